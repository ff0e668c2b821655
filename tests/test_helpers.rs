// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库 + AppState 装配 + 常用测试数据
// ==========================================
#![allow(dead_code)]

use inventory_ledger::app::AppState;
use inventory_ledger::domain::inventory::{InventoryKey, StockMovement};
use inventory_ledger::domain::order::{Order, ProductionLine, WarehouseAllocation};
use inventory_ledger::domain::types::{Grade, LineStatus, OrderStatus, TradeType, WarehouseType};
use std::error::Error;
use tempfile::NamedTempFile;

/// 创建临时数据库文件
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("临时文件路径不是合法 UTF-8")?
        .to_string();
    Ok((temp_file, db_path))
}

/// 在临时数据库上初始化完整 AppState（含迁移）
pub fn create_test_state() -> (NamedTempFile, AppState) {
    let (temp_file, db_path) = create_test_db().unwrap();
    let state = AppState::new(db_path).unwrap();
    (temp_file, state)
}

pub fn general_key(style_no: &str) -> InventoryKey {
    InventoryKey::new(style_no, WarehouseType::General, "25KG", None)
}

pub fn bonded_key(style_no: &str) -> InventoryKey {
    InventoryKey::new(style_no, WarehouseType::Bonded, "25KG", None)
}

pub fn movement(key: &InventoryKey, quantity: f64, grade: Grade) -> StockMovement {
    StockMovement::new(key, quantity, grade)
}

pub fn order(order_id: &str, style_no: &str, total_tons: f64, status: OrderStatus) -> Order {
    Order {
        order_id: order_id.to_string(),
        style_no: style_no.to_string(),
        total_tons,
        status,
        trade_type: TradeType::General,
        package_spec: None,
        warehouse_allocation: None,
    }
}

pub fn allocated_order(order_id: &str, style_no: &str, general: f64, bonded: f64) -> Order {
    Order {
        warehouse_allocation: Some(WarehouseAllocation { general, bonded }),
        ..order(order_id, style_no, general + bonded, OrderStatus::Confirmed)
    }
}

pub fn running_line(line_id: &str, style_no: &str, export_capacity: f64) -> ProductionLine {
    ProductionLine {
        line_id: line_id.to_string(),
        name: format!("{}线", line_id),
        status: LineStatus::Running,
        current_style: Some(style_no.to_string()),
        export_capacity,
        sub_lines: Vec::new(),
    }
}
