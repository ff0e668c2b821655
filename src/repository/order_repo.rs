// ==========================================
// 成品库存台账 - 销售订单仓储
// ==========================================
// 订单由外部系统维护；本仓储提供落库与齐套计算所需的只读查询
// warehouse_allocation 以 JSON 存储，序列化只发生在本文件
// ==========================================

use crate::domain::order::{Order, WarehouseAllocation};
use crate::domain::types::{OrderStatus, TradeType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{enum_err, format_ts, now_ts};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT order_id, style_no, total_tons, status, trade_type,
           package_spec, warehouse_allocation_json
    FROM sales_order
"#;

pub struct OrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OrderRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新增或覆盖订单
    pub fn upsert(&self, order: &Order) -> RepositoryResult<()> {
        if order.order_id.trim().is_empty() || order.style_no.trim().is_empty() {
            return Err(RepositoryError::ValidationError("订单号/款号不能为空".to_string()));
        }
        if !order.total_tons.is_finite() || order.total_tons < 0.0 {
            return Err(RepositoryError::FieldValueError {
                field: "total_tons".to_string(),
                message: format!("订单吨位非法: {}", order.total_tons),
            });
        }
        if let Some(alloc) = &order.warehouse_allocation {
            alloc.validate().map_err(|message| RepositoryError::FieldValueError {
                field: "warehouse_allocation".to_string(),
                message,
            })?;
        }

        let alloc_json = order
            .warehouse_allocation
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO sales_order (
                order_id, style_no, total_tons, status, trade_type,
                package_spec, warehouse_allocation_json, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(order_id) DO UPDATE SET
                style_no = excluded.style_no,
                total_tons = excluded.total_tons,
                status = excluded.status,
                trade_type = excluded.trade_type,
                package_spec = excluded.package_spec,
                warehouse_allocation_json = excluded.warehouse_allocation_json,
                updated_at = excluded.updated_at
            "#,
            params![
                order.order_id,
                order.style_no,
                order.total_tons,
                order.status.to_db_str(),
                order.trade_type.to_db_str(),
                order.package_spec,
                alloc_json,
                format_ts(&now_ts()),
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, order_id: &str) -> RepositoryResult<Option<Order>> {
        let conn = self.get_conn()?;
        Self::query_by_id(&conn, order_id)
    }

    pub fn list_by_style(&self, style_no: &str) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_conn()?;
        Self::query_by_style(&conn, style_no)
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_conn()?;
        Self::query_all(&conn)
    }

    // ==========================================
    // 快照读取（调用方已持有连接）
    // ==========================================

    pub(crate) fn query_by_id(conn: &Connection, order_id: &str) -> RepositoryResult<Option<Order>> {
        let order = conn
            .query_row(
                &format!("{} WHERE order_id = ?1", SELECT_COLUMNS),
                params![order_id],
                Self::map_row,
            )
            .optional()?;
        Ok(order)
    }

    pub(crate) fn query_by_style(conn: &Connection, style_no: &str) -> RepositoryResult<Vec<Order>> {
        let mut stmt = conn.prepare(&format!("{} WHERE style_no = ?1 ORDER BY order_id", SELECT_COLUMNS))?;
        let orders = stmt
            .query_map(params![style_no], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(orders)
    }

    pub(crate) fn query_all(conn: &Connection) -> RepositoryResult<Vec<Order>> {
        let mut stmt = conn.prepare(&format!("{} ORDER BY style_no, order_id", SELECT_COLUMNS))?;
        let orders = stmt
            .query_map([], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(orders)
    }

    fn map_row(row: &Row) -> SqliteResult<Order> {
        let status_raw: String = row.get(3)?;
        let trade_raw: String = row.get(4)?;
        let alloc_raw: Option<String> = row.get(6)?;

        let warehouse_allocation = alloc_raw
            .filter(|s| !s.trim().is_empty())
            .map(|s| serde_json::from_str::<WarehouseAllocation>(&s))
            .transpose()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;

        Ok(Order {
            order_id: row.get(0)?,
            style_no: row.get(1)?,
            total_tons: row.get(2)?,
            status: OrderStatus::from_db_str(&status_raw).ok_or_else(|| enum_err(3, &status_raw))?,
            trade_type: TradeType::from_db_str(&trade_raw).ok_or_else(|| enum_err(4, &trade_raw))?,
            package_spec: row.get(5)?,
            warehouse_allocation,
        })
    }
}
