// ==========================================
// 成品库存台账 - 库存现状仓储 (InventoryStore)
// ==========================================
// 红线: 每个写操作 = 一个 SQLite 事务
//       (库存行更新 + 对应流水/审计行 同进同退)
// 红线: 所有吨位落库前保留两位小数
// ==========================================
// 并发: 所有仓储共享同一个 Arc<Mutex<Connection>>，
//       持锁期间完成 读→算→写，天然单写者
// ==========================================

mod ops;
mod queries;


use crate::domain::inventory::{InventoryKey, InventoryRecord};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{enum_err, format_ts, parse_ts};
use crate::domain::types::WarehouseType;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

// ==========================================
// 操作结果 / 请求类型
// ==========================================

/// 单笔入/出库结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockResult {
    pub record: InventoryRecord,
    pub transaction_seq: i64,
}

/// 批量操作中单项失败
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItemError {
    pub index: usize,
    pub style_no: Option<String>,
    pub message: String,
    pub requested: Option<f64>,
    pub available: Option<f64>,
}

/// 批量入/出库结果（部分失败语义）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchResult {
    pub processed: usize,
    pub skipped: usize,
    pub errors: Vec<BatchItemError>,
    pub records: Vec<InventoryRecord>,
}

/// 库存调整请求（绝对值，未指定的品级保持原值）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustRequest {
    pub key: InventoryKey,
    pub grade_a: Option<f64>,
    pub grade_b: Option<f64>,
    pub reason: Option<String>,
    pub operator: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustResult {
    pub record: InventoryRecord,
    pub audit_seq: i64,
    /// 0~2 条 ADJUST_IN / ADJUST_OUT 流水
    pub transaction_seqs: Vec<i64>,
}

/// 锁定/解锁请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockRequest {
    pub key: InventoryKey,
    pub quantity: f64,
    pub reason: Option<String>,
    pub operator: String,
}

// ==========================================
// InventoryStore - 库存现状仓储
// ==========================================
pub struct InventoryStore {
    conn: Arc<Mutex<Connection>>,
}

pub(crate) const RECORD_COLUMNS: &str = r#"
    SELECT id, style_no, warehouse_type, package_spec, line_id,
           grade_a, grade_b, current_stock, locked_for_today, safety_stock, last_updated
    FROM inventory
"#;

impl InventoryStore {
    /// 创建库存仓储（共享连接）
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 行级读写（调用方负责事务）
    // ==========================================

    /// 按主键读取库存行，返回 (行id, 记录)
    pub(crate) fn load(conn: &Connection, key: &InventoryKey) -> RepositoryResult<Option<(i64, InventoryRecord)>> {
        let sql = format!(
            "{} WHERE style_no = ?1 AND warehouse_type = ?2 AND package_spec = ?3 AND line_id IS ?4",
            RECORD_COLUMNS
        );
        let found = conn
            .query_row(
                &sql,
                params![
                    key.style_no,
                    key.warehouse_type.to_db_str(),
                    key.package_spec,
                    key.line_id,
                ],
                |row| Ok((row.get::<_, i64>(0)?, Self::map_row(row)?)),
            )
            .optional()?;
        Ok(found)
    }

    /// 写回库存行；row_id 为 None 时插入新行
    pub(crate) fn save(conn: &Connection, row_id: Option<i64>, record: &InventoryRecord) -> RepositoryResult<i64> {
        match row_id {
            Some(id) => {
                conn.execute(
                    r#"
                    UPDATE inventory
                    SET grade_a = ?1, grade_b = ?2, current_stock = ?3,
                        locked_for_today = ?4, safety_stock = ?5, last_updated = ?6
                    WHERE id = ?7
                    "#,
                    params![
                        record.grade_a,
                        record.grade_b,
                        record.current_stock,
                        record.locked_for_today,
                        record.safety_stock,
                        format_ts(&record.last_updated),
                        id,
                    ],
                )?;
                Ok(id)
            }
            None => {
                conn.execute(
                    r#"
                    INSERT INTO inventory (
                        style_no, warehouse_type, package_spec, line_id,
                        grade_a, grade_b, current_stock, locked_for_today, safety_stock, last_updated
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                    "#,
                    params![
                        record.key.style_no,
                        record.key.warehouse_type.to_db_str(),
                        record.key.package_spec,
                        record.key.line_id,
                        record.grade_a,
                        record.grade_b,
                        record.current_stock,
                        record.locked_for_today,
                        record.safety_stock,
                        format_ts(&record.last_updated),
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            }
        }
    }

    /// 将数据库行映射为 InventoryRecord
    pub(crate) fn map_row(row: &Row) -> SqliteResult<InventoryRecord> {
        let warehouse_raw: String = row.get(2)?;
        let updated_raw: String = row.get(10)?;

        Ok(InventoryRecord {
            key: InventoryKey {
                style_no: row.get(1)?,
                warehouse_type: WarehouseType::from_db_str(&warehouse_raw)
                    .ok_or_else(|| enum_err(2, &warehouse_raw))?,
                package_spec: row.get(3)?,
                line_id: row.get(4)?,
            },
            grade_a: row.get(5)?,
            grade_b: row.get(6)?,
            current_stock: row.get(7)?,
            locked_for_today: row.get(8)?,
            safety_stock: row.get(9)?,
            last_updated: parse_ts(10, &updated_raw)?,
        })
    }

    fn not_found(key: &InventoryKey) -> RepositoryError {
        RepositoryError::NotFound {
            entity: "InventoryRecord".to_string(),
            id: key.to_string(),
        }
    }
}
