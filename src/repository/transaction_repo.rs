// ==========================================
// 成品库存台账 - 出入库流水仓储
// ==========================================
// 红线: 只追加；写入只能发生在 InventoryStore 的事务内
// ==========================================

use crate::domain::ledger::{NewTransaction, Page, TransactionEntry, TransactionFilter};
use crate::domain::types::{Grade, TransactionType, WarehouseType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{
    enum_err, format_ts, now_ts, paging, parse_ts, WhereBuilder,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT seq, entry_id, style_no, warehouse_type, package_spec, line_id,
           tx_type, grade, quantity, balance, source, note, order_id, created_at
    FROM inventory_transaction
"#;

// ==========================================
// TransactionRepository - 出入库流水仓储
// ==========================================
pub struct TransactionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TransactionRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入（事务内）
    // ==========================================

    /// 在调用方事务内追加一条流水
    ///
    /// # 返回
    /// - Ok(seq): 数据库分配的顺序号
    pub(crate) fn append(conn: &Connection, tx: &NewTransaction) -> RepositoryResult<i64> {
        conn.execute(
            r#"
            INSERT INTO inventory_transaction (
                entry_id, style_no, warehouse_type, package_spec, line_id,
                tx_type, grade, quantity, balance, source, note, order_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                uuid::Uuid::new_v4().to_string(),
                tx.key.style_no,
                tx.key.warehouse_type.to_db_str(),
                tx.key.package_spec,
                tx.key.line_id,
                tx.tx_type.to_db_str(),
                tx.grade.to_db_str(),
                tx.quantity,
                tx.balance,
                tx.source,
                tx.note,
                tx.order_id,
                format_ts(&now_ts()),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 分页查询流水（新→旧）
    pub fn list(
        &self,
        filter: &TransactionFilter,
        default_page_size: u32,
        max_page_size: u32,
    ) -> RepositoryResult<Page<TransactionEntry>> {
        let conn = self.get_conn()?;
        let wb = Self::build_where(filter);
        let (page, page_size, offset) =
            paging(filter.page, filter.page_size, default_page_size, max_page_size);

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM inventory_transaction {}", wb.sql()),
            params_from_iter(wb.values().iter()),
            |row| row.get(0),
        )?;

        let sql = format!("{} {} ORDER BY seq DESC LIMIT ? OFFSET ?", SELECT_COLUMNS, wb.sql());
        let mut values: Vec<Value> = wb.values().to_vec();
        values.push(Value::Integer(page_size as i64));
        values.push(Value::Integer(offset));

        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params_from_iter(values.iter()), Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(Page {
            items,
            total: total.max(0) as u64,
            page,
            page_size,
        })
    }

    /// 按过滤条件取全部流水（新→旧，不分页，用于导出）
    pub fn list_all_matching(&self, filter: &TransactionFilter) -> RepositoryResult<Vec<TransactionEntry>> {
        let conn = self.get_conn()?;
        let wb = Self::build_where(filter);
        let sql = format!("{} {} ORDER BY seq DESC", SELECT_COLUMNS, wb.sql());

        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params_from_iter(wb.values().iter()), Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(items)
    }

    /// 全部流水按写入顺序（旧→新），用于回放核对；调用方持锁并开读事务
    pub(crate) fn query_replay_order(conn: &Connection) -> RepositoryResult<Vec<TransactionEntry>> {
        let mut stmt = conn.prepare(&format!("{} ORDER BY seq ASC", SELECT_COLUMNS))?;
        let items = stmt
            .query_map([], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(items)
    }

    /// 按订单号查询（出库追溯）
    pub fn find_by_order(&self, order_id: &str) -> RepositoryResult<Vec<TransactionEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!("{} WHERE order_id = ?1 ORDER BY seq DESC", SELECT_COLUMNS))?;
        let items = stmt
            .query_map(params![order_id], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(items)
    }

    pub fn count(&self) -> RepositoryResult<u64> {
        let conn = self.get_conn()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM inventory_transaction", [], |row| row.get(0))?;
        Ok(n.max(0) as u64)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    fn build_where(filter: &TransactionFilter) -> WhereBuilder {
        let mut wb = WhereBuilder::new();
        wb.push_opt_text("style_no = ?", filter.style_no.as_deref());
        wb.push_opt_text(
            "warehouse_type = ?",
            filter.warehouse_type.as_ref().map(WarehouseType::to_db_str),
        );
        wb.push_opt_text("package_spec = ?", filter.package_spec.as_deref());
        wb.push_opt_text("tx_type = ?", filter.tx_type.as_ref().map(TransactionType::to_db_str));
        if let Some(start) = &filter.start_time {
            wb.push("created_at >= ?", Value::Text(format_ts(start)));
        }
        if let Some(end) = &filter.end_time {
            wb.push("created_at <= ?", Value::Text(format_ts(end)));
        }
        wb
    }

    fn map_row(row: &Row) -> SqliteResult<TransactionEntry> {
        let warehouse_raw: String = row.get(3)?;
        let tx_type_raw: String = row.get(6)?;
        let grade_raw: String = row.get(7)?;
        let created_raw: String = row.get(13)?;

        Ok(TransactionEntry {
            seq: row.get(0)?,
            entry_id: row.get(1)?,
            style_no: row.get(2)?,
            warehouse_type: WarehouseType::from_db_str(&warehouse_raw)
                .ok_or_else(|| enum_err(3, &warehouse_raw))?,
            package_spec: row.get(4)?,
            line_id: row.get(5)?,
            tx_type: TransactionType::from_db_str(&tx_type_raw)
                .ok_or_else(|| enum_err(6, &tx_type_raw))?,
            grade: Grade::from_db_str(&grade_raw).ok_or_else(|| enum_err(7, &grade_raw))?,
            quantity: row.get(8)?,
            balance: row.get(9)?,
            source: row.get(10)?,
            note: row.get(11)?,
            order_id: row.get(12)?,
            created_at: parse_ts(13, &created_raw)?,
        })
    }
}
