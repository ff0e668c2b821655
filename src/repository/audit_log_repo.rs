// ==========================================
// 成品库存台账 - 库存审计日志仓储
// ==========================================
// 记录调整/锁定/解锁的前后快照、原因、操作人
// 红线: 只追加；写入只能发生在 InventoryStore 的事务内
// ==========================================

use crate::domain::ledger::{AuditLogEntry, AuditLogFilter, NewAuditLog, Page};
use crate::domain::types::{AuditAction, WarehouseType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{enum_err, format_ts, now_ts, paging, parse_ts, WhereBuilder};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT seq, log_id, style_no, warehouse_type, package_spec, line_id, action,
           before_grade_a, before_grade_b, after_grade_a, after_grade_b,
           before_locked, after_locked, reason, operator, created_at
    FROM inventory_audit_log
"#;

pub struct AuditLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AuditLogRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 在调用方事务内追加审计记录
    pub(crate) fn append(conn: &Connection, log: &NewAuditLog) -> RepositoryResult<i64> {
        conn.execute(
            r#"
            INSERT INTO inventory_audit_log (
                log_id, style_no, warehouse_type, package_spec, line_id, action,
                before_grade_a, before_grade_b, after_grade_a, after_grade_b,
                before_locked, after_locked, reason, operator, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
            params![
                uuid::Uuid::new_v4().to_string(),
                log.key.style_no,
                log.key.warehouse_type.to_db_str(),
                log.key.package_spec,
                log.key.line_id,
                log.action.to_db_str(),
                log.before_grade_a,
                log.before_grade_b,
                log.after_grade_a,
                log.after_grade_b,
                log.before_locked,
                log.after_locked,
                log.reason,
                log.operator,
                format_ts(&now_ts()),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 分页查询审计日志（新→旧）
    pub fn list(
        &self,
        filter: &AuditLogFilter,
        default_page_size: u32,
        max_page_size: u32,
    ) -> RepositoryResult<Page<AuditLogEntry>> {
        let conn = self.get_conn()?;

        let mut wb = WhereBuilder::new();
        wb.push_opt_text("style_no = ?", filter.style_no.as_deref());
        wb.push_opt_text(
            "warehouse_type = ?",
            filter.warehouse_type.as_ref().map(WarehouseType::to_db_str),
        );
        wb.push_opt_text("package_spec = ?", filter.package_spec.as_deref());
        wb.push_opt_text("line_id = ?", filter.line_id.as_deref());
        wb.push_opt_text("action = ?", filter.action.as_ref().map(AuditAction::to_db_str));
        if let Some(start) = &filter.start_time {
            wb.push("created_at >= ?", Value::Text(format_ts(start)));
        }
        if let Some(end) = &filter.end_time {
            wb.push("created_at <= ?", Value::Text(format_ts(end)));
        }

        let (page, page_size, offset) =
            paging(filter.page, filter.page_size, default_page_size, max_page_size);

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM inventory_audit_log {}", wb.sql()),
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

    pub fn count(&self) -> RepositoryResult<u64> {
        let conn = self.get_conn()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM inventory_audit_log", [], |row| row.get(0))?;
        Ok(n.max(0) as u64)
    }

    fn map_row(row: &Row) -> SqliteResult<AuditLogEntry> {
        let warehouse_raw: String = row.get(3)?;
        let action_raw: String = row.get(6)?;
        let created_raw: String = row.get(15)?;

        Ok(AuditLogEntry {
            seq: row.get(0)?,
            log_id: row.get(1)?,
            style_no: row.get(2)?,
            warehouse_type: WarehouseType::from_db_str(&warehouse_raw)
                .ok_or_else(|| enum_err(3, &warehouse_raw))?,
            package_spec: row.get(4)?,
            line_id: row.get(5)?,
            action: AuditAction::from_db_str(&action_raw).ok_or_else(|| enum_err(6, &action_raw))?,
            before_grade_a: row.get(7)?,
            before_grade_b: row.get(8)?,
            after_grade_a: row.get(9)?,
            after_grade_b: row.get(10)?,
            before_locked: row.get(11)?,
            after_locked: row.get(12)?,
            reason: row.get(13)?,
            operator: row.get(14)?,
            created_at: parse_ts(15, &created_raw)?,
        })
    }
}
