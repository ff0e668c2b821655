// ==========================================
// 成品库存台账 - 流水/审计 API
// ==========================================
// 职责: 流水与审计分页查询、CSV 导出、回放核对
// 红线: 本模块只读，不改写任何日志
// ==========================================

use rusqlite::Connection;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::config::config_manager::ConfigManager;
use crate::domain::ledger::{
    replay_ledger, AuditLogEntry, AuditLogFilter, Page, ReconcileReport, TransactionEntry,
    TransactionFilter,
};
use crate::perf::PerfGuard;
use crate::repository::audit_log_repo::AuditLogRepository;
use crate::repository::inventory_repo::InventoryStore;
use crate::repository::row_utils::format_ts;
use crate::repository::transaction_repo::TransactionRepository;

const CSV_HEADER: [&str; 14] = [
    "seq",
    "entry_id",
    "created_at",
    "style_no",
    "warehouse_type",
    "package_spec",
    "line_id",
    "tx_type",
    "grade",
    "quantity",
    "balance",
    "source",
    "order_id",
    "note",
];

// ==========================================
// LedgerApi - 流水/审计 API
// ==========================================
pub struct LedgerApi {
    conn: Arc<Mutex<Connection>>,
    transaction_repo: Arc<TransactionRepository>,
    audit_log_repo: Arc<AuditLogRepository>,
    config: Arc<ConfigManager>,
}

impl LedgerApi {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        transaction_repo: Arc<TransactionRepository>,
        audit_log_repo: Arc<AuditLogRepository>,
        config: Arc<ConfigManager>,
    ) -> Self {
        Self {
            conn,
            transaction_repo,
            audit_log_repo,
            config,
        }
    }

    /// 流水分页（新→旧）
    pub fn list_transactions(&self, filter: &TransactionFilter) -> ApiResult<Page<TransactionEntry>> {
        check_time_range(filter.start_time.as_ref(), filter.end_time.as_ref())?;
        let (default_size, max_size) = self.page_limits()?;
        Ok(self.transaction_repo.list(filter, default_size, max_size)?)
    }

    /// 审计分页（新→旧）
    pub fn list_audit_logs(&self, filter: &AuditLogFilter) -> ApiResult<Page<AuditLogEntry>> {
        check_time_range(filter.start_time.as_ref(), filter.end_time.as_ref())?;
        let (default_size, max_size) = self.page_limits()?;
        Ok(self.audit_log_repo.list(filter, default_size, max_size)?)
    }

    /// 某订单的出库流水
    pub fn transactions_for_order(&self, order_id: &str) -> ApiResult<Vec<TransactionEntry>> {
        if order_id.trim().is_empty() {
            return Err(ApiError::ValidationError("订单号不能为空".to_string()));
        }
        Ok(self.transaction_repo.find_by_order(order_id.trim())?)
    }

    /// 导出过滤后的流水（忽略分页，新→旧）
    ///
    /// # 返回
    /// - Ok(n): 写出的数据行数（不含表头）
    pub fn export_transactions_csv<W: Write>(&self, filter: &TransactionFilter, writer: W) -> ApiResult<usize> {
        check_time_range(filter.start_time.as_ref(), filter.end_time.as_ref())?;
        let _perf = PerfGuard::new("export_transactions_csv");
        let entries = self.transaction_repo.list_all_matching(filter)?;

        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(CSV_HEADER)?;
        for e in &entries {
            wtr.write_record([
                e.seq.to_string(),
                e.entry_id.clone(),
                format_ts(&e.created_at),
                e.style_no.clone(),
                e.warehouse_type.to_db_str().to_string(),
                e.package_spec.clone(),
                e.line_id.clone().unwrap_or_default(),
                e.tx_type.to_db_str().to_string(),
                e.grade.to_db_str().to_string(),
                format!("{:.2}", e.quantity),
                format!("{:.2}", e.balance),
                e.source.clone().unwrap_or_default(),
                e.order_id.clone().unwrap_or_default(),
                e.note.clone().unwrap_or_default(),
            ])?;
        }
        wtr.flush()
            .map_err(|e| ApiError::StorageFailure(format!("CSV 导出失败: {}", e)))?;

        info!(rows = entries.len(), "transactions exported");
        Ok(entries.len())
    }

    /// 流水回放核对：逐键按 seq 回放，核对每笔 balance 与库存现存
    pub fn reconcile(&self) -> ApiResult<ReconcileReport> {
        let _perf = PerfGuard::new("reconcile");
        let (entries, records) = {
            let mut conn = self
                .conn
                .lock()
                .map_err(|e| ApiError::StorageFailure(format!("数据库锁获取失败: {}", e)))?;
            let tx = conn
                .transaction()
                .map_err(|e| ApiError::StorageFailure(e.to_string()))?;
            let entries = TransactionRepository::query_replay_order(&tx)?;
            let records = InventoryStore::query_all(&tx)?;
            (entries, records)
        };

        let report = replay_ledger(&entries, &records);
        if report.is_consistent() {
            info!(
                entries = report.entries_replayed,
                keys = report.keys_checked,
                "ledger reconciled"
            );
        } else {
            warn!(
                balance_mismatches = report.balance_mismatches.len(),
                stock_mismatches = report.stock_mismatches.len(),
                "ledger reconcile found mismatches"
            );
        }
        Ok(report)
    }

    fn page_limits(&self) -> ApiResult<(u32, u32)> {
        let max_size = self.config.max_page_size()?;
        let default_size = self.config.default_page_size()?.min(max_size);
        Ok((default_size, max_size))
    }
}

fn check_time_range(
    start: Option<&chrono::NaiveDateTime>,
    end: Option<&chrono::NaiveDateTime>,
) -> ApiResult<()> {
    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            return Err(ApiError::ValidationError(format!(
                "起始时间晚于结束时间: {} > {}",
                format_ts(s),
                format_ts(e)
            )));
        }
    }
    Ok(())
}
