// ==========================================
// 成品库存台账 - 出入库流水 / 审计日志
// ==========================================
// 红线: 两类日志只追加，不更新，不删除（全量重置除外）
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::domain::inventory::{round_qty, InventoryKey, InventoryRecord};
use crate::domain::types::{AuditAction, Grade, TransactionType, WarehouseType};

// ==========================================
// TransactionEntry - 出入库流水
// ==========================================
// balance 为本笔操作后的 current_stock，按 seq 顺序回放可复现
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionEntry {
    pub seq: i64,
    pub entry_id: String,
    pub style_no: String,
    pub warehouse_type: WarehouseType,
    pub package_spec: String,
    pub line_id: Option<String>,
    pub tx_type: TransactionType,
    pub grade: Grade,
    pub quantity: f64,
    pub balance: f64,
    pub source: Option<String>,
    pub note: Option<String>,
    pub order_id: Option<String>,
    pub created_at: NaiveDateTime,
}

impl TransactionEntry {
    pub fn key(&self) -> InventoryKey {
        InventoryKey {
            style_no: self.style_no.clone(),
            warehouse_type: self.warehouse_type,
            package_spec: self.package_spec.clone(),
            line_id: self.line_id.clone(),
        }
    }
}

/// 待写入的流水（seq 由数据库分配）
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub key: InventoryKey,
    pub tx_type: TransactionType,
    pub grade: Grade,
    pub quantity: f64,
    pub balance: f64,
    pub source: Option<String>,
    pub note: Option<String>,
    pub order_id: Option<String>,
}

// ==========================================
// AuditLogEntry - 调整/锁定审计
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub seq: i64,
    pub log_id: String,
    pub style_no: String,
    pub warehouse_type: WarehouseType,
    pub package_spec: String,
    pub line_id: Option<String>,
    pub action: AuditAction,
    pub before_grade_a: f64,
    pub before_grade_b: f64,
    pub after_grade_a: f64,
    pub after_grade_b: f64,
    pub before_locked: f64,
    pub after_locked: f64,
    pub reason: Option<String>,
    pub operator: String,
    pub created_at: NaiveDateTime,
}

/// 待写入的审计记录
#[derive(Debug, Clone)]
pub struct NewAuditLog {
    pub key: InventoryKey,
    pub action: AuditAction,
    pub before_grade_a: f64,
    pub before_grade_b: f64,
    pub after_grade_a: f64,
    pub after_grade_b: f64,
    pub before_locked: f64,
    pub after_locked: f64,
    pub reason: Option<String>,
    pub operator: String,
}

// ==========================================
// 查询过滤 / 分页
// ==========================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionFilter {
    pub style_no: Option<String>,
    pub warehouse_type: Option<WarehouseType>,
    pub package_spec: Option<String>,
    pub tx_type: Option<TransactionType>,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    /// 页码从 1 开始
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditLogFilter {
    pub style_no: Option<String>,
    pub warehouse_type: Option<WarehouseType>,
    pub package_spec: Option<String>,
    pub line_id: Option<String>,
    pub action: Option<AuditAction>,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u32 {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(self.page_size as u64) as u32
    }
}

// ==========================================
// 台账回放核对
// ==========================================

/// 回放结存与记录值的允许误差（两位小数）
const BALANCE_TOLERANCE: f64 = 0.005;

/// 流水 balance 与回放结存不一致
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceMismatch {
    pub seq: i64,
    pub key: InventoryKey,
    pub recorded_balance: f64,
    pub replayed_balance: f64,
}

/// 库存现存与回放终值不一致
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMismatch {
    pub key: InventoryKey,
    pub current_stock: f64,
    pub replayed_balance: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub entries_replayed: usize,
    pub keys_checked: usize,
    pub balance_mismatches: Vec<BalanceMismatch>,
    pub stock_mismatches: Vec<StockMismatch>,
}

impl ReconcileReport {
    pub fn is_consistent(&self) -> bool {
        self.balance_mismatches.is_empty() && self.stock_mismatches.is_empty()
    }
}

/// 按 seq 顺序逐键回放流水，与流水 balance 及库存现存逐一核对
///
/// `entries` 必须为写入顺序（旧→新）。
pub fn replay_ledger(entries: &[TransactionEntry], records: &[InventoryRecord]) -> ReconcileReport {
    let mut replayed: HashMap<InventoryKey, f64> = HashMap::new();
    let mut report = ReconcileReport {
        entries_replayed: entries.len(),
        ..Default::default()
    };

    for entry in entries {
        let key = entry.key();
        let balance = replayed.entry(key.clone()).or_insert(0.0);
        *balance = round_qty(*balance + entry.tx_type.sign() * entry.quantity);
        if (*balance - entry.balance).abs() > BALANCE_TOLERANCE {
            report.balance_mismatches.push(BalanceMismatch {
                seq: entry.seq,
                key,
                recorded_balance: entry.balance,
                replayed_balance: *balance,
            });
        }
    }

    let mut checked: HashSet<InventoryKey> = HashSet::new();
    for record in records {
        checked.insert(record.key.clone());
        let end = replayed.get(&record.key).copied().unwrap_or(0.0);
        if (record.current_stock - end).abs() > BALANCE_TOLERANCE {
            report.stock_mismatches.push(StockMismatch {
                key: record.key.clone(),
                current_stock: record.current_stock,
                replayed_balance: end,
            });
        }
    }

    // 有流水但库存行已不存在
    let mut orphans: Vec<(&InventoryKey, f64)> = replayed
        .iter()
        .filter(|(key, _)| !checked.contains(*key))
        .map(|(key, end)| (key, *end))
        .collect();
    orphans.sort_by(|a, b| a.0.to_string().cmp(&b.0.to_string()));
    for (key, end) in orphans {
        checked.insert(key.clone());
        if end.abs() > BALANCE_TOLERANCE {
            report.stock_mismatches.push(StockMismatch {
                key: key.clone(),
                current_stock: 0.0,
                replayed_balance: end,
            });
        }
    }

    report.keys_checked = checked.len();
    report
}
