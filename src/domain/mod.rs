// ==========================================
// 成品库存台账 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、值对象
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod inventory;
pub mod ledger;
pub mod order;
pub mod types;

// 重导出核心类型
pub use inventory::{
    round_qty, InventoryAlert, InventoryKey, InventoryRecord, StockMovement, StyleSummary,
    ValidMovement,
};
pub use ledger::{
    AuditLogEntry, AuditLogFilter, BalanceMismatch, NewAuditLog, NewTransaction, Page,
    replay_ledger, ReconcileReport, StockMismatch, TransactionEntry, TransactionFilter,
};
pub use order::{Order, ProductionLine, SubLine, WarehouseAllocation};
pub use types::{
    AuditAction, Grade, LineStatus, OrderStatus, TradeType, TransactionType, WarehouseType,
};
