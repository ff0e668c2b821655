// ==========================================
// 成品库存台账 - 数据仓储层
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约束: 所有仓储共享同一连接 (Arc<Mutex<Connection>>)
// ==========================================

pub mod audit_log_repo;
pub mod error;
pub mod inventory_repo;
pub mod order_repo;
pub mod production_line_repo;
pub mod row_utils;
pub mod transaction_repo;

// 重导出核心仓储
pub use audit_log_repo::AuditLogRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use inventory_repo::{
    AdjustRequest, AdjustResult, BatchItemError, BatchResult, InventoryStore, LockRequest,
    StockResult,
};
pub use order_repo::OrderRepository;
pub use production_line_repo::ProductionLineRepository;
pub use transaction_repo::TransactionRepository;
