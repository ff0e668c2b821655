// ==========================================
// 成品库存台账与订单齐套 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 单写者库存台账 + 只读齐套计算
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 齐套计算
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/迁移）
pub mod db;

// 日志系统
pub mod logging;

// SQL 性能观测
pub mod perf;

// API 层 - 业务接口
pub mod api;

// 应用层 - 装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    AuditAction, Grade, LineStatus, OrderStatus, TradeType, TransactionType, WarehouseType,
};

// 领域实体
pub use domain::{
    AuditLogEntry, InventoryKey, InventoryRecord, Order, ProductionLine, StockMovement,
    TransactionEntry, WarehouseAllocation,
};

// 引擎
pub use engine::{AllocationEngine, FulfillmentResult, LineCapacityProvider, ProductionSnapshot};

// API
pub use api::{AdminApi, ApiError, ApiResult, FulfillmentApi, InventoryApi, LedgerApi};

pub use app::AppState;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "成品库存台账";
