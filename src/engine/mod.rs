// ==========================================
// 成品库存台账 - 引擎层
// ==========================================
// 职责: 实现业务规则计算,不拼 SQL
// 红线: Engine 不访问数据库, 输入输出均为领域对象
// ==========================================

pub mod allocation;
pub mod capacity;

// 重导出核心引擎
pub use allocation::{AllocationEngine, FulfillmentResult, OrderFulfillment};
pub use capacity::{LineCapacityProvider, ProductionSnapshot};
