// ==========================================
// 成品库存台账 - API 层
// ==========================================
// 职责: 对外业务接口，统一错误类型 ApiError
// ==========================================

pub mod admin_api;
pub mod error;
pub mod fulfillment_api;
pub mod inventory_api;
pub mod ledger_api;

pub use admin_api::{AdminApi, ResetSummary};
pub use error::{ApiError, ApiResult};
pub use fulfillment_api::FulfillmentApi;
pub use inventory_api::InventoryApi;
pub use ledger_api::LedgerApi;
