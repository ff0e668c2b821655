// ==========================================
// 成品库存台账 - 应用层
// ==========================================
// 职责: 进程内装配入口（外部调用方持有 AppState）
// ==========================================

pub mod state;

pub use state::{get_default_db_path, AppState};
