// ==========================================
// 成品库存台账 - 配置层
// ==========================================
// 存储: config_kv 表
// ==========================================

pub mod config_manager;

pub use config_manager::{config_keys, defaults, ConfigManager};
