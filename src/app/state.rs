// ==========================================
// 成品库存台账 - 应用状态
// ==========================================
// 职责: 打开共享连接、执行迁移、装配仓储/引擎/API
// 约束: 无全局单例，调用方持有 AppState 并按需克隆 Arc
// ==========================================

use anyhow::Context;
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::api::{AdminApi, FulfillmentApi, InventoryApi, LedgerApi};
use crate::config::config_manager::ConfigManager;
use crate::db::{open_sqlite_connection, read_schema_version, run_migrations};
use crate::engine::AllocationEngine;
use crate::repository::{
    AuditLogRepository, InventoryStore, OrderRepository, ProductionLineRepository,
    TransactionRepository,
};

pub const DB_PATH_ENV: &str = "INVENTORY_LEDGER_DB_PATH";

/// 应用状态
pub struct AppState {
    pub db_path: String,

    /// 共享连接（单写者）
    pub conn: Arc<Mutex<Connection>>,

    pub config: Arc<ConfigManager>,
    pub order_repo: Arc<OrderRepository>,
    pub production_line_repo: Arc<ProductionLineRepository>,

    pub inventory_api: Arc<InventoryApi>,
    pub ledger_api: Arc<LedgerApi>,
    pub fulfillment_api: Arc<FulfillmentApi>,
    pub admin_api: Arc<AdminApi>,
}

impl AppState {
    /// 初始化应用状态
    ///
    /// 1. 打开数据库并应用统一 PRAGMA
    /// 2. 执行待执行的迁移
    /// 3. 装配仓储、引擎、API
    pub fn new(db_path: impl Into<String>) -> anyhow::Result<Self> {
        let db_path = db_path.into();
        tracing::info!(db_path = %db_path, "初始化AppState");

        let mut conn = open_sqlite_connection(&db_path)
            .with_context(|| format!("无法打开数据库: {}", db_path))?;
        crate::perf::install_sqlite_tracing(&mut conn);

        let applied = run_migrations(&mut conn).context("数据库迁移失败")?;
        let version = read_schema_version(&conn).context("读取 schema_version 失败")?;
        tracing::info!(applied, schema_version = ?version, "数据库迁移完成");

        Ok(Self::from_connection(db_path, Arc::new(Mutex::new(conn))))
    }

    /// 基于已迁移的共享连接装配
    pub fn from_connection(db_path: String, conn: Arc<Mutex<Connection>>) -> Self {
        // ==========================================
        // Repository 层
        // ==========================================
        let store = Arc::new(InventoryStore::new(conn.clone()));
        let transaction_repo = Arc::new(TransactionRepository::new(conn.clone()));
        let audit_log_repo = Arc::new(AuditLogRepository::new(conn.clone()));
        let order_repo = Arc::new(OrderRepository::new(conn.clone()));
        let production_line_repo = Arc::new(ProductionLineRepository::new(conn.clone()));
        let config = Arc::new(ConfigManager::from_connection(conn.clone()));

        // ==========================================
        // Engine / API 层
        // ==========================================
        let engine = Arc::new(AllocationEngine::new());

        let inventory_api = Arc::new(InventoryApi::new(store.clone(), config.clone()));
        let ledger_api = Arc::new(LedgerApi::new(
            conn.clone(),
            transaction_repo,
            audit_log_repo,
            config.clone(),
        ));
        let fulfillment_api = Arc::new(FulfillmentApi::new(conn.clone(), engine, config.clone()));
        let admin_api = Arc::new(AdminApi::new(store));

        Self {
            db_path,
            conn,
            config,
            order_repo,
            production_line_repo,
            inventory_api,
            ledger_api,
            fulfillment_api,
            admin_api,
        }
    }

    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }
}

/// 默认数据库路径
///
/// 优先级: 环境变量 INVENTORY_LEDGER_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./inventory_ledger.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("inventory-ledger");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("inventory_ledger.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_from_in_memory_connection() {
        let conn = crate::db::open_in_memory_migrated().unwrap();
        let state = AppState::from_connection(":memory:".to_string(), Arc::new(Mutex::new(conn)));
        assert_eq!(state.get_db_path(), ":memory:");
        assert!(state.inventory_api.list_inventory(None).unwrap().is_empty());
    }
}
