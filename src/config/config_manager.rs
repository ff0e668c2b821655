// ==========================================
// 成品库存台账 - 配置管理器
// ==========================================
// 职责: 配置查询、覆写
// 存储: config_kv 表 (scope_id='global')
// 非法值一律回落默认值并记 warn，不阻断业务
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{format_ts, now_ts};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从共享连接创建
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取 global scope 的原始配置值
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入（覆盖）global scope 配置
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        if key.trim().is_empty() {
            return Err(RepositoryError::ValidationError("配置键不能为空".to_string()));
        }
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![GLOBAL_SCOPE, key, value, format_ts(&now_ts())],
        )?;
        tracing::info!(config_key = key, value, "config updated");
        Ok(())
    }

    /// 全部 global 配置快照
    pub fn get_config_snapshot(&self) -> RepositoryResult<BTreeMap<String, String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![GLOBAL_SCOPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut snapshot = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            snapshot.insert(key, value);
        }
        Ok(snapshot)
    }

    fn get_parsed_or<T: FromStr + Copy>(&self, key: &str, default: T) -> RepositoryResult<T> {
        let Some(raw) = self.get_global_config_value(key)? else {
            return Ok(default);
        };
        match raw.trim().parse::<T>() {
            Ok(v) => Ok(v),
            Err(_) => {
                tracing::warn!(config_key = key, raw_value = %raw, "配置格式错误，使用默认值");
                Ok(default)
            }
        }
    }

    // ==========================================
    // 类型化读取
    // ==========================================

    /// 台账分页默认条数（默认 50）
    pub fn default_page_size(&self) -> RepositoryResult<u32> {
        let v = self.get_parsed_or(config_keys::LEDGER_DEFAULT_PAGE_SIZE, defaults::DEFAULT_PAGE_SIZE)?;
        Ok(v.max(1))
    }

    /// 台账分页上限（默认 500）
    pub fn max_page_size(&self) -> RepositoryResult<u32> {
        let v = self.get_parsed_or(config_keys::LEDGER_MAX_PAGE_SIZE, defaults::MAX_PAGE_SIZE)?;
        Ok(v.max(1))
    }

    /// 审计日志缺省操作人
    pub fn default_operator(&self) -> RepositoryResult<String> {
        let value = self
            .get_global_config_value(config_keys::AUDIT_DEFAULT_OPERATOR)?
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| defaults::DEFAULT_OPERATOR.to_string());
        Ok(value)
    }

    /// 齐套计算是否默认叠加在产产量
    pub fn include_production(&self) -> RepositoryResult<bool> {
        let Some(raw) = self.get_global_config_value(config_keys::FULFILLMENT_INCLUDE_PRODUCTION)? else {
            return Ok(defaults::INCLUDE_PRODUCTION);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => {
                tracing::warn!(
                    config_key = config_keys::FULFILLMENT_INCLUDE_PRODUCTION,
                    raw_value = %raw,
                    "配置格式错误，使用默认值"
                );
                Ok(defaults::INCLUDE_PRODUCTION)
            }
        }
    }
}

// ==========================================
// 默认值
// ==========================================
pub mod defaults {
    pub const DEFAULT_PAGE_SIZE: u32 = 50;
    pub const MAX_PAGE_SIZE: u32 = 500;
    pub const DEFAULT_OPERATOR: &str = "system";
    pub const INCLUDE_PRODUCTION: bool = true;
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    pub const LEDGER_DEFAULT_PAGE_SIZE: &str = "ledger.default_page_size";
    pub const LEDGER_MAX_PAGE_SIZE: &str = "ledger.max_page_size";
    pub const AUDIT_DEFAULT_OPERATOR: &str = "audit.default_operator";
    pub const FULFILLMENT_INCLUDE_PRODUCTION: &str = "fulfillment.include_production";
}
