// ==========================================
// 成品库存台账 - 管理 API
// ==========================================
// 全量重置是唯一允许删除流水/审计的入口
// ==========================================

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::api::error::ApiResult;
use crate::repository::inventory_repo::InventoryStore;

/// 重置结果（各表删除行数）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetSummary {
    pub inventory_rows: usize,
    pub transaction_rows: usize,
    pub audit_rows: usize,
}

pub struct AdminApi {
    store: Arc<InventoryStore>,
}

impl AdminApi {
    pub fn new(store: Arc<InventoryStore>) -> Self {
        Self { store }
    }

    /// 清空库存、流水、审计（同一事务）
    pub fn reset_all_data(&self, operator: &str) -> ApiResult<ResetSummary> {
        warn!(operator, "full data reset requested");
        let (inventory_rows, transaction_rows, audit_rows) = self.store.reset_all()?;
        Ok(ResetSummary {
            inventory_rows,
            transaction_rows,
            audit_rows,
        })
    }
}
