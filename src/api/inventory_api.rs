// ==========================================
// 成品库存台账 - 库存 API
// ==========================================
// 职责: 库存查询、出入库、调整、锁定
// 红线: 每个写操作一个事务（由 InventoryStore 保证）
// ==========================================

use std::sync::Arc;
use tracing::debug;

use crate::api::error::{ApiError, ApiResult};
use crate::config::config_manager::ConfigManager;
use crate::domain::inventory::{InventoryAlert, InventoryKey, InventoryRecord, StockMovement, StyleSummary};
use crate::repository::inventory_repo::{
    AdjustRequest, AdjustResult, BatchResult, InventoryStore, LockRequest, StockResult,
};

// ==========================================
// InventoryApi - 库存 API
// ==========================================
pub struct InventoryApi {
    store: Arc<InventoryStore>,
    config: Arc<ConfigManager>,
}

impl InventoryApi {
    pub fn new(store: Arc<InventoryStore>, config: Arc<ConfigManager>) -> Self {
        Self { store, config }
    }

    // ==========================================
    // 查询接口
    // ==========================================

    /// 库存列表（按款号、产线排序）
    pub fn list_inventory(&self, line_id: Option<&str>) -> ApiResult<Vec<InventoryRecord>> {
        let line_id = line_id.map(str::trim).filter(|s| !s.is_empty());
        Ok(self.store.list(line_id)?)
    }

    /// 低于安全库存的记录
    pub fn alerts(&self) -> ApiResult<Vec<InventoryAlert>> {
        Ok(self.store.list_alerts()?)
    }

    /// 按主键查询单条库存
    pub fn get_record(&self, key: &InventoryKey) -> ApiResult<InventoryRecord> {
        let key = normalize_key(key)?;
        self.store
            .find(&key)?
            .ok_or_else(|| ApiError::NotFound(format!("库存记录不存在: {}", key)))
    }

    pub fn summary_by_style(&self) -> ApiResult<Vec<StyleSummary>> {
        Ok(self.store.summary_by_style()?)
    }

    // ==========================================
    // 出入库
    // ==========================================

    pub fn stock_in(&self, movement: &StockMovement) -> ApiResult<StockResult> {
        Ok(self.store.stock_in(movement)?)
    }

    pub fn stock_out(&self, movement: &StockMovement) -> ApiResult<StockResult> {
        Ok(self.store.stock_out(movement)?)
    }

    /// 批量入库：缺字段条目跳过
    pub fn batch_in(&self, items: &[StockMovement]) -> ApiResult<BatchResult> {
        if items.is_empty() {
            return Err(ApiError::ValidationError("批量入库列表为空".to_string()));
        }
        Ok(self.store.batch_in(items)?)
    }

    /// 批量出库：库存不足条目进入 errors，其余整体提交
    pub fn batch_out(&self, items: &[StockMovement]) -> ApiResult<BatchResult> {
        if items.is_empty() {
            return Err(ApiError::ValidationError("批量出库列表为空".to_string()));
        }
        Ok(self.store.batch_out(items)?)
    }

    // ==========================================
    // 调整 / 锁定 / 安全库存
    // ==========================================

    /// 库存调整（绝对值）
    ///
    /// # 参数
    /// - grade_a / grade_b: 调整后的品级数量，None 表示保持不变
    /// - operator: 为空时取配置 audit.default_operator
    pub fn adjust(
        &self,
        key: &InventoryKey,
        grade_a: Option<f64>,
        grade_b: Option<f64>,
        reason: Option<String>,
        operator: Option<String>,
    ) -> ApiResult<AdjustResult> {
        let req = AdjustRequest {
            key: normalize_key(key)?,
            grade_a,
            grade_b,
            reason,
            operator: self.resolve_operator(operator)?,
        };
        Ok(self.store.adjust(&req)?)
    }

    pub fn lock(
        &self,
        key: &InventoryKey,
        quantity: f64,
        reason: Option<String>,
        operator: Option<String>,
    ) -> ApiResult<InventoryRecord> {
        let req = self.lock_request(key, quantity, reason, operator)?;
        Ok(self.store.lock(&req)?)
    }

    pub fn unlock(
        &self,
        key: &InventoryKey,
        quantity: f64,
        reason: Option<String>,
        operator: Option<String>,
    ) -> ApiResult<InventoryRecord> {
        let req = self.lock_request(key, quantity, reason, operator)?;
        Ok(self.store.unlock(&req)?)
    }

    pub fn set_safety_stock(&self, key: &InventoryKey, safety_stock: f64) -> ApiResult<InventoryRecord> {
        let key = normalize_key(key)?;
        Ok(self.store.set_safety_stock(&key, safety_stock)?)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    fn lock_request(
        &self,
        key: &InventoryKey,
        quantity: f64,
        reason: Option<String>,
        operator: Option<String>,
    ) -> ApiResult<LockRequest> {
        Ok(LockRequest {
            key: normalize_key(key)?,
            quantity,
            reason,
            operator: self.resolve_operator(operator)?,
        })
    }

    fn resolve_operator(&self, operator: Option<String>) -> ApiResult<String> {
        match operator.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) {
            Some(op) => Ok(op),
            None => {
                let fallback = self.config.default_operator()?;
                debug!(operator = %fallback, "operator not given, using default");
                Ok(fallback)
            }
        }
    }
}

/// 主键规整：款号必填；包装规格去空白；空产线视为无产线
fn normalize_key(key: &InventoryKey) -> ApiResult<InventoryKey> {
    let style_no = key.style_no.trim();
    if style_no.is_empty() {
        return Err(ApiError::ValidationError("款号不能为空".to_string()));
    }
    Ok(InventoryKey {
        style_no: style_no.to_string(),
        warehouse_type: key.warehouse_type,
        package_spec: key.package_spec.trim().to_string(),
        line_id: key
            .line_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::WarehouseType;

    #[test]
    fn test_normalize_key() {
        let key = InventoryKey::new(" ST-1 ", WarehouseType::Bonded, " 1T ", Some("  ".to_string()));
        let norm = normalize_key(&key).unwrap();
        assert_eq!(norm, InventoryKey::new("ST-1", WarehouseType::Bonded, "1T", None));

        let blank = InventoryKey::new("", WarehouseType::General, "", None);
        assert!(matches!(normalize_key(&blank), Err(ApiError::ValidationError(_))));
    }
}
