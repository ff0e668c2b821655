// ==========================================
// 成品库存台账 - 订单齐套 API
// ==========================================
// 职责: 加载一致快照（库存 + 订单 + 运行产线），交给 AllocationEngine 计算
// 红线: 快照在同一把连接锁、同一个读事务内读取；本路径不写库
// ==========================================

use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::api::error::{ApiError, ApiResult};
use crate::config::config_manager::ConfigManager;
use crate::domain::inventory::InventoryRecord;
use crate::domain::order::Order;
use crate::domain::types::OrderStatus;
use crate::engine::allocation::{AllocationEngine, FulfillmentResult, OrderFulfillment};
use crate::engine::capacity::{LineCapacityProvider, ProductionSnapshot};
use crate::perf::PerfGuard;
use crate::repository::inventory_repo::InventoryStore;
use crate::repository::order_repo::OrderRepository;
use crate::repository::production_line_repo::ProductionLineRepository;

/// 一次齐套计算所需的全部输入
struct FulfillmentSnapshot {
    records: Vec<InventoryRecord>,
    orders: Vec<Order>,
    lines: ProductionSnapshot,
}

// ==========================================
// FulfillmentApi - 订单齐套 API
// ==========================================
pub struct FulfillmentApi {
    conn: Arc<Mutex<Connection>>,
    engine: Arc<AllocationEngine>,
    config: Arc<ConfigManager>,
}

impl FulfillmentApi {
    pub fn new(conn: Arc<Mutex<Connection>>, engine: Arc<AllocationEngine>, config: Arc<ConfigManager>) -> Self {
        Self { conn, engine, config }
    }

    /// 以调用方给定的订单集合计算（库存与产线取当前快照）
    ///
    /// `all_orders` 可以包含目标订单本身。
    pub fn compute_fulfillment(
        &self,
        order: &Order,
        all_orders: &[Order],
        include_production: bool,
    ) -> ApiResult<FulfillmentResult> {
        validate_order(order)?;
        let snapshot = self.load_snapshot(Some(&order.style_no), false)?;
        Ok(self.engine.compute(
            order,
            &snapshot.records,
            all_orders,
            include_production,
            &snapshot.lines,
        ))
    }

    /// 按订单号计算（订单集合取库内同款号订单）
    ///
    /// include_production 为 None 时取配置 fulfillment.include_production
    pub fn compute_for_order(
        &self,
        order_id: &str,
        include_production: Option<bool>,
    ) -> ApiResult<FulfillmentResult> {
        let include_production = self.resolve_include_production(include_production)?;

        let (order, snapshot) = {
            let mut conn = self.lock_conn()?;
            let tx = conn
                .transaction()
                .map_err(|e| ApiError::StorageFailure(e.to_string()))?;
            let order = OrderRepository::query_by_id(&tx, order_id)?
                .ok_or_else(|| ApiError::NotFound(format!("订单不存在: {}", order_id)))?;
            let snapshot = Self::read_snapshot(&tx, Some(&order.style_no), true)?;
            (order, snapshot)
        };

        Ok(self.engine.compute(
            &order,
            &snapshot.records,
            &snapshot.orders,
            include_production,
            &snapshot.lines,
        ))
    }

    /// 全部未发货订单的齐套情况（订单列表视图，单一快照）
    pub fn compute_all_open(&self, include_production: Option<bool>) -> ApiResult<Vec<OrderFulfillment>> {
        let _perf = PerfGuard::new("compute_all_open");
        let include_production = self.resolve_include_production(include_production)?;
        let snapshot = self.load_snapshot(None, true)?;

        let results: Vec<OrderFulfillment> = snapshot
            .orders
            .iter()
            .filter(|o| o.status != OrderStatus::Shipped)
            .map(|o| OrderFulfillment {
                order_id: o.order_id.clone(),
                style_no: o.style_no.clone(),
                status: o.status,
                total_tons: o.total_tons,
                result: self.engine.compute(
                    o,
                    &snapshot.records,
                    &snapshot.orders,
                    include_production,
                    &snapshot.lines,
                ),
            })
            .collect();

        debug!(orders = results.len(), "open orders computed");
        Ok(results)
    }

    /// 当日在产出口产量（按款号）
    pub fn production_for_style(&self, style_no: &str) -> ApiResult<f64> {
        let conn = self.lock_conn()?;
        let lines = ProductionSnapshot::new(ProductionLineRepository::query_running(&conn)?);
        Ok(lines.export_capacity_for_style(style_no))
    }

    // ==========================================
    // 快照读取
    // ==========================================

    fn lock_conn(&self) -> ApiResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ApiError::StorageFailure(format!("数据库锁获取失败: {}", e)))
    }

    fn load_snapshot(&self, style_no: Option<&str>, with_orders: bool) -> ApiResult<FulfillmentSnapshot> {
        let mut conn = self.lock_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| ApiError::StorageFailure(e.to_string()))?;
        Self::read_snapshot(&tx, style_no, with_orders)
    }

    fn read_snapshot(conn: &Connection, style_no: Option<&str>, with_orders: bool) -> ApiResult<FulfillmentSnapshot> {
        let records = match style_no {
            Some(style) => InventoryStore::query_by_style(conn, style)?,
            None => InventoryStore::query_all(conn)?,
        };
        let orders = match (with_orders, style_no) {
            (false, _) => Vec::new(),
            (true, Some(style)) => OrderRepository::query_by_style(conn, style)?,
            (true, None) => OrderRepository::query_all(conn)?,
        };
        let lines = ProductionSnapshot::new(ProductionLineRepository::query_running(conn)?);

        Ok(FulfillmentSnapshot { records, orders, lines })
    }

    fn resolve_include_production(&self, explicit: Option<bool>) -> ApiResult<bool> {
        match explicit {
            Some(v) => Ok(v),
            None => Ok(self.config.include_production()?),
        }
    }
}

fn validate_order(order: &Order) -> ApiResult<()> {
    if order.style_no.trim().is_empty() {
        return Err(ApiError::ValidationError("订单款号不能为空".to_string()));
    }
    if !order.total_tons.is_finite() || order.total_tons < 0.0 {
        return Err(ApiError::ValidationError(format!("订单吨位非法: {}", order.total_tons)));
    }
    if let Some(alloc) = &order.warehouse_allocation {
        alloc.validate().map_err(ApiError::ValidationError)?;
    }
    Ok(())
}
