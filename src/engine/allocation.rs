// ==========================================
// 成品库存台账 - 订单齐套计算引擎
// ==========================================
// 职责: 基于库存快照 + 全部订单 + 产线产能，计算单个订单当前可满足的吨位
// 红线: 纯计算，不读写数据库；同一快照重复计算结果一致
// ==========================================
// 计算顺序:
// 1) ReadyToShip 订单自身视为 100% 齐套
// 2) 按仓库分配拆桶（无分配则按贸易方式选一个桶）
// 3) 桶内可用库存 = Σ max(0, 现存 - 锁定)
// 4) 依次扣减: 其他 ReadyToShip 订单（已预留）→ 其他未结订单
// 5) 有分配时每桶取 min(分配量, 剩余)
// 6) 叠加当日在产出口产量（可选）
// 7) 百分比封顶 100
// ==========================================

use crate::domain::inventory::{round_qty, InventoryRecord};
use crate::domain::order::Order;
use crate::domain::types::{OrderStatus, WarehouseType};
use crate::engine::capacity::LineCapacityProvider;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// 单个订单的齐套结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FulfillmentResult {
    /// 当前可满足吨位
    pub available: f64,
    /// 齐套百分比 (0~100)
    pub percent: f64,
    pub is_shortage: bool,
}

/// 订单列表视图中的一行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderFulfillment {
    pub order_id: String,
    pub style_no: String,
    pub status: OrderStatus,
    pub total_tons: f64,
    pub result: FulfillmentResult,
}

// ==========================================
// AllocationEngine - 齐套计算引擎
// ==========================================
#[derive(Debug, Default)]
pub struct AllocationEngine {
    // 无状态引擎
}

impl AllocationEngine {
    pub fn new() -> Self {
        Self {}
    }

    /// 计算订单齐套情况
    ///
    /// # 参数
    /// - `order`: 目标订单
    /// - `records`: 库存快照（可包含其他款号，内部按款号过滤）
    /// - `orders`: 全部订单（可包含目标订单本身，按 order_id 排除）
    /// - `include_production`: 是否叠加当日在产出口产量
    /// - `capacity`: 产线产能来源
    #[instrument(skip(self, records, orders, capacity), fields(
        order_id = %order.order_id,
        style_no = %order.style_no,
        total_tons = order.total_tons
    ))]
    pub fn compute(
        &self,
        order: &Order,
        records: &[InventoryRecord],
        orders: &[Order],
        include_production: bool,
        capacity: &dyn LineCapacityProvider,
    ) -> FulfillmentResult {
        if order.status == OrderStatus::ReadyToShip {
            return FulfillmentResult {
                available: round_qty(order.total_tons),
                percent: 100.0,
                is_shortage: false,
            };
        }

        let siblings: Vec<&Order> = orders
            .iter()
            .filter(|o| o.order_id != order.order_id && o.style_no == order.style_no)
            .collect();

        let from_stock: f64 = match &order.warehouse_allocation {
            Some(alloc) => [WarehouseType::General, WarehouseType::Bonded]
                .into_iter()
                .map(|wh| {
                    let residual = self.bucket_residual(order, wh, records, &siblings);
                    alloc.for_warehouse(wh).min(residual)
                })
                .sum(),
            None => {
                let wh = order.trade_type.default_warehouse();
                self.bucket_residual(order, wh, records, &siblings)
            }
        };

        let production = if include_production {
            capacity.export_capacity_for_style(&order.style_no).max(0.0)
        } else {
            0.0
        };

        let available = round_qty(from_stock + production);
        let total = round_qty(order.total_tons);
        let percent = if total > 0.0 {
            round_qty((available / total * 100.0).min(100.0))
        } else {
            100.0
        };

        debug!(from_stock, production, available, percent, "fulfillment computed");

        // 缺货判定与原始订单吨位比较，不受百分比取整影响
        FulfillmentResult {
            available,
            percent,
            is_shortage: available < order.total_tons,
        }
    }

    /// 单个仓库桶扣减竞争需求后的剩余可用量
    fn bucket_residual(
        &self,
        order: &Order,
        warehouse: WarehouseType,
        records: &[InventoryRecord],
        siblings: &[&Order],
    ) -> f64 {
        let stock = self.available_stock(order, warehouse, records);

        let reserved: f64 = siblings
            .iter()
            .filter(|o| o.status == OrderStatus::ReadyToShip)
            .map(|o| o.demand_for(warehouse))
            .sum();
        let open_demand: f64 = siblings
            .iter()
            .filter(|o| o.status.is_open_demand())
            .map(|o| o.demand_for(warehouse))
            .sum();

        let after_reserved = (stock - reserved).max(0.0);
        let residual = (after_reserved - open_demand).max(0.0);

        debug!(
            warehouse = %warehouse,
            stock,
            reserved,
            open_demand,
            residual,
            "bucket residual"
        );
        residual
    }

    /// 桶内可用库存: 同款号 + 同仓库（订单指定包装规格时再按规格过滤）
    fn available_stock(&self, order: &Order, warehouse: WarehouseType, records: &[InventoryRecord]) -> f64 {
        let spec = order
            .package_spec
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        records
            .iter()
            .filter(|r| r.key.style_no == order.style_no && r.key.warehouse_type == warehouse)
            .filter(|r| spec.map_or(true, |s| r.key.package_spec == s))
            .map(|r| (r.current_stock - r.locked_for_today).max(0.0))
            .sum()
    }
}
