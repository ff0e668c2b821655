// ==========================================
// 成品库存台账 - 销售订单 / 产线
// ==========================================
// 订单与产线由外部维护，本核心只读（齐套计算的输入）
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::types::{LineStatus, OrderStatus, TradeType, WarehouseType};

// ==========================================
// WarehouseAllocation - 订单的仓库分配
// ==========================================
// 显式指定一般仓/保税仓各取多少吨，覆盖按贸易方式选仓的默认规则
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WarehouseAllocation {
    #[serde(default)]
    pub general: f64,
    #[serde(default)]
    pub bonded: f64,
}

impl WarehouseAllocation {
    pub fn for_warehouse(&self, warehouse: WarehouseType) -> f64 {
        match warehouse {
            WarehouseType::General => self.general,
            WarehouseType::Bonded => self.bonded,
        }
    }

    /// 边界校验: 两个分配量都必须是非负有限数
    pub fn validate(&self) -> Result<(), String> {
        for (name, v) in [("general", self.general), ("bonded", self.bonded)] {
            if !v.is_finite() || v < 0.0 {
                return Err(format!("仓库分配 {} 非法: {}", name, v));
            }
        }
        Ok(())
    }
}

// ==========================================
// Order - 销售订单
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub style_no: String,
    pub total_tons: f64,
    pub status: OrderStatus,
    pub trade_type: TradeType,
    pub package_spec: Option<String>,
    pub warehouse_allocation: Option<WarehouseAllocation>,
}

impl Order {
    /// 该订单对指定仓库桶的需求
    ///
    /// 有仓库分配时取该仓分配量；否则只有贸易方式对应的仓才计全量。
    pub fn demand_for(&self, warehouse: WarehouseType) -> f64 {
        match &self.warehouse_allocation {
            Some(alloc) => alloc.for_warehouse(warehouse),
            None if self.trade_type.default_warehouse() == warehouse => self.total_tons,
            None => 0.0,
        }
    }
}

// ==========================================
// ProductionLine - 产线（含子线）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubLine {
    pub name: String,
    pub current_style: Option<String>,
    #[serde(default)]
    pub export_capacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionLine {
    pub line_id: String,
    pub name: String,
    pub status: LineStatus,
    pub current_style: Option<String>,
    pub export_capacity: f64,
    #[serde(default)]
    pub sub_lines: Vec<SubLine>,
}

impl ProductionLine {
    /// 该产线今日可为指定款号贡献的出口产量
    ///
    /// 仅运行中的产线计入；有子线时按子线逐一匹配，否则按主线匹配。
    pub fn export_yield_for(&self, style_no: &str) -> f64 {
        if self.status != LineStatus::Running {
            return 0.0;
        }
        if self.sub_lines.is_empty() {
            return match self.current_style.as_deref() {
                Some(s) if s == style_no => self.export_capacity.max(0.0),
                _ => 0.0,
            };
        }
        self.sub_lines
            .iter()
            .filter(|sub| sub.current_style.as_deref() == Some(style_no))
            .map(|sub| sub.export_capacity.max(0.0))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(trade_type: TradeType, alloc: Option<WarehouseAllocation>) -> Order {
        Order {
            order_id: "SO-1".to_string(),
            style_no: "ST-1".to_string(),
            total_tons: 40.0,
            status: OrderStatus::Confirmed,
            trade_type,
            package_spec: None,
            warehouse_allocation: alloc,
        }
    }

    #[test]
    fn test_demand_by_trade_type() {
        let o = order(TradeType::Bonded, None);
        assert_eq!(o.demand_for(WarehouseType::Bonded), 40.0);
        assert_eq!(o.demand_for(WarehouseType::General), 0.0);
    }

    #[test]
    fn test_demand_by_allocation() {
        let o = order(
            TradeType::Bonded,
            Some(WarehouseAllocation { general: 25.0, bonded: 15.0 }),
        );
        assert_eq!(o.demand_for(WarehouseType::General), 25.0);
        assert_eq!(o.demand_for(WarehouseType::Bonded), 15.0);
    }

    #[test]
    fn test_allocation_validation() {
        assert!(WarehouseAllocation { general: 1.0, bonded: 0.0 }.validate().is_ok());
        assert!(WarehouseAllocation { general: -1.0, bonded: 0.0 }.validate().is_err());
        assert!(WarehouseAllocation { general: f64::NAN, bonded: 0.0 }.validate().is_err());
    }

    #[test]
    fn test_line_yield_prefers_sub_lines() {
        let line = ProductionLine {
            line_id: "L1".to_string(),
            name: "一号线".to_string(),
            status: LineStatus::Running,
            current_style: Some("ST-1".to_string()),
            export_capacity: 50.0,
            sub_lines: vec![
                SubLine { name: "1A".to_string(), current_style: Some("ST-1".to_string()), export_capacity: 8.0 },
                SubLine { name: "1B".to_string(), current_style: Some("ST-2".to_string()), export_capacity: 6.0 },
                SubLine { name: "1C".to_string(), current_style: Some("ST-1".to_string()), export_capacity: 4.5 },
            ],
        };
        assert_eq!(line.export_yield_for("ST-1"), 12.5);
        assert_eq!(line.export_yield_for("ST-2"), 6.0);

        let stopped = ProductionLine { status: LineStatus::Stopped, ..line };
        assert_eq!(stopped.export_yield_for("ST-1"), 0.0);
    }
}
