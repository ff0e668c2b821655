// ==========================================
// 成品库存台账 - 产线产能来源
// ==========================================
// 齐套计算只关心"今天某款号还能出多少出口产量"，
// 具体来源（产线表快照 / 外部排产系统）由实现方决定
// ==========================================

use crate::domain::order::ProductionLine;
use crate::domain::inventory::round_qty;

/// 按款号提供当日已排定的出口产量（吨）
pub trait LineCapacityProvider {
    fn export_capacity_for_style(&self, style_no: &str) -> f64;
}

// ==========================================
// ProductionSnapshot - 产线表快照
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ProductionSnapshot {
    lines: Vec<ProductionLine>,
}

impl ProductionSnapshot {
    pub fn new(lines: Vec<ProductionLine>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[ProductionLine] {
        &self.lines
    }
}

impl LineCapacityProvider for ProductionSnapshot {
    fn export_capacity_for_style(&self, style_no: &str) -> f64 {
        round_qty(
            self.lines
                .iter()
                .map(|line| line.export_yield_for(style_no))
                .sum(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::SubLine;
    use crate::domain::types::LineStatus;

    fn line(id: &str, status: LineStatus, style: Option<&str>, cap: f64, subs: Vec<SubLine>) -> ProductionLine {
        ProductionLine {
            line_id: id.to_string(),
            name: id.to_string(),
            status,
            current_style: style.map(str::to_string),
            export_capacity: cap,
            sub_lines: subs,
        }
    }

    #[test]
    fn test_snapshot_sums_running_lines() {
        let snapshot = ProductionSnapshot::new(vec![
            line("L1", LineStatus::Running, Some("ST-1"), 12.0, vec![]),
            line("L2", LineStatus::Maintenance, Some("ST-1"), 30.0, vec![]),
            line(
                "L3",
                LineStatus::Running,
                None,
                0.0,
                vec![SubLine {
                    name: "3A".to_string(),
                    current_style: Some("ST-1".to_string()),
                    export_capacity: 3.5,
                }],
            ),
            line("L4", LineStatus::Running, Some("ST-2"), 9.0, vec![]),
        ]);

        assert_eq!(snapshot.export_capacity_for_style("ST-1"), 15.5);
        assert_eq!(snapshot.export_capacity_for_style("ST-2"), 9.0);
        assert_eq!(snapshot.export_capacity_for_style("ST-9"), 0.0);
    }

    #[test]
    fn test_empty_snapshot() {
        assert_eq!(ProductionSnapshot::default().export_capacity_for_style("ST-1"), 0.0);
    }
}
