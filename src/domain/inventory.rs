// ==========================================
// 成品库存台账 - 库存领域模型
// ==========================================
// 主键: (款号, 仓库类型, 包装规格, 产线?)
// 红线: current_stock == round2(grade_a + grade_b)
// 红线: locked_for_today <= current_stock
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::types::{Grade, WarehouseType};

/// 吨位统一保留两位小数（四舍五入，0.5 进位）
///
/// 所有落库的数量/结存都必须先经过此函数，避免多次累加后的浮点漂移。
pub fn round_qty(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let scaled = value * 100.0;
    // 抵消 1.005 * 100 = 100.49999... 这类表示误差
    let nudged = scaled + scaled.signum() * 1e-7;
    nudged.round() / 100.0
}

// ==========================================
// InventoryKey - 库存记录主键
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InventoryKey {
    pub style_no: String,
    pub warehouse_type: WarehouseType,
    pub package_spec: String,
    pub line_id: Option<String>,
}

impl InventoryKey {
    pub fn new(
        style_no: impl Into<String>,
        warehouse_type: WarehouseType,
        package_spec: impl Into<String>,
        line_id: Option<String>,
    ) -> Self {
        Self {
            style_no: style_no.into(),
            warehouse_type,
            package_spec: package_spec.into(),
            line_id,
        }
    }
}

impl std::fmt::Display for InventoryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.style_no,
            self.warehouse_type,
            self.package_spec,
            self.line_id.as_deref().unwrap_or("-")
        )
    }
}

// ==========================================
// InventoryRecord - 库存现状
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub key: InventoryKey,
    pub grade_a: f64,
    pub grade_b: f64,
    pub current_stock: f64,
    pub locked_for_today: f64,
    pub safety_stock: f64,
    pub last_updated: NaiveDateTime,
}

impl InventoryRecord {
    /// 首次入库时创建的零库存记录
    pub fn empty(key: InventoryKey, now: NaiveDateTime) -> Self {
        Self {
            key,
            grade_a: 0.0,
            grade_b: 0.0,
            current_stock: 0.0,
            locked_for_today: 0.0,
            safety_stock: 0.0,
            last_updated: now,
        }
    }

    pub fn grade_qty(&self, grade: Grade) -> f64 {
        match grade {
            Grade::A => self.grade_a,
            Grade::B => self.grade_b,
        }
    }

    pub fn set_grade_qty(&mut self, grade: Grade, qty: f64) {
        match grade {
            Grade::A => self.grade_a = round_qty(qty),
            Grade::B => self.grade_b = round_qty(qty),
        }
    }

    /// 按品级重算 current_stock，并把锁定量压回 current_stock 以内
    pub fn recompute(&mut self) {
        self.grade_a = round_qty(self.grade_a);
        self.grade_b = round_qty(self.grade_b);
        self.current_stock = round_qty(self.grade_a + self.grade_b);
        self.locked_for_today = round_qty(self.locked_for_today.clamp(0.0, self.current_stock));
    }

    /// 可用量 = 现存 - 当日锁定（不小于 0）
    pub fn available(&self) -> f64 {
        round_qty((self.current_stock - self.locked_for_today).max(0.0))
    }

    pub fn is_below_safety(&self) -> bool {
        self.safety_stock > 0.0 && self.current_stock - self.locked_for_today < self.safety_stock
    }
}

// ==========================================
// StockMovement - 单笔入/出库请求
// ==========================================
// 字段使用 Option 承接外部请求（批量导入时可能缺字段）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockMovement {
    pub style_no: Option<String>,
    pub warehouse_type: Option<WarehouseType>,
    #[serde(default)]
    pub package_spec: String,
    pub line_id: Option<String>,
    pub quantity: Option<f64>,
    pub grade: Option<Grade>,
    pub source: Option<String>,
    pub note: Option<String>,
    pub order_id: Option<String>,
}

/// 校验通过的入/出库请求
#[derive(Debug, Clone)]
pub struct ValidMovement {
    pub key: InventoryKey,
    pub quantity: f64,
    pub grade: Grade,
    pub source: Option<String>,
    pub note: Option<String>,
    pub order_id: Option<String>,
}

impl StockMovement {
    pub fn new(key: &InventoryKey, quantity: f64, grade: Grade) -> Self {
        Self {
            style_no: Some(key.style_no.clone()),
            warehouse_type: Some(key.warehouse_type),
            package_spec: key.package_spec.clone(),
            line_id: key.line_id.clone(),
            quantity: Some(quantity),
            grade: Some(grade),
            ..Default::default()
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_order(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// 校验必填字段
    ///
    /// 仓库类型缺省为一般仓，品级缺省为 A。
    /// 返回 Err(原因) 表示款号缺失或数量非正。
    pub fn validate(&self) -> Result<ValidMovement, String> {
        let style_no = self
            .style_no
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "款号不能为空".to_string())?;

        let quantity = match self.quantity {
            Some(q) if q.is_finite() && round_qty(q) > 0.0 => round_qty(q),
            Some(q) => return Err(format!("数量必须大于0: {}", q)),
            None => return Err("数量不能为空".to_string()),
        };

        Ok(ValidMovement {
            key: InventoryKey {
                style_no: style_no.to_string(),
                warehouse_type: self.warehouse_type.unwrap_or(WarehouseType::General),
                package_spec: self.package_spec.trim().to_string(),
                line_id: self
                    .line_id
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            },
            quantity,
            grade: self.grade.unwrap_or(Grade::A),
            source: self.source.clone(),
            note: self.note.clone(),
            order_id: self.order_id.clone(),
        })
    }
}

// ==========================================
// 安全库存预警 / 款号汇总
// ==========================================

/// 低于安全库存的记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryAlert {
    pub record: InventoryRecord,
    pub available: f64,
    pub shortage: f64,
}

impl InventoryAlert {
    pub fn from_record(record: InventoryRecord) -> Self {
        let available = round_qty(record.current_stock - record.locked_for_today);
        let shortage = round_qty(record.safety_stock - available);
        Self {
            record,
            available,
            shortage,
        }
    }
}

/// 按款号汇总（跨仓库/规格/产线）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleSummary {
    pub style_no: String,
    pub grade_a: f64,
    pub grade_b: f64,
    pub current_stock: f64,
    pub locked_for_today: f64,
    pub available: f64,
    pub record_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn key() -> InventoryKey {
        InventoryKey::new("ST-001", WarehouseType::General, "25KG", None)
    }

    #[test]
    fn test_round_qty_half_up() {
        assert_eq!(round_qty(1.005), 1.01);
        assert_eq!(round_qty(2.344), 2.34);
        assert_eq!(round_qty(0.1 + 0.2), 0.3);
        assert_eq!(round_qty(f64::NAN), 0.0);
    }

    #[test]
    fn test_recompute_keeps_invariants() {
        let mut record = InventoryRecord::empty(key(), Utc::now().naive_utc());
        record.grade_a = 10.111;
        record.grade_b = 5.0;
        record.locked_for_today = 30.0;
        record.recompute();

        assert_eq!(record.current_stock, 15.11);
        assert_eq!(record.locked_for_today, 15.11);
        assert_eq!(record.available(), 0.0);
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        let mut movement = StockMovement::new(&key(), 5.0, Grade::B);
        assert!(movement.validate().is_ok());

        movement.quantity = Some(0.0);
        assert!(movement.validate().is_err());

        movement.quantity = None;
        assert!(movement.validate().is_err());

        let blank = StockMovement {
            style_no: Some("   ".to_string()),
            quantity: Some(1.0),
            ..Default::default()
        };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_validate_defaults_warehouse_and_grade() {
        let movement = StockMovement {
            style_no: Some(" ST-9 ".to_string()),
            quantity: Some(2.5),
            line_id: Some("".to_string()),
            ..Default::default()
        };
        let valid = movement.validate().unwrap();
        assert_eq!(valid.key.style_no, "ST-9");
        assert_eq!(valid.key.warehouse_type, WarehouseType::General);
        assert_eq!(valid.key.line_id, None);
        assert_eq!(valid.grade, Grade::A);
    }

    #[test]
    fn test_alert_shortage() {
        let mut record = InventoryRecord::empty(key(), Utc::now().naive_utc());
        record.grade_a = 20.0;
        record.locked_for_today = 5.0;
        record.safety_stock = 30.0;
        record.recompute();

        assert!(record.is_below_safety());
        let alert = InventoryAlert::from_record(record);
        assert_eq!(alert.available, 15.0);
        assert_eq!(alert.shortage, 15.0);
    }
}
