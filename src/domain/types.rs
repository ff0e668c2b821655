// ==========================================
// 成品库存台账 - 领域类型定义
// ==========================================
// 数据库存储统一使用 to_db_str() 的大写编码
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 仓库类型 (Warehouse Type)
// ==========================================
// 一般贸易仓 / 保税仓, 同时也是齐套计算的"桶"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarehouseType {
    General, // 一般仓
    Bonded,  // 保税仓
}

impl fmt::Display for WarehouseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl WarehouseType {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GENERAL" => Some(WarehouseType::General),
            "BONDED" => Some(WarehouseType::Bonded),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            WarehouseType::General => "GENERAL",
            WarehouseType::Bonded => "BONDED",
        }
    }
}

// ==========================================
// 品级 (Grade)
// ==========================================
// 同一款号下两个质量等级, 各自独立记吨位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl Grade {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Some(Grade::A),
            "B" => Some(Grade::B),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
        }
    }
}

// ==========================================
// 台账流水类型 (Transaction Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    In,        // 入库
    Out,       // 出库
    AdjustIn,  // 盘盈
    AdjustOut, // 盘亏
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl TransactionType {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IN" => Some(TransactionType::In),
            "OUT" => Some(TransactionType::Out),
            "ADJUST_IN" => Some(TransactionType::AdjustIn),
            "ADJUST_OUT" => Some(TransactionType::AdjustOut),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            TransactionType::In => "IN",
            TransactionType::Out => "OUT",
            TransactionType::AdjustIn => "ADJUST_IN",
            TransactionType::AdjustOut => "ADJUST_OUT",
        }
    }

    /// 对结存的方向: 入为 +1, 出为 -1
    pub fn sign(&self) -> f64 {
        match self {
            TransactionType::In | TransactionType::AdjustIn => 1.0,
            TransactionType::Out | TransactionType::AdjustOut => -1.0,
        }
    }
}

// ==========================================
// 审计动作 (Audit Action)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Adjust,
    Lock,
    Unlock,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl AuditAction {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADJUST" => Some(AuditAction::Adjust),
            "LOCK" => Some(AuditAction::Lock),
            "UNLOCK" => Some(AuditAction::Unlock),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            AuditAction::Adjust => "ADJUST",
            AuditAction::Lock => "LOCK",
            AuditAction::Unlock => "UNLOCK",
        }
    }
}

// ==========================================
// 订单状态 (Order Status)
// ==========================================
// READY_TO_SHIP: 备货完成, 对自身视为 100% 齐套, 对其他订单视为已占用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    InProduction,
    ReadyToShip,
    Shipped,
    Delayed,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl OrderStatus {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(OrderStatus::Pending),
            "CONFIRMED" => Some(OrderStatus::Confirmed),
            "IN_PRODUCTION" => Some(OrderStatus::InProduction),
            "READY_TO_SHIP" => Some(OrderStatus::ReadyToShip),
            "SHIPPED" => Some(OrderStatus::Shipped),
            "DELAYED" => Some(OrderStatus::Delayed),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::InProduction => "IN_PRODUCTION",
            OrderStatus::ReadyToShip => "READY_TO_SHIP",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delayed => "DELAYED",
        }
    }

    /// 仍在争夺库存的未结订单（不含已发货、已备货）
    pub fn is_open_demand(&self) -> bool {
        !matches!(self, OrderStatus::Shipped | OrderStatus::ReadyToShip)
    }
}

// ==========================================
// 贸易方式 (Trade Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeType {
    General,
    Bonded,
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl TradeType {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GENERAL" => Some(TradeType::General),
            "BONDED" => Some(TradeType::Bonded),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            TradeType::General => "GENERAL",
            TradeType::Bonded => "BONDED",
        }
    }

    /// 未指定仓库分配时的默认取货仓
    pub fn default_warehouse(&self) -> WarehouseType {
        match self {
            TradeType::Bonded => WarehouseType::Bonded,
            TradeType::General => WarehouseType::General,
        }
    }
}

// ==========================================
// 产线状态 (Line Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineStatus {
    Running,
    Stopped,
    Maintenance,
}

impl fmt::Display for LineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl LineStatus {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RUNNING" => Some(LineStatus::Running),
            "STOPPED" => Some(LineStatus::Stopped),
            "MAINTENANCE" => Some(LineStatus::Maintenance),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            LineStatus::Running => "RUNNING",
            LineStatus::Stopped => "STOPPED",
            LineStatus::Maintenance => "MAINTENANCE",
        }
    }
}
