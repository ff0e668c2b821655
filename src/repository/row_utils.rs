// ==========================================
// 成品库存台账 - 行映射辅助
// ==========================================

use chrono::{NaiveDateTime, Utc};
use rusqlite::types::{Type, Value};

/// 落库时间戳格式（毫秒精度，字典序 = 时间序）
pub const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

pub fn now_ts() -> NaiveDateTime {
    Utc::now().naive_utc()
}

pub fn format_ts(ts: &NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

/// 解析时间戳列（兼容无毫秒的旧格式）
pub fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TS_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// 枚举列解析失败时的统一错误
pub fn enum_err(idx: usize, raw: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        format!("未知枚举值: {}", raw).into(),
    )
}

/// 动态拼接 WHERE 子句
#[derive(Default)]
pub struct WhereBuilder {
    clauses: Vec<String>,
    values: Vec<Value>,
}

impl WhereBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, clause: &str, value: Value) {
        self.clauses.push(clause.to_string());
        self.values.push(value);
    }

    pub fn push_opt_text(&mut self, clause: &str, value: Option<&str>) {
        if let Some(v) = value {
            self.push(clause, Value::Text(v.to_string()));
        }
    }

    pub fn sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

/// 计算分页参数: (page, page_size, offset)
pub fn paging(page: Option<u32>, page_size: Option<u32>, default_size: u32, max_size: u32) -> (u32, u32, i64) {
    let page = page.unwrap_or(1).max(1);
    let size = page_size.unwrap_or(default_size).clamp(1, max_size.max(1));
    let offset = (page as i64 - 1) * size as i64;
    (page, size, offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paging_clamps() {
        assert_eq!(paging(None, None, 50, 500), (1, 50, 0));
        assert_eq!(paging(Some(3), Some(20), 50, 500), (3, 20, 40));
        assert_eq!(paging(Some(0), Some(10_000), 50, 500), (1, 500, 0));
    }

    #[test]
    fn test_ts_roundtrip() {
        let ts = now_ts();
        let parsed = parse_ts(0, &format_ts(&ts)).unwrap();
        assert_eq!(format_ts(&parsed), format_ts(&ts));
        assert!(parse_ts(0, "2025-01-15 08:00:00").is_ok());
    }

    #[test]
    fn test_where_builder() {
        let mut wb = WhereBuilder::new();
        assert_eq!(wb.sql(), "");
        wb.push_opt_text("style_no = ?", Some("ST"));
        wb.push_opt_text("grade = ?", None);
        wb.push("quantity > ?", Value::Real(1.0));
        assert_eq!(wb.sql(), "WHERE style_no = ? AND quantity > ?");
        assert_eq!(wb.values().len(), 2);
    }
}
