// ==========================================
// 库存仓储 - 查询操作
// ==========================================
// 列表/告警/按款汇总，以及齐套快照用的借用连接查询
// ==========================================

use super::{InventoryStore, RECORD_COLUMNS};
use crate::domain::inventory::{round_qty, InventoryAlert, InventoryKey, InventoryRecord, StyleSummary};
use crate::repository::error::RepositoryResult;
use rusqlite::{params, Connection, Result as SqliteResult};
use std::collections::BTreeMap;

impl InventoryStore {
    // ==========================================
    // 查询操作
    // ==========================================

    /// 按主键查询库存行
    pub fn find(&self, key: &InventoryKey) -> RepositoryResult<Option<InventoryRecord>> {
        let conn = self.get_conn()?;
        Ok(Self::load(&conn, key)?.map(|(_, rec)| rec))
    }

    /// 库存列表（按款号、产线排序）
    ///
    /// # 参数
    /// - line_id: 可选产线过滤
    pub fn list(&self, line_id: Option<&str>) -> RepositoryResult<Vec<InventoryRecord>> {
        let conn = self.get_conn()?;
        let records = match line_id {
            Some(line) => {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE line_id = ?1 ORDER BY style_no, line_id, warehouse_type, package_spec",
                    RECORD_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(params![line], Self::map_row)?
                    .collect::<SqliteResult<Vec<_>>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "{} ORDER BY style_no, line_id, warehouse_type, package_spec",
                    RECORD_COLUMNS
                ))?;
                let rows = stmt
                    .query_map([], Self::map_row)?
                    .collect::<SqliteResult<Vec<_>>>()?;
                rows
            }
        };
        Ok(records)
    }

    /// 指定款号的全部库存行
    pub fn list_by_style(&self, style_no: &str) -> RepositoryResult<Vec<InventoryRecord>> {
        let conn = self.get_conn()?;
        Self::query_by_style(&conn, style_no)
    }

    /// 齐套快照读取（调用方已持有连接）
    pub(crate) fn query_by_style(conn: &Connection, style_no: &str) -> RepositoryResult<Vec<InventoryRecord>> {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE style_no = ?1 ORDER BY warehouse_type, package_spec, line_id",
            RECORD_COLUMNS
        ))?;
        let records = stmt
            .query_map(params![style_no], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(records)
    }

    pub(crate) fn query_all(conn: &Connection) -> RepositoryResult<Vec<InventoryRecord>> {
        let mut stmt = conn.prepare(&format!("{} ORDER BY style_no, line_id", RECORD_COLUMNS))?;
        let records = stmt
            .query_map([], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(records)
    }

    /// 安全库存预警: safety_stock > 0 且 (现存 - 锁定) < safety_stock
    pub fn list_alerts(&self) -> RepositoryResult<Vec<InventoryAlert>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE safety_stock > 0 AND (current_stock - locked_for_today) < safety_stock \
             ORDER BY style_no, line_id",
            RECORD_COLUMNS
        ))?;
        let alerts = stmt
            .query_map([], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?
            .into_iter()
            .map(InventoryAlert::from_record)
            .collect();
        Ok(alerts)
    }

    /// 按款号汇总（跨仓库/规格/产线）
    pub fn summary_by_style(&self) -> RepositoryResult<Vec<StyleSummary>> {
        let conn = self.get_conn()?;
        let records = Self::query_all(&conn)?;

        let mut by_style: BTreeMap<String, StyleSummary> = BTreeMap::new();
        for rec in records {
            let entry = by_style
                .entry(rec.key.style_no.clone())
                .or_insert_with(|| StyleSummary {
                    style_no: rec.key.style_no.clone(),
                    ..Default::default()
                });
            entry.grade_a += rec.grade_a;
            entry.grade_b += rec.grade_b;
            entry.current_stock += rec.current_stock;
            entry.locked_for_today += rec.locked_for_today;
            entry.available += rec.available();
            entry.record_count += 1;
        }

        Ok(by_style
            .into_values()
            .map(|mut s| {
                s.grade_a = round_qty(s.grade_a);
                s.grade_b = round_qty(s.grade_b);
                s.current_stock = round_qty(s.current_stock);
                s.locked_for_today = round_qty(s.locked_for_today);
                s.available = round_qty(s.available);
                s
            })
            .collect())
    }
}
