// ==========================================
// 成品库存台账 - 产线仓储
// ==========================================
// sub_lines 以 JSON 数组存储，序列化只发生在本文件
// ==========================================

use crate::domain::order::{ProductionLine, SubLine};
use crate::domain::types::LineStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{enum_err, format_ts, now_ts};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT line_id, name, status, current_style, export_capacity, sub_lines_json
    FROM production_line
"#;

pub struct ProductionLineRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductionLineRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn upsert(&self, line: &ProductionLine) -> RepositoryResult<()> {
        if line.line_id.trim().is_empty() {
            return Err(RepositoryError::ValidationError("产线ID不能为空".to_string()));
        }
        let capacities = std::iter::once(line.export_capacity)
            .chain(line.sub_lines.iter().map(|s| s.export_capacity));
        for cap in capacities {
            if !cap.is_finite() || cap < 0.0 {
                return Err(RepositoryError::FieldValueError {
                    field: "export_capacity".to_string(),
                    message: format!("出口产能非法: {}", cap),
                });
            }
        }

        let sub_lines_json = serde_json::to_string(&line.sub_lines)?;
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO production_line (
                line_id, name, status, current_style, export_capacity, sub_lines_json, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(line_id) DO UPDATE SET
                name = excluded.name,
                status = excluded.status,
                current_style = excluded.current_style,
                export_capacity = excluded.export_capacity,
                sub_lines_json = excluded.sub_lines_json,
                updated_at = excluded.updated_at
            "#,
            params![
                line.line_id,
                line.name,
                line.status.to_db_str(),
                line.current_style,
                line.export_capacity,
                sub_lines_json,
                format_ts(&now_ts()),
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, line_id: &str) -> RepositoryResult<Option<ProductionLine>> {
        let conn = self.get_conn()?;
        let line = conn
            .query_row(
                &format!("{} WHERE line_id = ?1", SELECT_COLUMNS),
                params![line_id],
                Self::map_row,
            )
            .optional()?;
        Ok(line)
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<ProductionLine>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!("{} ORDER BY line_id", SELECT_COLUMNS))?;
        let lines = stmt
            .query_map([], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(lines)
    }

    /// 运行中的产线
    pub fn list_running(&self) -> RepositoryResult<Vec<ProductionLine>> {
        let conn = self.get_conn()?;
        Self::query_running(&conn)
    }

    /// 同上，供齐套快照在已持锁的连接上读取
    pub(crate) fn query_running(conn: &Connection) -> RepositoryResult<Vec<ProductionLine>> {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE status = ?1 ORDER BY line_id",
            SELECT_COLUMNS
        ))?;
        let lines = stmt
            .query_map(params![LineStatus::Running.to_db_str()], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(lines)
    }

    fn map_row(row: &Row) -> SqliteResult<ProductionLine> {
        let status_raw: String = row.get(2)?;
        let sub_lines_raw: String = row.get(5)?;

        let sub_lines: Vec<SubLine> = if sub_lines_raw.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&sub_lines_raw)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?
        };

        Ok(ProductionLine {
            line_id: row.get(0)?,
            name: row.get(1)?,
            status: LineStatus::from_db_str(&status_raw).ok_or_else(|| enum_err(2, &status_raw))?,
            current_style: row.get(3)?,
            export_capacity: row.get(4)?,
            sub_lines,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_repo() -> ProductionLineRepository {
        let conn = crate::db::open_in_memory_migrated().unwrap();
        ProductionLineRepository::new(Arc::new(Mutex::new(conn)))
    }

    fn line(id: &str, status: LineStatus) -> ProductionLine {
        ProductionLine {
            line_id: id.to_string(),
            name: format!("{}线", id),
            status,
            current_style: Some("ST-1".to_string()),
            export_capacity: 6.0,
            sub_lines: Vec::new(),
        }
    }

    #[test]
    fn test_list_running_filters_by_status() {
        let repo = setup_repo();
        repo.upsert(&line("L2", LineStatus::Running)).unwrap();
        repo.upsert(&line("L1", LineStatus::Running)).unwrap();
        repo.upsert(&line("L3", LineStatus::Stopped)).unwrap();

        let running: Vec<String> = repo.list_running().unwrap().into_iter().map(|l| l.line_id).collect();
        assert_eq!(running, vec!["L1".to_string(), "L2".to_string()]);
        assert_eq!(repo.list_all().unwrap().len(), 3);

        // 停线后不再出现在运行列表
        repo.upsert(&line("L1", LineStatus::Stopped)).unwrap();
        assert_eq!(repo.list_running().unwrap().len(), 1);
    }

    #[test]
    fn test_sub_lines_survive_storage() {
        let repo = setup_repo();
        let mut split = line("L9", LineStatus::Running);
        split.sub_lines = vec![SubLine {
            name: "9A".to_string(),
            current_style: Some("ST-2".to_string()),
            export_capacity: 3.5,
        }];
        repo.upsert(&split).unwrap();

        let found = repo.find_by_id("L9").unwrap().unwrap();
        assert_eq!(found.sub_lines.len(), 1);
        assert_eq!(found.sub_lines[0].name, "9A");
        assert_eq!(found.sub_lines[0].export_capacity, 3.5);
        assert!(repo.find_by_id("NOPE").unwrap().is_none());
    }

    #[test]
    fn test_upsert_rejects_negative_capacity() {
        let repo = setup_repo();
        let mut bad = line("L1", LineStatus::Running);
        bad.export_capacity = -1.0;
        assert!(matches!(repo.upsert(&bad), Err(RepositoryError::FieldValueError { .. })));
    }
}
