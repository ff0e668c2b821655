// ==========================================
// 成品库存台账 - Schema 迁移
// ==========================================
// 规则:
// - 每个迁移有唯一递增的 version，已执行的 version 记录在 schema_version
// - 每个迁移在独立事务中执行，失败整体回滚
// - 重复执行 run_migrations 为空操作
// ==========================================

use rusqlite::{params, Connection};
use std::collections::HashSet;
use tracing::info;

/// 单个迁移
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub sql: &'static str,
}

/// 全部迁移（按 version 升序）
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "inventory_ledger_core",
        sql: r#"
        CREATE TABLE inventory (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            style_no TEXT NOT NULL,
            warehouse_type TEXT NOT NULL CHECK (warehouse_type IN ('GENERAL', 'BONDED')),
            package_spec TEXT NOT NULL DEFAULT '',
            line_id TEXT,
            grade_a REAL NOT NULL DEFAULT 0 CHECK (grade_a >= 0),
            grade_b REAL NOT NULL DEFAULT 0 CHECK (grade_b >= 0),
            current_stock REAL NOT NULL DEFAULT 0,
            locked_for_today REAL NOT NULL DEFAULT 0 CHECK (locked_for_today >= 0),
            safety_stock REAL NOT NULL DEFAULT 0 CHECK (safety_stock >= 0),
            last_updated TEXT NOT NULL
        );

        -- line_id 为 NULL 时也要保证主键唯一
        CREATE UNIQUE INDEX ux_inventory_key
            ON inventory (style_no, warehouse_type, package_spec, IFNULL(line_id, ''));

        CREATE TABLE inventory_transaction (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            entry_id TEXT NOT NULL UNIQUE,
            style_no TEXT NOT NULL,
            warehouse_type TEXT NOT NULL,
            package_spec TEXT NOT NULL DEFAULT '',
            line_id TEXT,
            tx_type TEXT NOT NULL CHECK (tx_type IN ('IN', 'OUT', 'ADJUST_IN', 'ADJUST_OUT')),
            grade TEXT NOT NULL CHECK (grade IN ('A', 'B')),
            quantity REAL NOT NULL CHECK (quantity > 0),
            balance REAL NOT NULL,
            source TEXT,
            note TEXT,
            order_id TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE inventory_audit_log (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            log_id TEXT NOT NULL UNIQUE,
            style_no TEXT NOT NULL,
            warehouse_type TEXT NOT NULL,
            package_spec TEXT NOT NULL DEFAULT '',
            line_id TEXT,
            action TEXT NOT NULL CHECK (action IN ('ADJUST', 'LOCK', 'UNLOCK')),
            before_grade_a REAL NOT NULL,
            before_grade_b REAL NOT NULL,
            after_grade_a REAL NOT NULL,
            after_grade_b REAL NOT NULL,
            before_locked REAL NOT NULL DEFAULT 0,
            after_locked REAL NOT NULL DEFAULT 0,
            reason TEXT,
            operator TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        -- 流水与审计只追加
        CREATE TRIGGER trg_inventory_transaction_no_update
            BEFORE UPDATE ON inventory_transaction
            BEGIN SELECT RAISE(ABORT, 'inventory_transaction is append-only'); END;

        CREATE TRIGGER trg_inventory_audit_log_no_update
            BEFORE UPDATE ON inventory_audit_log
            BEGIN SELECT RAISE(ABORT, 'inventory_audit_log is append-only'); END;
        "#,
    },
    Migration {
        version: 2,
        name: "orders_lines_config",
        sql: r#"
        CREATE TABLE sales_order (
            order_id TEXT PRIMARY KEY,
            style_no TEXT NOT NULL,
            total_tons REAL NOT NULL CHECK (total_tons >= 0),
            status TEXT NOT NULL,
            trade_type TEXT NOT NULL,
            package_spec TEXT,
            warehouse_allocation_json TEXT,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE production_line (
            line_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            status TEXT NOT NULL,
            current_style TEXT,
            export_capacity REAL NOT NULL DEFAULT 0,
            sub_lines_json TEXT NOT NULL DEFAULT '[]',
            updated_at TEXT NOT NULL
        );

        CREATE TABLE config_kv (
            scope_id TEXT NOT NULL DEFAULT 'global',
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );
        "#,
    },
    Migration {
        version: 3,
        name: "query_indexes",
        sql: r#"
        CREATE INDEX idx_tx_style_time ON inventory_transaction (style_no, created_at);
        CREATE INDEX idx_tx_type ON inventory_transaction (tx_type);
        CREATE INDEX idx_audit_style ON inventory_audit_log (style_no, created_at);
        CREATE INDEX idx_audit_line ON inventory_audit_log (line_id);
        CREATE INDEX idx_order_style ON sales_order (style_no, status);
        "#,
    },
];

fn ensure_version_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        "#,
    )
}

fn applied_versions(conn: &Connection) -> rusqlite::Result<HashSet<i64>> {
    let mut stmt = conn.prepare("SELECT version FROM schema_version")?;
    let versions = stmt
        .query_map([], |row| row.get::<_, i64>(0))?
        .collect::<rusqlite::Result<HashSet<_>>>()?;
    Ok(versions)
}

/// 执行全部未应用的迁移
///
/// # 返回
/// - Ok(n): 本次新应用的迁移数（已是最新时为 0）
pub fn run_migrations(conn: &mut Connection) -> rusqlite::Result<usize> {
    ensure_version_table(conn)?;
    let applied = applied_versions(conn)?;

    let mut count = 0;
    for migration in MIGRATIONS {
        if applied.contains(&migration.version) {
            continue;
        }

        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql)?;
        tx.execute(
            "INSERT INTO schema_version (version, name) VALUES (?1, ?2)",
            params![migration.version, migration.name],
        )?;
        tx.commit()?;

        info!(version = migration.version, name = migration.name, "schema migration applied");
        count += 1;
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{read_schema_version, CURRENT_SCHEMA_VERSION};

    #[test]
    fn test_migrations_are_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();

        let first = run_migrations(&mut conn).unwrap();
        assert_eq!(first, MIGRATIONS.len());

        let second = run_migrations(&mut conn).unwrap();
        assert_eq!(second, 0);

        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_versions_strictly_increase() {
        for pair in MIGRATIONS.windows(2) {
            assert!(pair[0].version < pair[1].version);
        }
        assert_eq!(MIGRATIONS.last().map(|m| m.version), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_ledger_rejects_update() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();

        conn.execute(
            r#"
            INSERT INTO inventory_transaction (
                entry_id, style_no, warehouse_type, package_spec, tx_type, grade,
                quantity, balance, created_at
            ) VALUES ('e1', 'ST', 'GENERAL', '', 'IN', 'A', 1.0, 1.0, '2025-01-01 00:00:00.000')
            "#,
            [],
        )
        .unwrap();

        let result = conn.execute("UPDATE inventory_transaction SET quantity = 2.0", []);
        assert!(result.is_err());
    }

    #[test]
    fn test_null_line_id_key_is_unique() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();

        let insert = "INSERT INTO inventory (style_no, warehouse_type, package_spec, line_id, last_updated) \
                      VALUES ('ST', 'GENERAL', '25KG', NULL, '2025-01-01 00:00:00.000')";
        conn.execute(insert, []).unwrap();
        assert!(conn.execute(insert, []).is_err());
    }
}
