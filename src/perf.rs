// ==========================================
// 成品库存台账 - SQL 性能观测
// ==========================================
// 开关（环境变量）:
// - INVENTORY_LEDGER_PERF_SQL=1      强制开启（Debug 构建默认开启）
// - INVENTORY_LEDGER_SLOW_SQL_MS=50  慢 SQL 阈值（毫秒）
// ==========================================

use rusqlite::Connection;
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub const PERF_SQL_ENV: &str = "INVENTORY_LEDGER_PERF_SQL";
pub const SLOW_SQL_MS_ENV: &str = "INVENTORY_LEDGER_SLOW_SQL_MS";

static ENABLED: AtomicBool = AtomicBool::new(false);
static SLOW_THRESHOLD_MS: AtomicU64 = AtomicU64::new(0);

/// 当前线程上的统计（仅在 PerfGuard 作用域内累加）
#[derive(Default)]
struct ThreadCounters {
    depth: Cell<u32>,
    statements: Cell<u64>,
    slow_statements: Cell<u64>,
}

thread_local! {
    static COUNTERS: ThreadCounters = ThreadCounters::default();
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|v| {
        matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn shorten(sql: &str, max_chars: usize) -> String {
    let flat = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut cut: String = flat.chars().take(max_chars).collect();
    cut.push('…');
    cut
}

fn in_guard() -> bool {
    COUNTERS.with(|c| c.depth.get() > 0)
}

/// 在连接上挂载 trace/profile 回调（语句计数 + 慢查询日志）
pub fn install_sqlite_tracing(conn: &mut Connection) {
    let enabled = env_flag(PERF_SQL_ENV).unwrap_or(cfg!(debug_assertions));
    ENABLED.store(enabled, Ordering::Relaxed);

    if !enabled {
        conn.trace(None);
        conn.profile(None);
        return;
    }

    let threshold = std::env::var(SLOW_SQL_MS_ENV)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(if cfg!(debug_assertions) { 50 } else { 200 });
    SLOW_THRESHOLD_MS.store(threshold, Ordering::Relaxed);

    conn.trace(Some(on_statement));
    conn.profile(Some(on_profile));
}

fn on_statement(_sql: &str) {
    if ENABLED.load(Ordering::Relaxed) && in_guard() {
        COUNTERS.with(|c| c.statements.set(c.statements.get().saturating_add(1)));
    }
}

fn on_profile(sql: &str, duration: Duration) {
    if !ENABLED.load(Ordering::Relaxed) {
        return;
    }
    let threshold = SLOW_THRESHOLD_MS.load(Ordering::Relaxed);
    let ms = duration.as_millis() as u64;
    if threshold == 0 || ms < threshold {
        return;
    }

    tracing::warn!(target: "slow_sql", duration_ms = ms, sql = %shorten(sql, 400), "slow sql");
    if in_guard() {
        COUNTERS.with(|c| c.slow_statements.set(c.slow_statements.get().saturating_add(1)));
    }
}

/// 操作级性能统计：drop 时输出耗时、SQL 条数、慢 SQL 条数
///
/// ```ignore
/// let _perf = PerfGuard::new("compute_all_open");
/// ```
pub struct PerfGuard {
    op: &'static str,
    start: Instant,
    statements_at_start: u64,
    slow_at_start: u64,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        let (statements_at_start, slow_at_start) = COUNTERS.with(|c| {
            c.depth.set(c.depth.get().saturating_add(1));
            (c.statements.get(), c.slow_statements.get())
        });
        Self {
            op,
            start: Instant::now(),
            statements_at_start,
            slow_at_start,
        }
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let (sql_count, slow_sql_count) = COUNTERS.with(|c| {
            c.depth.set(c.depth.get().saturating_sub(1));
            (
                c.statements.get().saturating_sub(self.statements_at_start),
                c.slow_statements.get().saturating_sub(self.slow_at_start),
            )
        });

        tracing::info!(
            target: "perf",
            op = self.op,
            elapsed_ms = self.start.elapsed().as_millis() as u64,
            sql_count,
            slow_sql_count,
            "done"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shorten_flattens_and_truncates() {
        assert_eq!(shorten("SELECT *\n  FROM inventory", 100), "SELECT * FROM inventory");
        assert_eq!(shorten("库存流水查询", 2), "库存…");
    }

    #[test]
    fn test_guard_nesting_restores_depth() {
        {
            let _outer = PerfGuard::new("outer");
            let _inner = PerfGuard::new("inner");
            assert!(in_guard());
        }
        assert!(!in_guard());
    }
}
