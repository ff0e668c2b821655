// ==========================================
// 成品库存台账 - 日志初始化
// ==========================================
// RUST_LOG 控制过滤（默认 info）
// INVENTORY_LEDGER_LOG_FORMAT=json 切换为 JSON 行输出（便于日志采集）
// 慢 SQL 走 target=slow_sql，操作耗时走 target=perf
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 日志输出格式环境变量
pub const LOG_FORMAT_ENV: &str = "INVENTORY_LEDGER_LOG_FORMAT";

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// 解析格式名；未知值按文本处理
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }

    pub fn from_env() -> Self {
        std::env::var(LOG_FORMAT_ENV)
            .map(|v| Self::parse(&v))
            .unwrap_or(LogFormat::Text)
    }
}

/// 安装全局 fmt 订阅者
///
/// ```no_run
/// inventory_ledger::logging::init();
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match LogFormat::from_env() {
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_line_number(true)
            .with_current_span(true)
            .init(),
        LogFormat::Text => fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_line_number(true)
            .init(),
    }
}

/// 测试用：debug 级别，输出交给测试框架捕获；重复调用无副作用
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse(" JSON "), LogFormat::Json);
        assert_eq!(LogFormat::parse("text"), LogFormat::Text);
        assert_eq!(LogFormat::parse(""), LogFormat::Text);
    }
}
