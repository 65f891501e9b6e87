// ==========================================
// 养殖批次运营核心 - SQL 性能观测
// ==========================================
// 职责: rusqlite trace/profile 回调, 统计 SQL 数量与慢查询
// 开关:
// - AQUAFARM_PERF_SQL=1 开启 (Debug 默认开启)
// - AQUAFARM_SLOW_SQL_MS=50 慢 SQL 阈值（毫秒）
// ==========================================

use rusqlite::Connection;
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

static SQL_TRACING_ON: AtomicBool = AtomicBool::new(false);
static SLOW_SQL_MS: AtomicU64 = AtomicU64::new(0);

thread_local! {
    // 仅在 OpTimer 存活期间计数
    static OPEN_TIMERS: Cell<u32> = const { Cell::new(0) };
    static STATEMENTS: Cell<u64> = const { Cell::new(0) };
    static SLOW_STATEMENTS: Cell<u64> = const { Cell::new(0) };
}

/// SQL 观测配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerfSettings {
    pub enabled: bool,
    pub slow_sql_ms: u64,
}

impl PerfSettings {
    /// 从环境变量读取
    pub fn from_env() -> Self {
        let enabled = std::env::var("AQUAFARM_PERF_SQL")
            .map(|v| parse_flag(&v))
            .unwrap_or(cfg!(debug_assertions));
        let slow_sql_ms = std::env::var("AQUAFARM_SLOW_SQL_MS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(if cfg!(debug_assertions) { 50 } else { 200 });
        Self { enabled, slow_sql_ms }
    }
}

fn parse_flag(v: &str) -> bool {
    matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn one_line(sql: &str, max_chars: usize) -> String {
    let flat: String = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}…", cut)
}

/// 按环境变量安装 SQL 观测回调
pub fn install_sqlite_tracing(conn: &mut Connection) {
    install_with_settings(conn, PerfSettings::from_env());
}

/// 按指定配置安装 SQL 观测回调
pub fn install_with_settings(conn: &mut Connection, settings: PerfSettings) {
    SQL_TRACING_ON.store(settings.enabled, Ordering::Relaxed);
    SLOW_SQL_MS.store(settings.slow_sql_ms, Ordering::Relaxed);

    if settings.enabled {
        conn.trace(Some(on_statement));
        conn.profile(Some(on_profile));
    } else {
        conn.trace(None);
        conn.profile(None);
    }
}

fn timing_active() -> bool {
    SQL_TRACING_ON.load(Ordering::Relaxed) && OPEN_TIMERS.with(|t| t.get() > 0)
}

fn on_statement(_sql: &str) {
    if timing_active() {
        STATEMENTS.with(|c| c.set(c.get() + 1));
    }
}

fn on_profile(sql: &str, elapsed: Duration) {
    if !SQL_TRACING_ON.load(Ordering::Relaxed) {
        return;
    }
    let threshold = SLOW_SQL_MS.load(Ordering::Relaxed);
    let ms = elapsed.as_millis() as u64;
    if threshold == 0 || ms < threshold {
        return;
    }

    tracing::warn!(target: "slow_sql", duration_ms = ms, sql = %one_line(sql, 400), "慢 SQL");
    if timing_active() {
        SLOW_STATEMENTS.with(|c| c.set(c.get() + 1));
    }
}

/// 用例计时器：drop 时输出耗时 + SQL 数 + 慢 SQL 数
///
/// ```ignore
/// let _t = aquafarm_core::perf::OpTimer::start("execute_action");
/// ```
pub struct OpTimer {
    op: &'static str,
    started: Instant,
    statements_before: u64,
    slow_before: u64,
}

impl OpTimer {
    pub fn start(op: &'static str) -> Self {
        OPEN_TIMERS.with(|t| t.set(t.get() + 1));
        Self {
            op,
            started: Instant::now(),
            statements_before: STATEMENTS.with(|c| c.get()),
            slow_before: SLOW_STATEMENTS.with(|c| c.get()),
        }
    }
}

impl Drop for OpTimer {
    fn drop(&mut self) {
        let sql_count = STATEMENTS.with(|c| c.get()).saturating_sub(self.statements_before);
        let slow_sql_count = SLOW_STATEMENTS.with(|c| c.get()).saturating_sub(self.slow_before);
        tracing::debug!(
            target: "perf",
            op = self.op,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            sql_count,
            slow_sql_count,
            "用例完成"
        );
        OPEN_TIMERS.with(|t| t.set(t.get().saturating_sub(1)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag(" YES "));
        assert!(parse_flag("1"));
        assert!(!parse_flag("off"));
    }

    #[test]
    fn test_one_line_truncates() {
        assert_eq!(one_line("SELECT *\n  FROM batch", 100), "SELECT * FROM batch");
        assert_eq!(one_line("SELECT 1234567", 6), "SELECT…");
    }

    #[test]
    fn test_statements_counted_inside_timer() {
        let mut conn = Connection::open_in_memory().unwrap();
        install_with_settings(&mut conn, PerfSettings { enabled: true, slow_sql_ms: 0 });
        let before = STATEMENTS.with(|c| c.get());
        {
            let _t = OpTimer::start("test");
            conn.execute_batch("SELECT 1; SELECT 2;").unwrap();
        }
        assert!(STATEMENTS.with(|c| c.get()) > before);
    }
}
