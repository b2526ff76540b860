//! Logging setup
//!
//! 开发环境输出到终端；生产环境写入按天滚动的日志文件。过滤器
//! 优先级：显式 log_level > RUST_LOG > "info"。

use std::path::Path;

use tracing_subscriber::EnvFilter;

/// Initialize logging with defaults (stdout, info level)
pub fn init_logger() {
    init_logger_with_file(None, None);
}

/// Initialize logging, optionally into a daily-rolling file.
///
/// `log_dir` must already exist for file output to engage; otherwise the
/// subscriber falls back to stdout.
pub fn init_logger_with_file(log_level: Option<&str>, log_dir: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info")),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match log_dir {
        Some(dir) if Path::new(dir).exists() => {
            let appender = tracing_appender::rolling::daily(dir, "waitlist-server");
            builder.with_writer(appender).with_ansi(false).init();
        }
        _ => builder.init(),
    }
}
