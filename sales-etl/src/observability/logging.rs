use std::fs;
use std::io;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "sales-etl.log";

/// Initializes logging: console output on stderr plus a daily-rolling JSON
/// file under `logs/`.
///
/// Console lines go to stderr so the `read` command can print table rows on
/// stdout without log lines interleaved. The returned guard flushes the
/// file writer when dropped; hold it for the life of the process so the
/// last lines of a run make it to disk.
pub fn init_logging() -> WorkerGuard {
    let _ = fs::create_dir_all(LOG_DIR);

    let file_appender = tracing_appender::rolling::daily(LOG_DIR, LOG_FILE);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = fmt::layer().json().with_writer(file_writer);

    let console_layer = fmt::layer().with_target(true).with_writer(io::stderr);

    // Respect RUST_LOG if set; otherwise default to verbose for our crates
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sales_etl=debug,sales_core=debug,info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    guard
}
