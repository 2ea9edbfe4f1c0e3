//! File logging for the REPL.
//!
//! Logs go to a daily rolling file so they never interleave with the
//! prompt. `RUST_LOG` overrides the default filter.

use anyhow::{Context, Result};
use salesdesk_infrastructure::SalesdeskPaths;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn,salesdesk=info";

/// Installs the global subscriber. Keep the returned guard alive until
/// exit so buffered lines are flushed.
pub fn init(paths: &SalesdeskPaths) -> Result<WorkerGuard> {
    let logs_dir = paths.logs_dir()?;
    std::fs::create_dir_all(&logs_dir)
        .with_context(|| format!("Failed to create log directory {}", logs_dir.display()))?;

    let appender = tracing_appender::rolling::daily(&logs_dir, "salesdesk.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {e}"))?;

    Ok(guard)
}
