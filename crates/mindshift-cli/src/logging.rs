//! Logging setup for the terminal client.
//!
//! The REPL owns stdout, so log output goes to a daily rolling file under the
//! logs directory. Filtering follows `MINDSHIFT_LOG` (an `EnvFilter`
//! directive) and defaults to `info`.

use anyhow::{Context, Result};
use mindshift_execution::{SessionTraceEvent, SessionTraceLayer};
use std::path::Path;
use tokio::sync::mpsc::UnboundedSender;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const LOG_ENV: &str = "MINDSHIFT_LOG";
const LOG_FILE: &str = "mindshift.log";

/// Installs the global subscriber.
///
/// When `trace` is given, protocol events are also forwarded to it for
/// display. The returned guard must be held until exit so buffered lines are
/// flushed.
pub fn init(logs_dir: &Path, trace: Option<UnboundedSender<SessionTraceEvent>>) -> Result<WorkerGuard> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("Failed to create log directory {}", logs_dir.display()))?;

    let appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(trace.map(SessionTraceLayer::new))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
