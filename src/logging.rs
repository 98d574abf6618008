//! File-based logging
//!
//! The terminal front-end owns stdout, so tracing output goes to a daily
//! rotating file instead.

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const LOG_DIR: &str = ".logs";
const LOG_FILE_PREFIX: &str = "polyplay";
const DEFAULT_FILTER: &str = "polyplay=debug,rspotify=info,reqwest=warn,warn";

/// Initialize the logging system.
///
/// Logs are written to `.logs/polyplay.YYYY-MM-DD` with daily rotation.
/// `RUST_LOG` overrides the default filter.
pub fn init_logging() -> anyhow::Result<()> {
    let log_dir = Path::new(LOG_DIR);
    if !log_dir.exists() {
        std::fs::create_dir_all(log_dir)?;
    }

    let file_appender = RollingFileAppender::new(Rotation::DAILY, LOG_DIR, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // The guard flushes on drop; it has to live as long as the process
    Box::leak(Box::new(guard));

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true)
        .with_span_events(FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::info!("Logging initialized - logs written to {}/", LOG_DIR);

    Ok(())
}

/// Log the outcome of a backend request
#[macro_export]
macro_rules! log_api_result {
    ($provider:expr, $operation:expr, $result:expr) => {
        match &$result {
            Ok(_) => tracing::debug!(provider = %$provider, operation = $operation, "API request successful"),
            Err(e) => tracing::warn!(provider = %$provider, operation = $operation, error = %e, "API request failed"),
        }
    };
}

/// Log a backend request with additional context
#[macro_export]
macro_rules! log_api_request {
    ($provider:expr, $operation:expr) => {
        tracing::debug!(provider = %$provider, operation = $operation, "API request started");
    };
    ($provider:expr, $operation:expr, $($field:tt)*) => {
        tracing::debug!(provider = %$provider, operation = $operation, $($field)*, "API request started");
    };
}
