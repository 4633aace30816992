//! Tracing initialization: a console layer plus a plain-text log file.

use std::fs::OpenOptions;
use std::sync::Arc;

use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry,
};

/// Filter applied when `RUST_LOG` is unset: everything of ours at info,
/// with the HTTP machinery under teloxide/reqwest quieted down.
const DEFAULT_FILTER: &str = "info,teloxide=warn,reqwest=warn,hyper=warn";

/// Initializes the global tracing subscriber.
///
/// Two fmt layers share one filter: ANSI-colored output on stdout, and the
/// same events appended uncolored to `log_file_path`. The level comes from
/// `RUST_LOG`; load `.env` (e.g. `dotenvy::dotenv()`) before calling this or
/// `RUST_LOG` from the file will not apply.
pub fn init_tracing(log_file_path: &str) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true);

    Registry::default()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set global subscriber: {}", e))?;

    Ok(())
}
