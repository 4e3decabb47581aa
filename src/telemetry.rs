//! Global tracing setup for the `ghstats` binary.
//!
//! SQLx and the pool code log through `log::`, so a `LogTracer` bridge feeds
//! them into the same subscriber as the ingestion and API spans.

use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing_log::LogTracer;
use tracing_subscriber::{
    EnvFilter, fmt,
    filter::ParseError,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::AppConfig;

/// HTTP and TLS internals that are noisy at `debug` during ingestion passes.
const DEPENDENCY_DIRECTIVES: [&str; 4] =
    ["hyper=warn", "hyper_util=warn", "h2=warn", "rustls=warn"];

#[derive(Debug, Error)]
pub enum TelemetryInitError {
    #[error("invalid log filter `{directives}`: {source}")]
    Filter {
        directives: String,
        #[source]
        source: ParseError,
    },
}

static TELEMETRY_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Filter directives: `RUST_LOG` verbatim when set, otherwise the configured
/// level with the HTTP stack held at `warn`.
pub fn filter_directives(log_level: &str, rust_log: Option<&str>) -> String {
    match rust_log.map(str::trim).filter(|value| !value.is_empty()) {
        Some(explicit) => explicit.to_string(),
        None => std::iter::once(log_level.trim())
            .chain(DEPENDENCY_DIRECTIVES)
            .collect::<Vec<_>>()
            .join(","),
    }
}

pub fn build_filter(
    log_level: &str,
    rust_log: Option<&str>,
) -> Result<EnvFilter, TelemetryInitError> {
    let directives = filter_directives(log_level, rust_log);
    EnvFilter::try_new(&directives)
        .map_err(|source| TelemetryInitError::Filter { directives, source })
}

/// Installs the global subscriber once; later calls are no-ops.
pub fn init_tracing(config: &AppConfig) -> Result<(), TelemetryInitError> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = build_filter(&config.log_level, rust_log.as_deref())?;

    if TELEMETRY_INITIALIZED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return Ok(());
    }

    if let Err(err) = LogTracer::init() {
        eprintln!("Warning: log bridge not installed, SQLx statements will not be traced: {err}");
    }

    let fmt_layer = match config.log_format.as_str() {
        "pretty" => fmt::layer().pretty().boxed(),
        _ => fmt::layer().json().with_current_span(true).boxed(),
    };

    if let Err(err) = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
    {
        TELEMETRY_INITIALIZED.store(false, Ordering::SeqCst);
        eprintln!("Warning: a global tracing subscriber is already set: {err}");
    }

    tracing::debug!(
        service = "ghstats",
        version = env!("CARGO_PKG_VERSION"),
        format = %config.log_format,
        "Tracing initialized"
    );
    Ok(())
}
