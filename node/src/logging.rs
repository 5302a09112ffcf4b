//! # Operator Logs
//!
//! `pulsevault` talks to two audiences at once. Whatever a subcommand
//! produces (key material, signed requests, simulation reports) is printed
//! on stdout as JSON so it can be piped into `jq` or saved. Diagnostics
//! from the fleet manager and the vault modules go to stderr through
//! `tracing`, either as readable text or as JSON lines.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Directives used when `RUST_LOG` is unset: vault lifecycle events
/// (creation, claims, fee payments, reverted calls) without per-effect
/// settlement noise.
pub const DEFAULT_FILTER: &str = "pulsevault=info,pulsevault_contracts=info,pulsevault_protocol=info";

/// How stderr diagnostics are rendered. Chosen with `--log-format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Text with source locations, for a terminal.
    Pretty,
    /// One JSON object per event, for collectors.
    Json,
}

fn filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Install the process-wide subscriber. `main` calls this once before
/// dispatching a subcommand.
///
/// `RUST_LOG` wins over `fallback`. Settlement of individual effects is
/// logged at debug level:
///
/// ```text
/// RUST_LOG=pulsevault_contracts=debug pulsevault simulate --pretty
/// ```
pub fn init_logging(fallback: &str, format: LogFormat) {
    let registry = tracing_subscriber::registry().with(filter(fallback));
    let stderr = fmt::layer().with_writer(std::io::stderr).with_target(true);

    match format {
        LogFormat::Pretty => registry
            .with(stderr.with_file(true).with_line_number(true))
            .init(),
        LogFormat::Json => registry.with(stderr.json()).init(),
    }

    tracing::debug!(?format, filter = fallback, "operator logging ready");
}
