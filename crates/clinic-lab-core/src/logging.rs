//! Logging setup using `tracing` and `tracing-subscriber`.
//!
//! Library code only emits events; the host application decides whether and
//! how they are printed by calling [`init_logging`] once at startup.
//!
//! Measured values and technician notes are patient data and are never
//! logged. Events carry identifiers, counts and statuses only.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line human-readable output.
    Pretty,
    /// Single-line output.
    #[default]
    Compact,
    /// JSON lines for machine parsing.
    Json,
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Some(LogFormat::Pretty),
            "compact" => Some(LogFormat::Compact),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `filter` when set. Returns `Ok(false)` if
/// a global subscriber was already installed, so calling twice is harmless.
pub fn init_logging(filter: &str, format: LogFormat) -> anyhow::Result<bool> {
    let env_filter = build_env_filter(filter)?;
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
    };

    match installed {
        Ok(()) => {
            tracing::debug!(filter, ?format, "Logging initialised");
            Ok(true)
        }
        Err(_) => Ok(false),
    }
}

/// Build the level filter, letting `RUST_LOG` override the configured one.
fn build_env_filter(filter: &str) -> anyhow::Result<EnvFilter> {
    if let Ok(from_env) = EnvFilter::try_from_default_env() {
        return Ok(from_env);
    }
    EnvFilter::try_new(filter)
        .map_err(|e| anyhow::anyhow!("Invalid log filter '{}': {}", filter, e))
}
