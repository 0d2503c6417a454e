//! Log subscriber setup

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "flightboard=info,info";

/// Output format of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Logging configuration from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub format: LogFormat,
    /// Unrecognized `FLIGHTBOARD_LOG_FORMAT` value, reported once logging is up.
    pub rejected_format: Option<String>,
}

impl TelemetryConfig {
    pub fn from_env() -> Self {
        Self::from_value(std::env::var("FLIGHTBOARD_LOG_FORMAT").ok())
    }

    fn from_value(value: Option<String>) -> Self {
        match value.as_deref().map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("json") => Self {
                format: LogFormat::Json,
                rejected_format: None,
            },
            Some("pretty") => Self {
                format: LogFormat::Pretty,
                rejected_format: None,
            },
            Some(_) => Self {
                format: LogFormat::Json,
                rejected_format: value,
            },
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self::from_value(None)
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init(config: &TelemetryConfig) -> Result<(), String> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let (json, pretty) = match config.format {
        LogFormat::Json => (Some(tracing_subscriber::fmt::layer().json()), None),
        LogFormat::Pretty => (None, Some(tracing_subscriber::fmt::layer().pretty())),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json)
        .with(pretty)
        .try_init()
        .map_err(|e| format!("Failed to init subscriber: {}", e))?;

    if let Some(value) = &config.rejected_format {
        tracing::warn!(
            value = %value,
            "Unknown FLIGHTBOARD_LOG_FORMAT, expected 'json' or 'pretty'; using json"
        );
    }
    Ok(())
}
