//! Tracing subscriber setup.
//!
//! Hosts call [`init`] once at startup. `RUST_LOG` wins over the configured
//! level; the verbosity knob escalates the default directive.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use crate::config::{LogFormat, LoggingConfig};

pub struct TelemetryConfig {
    pub verbosity: u8,
    pub logging: LoggingConfig,
}

impl TelemetryConfig {
    pub fn new(verbosity: u8, logging: LoggingConfig) -> Self {
        Self { verbosity, logging }
    }
}

/// Initialize the global subscriber. Safe to call more than once; later calls
/// are ignored (relevant for tests sharing a process).
pub fn init(config: TelemetryConfig) {
    let default_directive = match config.verbosity {
        0 => config.logging.level.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let builder = fmt().with_env_filter(filter).with_target(false);
    let result = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if result.is_err() {
        tracing::debug!("telemetry already initialized");
    }
}
