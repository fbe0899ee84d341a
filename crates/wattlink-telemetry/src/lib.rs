mod logging;
pub mod metrics;

pub use logging::{build_filter_directives, init_logging};
pub use metrics::{install_recorder, render};
pub use metrics_exporter_prometheus::PrometheusHandle;

use tracing::Level;

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    Filter(String),

    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(String),

    #[error("failed to install metrics recorder: {0}")]
    Metrics(String),
}

/// Configuration for the telemetry subsystem.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Default log level. Overridden by RUST_LOG env var.
    pub log_level: Level,
    /// Per-module level overrides (e.g. "wattlink_server" => DEBUG).
    pub module_levels: Vec<(String, Level)>,
    /// JSON lines instead of human-readable output.
    pub json: bool,
    /// Whether to install the Prometheus recorder.
    pub metrics_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            module_levels: Vec::new(),
            json: false,
            metrics_enabled: true,
        }
    }
}

impl TelemetryConfig {
    /// Parse a level name, keeping the default on anything unrecognised.
    pub fn with_level_name(mut self, name: &str) -> Self {
        if let Ok(level) = name.parse::<Level>() {
            self.log_level = level;
        }
        self
    }
}

/// Handles kept alive for the lifetime of the process.
pub struct TelemetryGuard {
    metrics: Option<PrometheusHandle>,
}

impl TelemetryGuard {
    /// Prometheus handle, when metrics are enabled.
    pub fn metrics(&self) -> Option<&PrometheusHandle> {
        self.metrics.as_ref()
    }
}

/// Initialize logging and metrics. Call once at startup.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    init_logging(config)?;

    let metrics = if config.metrics_enabled {
        Some(install_recorder()?)
    } else {
        None
    };

    Ok(TelemetryGuard { metrics })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.log_level, Level::INFO);
        assert!(config.module_levels.is_empty());
        assert!(!config.json);
        assert!(config.metrics_enabled);
    }

    #[test]
    fn level_name_parsing() {
        let config = TelemetryConfig::default().with_level_name("debug");
        assert_eq!(config.log_level, Level::DEBUG);

        let config = TelemetryConfig::default().with_level_name("loud");
        assert_eq!(config.log_level, Level::INFO);
    }
}
