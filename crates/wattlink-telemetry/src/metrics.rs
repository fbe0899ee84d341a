//! Prometheus metrics recorder and metric names.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

use crate::TelemetryError;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the handle used to render the `/metrics` endpoint. Must be called
/// once at startup before any metrics are recorded.
pub fn install_recorder() -> Result<PrometheusHandle, TelemetryError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Render Prometheus text format from the installed recorder.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

// Metric name constants to avoid typos across crates.

/// WebSocket connections opened total (counter, labels: role).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket disconnections total (counter, labels: role).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Registered device connections (gauge).
pub const DEVICES_ONLINE: &str = "devices_online";
/// Registered observer connections (gauge).
pub const OBSERVERS_ONLINE: &str = "observers_online";
/// WebSocket connection lifetime (histogram, labels: role).
pub const WS_CONNECTION_DURATION_SECONDS: &str = "ws_connection_duration_seconds";
/// Inbound frames that failed to parse (counter).
pub const WS_MALFORMED_MESSAGES_TOTAL: &str = "ws_malformed_messages_total";
/// Frames fanned out to observers (counter, labels: type).
pub const RELAY_FANOUT_MESSAGES_TOTAL: &str = "relay_fanout_messages_total";
/// Per-recipient fan-out failures (counter).
pub const RELAY_FANOUT_FAILURES_TOTAL: &str = "relay_fanout_failures_total";
/// Commands sent through the HTTP bridge (counter, labels: outcome).
pub const BRIDGE_COMMANDS_TOTAL: &str = "bridge_commands_total";
/// Readings persisted (counter).
pub const READINGS_SAVED_TOTAL: &str = "readings_saved_total";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_without_global_install() {
        // Build a recorder + handle (no global install to avoid test conflicts).
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let output = render(&handle);
        assert!(output.is_empty() || output.contains('\n'));
    }

    #[test]
    fn metric_constants_are_snake_case() {
        let names = [
            WS_CONNECTIONS_TOTAL,
            WS_DISCONNECTIONS_TOTAL,
            DEVICES_ONLINE,
            OBSERVERS_ONLINE,
            WS_CONNECTION_DURATION_SECONDS,
            WS_MALFORMED_MESSAGES_TOTAL,
            RELAY_FANOUT_MESSAGES_TOTAL,
            RELAY_FANOUT_FAILURES_TOTAL,
            BRIDGE_COMMANDS_TOTAL,
            READINGS_SAVED_TOTAL,
        ];
        for name in names {
            assert!(
                name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "metric name '{name}' must be snake_case"
            );
        }
    }
}
