//! Best-effort fan-out to a snapshot of connections.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, warn};
use wattlink_core::OutboundMessage;
use wattlink_telemetry::metrics::{RELAY_FANOUT_FAILURES_TOTAL, RELAY_FANOUT_MESSAGES_TOTAL};

use super::connection::ClientConnection;

/// What happened when a frame was fanned out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Queue `payload` on every recipient. A failed recipient is logged and skipped.
pub fn fan_out(recipients: &[Arc<ClientConnection>], payload: &str, kind: &str) -> FanoutReport {
    let mut report = FanoutReport {
        attempted: recipients.len(),
        ..FanoutReport::default()
    };
    for conn in recipients {
        match conn.send(payload.to_owned()) {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                report.failed += 1;
                warn!(conn_id = %conn.id(), kind, error = %e, "failed to deliver to observer");
            }
        }
    }

    counter!(RELAY_FANOUT_MESSAGES_TOTAL, "type" => kind.to_owned()).increment(report.delivered as u64);
    if report.failed > 0 {
        counter!(RELAY_FANOUT_FAILURES_TOTAL).increment(report.failed as u64);
    }
    debug!(
        kind,
        attempted = report.attempted,
        delivered = report.delivered,
        "fan-out complete"
    );
    report
}

/// Serialize a server message once and fan it out.
pub fn fan_out_message(
    recipients: &[Arc<ClientConnection>],
    message: &OutboundMessage,
) -> FanoutReport {
    let kind = message_kind(message);
    match message.to_json() {
        Ok(json) => fan_out(recipients, &json, kind),
        Err(e) => {
            warn!(kind, error = %e, "failed to serialize broadcast");
            FanoutReport {
                attempted: recipients.len(),
                delivered: 0,
                failed: recipients.len(),
            }
        }
    }
}

fn message_kind(message: &OutboundMessage) -> &'static str {
    match message {
        OutboundMessage::Registered { .. } => "registered",
        OutboundMessage::UiRegistered => "ui-registered",
        OutboundMessage::UiAck { .. } => "ui-ack",
        OutboundMessage::DeviceConnected { .. } => "device-connected",
        OutboundMessage::DeviceDisconnected { .. } => "device-disconnected",
        OutboundMessage::Command { .. } => "command",
    }
}
