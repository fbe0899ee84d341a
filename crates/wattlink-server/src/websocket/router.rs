//! Role-aware routing of inbound frames.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, warn};
use wattlink_core::envelope::MAC_FIELD;
use wattlink_core::{DeviceId, InboundKind, InboundMessage, OutboundMessage};
use wattlink_telemetry::metrics::WS_MALFORMED_MESSAGES_TOTAL;

use super::broadcast::{fan_out, FanoutReport};
use super::connection::ClientConnection;
use super::lifecycle::Role;
use super::registry::ConnectionRegistry;

/// What the router did with one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Relayed to the observer snapshot.
    Broadcast {
        message_type: String,
        report: FanoutReport,
    },
    /// Replied to the sender only.
    Acknowledged { delivered: bool },
    /// Well-formed but not meaningful for the sender's role.
    Ignored { message_type: String },
    /// Not a JSON object.
    Malformed { reason: String },
}

pub struct MessageRouter {
    registry: Arc<dyn ConnectionRegistry>,
}

impl MessageRouter {
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Route one text frame from `sender`.
    pub fn route(&self, sender: &ClientConnection, role: &Role, text: &str) -> RouteOutcome {
        let message = match InboundMessage::parse(text) {
            Ok(m) => m,
            Err(e) => {
                counter!(WS_MALFORMED_MESSAGES_TOTAL).increment(1);
                warn!(conn_id = %sender.id(), error = %e, "dropping malformed frame");
                return RouteOutcome::Malformed {
                    reason: e.to_string(),
                };
            }
        };

        match role {
            Role::Device(mac) => self.route_device(mac, message),
            Role::Observer => self.route_observer(sender, message),
        }
    }

    fn route_device(&self, mac: &DeviceId, mut message: InboundMessage) -> RouteOutcome {
        match message.kind() {
            InboundKind::Data | InboundKind::Heartbeat => {
                message.stamp(mac, chrono::Utc::now().timestamp_millis());
                self.broadcast(&message)
            }
            InboundKind::CommandResponse => self.broadcast(&message),
            _ => {
                debug!(%mac, message_type = message.message_type(), "ignoring device message");
                RouteOutcome::Ignored {
                    message_type: message.message_type().to_string(),
                }
            }
        }
    }

    fn route_observer(&self, sender: &ClientConnection, message: InboundMessage) -> RouteOutcome {
        match message.kind() {
            InboundKind::UiRegister => {
                // Acknowledgment only; observers always receive every device broadcast.
                let mac = message
                    .str_field(MAC_FIELD)
                    .map(|m| DeviceId::new(m).to_string())
                    .unwrap_or_default();
                let delivered = match sender.send_message(&OutboundMessage::UiAck { mac }) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(conn_id = %sender.id(), error = %e, "failed to queue ui-ack");
                        false
                    }
                };
                RouteOutcome::Acknowledged { delivered }
            }
            _ => {
                debug!(
                    conn_id = %sender.id(),
                    message_type = message.message_type(),
                    "ignoring observer message"
                );
                RouteOutcome::Ignored {
                    message_type: message.message_type().to_string(),
                }
            }
        }
    }

    fn broadcast(&self, message: &InboundMessage) -> RouteOutcome {
        let message_type = message.message_type().to_string();
        let report = match message.to_json() {
            Ok(json) => fan_out(&self.registry.observers(), &json, &message_type),
            Err(e) => {
                warn!(message_type, error = %e, "failed to serialize relayed frame");
                FanoutReport::default()
            }
        };
        RouteOutcome::Broadcast {
            message_type,
            report,
        }
    }
}
