//! Deliver HTTP-originated commands into live device connections.

use std::sync::Arc;

use metrics::counter;
use tracing::{info, warn};
use wattlink_core::{DeviceId, OutboundMessage};
use wattlink_telemetry::metrics::BRIDGE_COMMANDS_TOTAL;

use crate::websocket::registry::ConnectionRegistry;

/// Fire-and-forget command delivery. No retries, no queueing for offline devices.
#[derive(Clone)]
pub struct CommandBridge {
    registry: Arc<dyn ConnectionRegistry>,
}

impl CommandBridge {
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Queue `{"type":"command","command":C}` on the device's connection.
    ///
    /// Returns `true` only when the device is registered, open, and the
    /// frame was accepted by its outbound queue.
    pub fn send_command(&self, mac: &str, command: &str) -> bool {
        let Some(device) = DeviceId::parse(mac) else {
            counter!(BRIDGE_COMMANDS_TOTAL, "outcome" => "offline").increment(1);
            return false;
        };
        let connection = match self.registry.lookup_device(&device) {
            Some(conn) if conn.is_open() => conn,
            _ => {
                info!(mac = %device, command, "command for offline device");
                counter!(BRIDGE_COMMANDS_TOTAL, "outcome" => "offline").increment(1);
                return false;
            }
        };

        let message = OutboundMessage::Command {
            command: command.to_string(),
        };
        match connection.send_message(&message) {
            Ok(()) => {
                info!(mac = %device, command, conn_id = %connection.id(), "command sent");
                counter!(BRIDGE_COMMANDS_TOTAL, "outcome" => "sent").increment(1);
                true
            }
            Err(e) => {
                warn!(mac = %device, command, error = %e, "failed to queue command");
                counter!(BRIDGE_COMMANDS_TOTAL, "outcome" => "failed").increment(1);
                false
            }
        }
    }

    pub fn is_online(&self, mac: &str) -> bool {
        DeviceId::parse(mac).is_some_and(|device| self.registry.is_device_online(&device))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::connection::test_support::connection;
    use crate::websocket::registry::InMemoryRegistry;

    fn setup() -> (CommandBridge, Arc<InMemoryRegistry>) {
        let registry = Arc::new(InMemoryRegistry::new());
        (CommandBridge::new(registry.clone()), registry)
    }

    #[test]
    fn command_reaches_registered_device() {
        let (bridge, registry) = setup();
        let (conn, mut rx) = connection(4);
        let _ = registry.register_device(DeviceId::new("AA:BB:CC:DD:EE:FF"), conn);

        assert!(bridge.send_command("aa:bb:cc:dd:ee:ff", "RELOAD"));
        let frame: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(frame, serde_json::json!({"type": "command", "command": "RELOAD"}));
    }

    #[test]
    fn unknown_device_returns_false_without_side_effects() {
        let (bridge, registry) = setup();
        let (observer, mut rx) = connection(4);
        registry.register_observer(observer);

        assert!(!bridge.send_command("00:00:00:00:00:00", "RELOAD"));
        assert!(rx.try_recv().is_err());
        assert_eq!(registry.device_count(), 0);
    }

    #[test]
    fn blank_mac_is_offline() {
        let (bridge, _registry) = setup();
        assert!(!bridge.send_command("  ", "RELOAD"));
        assert!(!bridge.is_online(""));
    }

    #[test]
    fn closed_but_registered_device_returns_false() {
        let (bridge, registry) = setup();
        let (conn, _rx) = connection(4);
        let _ = registry.register_device(DeviceId::new("AA:01"), conn.clone());
        conn.mark_closed();

        assert!(!bridge.send_command("AA:01", "RELOAD"));
        assert!(!bridge.is_online("AA:01"));
    }

    #[test]
    fn dropped_writer_returns_false() {
        let (bridge, registry) = setup();
        let (conn, rx) = connection(4);
        let _ = registry.register_device(DeviceId::new("AA:02"), conn);
        drop(rx);
        assert!(!bridge.send_command("AA:02", "RELOAD"));
    }

    #[test]
    fn full_queue_returns_false() {
        let (bridge, registry) = setup();
        let (conn, _rx) = connection(1);
        let _ = registry.register_device(DeviceId::new("AA:03"), conn.clone());
        conn.send("backlog".into()).unwrap();

        assert!(bridge.is_online("aa:03"));
        assert!(!bridge.send_command("AA:03", "RELOAD"));
    }

    #[test]
    fn is_online_tracks_registration() {
        let (bridge, registry) = setup();
        let (conn, _rx) = connection(4);
        assert!(!bridge.is_online("AA:04"));
        let _ = registry.register_device(DeviceId::new("AA:04"), conn.clone());
        assert!(bridge.is_online("aa:04"));
        let _ = registry.remove_by_connection_id(conn.id());
        assert!(!bridge.is_online("AA:04"));
    }
}
