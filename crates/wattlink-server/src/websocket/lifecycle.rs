//! Connection classification, registration and teardown.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::{counter, gauge, histogram};
use tracing::{info, warn};
use wattlink_core::envelope::MAC_FIELD;
use wattlink_core::{DeviceId, OutboundMessage};
use wattlink_telemetry::metrics::{
    DEVICES_ONLINE, OBSERVERS_ONLINE, WS_CONNECTIONS_TOTAL, WS_CONNECTION_DURATION_SECONDS,
    WS_DISCONNECTIONS_TOTAL,
};

use super::broadcast::fan_out_message;
use super::connection::ClientConnection;
use super::registry::ConnectionRegistry;

/// Observer endpoint. A connection on this path is never a device.
pub const OBSERVER_PATH: &str = "/ws/ui";

/// What a connection is, decided once at upgrade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Device(DeviceId),
    Observer,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Device(_) => "device",
            Self::Observer => "observer",
        }
    }
}

/// Classify a connection from its request path and query parameters.
///
/// The `mac` key is matched case-insensitively. A blank or missing `mac`
/// means observer, as does any path on the observer endpoint.
pub fn classify(path: &str, query: &HashMap<String, String>) -> Role {
    if path.contains(OBSERVER_PATH) {
        return Role::Observer;
    }
    query
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(MAC_FIELD))
        .and_then(|(_, v)| DeviceId::parse(v))
        .map_or(Role::Observer, Role::Device)
}

/// Registers connections on open and tears them down on close.
pub struct SessionLifecycle {
    registry: Arc<dyn ConnectionRegistry>,
}

impl SessionLifecycle {
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Register a freshly upgraded connection and acknowledge it.
    pub fn open(&self, connection: &Arc<ClientConnection>, role: &Role) {
        counter!(WS_CONNECTIONS_TOTAL, "role" => role.label()).increment(1);
        match role {
            Role::Device(mac) => {
                if let Some(previous) = self.registry.register_device(mac.clone(), connection.clone())
                {
                    info!(
                        %mac,
                        previous = %previous.id(),
                        conn_id = %connection.id(),
                        "device connection superseded"
                    );
                }
                info!(%mac, conn_id = %connection.id(), "device connected");
                self.acknowledge(connection, &OutboundMessage::Registered { mac: mac.clone() });
                let _ = fan_out_message(
                    &self.registry.observers(),
                    &OutboundMessage::DeviceConnected { mac: mac.clone() },
                );
            }
            Role::Observer => {
                self.registry.register_observer(connection.clone());
                info!(conn_id = %connection.id(), "observer connected");
                self.acknowledge(connection, &OutboundMessage::UiRegistered);
            }
        }
        self.record_gauges();
    }

    /// Tear down a connection. Returns the device identity when observers
    /// were told it disconnected.
    pub fn close(&self, connection: &ClientConnection, role: &Role) -> Option<DeviceId> {
        connection.mark_closed();
        let removed = self.registry.remove_by_connection_id(connection.id());

        counter!(WS_DISCONNECTIONS_TOTAL, "role" => role.label()).increment(1);
        histogram!(WS_CONNECTION_DURATION_SECONDS, "role" => role.label())
            .record(connection.age().as_secs_f64());
        self.record_gauges();

        match (&removed, role) {
            (Some(mac), _) => {
                info!(%mac, conn_id = %connection.id(), "device disconnected");
                let _ = fan_out_message(
                    &self.registry.observers(),
                    &OutboundMessage::DeviceDisconnected { mac: mac.clone() },
                );
            }
            (None, Role::Device(mac)) => {
                info!(%mac, conn_id = %connection.id(), "superseded device connection closed");
            }
            (None, Role::Observer) => {
                info!(conn_id = %connection.id(), "observer disconnected");
            }
        }
        removed
    }

    fn acknowledge(&self, connection: &ClientConnection, message: &OutboundMessage) {
        if let Err(e) = connection.send_message(message) {
            warn!(conn_id = %connection.id(), error = %e, "failed to queue acknowledgment");
        }
    }

    fn record_gauges(&self) {
        gauge!(DEVICES_ONLINE).set(self.registry.device_count() as f64);
        gauge!(OBSERVERS_ONLINE).set(self.registry.observer_count() as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::connection::test_support::connection;
    use crate::websocket::registry::InMemoryRegistry;
    use serde_json::Value;
    use tokio::sync::mpsc;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn next_frame(rx: &mut mpsc::Receiver<String>) -> Value {
        serde_json::from_str(&rx.try_recv().unwrap()).unwrap()
    }

    fn lifecycle() -> (SessionLifecycle, Arc<InMemoryRegistry>) {
        let registry = Arc::new(InMemoryRegistry::new());
        (SessionLifecycle::new(registry.clone()), registry)
    }

    #[test]
    fn classify_device_with_mac() {
        let role = classify("/ws/device", &query(&[("mac", "aa:bb:cc:dd:ee:ff")]));
        assert_eq!(role, Role::Device(DeviceId::new("AA:BB:CC:DD:EE:FF")));
    }

    #[test]
    fn classify_mac_key_case_insensitive() {
        let role = classify("/ws/device", &query(&[("MAC", "01:02")]));
        assert_eq!(role, Role::Device(DeviceId::new("01:02")));
    }

    #[test]
    fn classify_observer_path_wins_over_mac() {
        let role = classify("/ws/ui", &query(&[("mac", "aa:bb")]));
        assert_eq!(role, Role::Observer);
    }

    #[test]
    fn classify_missing_or_blank_mac_is_observer() {
        assert_eq!(classify("/ws/device", &query(&[])), Role::Observer);
        assert_eq!(classify("/ws/device", &query(&[("mac", "  ")])), Role::Observer);
        assert_eq!(
            classify("/ws/device", &query(&[("device", "aa")])),
            Role::Observer
        );
    }

    #[test]
    fn device_open_registers_acks_and_notifies_observers() {
        let (lifecycle, registry) = lifecycle();
        let (observer, mut obs_rx) = connection(8);
        lifecycle.open(&observer, &Role::Observer);
        assert_eq!(next_frame(&mut obs_rx)["type"], "ui-registered");

        let (device, mut dev_rx) = connection(8);
        let mac = DeviceId::new("AA:BB:CC:DD:EE:FF");
        lifecycle.open(&device, &Role::Device(mac.clone()));

        assert!(registry.is_device_online(&mac));
        let ack = next_frame(&mut dev_rx);
        assert_eq!(ack["type"], "registered");
        assert_eq!(ack["mac"], "AA:BB:CC:DD:EE:FF");

        let note = next_frame(&mut obs_rx);
        assert_eq!(note["type"], "device-connected");
        assert_eq!(note["mac"], "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn device_close_notifies_observers() {
        let (lifecycle, registry) = lifecycle();
        let (observer, mut obs_rx) = connection(8);
        lifecycle.open(&observer, &Role::Observer);
        let mac = DeviceId::new("AA:01");
        let (device, _dev_rx) = connection(8);
        lifecycle.open(&device, &Role::Device(mac.clone()));
        let _ = obs_rx.try_recv();
        let _ = obs_rx.try_recv();

        assert_eq!(lifecycle.close(&device, &Role::Device(mac.clone())), Some(mac.clone()));
        assert!(!device.is_open());
        assert!(!registry.is_device_online(&mac));

        let note = next_frame(&mut obs_rx);
        assert_eq!(note["type"], "device-disconnected");
        assert_eq!(note["mac"], "AA:01");
    }

    #[test]
    fn observer_close_is_silent() {
        let (lifecycle, registry) = lifecycle();
        let (watcher, mut watcher_rx) = connection(8);
        lifecycle.open(&watcher, &Role::Observer);
        let _ = watcher_rx.try_recv();

        let (leaving, _rx) = connection(8);
        lifecycle.open(&leaving, &Role::Observer);
        assert_eq!(registry.observer_count(), 2);

        assert_eq!(lifecycle.close(&leaving, &Role::Observer), None);
        assert_eq!(registry.observer_count(), 1);
        assert!(watcher_rx.try_recv().is_err());
    }

    #[test]
    fn superseded_close_is_silent() {
        let (lifecycle, registry) = lifecycle();
        let (observer, mut obs_rx) = connection(8);
        lifecycle.open(&observer, &Role::Observer);

        let mac = DeviceId::new("AA:02");
        let role = Role::Device(mac.clone());
        let (old, _old_rx) = connection(8);
        let (new, _new_rx) = connection(8);
        lifecycle.open(&old, &role);
        lifecycle.open(&new, &role);
        while obs_rx.try_recv().is_ok() {}

        assert_eq!(lifecycle.close(&old, &role), None);
        assert!(registry.is_device_online(&mac));
        assert!(obs_rx.try_recv().is_err());
    }
}
