//! Live connection registry.
//!
//! Devices are indexed by [`DeviceId`] with a reverse index from
//! [`ConnectionId`] so teardown never scans. Both device indices sit behind
//! one lock and change together; observers live in a separate concurrent map.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use wattlink_core::{ConnectionId, DeviceId};

use super::connection::ClientConnection;

/// Registration state shared by lifecycle, router and bridge.
pub trait ConnectionRegistry: Send + Sync {
    /// Insert or overwrite the device entry for `device`.
    ///
    /// Returns the superseded connection, if any. It is not closed here.
    fn register_device(
        &self,
        device: DeviceId,
        connection: Arc<ClientConnection>,
    ) -> Option<Arc<ClientConnection>>;

    fn register_observer(&self, connection: Arc<ClientConnection>);

    fn lookup_device(&self, device: &DeviceId) -> Option<Arc<ClientConnection>>;

    /// Registered and still open.
    fn is_device_online(&self, device: &DeviceId) -> bool {
        self.lookup_device(device).is_some_and(|c| c.is_open())
    }

    /// Remove a connection from whichever index holds it.
    ///
    /// Returns the device identity when `id` was the current connection for
    /// a device, `None` for observers, superseded devices and unknown ids.
    fn remove_by_connection_id(&self, id: &ConnectionId) -> Option<DeviceId>;

    /// Point-in-time snapshot of observer connections.
    fn observers(&self) -> Vec<Arc<ClientConnection>>;

    fn device_count(&self) -> usize;

    fn observer_count(&self) -> usize;
}

#[derive(Default)]
struct DeviceIndex {
    by_device: HashMap<DeviceId, Arc<ClientConnection>>,
    by_connection: HashMap<ConnectionId, DeviceId>,
}

/// Single-process registry.
#[derive(Default)]
pub struct InMemoryRegistry {
    devices: RwLock<DeviceIndex>,
    observers: DashMap<ConnectionId, Arc<ClientConnection>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConnectionRegistry for InMemoryRegistry {
    fn register_device(
        &self,
        device: DeviceId,
        connection: Arc<ClientConnection>,
    ) -> Option<Arc<ClientConnection>> {
        let id = connection.id().clone();
        let mut index = self.devices.write();
        let previous = index.by_device.insert(device.clone(), connection);
        if let Some(prev) = &previous {
            let _ = index.by_connection.remove(prev.id());
        }
        let _ = index.by_connection.insert(id, device);
        previous
    }

    fn register_observer(&self, connection: Arc<ClientConnection>) {
        let _ = self.observers.insert(connection.id().clone(), connection);
    }

    fn lookup_device(&self, device: &DeviceId) -> Option<Arc<ClientConnection>> {
        self.devices.read().by_device.get(device).cloned()
    }

    fn remove_by_connection_id(&self, id: &ConnectionId) -> Option<DeviceId> {
        {
            let mut index = self.devices.write();
            if let Some(device) = index.by_connection.remove(id) {
                let _ = index.by_device.remove(&device);
                return Some(device);
            }
        }
        let _ = self.observers.remove(id);
        None
    }

    fn observers(&self) -> Vec<Arc<ClientConnection>> {
        self.observers.iter().map(|e| e.value().clone()).collect()
    }

    fn device_count(&self) -> usize {
        self.devices.read().by_device.len()
    }

    fn observer_count(&self) -> usize {
        self.observers.len()
    }
}
