//! The relay core wired around one shared registry.

use std::sync::Arc;

use crate::bridge::CommandBridge;
use crate::websocket::lifecycle::SessionLifecycle;
use crate::websocket::registry::{ConnectionRegistry, InMemoryRegistry};
use crate::websocket::router::MessageRouter;

/// Registry, lifecycle, router and bridge sharing the same registration state.
pub struct Relay {
    registry: Arc<dyn ConnectionRegistry>,
    lifecycle: SessionLifecycle,
    router: MessageRouter,
    bridge: CommandBridge,
}

impl Relay {
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self {
            lifecycle: SessionLifecycle::new(registry.clone()),
            router: MessageRouter::new(registry.clone()),
            bridge: CommandBridge::new(registry.clone()),
            registry,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryRegistry::new()))
    }

    pub fn registry(&self) -> &Arc<dyn ConnectionRegistry> {
        &self.registry
    }

    pub fn lifecycle(&self) -> &SessionLifecycle {
        &self.lifecycle
    }

    pub fn router(&self) -> &MessageRouter {
        &self.router
    }

    pub fn bridge(&self) -> &CommandBridge {
        &self.bridge
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::connection::test_support::connection;
    use crate::websocket::lifecycle::Role;
    use wattlink_core::DeviceId;

    #[test]
    fn components_share_one_registry() {
        let relay = Relay::in_memory();
        let (device, mut rx) = connection(8);
        let mac = DeviceId::new("AA:BB:CC:DD:EE:FF");
        relay.lifecycle().open(&device, &Role::Device(mac.clone()));
        let _ = rx.try_recv();

        assert!(relay.bridge().is_online("aa:bb:cc:dd:ee:ff"));
        assert!(relay.bridge().send_command("AA:BB:CC:DD:EE:FF", "RELOAD"));
        assert!(rx.try_recv().unwrap().contains("RELOAD"));

        let _ = relay.lifecycle().close(&device, &Role::Device(mac));
        assert!(!relay.bridge().is_online("AA:BB:CC:DD:EE:FF"));
        assert_eq!(relay.registry().device_count(), 0);
    }
}
