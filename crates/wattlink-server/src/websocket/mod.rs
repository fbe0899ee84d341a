//! WebSocket relay: connections, registry, lifecycle, routing and sessions.

pub mod broadcast;
pub mod connection;
pub mod lifecycle;
pub mod registry;
pub mod router;
pub mod session;
