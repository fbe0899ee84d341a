//! # wattlink-server
//!
//! The relay core and its network surface:
//!
//! - [`websocket::registry`]: live device and observer connections
//! - [`websocket::lifecycle`]: classify, register and tear down connections
//! - [`websocket::router`]: role-aware routing and observer fan-out
//! - [`bridge`]: HTTP-to-device command delivery
//! - [`api`]: device, readings and payment HTTP endpoints
//! - [`server`]: axum router, startup and graceful shutdown

#![deny(unsafe_code)]

pub mod api;
pub mod bridge;
pub mod config;
pub mod health;
pub mod relay;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use bridge::CommandBridge;
pub use config::ServerConfig;
pub use relay::Relay;
pub use server::{build_router, start, AppState, ServerDeps, ServerHandle};
