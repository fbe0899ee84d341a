//! Server configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use wattlink_settings::ServerSettings;

/// Runtime configuration for the relay server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind (`0` for auto-assign).
    pub port: u16,
    /// Outbound frames buffered per connection before writes are rejected.
    pub max_send_queue: usize,
    /// Interval between server-initiated Ping frames.
    pub heartbeat_interval_secs: u64,
    /// Close connections silent for longer than this.
    pub heartbeat_timeout_secs: u64,
    /// Allowed CORS origins for the HTTP API. Empty means any origin.
    pub cors_origins: Vec<String>,
    /// Per-request timeout for the HTTP API.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            max_send_queue: 256,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            cors_origins: Vec::new(),
            request_timeout_secs: 60,
        }
    }
}

impl ServerConfig {
    pub fn from_settings(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            max_send_queue: settings.max_send_queue,
            heartbeat_interval_secs: settings.heartbeat_interval_secs,
            heartbeat_timeout_secs: settings.heartbeat_timeout_secs,
            cors_origins: settings.cors_origins.clone(),
            ..Self::default()
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            max_send_queue: self.max_send_queue.max(1),
            heartbeat_interval: Duration::from_secs(self.heartbeat_interval_secs.max(1)),
            heartbeat_timeout: Duration::from_secs(self.heartbeat_timeout_secs.max(1)),
        }
    }
}

/// Per-connection limits derived from [`ServerConfig`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub max_send_queue: usize,
    pub heartbeat_interval: Duration,
    pub heartbeat_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        ServerConfig::default().session()
    }
}
