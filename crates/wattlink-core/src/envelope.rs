//! Wire envelope shared by devices, observers and the server.
//!
//! Every frame is a JSON object with a `type` discriminant. Field names are
//! part of the device firmware and UI contract and must not change.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::DeviceId;

pub const TYPE_FIELD: &str = "type";
pub const MAC_FIELD: &str = "mac";
pub const SERVER_TS_FIELD: &str = "serverTs";

/// Messages originated by the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OutboundMessage {
    /// Acknowledges a device registration.
    Registered { mac: DeviceId },
    /// Acknowledges an observer registration.
    UiRegistered,
    /// Reply to an observer's `ui-register`; `mac` is empty when none was given.
    UiAck { mac: String },
    DeviceConnected { mac: DeviceId },
    DeviceDisconnected { mac: DeviceId },
    /// Command delivered to a device through the HTTP bridge.
    Command { command: String },
}

impl OutboundMessage {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Inbound message types the relay acts on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundKind {
    Data,
    Heartbeat,
    CommandResponse,
    UiRegister,
    Unknown(String),
}

impl InboundKind {
    pub fn from_type(ty: &str) -> Self {
        match ty {
            "data" => Self::Data,
            "heartbeat" => Self::Heartbeat,
            "commandResponse" => Self::CommandResponse,
            "ui-register" => Self::UiRegister,
            other => Self::Unknown(other.to_string()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("message is not a JSON object")]
    NotAnObject,
}

/// A parsed inbound frame. Unknown fields are kept so telemetry is relayed intact.
#[derive(Clone, Debug, PartialEq)]
pub struct InboundMessage {
    fields: Map<String, Value>,
}

impl InboundMessage {
    pub fn parse(text: &str) -> Result<Self, EnvelopeError> {
        match serde_json::from_str::<Value>(text)? {
            Value::Object(fields) => Ok(Self { fields }),
            _ => Err(EnvelopeError::NotAnObject),
        }
    }

    /// The `type` discriminant, or `""` when absent or not a string.
    pub fn message_type(&self) -> &str {
        self.str_field(TYPE_FIELD).unwrap_or("")
    }

    pub fn kind(&self) -> InboundKind {
        InboundKind::from_type(self.message_type())
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Add server-side metadata, overwriting whatever the sender supplied.
    pub fn stamp(&mut self, mac: &DeviceId, server_ts_millis: i64) {
        let _ = self
            .fields
            .insert(SERVER_TS_FIELD.to_string(), Value::from(server_ts_millis));
        let _ = self
            .fields
            .insert(MAC_FIELD.to_string(), Value::from(mac.as_str()));
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.fields)
    }
}
