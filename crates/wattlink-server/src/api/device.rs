//! Device command bridge and presence endpoints.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::error::ApiError;
use crate::server::AppState;
use wattlink_core::DeviceId;

#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub mac: String,
}

#[derive(Debug, Serialize)]
pub struct DeviceStatus {
    pub mac: DeviceId,
    pub connected: bool,
}

/// POST /api/device/command
pub async fn send_command(
    State(state): State<AppState>,
    Json(req): Json<CommandRequest>,
) -> Result<Json<Value>, ApiError> {
    let Some(command) = req.command.filter(|c| !c.is_empty()) else {
        return Err(ApiError::bad_request("command_missing"));
    };
    let mac = req.mac.unwrap_or_default();
    if state.relay.bridge().send_command(&mac, &command) {
        Ok(Json(json!({ "status": "sent" })))
    } else {
        Err(ApiError::ServiceUnavailable(
            json!({ "status": "device-offline" }),
        ))
    }
}

/// GET /api/device/status?mac=
pub async fn status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Json<DeviceStatus> {
    let mac = DeviceId::new(&query.mac);
    let connected = state.relay.bridge().is_online(mac.as_str());
    Json(DeviceStatus { mac, connected })
}
