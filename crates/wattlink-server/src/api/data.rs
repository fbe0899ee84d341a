//! Reading ingestion and the billing summary for a device's latest reading.

use axum::extract::{Path, State};
use axum::Json;
use metrics::counter;
use tracing::info;
use wattlink_core::{DeviceId, NewReading, ReadingSummary};
use wattlink_telemetry::metrics::READINGS_SAVED_TOTAL;

use super::error::ApiError;
use crate::server::AppState;

/// POST /api/data
pub async fn save_reading(
    State(state): State<AppState>,
    Json(reading): Json<NewReading>,
) -> Result<&'static str, ApiError> {
    if reading.esp_mac.is_empty() {
        return Err(ApiError::bad_request("esp_mac_missing"));
    }
    let repo = state.readings.clone();
    let saved = tokio::task::spawn_blocking(move || repo.save(&reading))
        .await
        .map_err(|e| ApiError::internal("storage_error", e))??;

    counter!(READINGS_SAVED_TOTAL).increment(1);
    info!(esp_mac = %saved.esp_mac, id = saved.id, "reading saved");
    Ok("ESP data saved successfully")
}

/// GET /api/data/{esp_mac}
pub async fn latest_reading(
    State(state): State<AppState>,
    Path(esp_mac): Path<String>,
) -> Result<Json<ReadingSummary>, ApiError> {
    let device = DeviceId::new(&esp_mac);
    let repo = state.readings.clone();
    let latest = tokio::task::spawn_blocking(move || repo.latest_for_device(&device))
        .await
        .map_err(|e| ApiError::internal("storage_error", e))??;

    match latest {
        Some(reading) => Ok(Json(ReadingSummary::from_reading(&reading, &state.billing))),
        None => Err(ApiError::NotFound(format!(
            "No data found for ESP MAC: {esp_mac}"
        ))),
    }
}
