//! HTTP API: device bridge, readings and payments.

pub mod data;
pub mod device;
pub mod error;
pub mod payment;

use axum::routing::{get, post};
use axum::Router;

use crate::server::AppState;

pub use error::ApiError;

/// All `/api` routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/device/command", post(device::send_command))
        .route("/api/device/status", get(device::status))
        .route("/api/data", post(data::save_reading))
        .route("/api/data/{esp_mac}", get(data::latest_reading))
        .route("/api/payment/create-order", post(payment::create_order))
        .route("/api/payment/verify", post(payment::verify))
}
