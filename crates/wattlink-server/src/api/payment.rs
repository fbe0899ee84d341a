//! Payment order creation and verified wallet recharge.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use wattlink_payments::PaymentError;

use super::error::ApiError;
use crate::server::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub receipt: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub razorpay_order_id: Option<String>,
    #[serde(default)]
    pub razorpay_payment_id: Option<String>,
    #[serde(default)]
    pub razorpay_signature: Option<String>,
}

/// Accepts JSON numbers and numeric strings.
fn parse_amount(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

/// POST /api/payment/create-order
pub async fn create_order(
    State(state): State<AppState>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Json<Value>, ApiError> {
    let amount = match req.amount.as_ref().filter(|v| !v.is_null()) {
        None => return Err(ApiError::bad_request("amount_missing")),
        Some(v) => parse_amount(v).ok_or_else(|| ApiError::bad_request("amount_invalid"))?,
    };
    let order = state
        .payments
        .order_request(amount, req.currency.as_deref(), req.receipt.as_deref())
        .map_err(|_| ApiError::bad_request("amount_invalid"))?;

    match state.payments.create_order(&order).await {
        Ok(created) => Ok(Json(created)),
        Err(e) => {
            warn!(error = %e, "order creation failed");
            Err(ApiError::internal("order_creation_failed", e))
        }
    }
}

/// POST /api/payment/verify
pub async fn verify(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<Value>, ApiError> {
    let Some(username) = non_blank(req.username.as_ref()) else {
        return Err(ApiError::bad_request("username_missing"));
    };
    let (Some(order_id), Some(payment_id), Some(signature)) = (
        non_blank(req.razorpay_order_id.as_ref()),
        non_blank(req.razorpay_payment_id.as_ref()),
        non_blank(req.razorpay_signature.as_ref()),
    ) else {
        return Err(ApiError::bad_request("missing_payment_fields"));
    };

    if !state.payments.verify_signature(order_id, payment_id, signature) {
        warn!(username, order_id, payment_id, "payment signature mismatch");
        return Err(ApiError::BadRequest(json!({ "status": "verification_failed" })));
    }

    let Some(amount) = req.amount.as_ref().and_then(parse_amount) else {
        return Err(ApiError::bad_request("amount_missing"));
    };

    match state.payments.recharge(username, amount).await {
        Ok(Some(body)) => {
            info!(username, order_id, amount, "wallet recharged");
            Ok(Json(body))
        }
        Ok(None) => {
            info!(username, order_id, amount, "wallet recharged");
            Ok(Json(json!({ "status": "recharged" })))
        }
        Err(PaymentError::Status { status, .. }) => Err(ApiError::Internal(
            json!({ "status": "recharge_failed", "code": status }),
        )),
        Err(e) => Err(ApiError::internal("verification_error", e)),
    }
}
