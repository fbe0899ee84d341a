//! HTTP client for the payment provider and the wallet recharge service.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};
use wattlink_settings::PaymentSettings;

use crate::error::PaymentError;
use crate::signature;

/// Order creation request in the provider's wire format.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CreateOrder {
    /// Minor currency units (paise for INR).
    pub amount: u64,
    pub currency: String,
    pub receipt: String,
}

/// Convert a major-unit amount to minor units, rounding to the nearest unit.
pub fn to_minor_units(amount: f64) -> Result<u64, PaymentError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(PaymentError::InvalidAmount(format!(
            "amount must be a positive number, got {amount}"
        )));
    }
    Ok((amount * 100.0).round() as u64)
}

#[derive(Clone)]
pub struct PaymentClient {
    client: reqwest::Client,
    key_id: String,
    key_secret: SecretString,
    api_base_url: String,
    recharge_url: String,
    default_currency: String,
}

impl PaymentClient {
    pub fn from_settings(settings: &PaymentSettings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .user_agent(concat!("wattlink/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "payment http client build failed, using defaults");
                reqwest::Client::default()
            });

        if settings.key_id.is_empty() {
            warn!("payment key id is not configured; order creation will be rejected upstream");
        }

        Self {
            client,
            key_id: settings.key_id.clone(),
            key_secret: settings.key_secret.clone(),
            api_base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            recharge_url: settings.recharge_url.clone(),
            default_currency: settings.default_currency.clone(),
        }
    }

    /// Build an order request, defaulting currency and receipt when absent.
    pub fn order_request(
        &self,
        amount: f64,
        currency: Option<&str>,
        receipt: Option<&str>,
    ) -> Result<CreateOrder, PaymentError> {
        let currency = currency
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(&self.default_currency)
            .to_string();
        let receipt = receipt
            .filter(|r| !r.trim().is_empty())
            .map(String::from)
            .unwrap_or_else(|| format!("rcpt_{}", chrono::Utc::now().timestamp_millis()));
        Ok(CreateOrder {
            amount: to_minor_units(amount)?,
            currency,
            receipt,
        })
    }

    /// Create an order with the provider, returning its JSON body unchanged.
    #[instrument(skip(self), fields(amount = order.amount, currency = %order.currency))]
    pub async fn create_order(&self, order: &CreateOrder) -> Result<Value, PaymentError> {
        let url = format!("{}/orders", self.api_base_url);
        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(self.key_secret.expose_secret()))
            .json(order)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "order creation rejected");
            return Err(PaymentError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let order: Value =
            serde_json::from_str(&body).map_err(|e| PaymentError::Decode(e.to_string()))?;
        info!(order_id = order.get("id").and_then(serde_json::Value::as_str).unwrap_or(""), "order created");
        Ok(order)
    }

    /// Check a checkout signature against the configured key secret.
    pub fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        signature::verify_signature(
            self.key_secret.expose_secret(),
            order_id,
            payment_id,
            signature,
        )
    }

    /// Credit `amount` to `username` at the wallet service.
    ///
    /// Returns the service's JSON body, a JSON string for a non-JSON body,
    /// or `None` when the body is empty.
    #[instrument(skip(self))]
    pub async fn recharge(&self, username: &str, amount: f64) -> Result<Option<Value>, PaymentError> {
        let resp = self
            .client
            .post(&self.recharge_url)
            .json(&json!({ "username": username, "amount": amount }))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "recharge rejected by wallet service");
            return Err(PaymentError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(status = status.as_u16(), "recharge accepted");
        if body.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(
            serde_json::from_str(&body).unwrap_or(Value::String(body)),
        ))
    }
}

impl std::fmt::Debug for PaymentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentClient")
            .field("key_id", &self.key_id)
            .field("api_base_url", &self.api_base_url)
            .field("recharge_url", &self.recharge_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> PaymentClient {
        let settings = PaymentSettings {
            key_id: "rzp_test_key".into(),
            key_secret: SecretString::from("rzp_test_secret".to_string()),
            api_base_url: format!("{}/v1/", server.uri()),
            recharge_url: format!("{}/api/user/recharge", server.uri()),
            ..PaymentSettings::default()
        };
        PaymentClient::from_settings(&settings)
    }

    #[tokio::test]
    async fn configured_user_agent_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/user/recharge"))
            .and(header("user-agent", concat!("wattlink/", env!("CARGO_PKG_VERSION"))))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let body = client_for(&server).recharge("alice", 1.0).await.unwrap();
        assert!(body.is_none());
    }

    #[test]
    fn minor_units_round() {
        assert_eq!(to_minor_units(499.0).unwrap(), 49_900);
        assert_eq!(to_minor_units(10.25).unwrap(), 1_025);
        assert_eq!(to_minor_units(0.1).unwrap(), 10);
    }

    #[test]
    fn minor_units_reject_non_positive() {
        assert!(matches!(
            to_minor_units(0.0),
            Err(PaymentError::InvalidAmount(_))
        ));
        assert!(to_minor_units(-5.0).is_err());
        assert!(to_minor_units(f64::NAN).is_err());
    }

    #[tokio::test]
    async fn order_request_defaults() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        let order = client.order_request(100.0, None, None).unwrap();
        assert_eq!(order.amount, 10_000);
        assert_eq!(order.currency, "INR");
        assert!(order.receipt.starts_with("rcpt_"));

        let order = client
            .order_request(2.5, Some("USD"), Some("r-42"))
            .unwrap();
        assert_eq!(order.currency, "USD");
        assert_eq!(order.receipt, "r-42");
    }

    #[tokio::test]
    async fn create_order_posts_minor_units_with_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/orders"))
            .and(header_exists("authorization"))
            .and(body_json(json!({"amount": 25_000, "currency": "INR", "receipt": "r1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "order_Abc123",
                "entity": "order",
                "amount": 25_000,
                "currency": "INR",
                "status": "created"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let order = client.order_request(250.0, None, Some("r1")).unwrap();
        let created = client.create_order(&order).await.unwrap();
        assert_eq!(created["id"], "order_Abc123");
        assert_eq!(created["status"], "created");
    }

    #[tokio::test]
    async fn create_order_surfaces_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/orders"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let order = client.order_request(1.0, None, None).unwrap();
        let err = client.create_order(&order).await.unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert!(err.to_string().contains("bad credentials"));
    }

    #[tokio::test]
    async fn recharge_returns_service_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/user/recharge"))
            .and(body_json(json!({"username": "alice", "amount": 150.0})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"balance": 350.0})),
            )
            .mount(&server)
            .await;

        let body = client_for(&server).recharge("alice", 150.0).await.unwrap();
        assert_eq!(body, Some(json!({"balance": 350.0})));
    }

    #[tokio::test]
    async fn recharge_empty_body_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/user/recharge"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let body = client_for(&server).recharge("bob", 10.0).await.unwrap();
        assert!(body.is_none());
    }

    #[tokio::test]
    async fn recharge_non_success_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/user/recharge"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = client_for(&server).recharge("carol", 5.0).await.unwrap_err();
        assert_eq!(err.status(), Some(502));
    }

    #[tokio::test]
    async fn verify_uses_configured_secret() {
        let server = MockServer::start().await;
        let client = client_for(&server);
        let sig = signature::compute_signature("rzp_test_secret", "order_1", "pay_1");
        assert!(client.verify_signature("order_1", "pay_1", &sig));
        assert!(!client.verify_signature("order_1", "pay_2", &sig));
    }

    #[test]
    fn debug_hides_secret() {
        let settings = PaymentSettings {
            key_secret: SecretString::from("hunter2".to_string()),
            ..PaymentSettings::default()
        };
        let rendered = format!("{:?}", PaymentClient::from_settings(&settings));
        assert!(!rendered.contains("hunter2"));
    }
}
