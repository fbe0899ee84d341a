//! Settings schema. JSON keys are camelCase.

use std::path::PathBuf;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use wattlink_core::BillingRates;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WattlinkSettings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub billing: BillingRates,
    pub payments: PaymentSettings,
    pub logging: LoggingSettings,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Outbound queue depth per connection before frames are dropped.
    pub max_send_queue: usize,
    pub heartbeat_interval_secs: u64,
    /// Connections silent for longer than this are closed.
    pub heartbeat_timeout_secs: u64,
    /// Allowed CORS origins for the HTTP API. Empty means any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            max_send_queue: 256,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            cors_origins: vec![
                "http://127.0.0.1:5500".into(),
                "http://localhost:5500".into(),
            ],
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSettings {
    pub db_path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            db_path: wattlink_home().join("database").join("readings.db"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentSettings {
    pub key_id: String,
    /// Never written back out; supply via the settings file or `RAZORPAY_KEY_SECRET`.
    #[serde(skip_serializing, deserialize_with = "deserialize_secret")]
    pub key_secret: SecretString,
    pub api_base_url: String,
    /// Wallet service endpoint credited after a verified payment.
    pub recharge_url: String,
    pub default_currency: String,
    pub request_timeout_secs: u64,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            key_id: String::new(),
            key_secret: SecretString::from(String::new()),
            api_base_url: "https://api.razorpay.com/v1".into(),
            recharge_url: "http://127.0.0.1:8090/api/user/recharge".into(),
            default_currency: "INR".into(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default level; `RUST_LOG` wins when set.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> std::result::Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

/// `~/.wattlink`, falling back to `/tmp/.wattlink` without a home directory.
pub fn wattlink_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
        .join(".wattlink")
}
