//! Bill prediction derived from a device's latest reading.

use serde::{Deserialize, Serialize};

use crate::reading::Reading;

/// Tariff parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BillingRates {
    /// Rupees per unit of energy.
    pub rate_per_unit: f64,
    /// Multiplier applied to current usage to estimate the peak.
    pub peak_factor: f64,
}

impl Default for BillingRates {
    fn default() -> Self {
        Self {
            rate_per_unit: 5.0,
            peak_factor: 1.2,
        }
    }
}

/// Response body for the latest-reading query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingSummary {
    pub voltage: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    /// Dashboards read this as the live current draw; devices report it as energy usage.
    pub current: f64,
    pub energy_usage: f64,
    pub predicted_bill_rs: f64,
    pub peak_usage_w: f64,
    pub tamper_alert_flag: bool,
}

impl ReadingSummary {
    pub fn from_reading(reading: &Reading, rates: &BillingRates) -> Self {
        let energy = reading.energy_usage.unwrap_or(0.0);
        Self {
            voltage: reading.voltage,
            temperature: reading.temperature,
            humidity: reading.humidity,
            current: energy,
            energy_usage: energy,
            predicted_bill_rs: energy * rates.rate_per_unit,
            peak_usage_w: energy * rates.peak_factor,
            // No tamper detection exists on the device side yet.
            tamper_alert_flag: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::DeviceId;
    use chrono::Utc;

    fn reading(energy: Option<f64>) -> Reading {
        Reading {
            id: 1,
            esp_mac: DeviceId::new("aa:bb"),
            temperature: Some(27.5),
            humidity: Some(61.0),
            voltage: Some(230.1),
            energy_usage: energy,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn default_rates() {
        let rates = BillingRates::default();
        assert_eq!(rates.rate_per_unit, 5.0);
        assert_eq!(rates.peak_factor, 1.2);
    }

    #[test]
    fn predicts_bill_and_peak() {
        let summary = ReadingSummary::from_reading(&reading(Some(10.0)), &BillingRates::default());
        assert_eq!(summary.energy_usage, 10.0);
        assert_eq!(summary.current, 10.0);
        assert_eq!(summary.predicted_bill_rs, 50.0);
        assert!((summary.peak_usage_w - 12.0).abs() < 1e-9);
        assert!(!summary.tamper_alert_flag);
        assert_eq!(summary.voltage, Some(230.1));
    }

    #[test]
    fn missing_energy_counts_as_zero() {
        let summary = ReadingSummary::from_reading(&reading(None), &BillingRates::default());
        assert_eq!(summary.energy_usage, 0.0);
        assert_eq!(summary.predicted_bill_rs, 0.0);
        assert_eq!(summary.peak_usage_w, 0.0);
    }

    #[test]
    fn custom_rates() {
        let rates = BillingRates {
            rate_per_unit: 7.5,
            peak_factor: 2.0,
        };
        let summary = ReadingSummary::from_reading(&reading(Some(2.0)), &rates);
        assert_eq!(summary.predicted_bill_rs, 15.0);
        assert_eq!(summary.peak_usage_w, 4.0);
    }

    #[test]
    fn summary_field_names() {
        let summary = ReadingSummary::from_reading(&reading(Some(1.0)), &BillingRates::default());
        let value = serde_json::to_value(&summary).unwrap();
        for key in [
            "voltage",
            "temperature",
            "humidity",
            "current",
            "energyUsage",
            "predictedBillRs",
            "peakUsageW",
            "tamperAlertFlag",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }
}
