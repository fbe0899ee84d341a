//! `/health` endpoint.

use std::time::Instant;

use serde::Serialize;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    pub uptime_secs: u64,
    /// Devices currently registered.
    pub devices: usize,
    /// Observers currently registered.
    pub observers: usize,
}

pub fn health_check(start_time: Instant, devices: usize, observers: usize) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        devices,
        observers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_ok() {
        let resp = health_check(Instant::now(), 0, 0);
        assert_eq!(resp.status, "ok");
        assert!(resp.uptime_secs < 2);
    }

    #[test]
    fn uptime_increases() {
        let start = Instant::now()
            .checked_sub(std::time::Duration::from_secs(60))
            .unwrap();
        assert!(health_check(start, 0, 0).uptime_secs >= 59);
    }

    #[test]
    fn serializes_counts() {
        let json = serde_json::to_value(health_check(Instant::now(), 3, 2)).unwrap();
        assert_eq!(json["devices"], 3);
        assert_eq!(json["observers"], 2);
        assert!(json["uptime_secs"].is_number());
    }
}
