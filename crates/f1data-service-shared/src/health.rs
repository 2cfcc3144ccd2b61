//! `GET /health` handler.
//!
//! Reports liveness together with the provider identity. It never calls the
//! provider, so it stays cheap and works while upstream APIs are down.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Health status response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    /// Always "healthy" while the process serves requests.
    pub status: String,

    /// Name of the configured data provider.
    pub provider: String,

    /// Version of the configured data provider.
    pub provider_version: String,
}

impl HealthStatus {
    pub fn healthy(provider: &str, provider_version: &str) -> Self {
        Self {
            status: "healthy".to_string(),
            provider: provider.to_string(),
            provider_version: provider_version.to_string(),
        }
    }
}

/// Health handler.
///
/// ```text
/// GET /health
/// {"status":"healthy","provider":"f1data-live","provider_version":"0.1.0"}
/// ```
pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus::healthy(
        state.provider_name(),
        state.provider_version(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FixtureProvider;

    #[test]
    fn test_health_status_healthy() {
        let status = HealthStatus::healthy("f1data-live", "0.1.0");
        assert_eq!(status.status, "healthy");
        assert_eq!(status.provider, "f1data-live");
        assert_eq!(status.provider_version, "0.1.0");
    }

    #[test]
    fn test_health_status_serialization() {
        let json = serde_json::to_string(&HealthStatus::healthy("fixture", "1.2.3")).unwrap();
        assert_eq!(
            json,
            r#"{"status":"healthy","provider":"fixture","provider_version":"1.2.3"}"#
        );
    }

    #[tokio::test]
    async fn test_health_handler_reports_provider() {
        let state = AppState::from_provider(FixtureProvider::new());
        let Json(status) = health(State(state)).await;
        assert_eq!(status.provider, "fixture");
    }
}
