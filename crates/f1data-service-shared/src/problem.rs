//! Error bodies in the RFC 9457 problem details format
//! (<https://www.rfc-editor.org/rfc/rfc9457.html>).
//!
//! Every failure the service reports falls into one of four [`ProblemKind`]s.
//! The kind fixes the `type`, `title` and status code; the handler supplies
//! the `detail` and the request ID goes in `instance`.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Serialize, Serializer};

use f1data_lib::Error as LibError;

pub const PROBLEM_INVALID_REQUEST: &str = "/problems/invalid-request";
pub const PROBLEM_NOT_FOUND: &str = "/problems/not-found";
pub const PROBLEM_PROVIDER_ERROR: &str = "/problems/provider-error";
pub const PROBLEM_INTERNAL_ERROR: &str = "/problems/internal-error";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemKind {
    /// Malformed or out-of-range path and query parameters.
    InvalidRequest,
    /// No lap or driver matched the selection.
    NotFound,
    /// The data provider failed: upstream HTTP, cache or missing data.
    ProviderError,
    /// The blocking worker running the provider call did not finish.
    Internal,
}

impl ProblemKind {
    pub fn type_uri(self) -> &'static str {
        match self {
            ProblemKind::InvalidRequest => PROBLEM_INVALID_REQUEST,
            ProblemKind::NotFound => PROBLEM_NOT_FOUND,
            ProblemKind::ProviderError => PROBLEM_PROVIDER_ERROR,
            ProblemKind::Internal => PROBLEM_INTERNAL_ERROR,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ProblemKind::InvalidRequest => "Invalid Request",
            ProblemKind::NotFound => "Not Found",
            ProblemKind::ProviderError => "Provider Error",
            ProblemKind::Internal => "Internal Error",
        }
    }

    pub fn status(self) -> StatusCode {
        match self {
            ProblemKind::InvalidRequest => StatusCode::BAD_REQUEST,
            ProblemKind::NotFound => StatusCode::NOT_FOUND,
            ProblemKind::ProviderError | ProblemKind::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Label value for the `reason` of `f1data_provider_failures_total`.
    pub fn metric_reason(self) -> &'static str {
        match self {
            ProblemKind::InvalidRequest => "invalid_request",
            ProblemKind::NotFound => "not_found",
            ProblemKind::ProviderError => "provider_error",
            ProblemKind::Internal => "internal_error",
        }
    }
}

impl Serialize for ProblemKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.type_uri())
    }
}

/// A problem details body.
///
/// ```
/// use f1data_service_shared::{ProblemDetails, ProblemKind};
///
/// let problem = ProblemDetails::not_found("No data found for driver VER", "req-12345");
/// assert_eq!(problem.kind, ProblemKind::NotFound);
/// assert_eq!(problem.status, 404);
/// ```
#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[error("{title}: {detail}")]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub kind: ProblemKind,
    pub title: &'static str,
    pub status: u16,
    pub detail: String,
    /// The request ID of the failed request.
    pub instance: String,
}

impl ProblemDetails {
    pub fn of(kind: ProblemKind, detail: impl Into<String>, request_id: impl Into<String>) -> Self {
        ProblemDetails {
            kind,
            title: kind.title(),
            status: kind.status().as_u16(),
            detail: detail.into(),
            instance: request_id.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self::of(ProblemKind::InvalidRequest, detail, request_id)
    }

    pub fn not_found(detail: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self::of(ProblemKind::NotFound, detail, request_id)
    }

    /// Detail reads `Failed to fetch <thing>: <error>`.
    pub fn provider_error(
        thing: &str,
        error: impl std::fmt::Display,
        request_id: impl Into<String>,
    ) -> Self {
        Self::of(
            ProblemKind::ProviderError,
            format!("Failed to fetch {thing}: {error}"),
            request_id,
        )
    }

    pub fn internal_error(detail: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self::of(ProblemKind::Internal, detail, request_id)
    }
}

impl IntoResponse for ProblemDetails {
    fn into_response(self) -> Response {
        (
            self.kind.status(),
            [(header::CONTENT_TYPE, "application/problem+json")],
            Json(self),
        )
            .into_response()
    }
}

/// Map a library error to the problem an endpoint reports.
///
/// Lap and driver misses are 404s, an unknown session code is a 400 and
/// everything else is a provider error about `thing` ("drivers",
/// "telemetry", "race calendar", ...).
pub fn from_lib_error(error: &LibError, thing: &str, request_id: &str) -> ProblemDetails {
    match error {
        LibError::LapNotFound {
            driver,
            lap_number: Some(lap),
        } => ProblemDetails::not_found(
            format!("No data found for driver {driver} on lap {lap}"),
            request_id,
        ),
        LibError::LapNotFound { driver, .. } => {
            ProblemDetails::not_found(format!("No data found for driver {driver}"), request_id)
        }
        LibError::DriverNotFound { driver } => ProblemDetails::not_found(
            format!("Driver {driver} not found in this session"),
            request_id,
        ),
        LibError::InvalidSessionType { .. } => {
            ProblemDetails::bad_request(error.to_string(), request_id)
        }
        _ => ProblemDetails::provider_error(thing, error, request_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kinds_carry_status_and_title() {
        let problem = ProblemDetails::bad_request("year must be 1950 or later", "req-123");
        assert_eq!(problem.status, 400);
        assert_eq!(problem.title, "Invalid Request");
        assert_eq!(problem.instance, "req-123");

        let problem = ProblemDetails::internal_error("worker task did not complete", "req-9");
        assert_eq!(problem.kind.type_uri(), PROBLEM_INTERNAL_ERROR);
        assert_eq!(problem.status, 500);
        assert_eq!(problem.to_string(), "Internal Error: worker task did not complete");
    }

    #[test]
    fn body_uses_rfc_field_names() {
        let body = serde_json::to_value(ProblemDetails::not_found("lap 57", "req-abc")).unwrap();
        assert_eq!(
            body,
            json!({
                "type": "/problems/not-found",
                "title": "Not Found",
                "status": 404,
                "detail": "lap 57",
                "instance": "req-abc",
            })
        );
    }

    #[tokio::test]
    async fn response_is_problem_json() {
        let response = ProblemDetails::provider_error("drivers", "connection refused", "req-1")
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/problem+json"
        );

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["detail"], "Failed to fetch drivers: connection refused");
    }

    #[test]
    fn lap_misses_are_not_found() {
        let error = LibError::LapNotFound {
            driver: "VER".to_string(),
            lap_number: Some(99),
        };
        let problem = from_lib_error(&error, "telemetry", "req-lib");
        assert_eq!(problem.kind, ProblemKind::NotFound);
        assert_eq!(problem.detail, "No data found for driver VER on lap 99");

        let error = LibError::DriverNotFound {
            driver: "XYZ".to_string(),
        };
        assert_eq!(from_lib_error(&error, "telemetry", "r").status, 404);
    }

    #[test]
    fn unknown_session_code_is_a_bad_request() {
        let error = LibError::InvalidSessionType {
            code: "FP4".to_string(),
        };
        let problem = from_lib_error(&error, "session data", "req-s");
        assert_eq!(problem.kind.metric_reason(), "invalid_request");
    }

    #[test]
    fn upstream_failures_name_what_was_fetched() {
        let error = LibError::Upstream {
            status: 503,
            url: "https://api.example.test/2023.json".to_string(),
        };
        let problem = from_lib_error(&error, "race calendar", "req-up");
        assert_eq!(problem.kind, ProblemKind::ProviderError);
        assert!(problem.detail.starts_with("Failed to fetch race calendar: "));
    }
}
