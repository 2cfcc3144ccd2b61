//! HTTP plumbing for the f1data service. Data access and season aggregates
//! live in `f1data-lib`; handlers here only validate parameters, call the
//! provider on the blocking pool and shape the JSON.
//!
//! | item | role |
//! |---|---|
//! | [`AppState`] | provider handle passed to every handler |
//! | [`ProblemDetails`] | `application/problem+json` error bodies |
//! | [`ObservabilityLayer`] | request IDs, request spans, HTTP metrics |
//! | [`ServiceConfig`] | bind address and CORS origins |
//! | [`metrics`], [`logging`] | Prometheus recorder and tracing subscriber |
//! | [`SeasonPath`], [`TelemetryPath`], ... | extractor types with [`Validate`] |
//!
//! With the `test-utils` feature, `test_utils` exposes an in-memory
//! provider holding a small 2023 season.

#![deny(warnings)]

pub mod config;
mod health;
pub mod logging;
pub mod metrics;
pub mod middleware;
mod problem;
mod request;
mod state;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::ServiceConfig;
pub use health::{health, HealthStatus};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use metrics::{
    init_metrics, metrics_handler, record_events_skipped, record_http_request, record_provider_call,
    record_provider_failure, record_rows_returned, MetricsConfig, MetricsError,
};
pub use middleware::{extract_or_generate_request_id, route_label, ObservabilityLayer, RequestId};
pub use problem::{
    from_lib_error, ProblemDetails, ProblemKind, PROBLEM_INTERNAL_ERROR, PROBLEM_INVALID_REQUEST,
    PROBLEM_NOT_FOUND, PROBLEM_PROVIDER_ERROR,
};
pub use request::{
    latest_season, LapTimesQuery, RoundPath, SeasonPath, SessionPath, TelemetryPath,
    TelemetryQuery, Validate, FIRST_SEASON,
};
pub use state::{AppState, AppStateError};
