//! Prometheus export.
//!
//! HTTP series (written by [`crate::middleware::ObservabilityLayer`]):
//!
//! | name | kind | labels |
//! |---|---|---|
//! | `http_requests_total` | counter | method, path, status |
//! | `http_request_duration_seconds` | histogram | method, path |
//! | `http_response_size_bytes` | histogram | method, path |
//!
//! Provider series (written by the handlers):
//!
//! | name | kind | labels |
//! |---|---|---|
//! | `f1data_provider_calls_total` | counter | operation |
//! | `f1data_provider_call_duration_seconds` | histogram | operation |
//! | `f1data_provider_failures_total` | counter | operation, reason |
//! | `f1data_season_events_skipped_total` | counter | aggregate |
//! | `f1data_rows_returned` | histogram | operation |
//!
//! ```no_run
//! use axum::{routing::get, Router};
//! use f1data_service_shared::metrics::{init_metrics, metrics_handler, MetricsConfig};
//!
//! init_metrics(&MetricsConfig::from_env()).expect("recorder installed once");
//! let app: Router = Router::new().route("/metrics", get(metrics_handler));
//! ```

use std::time::Duration;

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

static RECORDER: OnceCell<PrometheusHandle> = OnceCell::new();

/// Cold-cache provider calls fan out to several upstream requests, so the
/// latency buckets reach well past the exporter's 10 s default.
const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.025, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        MetricsConfig { enabled: true }
    }
}

impl MetricsConfig {
    /// `METRICS_ENABLED=false` (any case) turns the exporter off.
    pub fn from_env() -> Self {
        let disabled = std::env::var("METRICS_ENABLED")
            .is_ok_and(|value| value.trim().eq_ignore_ascii_case("false"));
        MetricsConfig { enabled: !disabled }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetricsError {
    #[error("metrics are disabled")]
    Disabled,
    #[error("metrics recorder already initialized")]
    AlreadyInitialized,
    #[error("failed to install metrics recorder: {0}")]
    InstallFailed(String),
}

/// Install the global Prometheus recorder.
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        return Err(MetricsError::Disabled);
    }
    if RECORDER.get().is_some() {
        return Err(MetricsError::AlreadyInitialized);
    }

    let install_failed = |e: metrics_exporter_prometheus::BuildError| {
        MetricsError::InstallFailed(e.to_string())
    };
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Suffix("duration_seconds".to_string()), LATENCY_BUCKETS)
        .map_err(install_failed)?
        .install_recorder()
        .map_err(install_failed)?;

    RECORDER
        .set(handle)
        .map_err(|_| MetricsError::AlreadyInitialized)
}

/// `GET /metrics`. Renders a comment line when no recorder is installed.
pub async fn metrics_handler() -> String {
    match RECORDER.get() {
        Some(handle) => handle.render(),
        None => "# Metrics not initialized\n".to_string(),
    }
}

fn status_class(status: Option<u16>) -> &'static str {
    match status.map(|code| code / 100) {
        Some(2) => "2xx",
        Some(3) => "3xx",
        Some(4) => "4xx",
        // A failed inner service never produced a response; count it as 5xx.
        Some(5) | None => "5xx",
        Some(_) => "other",
    }
}

/// One finished HTTP exchange. `status` is `None` when the inner service
/// returned an error instead of a response.
pub fn record_http_request(
    method: &str,
    route: &'static str,
    status: Option<u16>,
    elapsed: Duration,
    body_bytes: Option<u64>,
) {
    let method = method.to_string();

    metrics::counter!(
        "http_requests_total",
        "method" => method.clone(),
        "path" => route,
        "status" => status_class(status)
    )
    .increment(1);
    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.clone(),
        "path" => route
    )
    .record(elapsed);
    if let Some(bytes) = body_bytes {
        metrics::histogram!("http_response_size_bytes", "method" => method, "path" => route)
            .record(bytes as f64);
    }
}

/// A provider call that returned data. `operation` names the endpoint, e.g.
/// `"telemetry"` or `"team_analysis"`.
pub fn record_provider_call(operation: &str, elapsed: Duration) {
    let operation = operation.to_string();
    metrics::counter!("f1data_provider_calls_total", "operation" => operation.clone()).increment(1);
    metrics::histogram!("f1data_provider_call_duration_seconds", "operation" => operation)
        .record(elapsed);
}

/// `reason` mirrors the problem type: `not_found`, `invalid_request`,
/// `provider_error` or `internal_error`.
pub fn record_provider_failure(operation: &str, reason: &str) {
    metrics::counter!(
        "f1data_provider_failures_total",
        "operation" => operation.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

pub fn record_events_skipped(aggregate: &str, count: usize) {
    if count > 0 {
        metrics::counter!(
            "f1data_season_events_skipped_total",
            "aggregate" => aggregate.to_string()
        )
        .increment(count as u64);
    }
}

pub fn record_rows_returned(operation: &str, rows: usize) {
    metrics::histogram!("f1data_rows_returned", "operation" => operation.to_string())
        .record(rows as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabled_unless_switched_off() {
        assert!(MetricsConfig::default().enabled);
        assert_eq!(
            init_metrics(&MetricsConfig { enabled: false }),
            Err(MetricsError::Disabled)
        );
    }

    #[test]
    fn status_classes() {
        assert_eq!(status_class(Some(200)), "2xx");
        assert_eq!(status_class(Some(304)), "3xx");
        assert_eq!(status_class(Some(422)), "4xx");
        assert_eq!(status_class(Some(503)), "5xx");
        assert_eq!(status_class(None), "5xx");
        assert_eq!(status_class(Some(102)), "other");
    }

    #[tokio::test]
    async fn handler_output_is_exposition_text() {
        let body = metrics_handler().await;
        assert!(body.is_empty() || body.contains('#') || body.contains("_total"));
    }

    #[test]
    fn recording_without_a_recorder_is_a_no_op() {
        let elapsed = Duration::from_millis(3);
        record_http_request("GET", "/drivers/{year}", Some(200), elapsed, Some(512));
        record_http_request("GET", "other", None, Duration::ZERO, None);
        record_provider_call("drivers", Duration::from_millis(12));
        record_provider_failure("telemetry", "not_found");
        record_events_skipped("driver_performance", 2);
        record_events_skipped("team_analysis", 0);
        record_rows_returned("lap_times", 1200);
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            MetricsError::AlreadyInitialized.to_string(),
            "metrics recorder already initialized"
        );
        assert!(MetricsError::InstallFailed("port in use".into())
            .to_string()
            .ends_with("port in use"));
    }
}
