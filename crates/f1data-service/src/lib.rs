//! F1 data HTTP microservice.
//!
//! Re-exposes session results, lap timing, car telemetry, standings and the
//! season schedule as JSON for a separate backend service. All data access
//! goes through the [`f1data_lib::DataProvider`] held in [`AppState`].
//!
//! # Endpoints
//!
//! - `GET /` - Service descriptor
//! - `GET /health` - Health and provider identity
//! - `GET /drivers/{year}` - Season line-up
//! - `GET /telemetry/{year}/{round}/{driver}` - Car telemetry for one lap
//! - `GET /lap-times/{year}/{round}` - Race lap times
//! - `GET /session/{year}/{round}/{session_type}` - Session results
//! - `GET /championship-standings/{year}` - Driver and constructor standings
//! - `GET /driver-performance/{year}` - Per-race driver performance
//! - `GET /race-calendar/{year}` - Event schedule
//! - `GET /team-analysis/{year}` - Per-team season aggregates
//! - `GET /metrics` - Prometheus metrics endpoint

#![deny(warnings)]

pub mod handlers;
pub mod models;

use axum::{routing::get, Router};

use f1data_service_shared::{health, metrics_handler, AppState, ObservabilityLayer, ServiceConfig};

/// Build the application router with CORS and request metrics applied.
pub fn app(state: AppState, config: &ServiceConfig) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(health))
        .route("/drivers/{year}", get(handlers::drivers))
        .route("/telemetry/{year}/{round}/{driver}", get(handlers::telemetry))
        .route("/lap-times/{year}/{round}", get(handlers::lap_times))
        .route("/session/{year}/{round}/{session_type}", get(handlers::session))
        .route(
            "/championship-standings/{year}",
            get(handlers::championship_standings),
        )
        .route(
            "/driver-performance/{year}",
            get(handlers::driver_performance_handler),
        )
        .route("/race-calendar/{year}", get(handlers::race_calendar))
        .route("/team-analysis/{year}", get(handlers::team_analysis_handler))
        .route("/metrics", get(metrics_handler))
        .layer(config.cors_layer())
        .layer(ObservabilityLayer)
        .with_state(state)
}
