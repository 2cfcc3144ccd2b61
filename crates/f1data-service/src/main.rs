//! f1data HTTP microservice binary.
//!
//! # Configuration
//!
//! - `SERVICE_HOST` - Bind address (default: 0.0.0.0)
//! - `SERVICE_PORT` - HTTP port (default: 8000)
//! - `CORS_ALLOWED_ORIGINS` - Comma-separated browser origins
//! - `F1DATA_CACHE_DIR` - Response cache directory (default: platform cache dir)
//! - `F1DATA_ERGAST_URL` / `F1DATA_OPENF1_URL` - Upstream API base URLs
//! - `RUST_LOG` - Log level (default: info)
//! - `LOG_FORMAT` - Log format: json (default) or text
//! - `METRICS_ENABLED` - Set to `false` to disable Prometheus metrics

use tracing::{error, info};

use f1data_lib::{default_cache_dir, LiveProviderConfig};
use f1data_service::app;
use f1data_service_shared::{
    init_logging, init_metrics, AppState, LoggingConfig, MetricsConfig, ServiceConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logging_config = LoggingConfig::from_env().with_service("f1data");
    init_logging(&logging_config)?;

    let metrics_config = MetricsConfig::from_env();
    if let Err(e) = init_metrics(&metrics_config) {
        tracing::warn!(error = %e, "failed to initialize metrics, continuing without metrics");
    }

    let config = ServiceConfig::from_env();
    let cache_dir = default_cache_dir();
    info!(
        addr = %config.bind_addr(),
        cache_dir = %cache_dir.display(),
        cors_origins = ?config.cors_allowed_origins,
        "starting f1data service"
    );

    let state = AppState::live(LiveProviderConfig::from_env(), Some(&cache_dir)).map_err(|e| {
        error!(error = %e, path = %cache_dir.display(), "failed to initialise application state");
        e
    })?;

    let router = app(state, &config);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, router).await?;

    Ok(())
}
