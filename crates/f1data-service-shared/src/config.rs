//! Service configuration read from the environment.
//!
//! - `SERVICE_HOST`: bind address (default `0.0.0.0`)
//! - `SERVICE_PORT`: HTTP port (default `8000`)
//! - `CORS_ALLOWED_ORIGINS`: comma-separated origins allowed to call the API
//!   with credentials (default `http://localhost:3000,http://localhost:3001`)

use axum::http::HeaderValue;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_CORS_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:3001"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cors_allowed_origins: DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = std::env::var("SERVICE_HOST")
            .ok()
            .filter(|h| !h.trim().is_empty())
            .unwrap_or(defaults.host);

        let port = match std::env::var("SERVICE_PORT") {
            Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(
                    value = %raw,
                    default = DEFAULT_PORT,
                    "invalid SERVICE_PORT, using default"
                );
                DEFAULT_PORT
            }),
            Err(_) => defaults.port,
        };

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .map(|raw| parse_origins(&raw))
            .unwrap_or(defaults.cors_allowed_origins);

        Self {
            host,
            port,
            cors_allowed_origins,
        }
    }

    /// `host:port` string suitable for `TcpListener::bind`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// CORS policy for the configured origins.
    ///
    /// Credentials are allowed, so methods and headers mirror the preflight
    /// request instead of using a `*` wildcard.
    pub fn cors_layer(&self) -> CorsLayer {
        let origins: Vec<HeaderValue> = self
            .cors_allowed_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(true)
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/'))
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}
