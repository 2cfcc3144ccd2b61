//! Tracing subscriber set-up.
//!
//! `LOG_FORMAT` picks the output (`json`, the default, or `text`/`pretty`),
//! `RUST_LOG` the filter and `SERVICE_NAME` the name printed when logging
//! comes up.
//!
//! ```no_run
//! use f1data_service_shared::logging::{LoggingConfig, init_logging};
//!
//! init_logging(&LoggingConfig::from_env().with_service("f1data")).expect("first init");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, Registry};

const FALLBACK_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event, with the current span's fields.
    #[default]
    Json,
    /// Multi-line output for terminals.
    Text,
}

impl From<&str> for LogFormat {
    /// Unrecognised names fall back to JSON.
    fn from(name: &str) -> Self {
        if matches!(name.trim().to_ascii_lowercase().as_str(), "text" | "pretty") {
            LogFormat::Text
        } else {
            LogFormat::Json
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Json => "json",
            LogFormat::Text => "text",
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// `EnvFilter` directives; `None` means `info`.
    pub filter: Option<String>,
    pub service: Option<String>,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        LoggingConfig {
            format: non_empty("LOG_FORMAT")
                .map(|v| LogFormat::from(v.as_str()))
                .unwrap_or_default(),
            filter: non_empty("RUST_LOG"),
            service: non_empty("SERVICE_NAME"),
        }
    }

    /// Name used when `SERVICE_NAME` is not set.
    pub fn with_service(self, fallback: impl Into<String>) -> Self {
        LoggingConfig {
            service: self.service.or_else(|| Some(fallback.into())),
            ..self
        }
    }

    fn env_filter(&self) -> EnvFilter {
        self.filter
            .as_deref()
            .and_then(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::new(FALLBACK_FILTER))
    }
}

/// Install the global subscriber. A second call fails with [`TryInitError`].
pub fn init_logging(config: &LoggingConfig) -> Result<(), TryInitError> {
    let output: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Text => tracing_subscriber::fmt::layer().pretty().boxed(),
    };

    tracing_subscriber::registry()
        .with(output)
        .with(config.env_filter())
        .try_init()?;

    tracing::info!(
        service = config.service.as_deref().unwrap_or("f1data-service"),
        format = %config.format,
        "logging initialised"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_names() {
        assert_eq!(LogFormat::from("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from(" pretty "), LogFormat::Text);
        assert_eq!(LogFormat::from("text"), LogFormat::Text);
        assert_eq!(LogFormat::from("logfmt"), LogFormat::Json);
        assert_eq!(LogFormat::Text.to_string(), "text");
    }

    #[test]
    fn service_name_from_environment_wins() {
        let named = LoggingConfig {
            service: Some("paddock".to_string()),
            ..LoggingConfig::default()
        };
        assert_eq!(named.with_service("f1data").service.as_deref(), Some("paddock"));
        assert_eq!(
            LoggingConfig::default().with_service("f1data").service.as_deref(),
            Some("f1data")
        );
    }

    #[test]
    fn bad_filter_falls_back_to_info() {
        let config = LoggingConfig {
            filter: Some("f1data=loud".to_string()),
            ..LoggingConfig::default()
        };
        assert_eq!(
            config.env_filter().max_level_hint(),
            Some(tracing_subscriber::filter::LevelFilter::INFO)
        );
    }
}
