use std::path::PathBuf;

use thiserror::Error;

/// Convenient result alias for the f1data library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Raised when a driver has no lap matching the requested selection.
    #[error("no lap data found for driver {driver}{}", format_lap(.lap_number))]
    LapNotFound {
        driver: String,
        lap_number: Option<i64>,
    },

    /// Raised when a driver code does not appear in the loaded session.
    #[error("driver {driver} did not take part in this session")]
    DriverNotFound { driver: String },

    /// Raised when a session type code is not one of the supported codes.
    #[error("unsupported session type '{code}'; expected one of FP1, FP2, FP3, Q, SQ, S, R")]
    InvalidSessionType { code: String },

    /// Raised when the schedule has no event for the requested round.
    #[error("no event found for round {round} of the {year} season")]
    EventNotFound { year: i32, round: u32 },

    /// Raised when the event exists but the requested session is not available.
    #[error("session {session} of round {round} ({year}) is not available")]
    SessionNotFound {
        year: i32,
        round: u32,
        session: String,
    },

    /// Raised when a lap lacks the timestamps needed to window car data.
    #[error("lap {lap_number} of driver {driver} has no timing window for car data")]
    TimingWindowUnavailable { driver: String, lap_number: u32 },

    /// Raised when an upstream API answers with a non-success status.
    #[error("upstream request to {url} failed with status {status}")]
    Upstream { status: u16, url: String },

    /// Raised when the response cache directory cannot be created.
    #[error("failed to enable response cache at {path}: {source}")]
    CacheInit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapper for HTTP client errors.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Wrapper for malformed upstream payloads.
    #[error("malformed upstream payload: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error means the requested lap or driver selection was empty.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::LapNotFound { .. } | Error::DriverNotFound { .. })
    }

    /// Whether this error stems from invalid caller input rather than the provider.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Error::InvalidSessionType { .. })
    }
}

fn format_lap(lap_number: &Option<i64>) -> String {
    match lap_number {
        Some(lap) => format!(" on lap {}", lap),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lap_not_found_message_mentions_lap() {
        let err = Error::LapNotFound {
            driver: "VER".to_string(),
            lap_number: Some(99),
        };
        assert_eq!(err.to_string(), "no lap data found for driver VER on lap 99");
        assert!(err.is_not_found());
    }

    #[test]
    fn lap_not_found_without_lap_number() {
        let err = Error::LapNotFound {
            driver: "HAM".to_string(),
            lap_number: None,
        };
        assert_eq!(err.to_string(), "no lap data found for driver HAM");
    }

    #[test]
    fn upstream_errors_are_not_not_found() {
        let err = Error::Upstream {
            status: 503,
            url: "https://example.test".to_string(),
        };
        assert!(!err.is_not_found());
        assert!(!err.is_invalid_input());
    }
}
