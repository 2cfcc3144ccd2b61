//! Path and query parameters with validation for the HTTP endpoints.

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use f1data_lib::SessionKind;

use crate::ProblemDetails;

/// First season of the world championship.
pub const FIRST_SEASON: i32 = 1950;

/// Validation trait for request types.
///
/// The `request_id` populates the `instance` field of any returned
/// `ProblemDetails`. The error is boxed to keep `Result` small.
pub trait Validate {
    fn validate(&self, request_id: &str) -> Result<(), Box<ProblemDetails>>;
}

fn bad_request(detail: String, request_id: &str) -> Box<ProblemDetails> {
    Box::new(ProblemDetails::bad_request(detail, request_id))
}

/// Latest season accepted: next year's calendar is usually published early.
pub fn latest_season() -> i32 {
    Utc::now().year() + 1
}

fn validate_year(year: i32, request_id: &str) -> Result<(), Box<ProblemDetails>> {
    let latest = latest_season();
    if !(FIRST_SEASON..=latest).contains(&year) {
        return Err(bad_request(
            format!(
                "The 'year' parameter must be between {} and {}",
                FIRST_SEASON, latest
            ),
            request_id,
        ));
    }
    Ok(())
}

fn validate_round(round: u32, request_id: &str) -> Result<(), Box<ProblemDetails>> {
    if round == 0 {
        return Err(bad_request(
            "The 'round' parameter must be at least 1".to_string(),
            request_id,
        ));
    }
    Ok(())
}

fn validate_driver(driver: &str, field: &str, request_id: &str) -> Result<(), Box<ProblemDetails>> {
    if driver.trim().is_empty() {
        return Err(bad_request(
            format!("The '{}' parameter cannot be empty", field),
            request_id,
        ));
    }
    if !driver.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(bad_request(
            format!("The '{}' parameter must be an alphanumeric driver code", field),
            request_id,
        ));
    }
    Ok(())
}

/// `/{endpoint}/{year}` path parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonPath {
    pub year: i32,
}

impl Validate for SeasonPath {
    fn validate(&self, request_id: &str) -> Result<(), Box<ProblemDetails>> {
        validate_year(self.year, request_id)
    }
}

/// `/lap-times/{year}/{round}` path parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundPath {
    pub year: i32,
    pub round: u32,
}

impl Validate for RoundPath {
    fn validate(&self, request_id: &str) -> Result<(), Box<ProblemDetails>> {
        validate_year(self.year, request_id)?;
        validate_round(self.round, request_id)
    }
}

/// `/telemetry/{year}/{round}/{driver}` path parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryPath {
    pub year: i32,
    pub round: u32,
    pub driver: String,
}

impl Validate for TelemetryPath {
    fn validate(&self, request_id: &str) -> Result<(), Box<ProblemDetails>> {
        validate_year(self.year, request_id)?;
        validate_round(self.round, request_id)?;
        validate_driver(&self.driver, "driver", request_id)
    }
}

/// `?lap_number=` on the telemetry endpoint; absent means the fastest lap.
///
/// Any integer is accepted here. A lap the driver did not complete is a 404
/// from lap selection, not a 400.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryQuery {
    pub lap_number: Option<i64>,
}

impl Validate for TelemetryQuery {
    fn validate(&self, _request_id: &str) -> Result<(), Box<ProblemDetails>> {
        Ok(())
    }
}

/// `?driver=` on the lap-times endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LapTimesQuery {
    pub driver: Option<String>,
}

impl Validate for LapTimesQuery {
    fn validate(&self, request_id: &str) -> Result<(), Box<ProblemDetails>> {
        match &self.driver {
            Some(driver) => validate_driver(driver, "driver", request_id),
            None => Ok(()),
        }
    }
}

/// `/session/{year}/{round}/{session_type}` path parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionPath {
    pub year: i32,
    pub round: u32,
    pub session_type: String,
}

impl SessionPath {
    /// The parsed session kind; call after [`Validate::validate`] succeeded.
    pub fn kind(&self) -> Option<SessionKind> {
        self.session_type.parse().ok()
    }
}

impl Validate for SessionPath {
    fn validate(&self, request_id: &str) -> Result<(), Box<ProblemDetails>> {
        validate_year(self.year, request_id)?;
        validate_round(self.round, request_id)?;
        if let Err(err) = self.session_type.parse::<SessionKind>() {
            return Err(bad_request(err.to_string(), request_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_season_path_bounds() {
        assert!(SeasonPath { year: 1950 }.validate("t").is_ok());
        assert!(SeasonPath { year: 2023 }.validate("t").is_ok());
        assert!(SeasonPath { year: latest_season() }.validate("t").is_ok());

        let err = SeasonPath { year: 1949 }.validate("t").unwrap_err();
        assert_eq!(err.status, 400);
        assert!(err.detail.contains("'year'"));

        assert!(SeasonPath { year: latest_season() + 1 }.validate("t").is_err());
    }

    #[test]
    fn test_round_must_be_positive() {
        let err = RoundPath { year: 2023, round: 0 }.validate("req-9").unwrap_err();
        assert!(err.detail.contains("'round'"));
        assert_eq!(err.instance, "req-9");
    }

    #[test]
    fn test_telemetry_path_rejects_bad_driver_codes() {
        let path = |driver: &str| TelemetryPath {
            year: 2023,
            round: 1,
            driver: driver.to_string(),
        };
        assert!(path("VER").validate("t").is_ok());
        assert!(path("44").validate("t").is_ok());
        assert!(path("").validate("t").is_err());
        assert!(path("V-R").validate("t").is_err());
        assert!(path("VER;").validate("t").is_err());
    }

    #[test]
    fn test_telemetry_query_lap_number() {
        assert!(TelemetryQuery { lap_number: None }.validate("t").is_ok());
        assert!(TelemetryQuery { lap_number: Some(1) }.validate("t").is_ok());
        assert!(TelemetryQuery { lap_number: Some(0) }.validate("t").is_ok());
        assert!(TelemetryQuery { lap_number: Some(-1) }.validate("t").is_ok());
    }

    #[test]
    fn test_lap_times_query_driver_is_optional() {
        assert!(LapTimesQuery { driver: None }.validate("t").is_ok());
        assert!(LapTimesQuery { driver: Some("HAM".to_string()) }.validate("t").is_ok());
        assert!(LapTimesQuery { driver: Some(" ".to_string()) }.validate("t").is_err());
    }

    #[test]
    fn test_session_path_session_type() {
        let path = |code: &str| SessionPath {
            year: 2023,
            round: 1,
            session_type: code.to_string(),
        };
        assert!(path("R").validate("t").is_ok());
        assert_eq!(path("sq").kind(), Some(SessionKind::SprintQualifying));

        let err = path("FP4").validate("t").unwrap_err();
        assert_eq!(err.status, 400);
        assert!(err.detail.contains("FP4"));
    }
}
