//! Typed rows returned by a [`DataProvider`](crate::DataProvider).
//!
//! Every timing or numeric field the upstream feed may omit is an `Option`,
//! so projections can emit `null` instead of inventing zeros.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{Error, Result};

/// One discrete track activity within an event weekend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionKind {
    Practice1,
    Practice2,
    Practice3,
    Qualifying,
    SprintQualifying,
    Sprint,
    #[default]
    Race,
}

impl SessionKind {
    /// All supported session kinds in weekend order.
    pub const ALL: [SessionKind; 7] = [
        SessionKind::Practice1,
        SessionKind::Practice2,
        SessionKind::Practice3,
        SessionKind::SprintQualifying,
        SessionKind::Sprint,
        SessionKind::Qualifying,
        SessionKind::Race,
    ];

    /// Canonical session type code (`FP1`, `Q`, `R`, ...).
    pub fn code(self) -> &'static str {
        match self {
            SessionKind::Practice1 => "FP1",
            SessionKind::Practice2 => "FP2",
            SessionKind::Practice3 => "FP3",
            SessionKind::Qualifying => "Q",
            SessionKind::SprintQualifying => "SQ",
            SessionKind::Sprint => "S",
            SessionKind::Race => "R",
        }
    }

    /// Human-readable session name as used by timing feeds.
    pub fn name(self) -> &'static str {
        match self {
            SessionKind::Practice1 => "Practice 1",
            SessionKind::Practice2 => "Practice 2",
            SessionKind::Practice3 => "Practice 3",
            SessionKind::Qualifying => "Qualifying",
            SessionKind::SprintQualifying => "Sprint Qualifying",
            SessionKind::Sprint => "Sprint",
            SessionKind::Race => "Race",
        }
    }

    /// Whether the session awards a classification with grid slots and points.
    pub fn is_race_like(self) -> bool {
        matches!(self, SessionKind::Race | SessionKind::Sprint)
    }
}

impl FromStr for SessionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase();
        SessionKind::ALL
            .into_iter()
            .find(|kind| kind.code() == upper)
            .ok_or_else(|| Error::InvalidSessionType {
                code: s.to_string(),
            })
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Weekend format of a scheduled event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EventFormat {
    #[default]
    Conventional,
    Sprint,
    SprintShootout,
    SprintQualifying,
    Testing,
}

impl EventFormat {
    /// Wire name of the format (`conventional`, `sprint_shootout`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            EventFormat::Conventional => "conventional",
            EventFormat::Sprint => "sprint",
            EventFormat::SprintShootout => "sprint_shootout",
            EventFormat::SprintQualifying => "sprint_qualifying",
            EventFormat::Testing => "testing",
        }
    }

    /// Sprint weekend format in use for a given season.
    pub fn sprint_format_for(year: i32) -> Self {
        if year <= 2022 {
            EventFormat::Sprint
        } else if year == 2023 {
            EventFormat::SprintShootout
        } else {
            EventFormat::SprintQualifying
        }
    }
}

impl fmt::Display for EventFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a season schedule.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Event {
    pub round: u32,
    pub name: String,
    pub location: String,
    pub country: String,
    pub format: EventFormat,
    /// First day of the event weekend.
    pub date_start: Option<NaiveDate>,
    /// Day of the main race.
    pub race_date: Option<NaiveDate>,
    /// Whether the official live-timing feed covers this event.
    pub f1_api_support: bool,
}

impl Event {
    pub fn is_conventional(&self) -> bool {
        self.format == EventFormat::Conventional
    }
}

/// A driver's identity within a session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DriverInfo {
    pub abbreviation: String,
    pub driver_number: String,
    pub full_name: String,
    pub team_name: String,
    /// Hex colour without a leading `#`.
    pub team_color: String,
}

/// One driver-lap timing row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Lap {
    pub driver: String,
    pub driver_number: String,
    pub lap_number: u32,
    pub lap_time: Option<Duration>,
    pub sector1_time: Option<Duration>,
    pub sector2_time: Option<Duration>,
    pub sector3_time: Option<Duration>,
    pub compound: Option<String>,
    pub tyre_life: Option<u32>,
    pub stint: Option<u32>,
    /// Session time at which the car left the pit lane on this lap.
    pub pit_out_time: Option<Duration>,
    /// Session time at which the car entered the pit lane on this lap.
    pub pit_in_time: Option<Duration>,
    pub is_personal_best: Option<bool>,
    /// Wall-clock start of the lap, used to window car data.
    pub date_start: Option<DateTime<Utc>>,
}

/// One classified (or listed) entry of a session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionResult {
    pub position: Option<u32>,
    pub driver_number: String,
    pub abbreviation: String,
    pub full_name: String,
    pub team_name: String,
    pub grid_position: Option<u32>,
    pub points: Option<f64>,
    pub status: Option<String>,
    /// Rank of the entry's fastest lap within the session, when published.
    pub fastest_lap_rank: Option<u32>,
}

impl SessionResult {
    pub fn holds_fastest_lap(&self) -> bool {
        self.fastest_lap_rank == Some(1)
    }
}

/// One car-data sample.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CarSample {
    /// Time since the start of the lap.
    pub time: Duration,
    pub speed: f64,
    pub rpm: f64,
    pub gear: u8,
    pub throttle: f64,
    pub brake: bool,
    /// Cumulative distance in metres since the first sample.
    pub distance: f64,
}

/// Car-data channels for a single lap.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CarData {
    pub samples: Vec<CarSample>,
}

impl CarData {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// A driver as referenced by standings tables.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DriverRef {
    pub driver_id: String,
    pub code: Option<String>,
    pub permanent_number: Option<String>,
    pub given_name: String,
    pub family_name: String,
    pub nationality: Option<String>,
}

/// A constructor as referenced by standings tables.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConstructorRef {
    pub constructor_id: String,
    pub name: String,
    pub nationality: Option<String>,
}

/// One row of the drivers' championship.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DriverStanding {
    pub position: Option<u32>,
    pub position_text: String,
    pub points: f64,
    pub wins: u32,
    pub driver: DriverRef,
    pub constructors: Vec<ConstructorRef>,
}

/// One row of the constructors' championship.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConstructorStanding {
    pub position: Option<u32>,
    pub position_text: String,
    pub points: f64,
    pub wins: u32,
    pub constructor: ConstructorRef,
}

/// Provider-specific handle used to fetch data tied to a loaded session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimingRef {
    pub session_key: Option<u64>,
    pub date_start: Option<DateTime<Utc>>,
}

/// Which parts of a session to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub laps: bool,
}

impl LoadOptions {
    /// Results and driver list only.
    pub fn results_only() -> Self {
        Self { laps: false }
    }

    /// Results, driver list, and lap timing.
    pub fn with_laps() -> Self {
        Self { laps: true }
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self::with_laps()
    }
}

/// A loaded session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Session {
    pub year: i32,
    pub round: u32,
    pub kind: SessionKind,
    pub event: Event,
    pub drivers: Vec<DriverInfo>,
    pub results: Vec<SessionResult>,
    pub laps: Vec<Lap>,
    pub timing: TimingRef,
}

impl Session {
    /// Look up a driver by abbreviation (case-insensitive).
    pub fn driver(&self, abbreviation: &str) -> Option<&DriverInfo> {
        self.drivers
            .iter()
            .find(|d| d.abbreviation.eq_ignore_ascii_case(abbreviation))
    }

    /// All laps driven by the given driver, in row order.
    pub fn laps_for<'a>(&'a self, abbreviation: &'a str) -> impl Iterator<Item = &'a Lap> + 'a {
        self.laps
            .iter()
            .filter(move |lap| lap.driver.eq_ignore_ascii_case(abbreviation))
    }

    /// Classified result for the given driver abbreviation.
    pub fn result_for(&self, abbreviation: &str) -> Option<&SessionResult> {
        self.results
            .iter()
            .find(|r| r.abbreviation.eq_ignore_ascii_case(abbreviation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_kind_parses_codes_case_insensitively() {
        assert_eq!("fp1".parse::<SessionKind>().unwrap(), SessionKind::Practice1);
        assert_eq!("SQ".parse::<SessionKind>().unwrap(), SessionKind::SprintQualifying);
        assert_eq!(" r ".parse::<SessionKind>().unwrap(), SessionKind::Race);
    }

    #[test]
    fn session_kind_rejects_unknown_codes() {
        let err = "FP4".parse::<SessionKind>().unwrap_err();
        assert!(err.to_string().contains("FP4"));
        assert!(err.is_invalid_input());
    }

    #[test]
    fn session_kind_codes_round_trip() {
        for kind in SessionKind::ALL {
            assert_eq!(kind.code().parse::<SessionKind>().unwrap(), kind);
        }
    }

    #[test]
    fn sprint_format_follows_season() {
        assert_eq!(EventFormat::sprint_format_for(2021), EventFormat::Sprint);
        assert_eq!(EventFormat::sprint_format_for(2023), EventFormat::SprintShootout);
        assert_eq!(EventFormat::sprint_format_for(2024), EventFormat::SprintQualifying);
    }

    #[test]
    fn fastest_lap_flag_requires_rank_one() {
        let mut result = SessionResult::default();
        assert!(!result.holds_fastest_lap());
        result.fastest_lap_rank = Some(2);
        assert!(!result.holds_fastest_lap());
        result.fastest_lap_rank = Some(1);
        assert!(result.holds_fastest_lap());
    }

    #[test]
    fn session_filters_laps_by_driver() {
        let session = Session {
            laps: vec![
                Lap { driver: "VER".into(), lap_number: 1, ..Lap::default() },
                Lap { driver: "HAM".into(), lap_number: 1, ..Lap::default() },
                Lap { driver: "VER".into(), lap_number: 2, ..Lap::default() },
            ],
            ..Session::default()
        };
        let numbers: Vec<u32> = session.laps_for("ver").map(|l| l.lap_number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }
}
