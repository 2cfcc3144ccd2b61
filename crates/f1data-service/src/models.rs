//! Response bodies for each endpoint.
//!
//! Field names are part of the wire contract with the downstream backend.
//! Durations are timedelta strings and missing values are `null`.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use f1data_lib::{
    format_timedelta, CarData, ConstructorStanding, DriverInfo, DriverRacePerformance,
    DriverStanding, Event, Lap, SeasonPerformance, SeasonTeams, SessionResult, TeamSeasonSummary,
};

fn timedelta(duration: Option<Duration>) -> Option<String> {
    duration.map(format_timedelta)
}

/// `GET /`
#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub status: &'static str,
    pub version: &'static str,
    pub endpoints: BTreeMap<&'static str, &'static str>,
}

/// `GET /drivers/{year}`
#[derive(Debug, Clone, Serialize)]
pub struct DriversResponse {
    pub year: i32,
    pub driver_count: usize,
    pub drivers: Vec<DriverDto>,
}

impl DriversResponse {
    pub fn new(year: i32, drivers: &[DriverInfo]) -> Self {
        let drivers: Vec<DriverDto> = drivers.iter().map(DriverDto::from).collect();
        Self {
            year,
            driver_count: drivers.len(),
            drivers,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DriverDto {
    pub abbreviation: String,
    pub full_name: String,
    pub team: String,
    pub team_color: String,
    pub driver_number: String,
}

impl From<&DriverInfo> for DriverDto {
    fn from(value: &DriverInfo) -> Self {
        Self {
            abbreviation: value.abbreviation.clone(),
            full_name: value.full_name.clone(),
            team: value.team_name.clone(),
            team_color: value.team_color.clone(),
            driver_number: value.driver_number.clone(),
        }
    }
}

/// `GET /telemetry/{year}/{round}/{driver}`
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryResponse {
    pub year: i32,
    pub round: u32,
    pub driver: String,
    pub data: LapTelemetryDto,
}

#[derive(Debug, Clone, Serialize)]
pub struct LapTelemetryDto {
    pub lap_number: u32,
    pub lap_time: Option<String>,
    pub is_personal_best: Option<bool>,
    pub compound: Option<String>,
    pub tyre_life: Option<u32>,
    pub telemetry: TelemetryChannels,
}

impl LapTelemetryDto {
    pub fn new(lap: &Lap, car_data: &CarData) -> Self {
        Self {
            lap_number: lap.lap_number,
            lap_time: timedelta(lap.lap_time),
            is_personal_best: lap.is_personal_best,
            compound: lap.compound.clone(),
            tyre_life: lap.tyre_life,
            telemetry: TelemetryChannels::from(car_data),
        }
    }
}

/// Column-oriented car data: every channel has one entry per sample.
#[derive(Debug, Clone, Serialize, Default)]
pub struct TelemetryChannels {
    pub speed: Vec<f64>,
    pub rpm: Vec<f64>,
    pub gear: Vec<u8>,
    pub throttle: Vec<f64>,
    pub brake: Vec<bool>,
    pub distance: Vec<f64>,
    pub time: Vec<String>,
}

impl From<&CarData> for TelemetryChannels {
    fn from(value: &CarData) -> Self {
        let mut channels = TelemetryChannels::default();
        for sample in &value.samples {
            channels.speed.push(sample.speed);
            channels.rpm.push(sample.rpm);
            channels.gear.push(sample.gear);
            channels.throttle.push(sample.throttle);
            channels.brake.push(sample.brake);
            channels.distance.push(sample.distance);
            channels.time.push(format_timedelta(sample.time));
        }
        channels
    }
}

/// `GET /lap-times/{year}/{round}`
#[derive(Debug, Clone, Serialize)]
pub struct LapTimesResponse {
    pub year: i32,
    pub round: u32,
    pub driver_filter: Option<String>,
    pub lap_count: usize,
    pub laps: Vec<LapDto>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LapDto {
    pub driver: String,
    pub lap_number: u32,
    pub lap_time: Option<String>,
    pub sector1_time: Option<String>,
    pub sector2_time: Option<String>,
    pub sector3_time: Option<String>,
    pub compound: Option<String>,
    pub tyre_life: Option<u32>,
    pub stint: Option<u32>,
    pub pit_out_time: Option<String>,
    pub pit_in_time: Option<String>,
    pub is_personal_best: Option<bool>,
}

impl From<&Lap> for LapDto {
    fn from(value: &Lap) -> Self {
        Self {
            driver: value.driver.clone(),
            lap_number: value.lap_number,
            lap_time: timedelta(value.lap_time),
            sector1_time: timedelta(value.sector1_time),
            sector2_time: timedelta(value.sector2_time),
            sector3_time: timedelta(value.sector3_time),
            compound: value.compound.clone(),
            tyre_life: value.tyre_life,
            stint: value.stint,
            pit_out_time: timedelta(value.pit_out_time),
            pit_in_time: timedelta(value.pit_in_time),
            is_personal_best: value.is_personal_best,
        }
    }
}

/// `GET /session/{year}/{round}/{session_type}`
#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub year: i32,
    pub round: u32,
    pub session_type: String,
    pub event_name: String,
    pub location: String,
    pub country: String,
    pub results: Vec<ResultDto>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResultDto {
    pub position: Option<u32>,
    pub driver_number: String,
    pub driver_abbr: String,
    pub full_name: String,
    pub team: String,
    pub grid_position: Option<u32>,
    pub points: Option<f64>,
    pub status: Option<String>,
}

impl From<&SessionResult> for ResultDto {
    fn from(value: &SessionResult) -> Self {
        Self {
            position: value.position,
            driver_number: value.driver_number.clone(),
            driver_abbr: value.abbreviation.clone(),
            full_name: value.full_name.clone(),
            team: value.team_name.clone(),
            grid_position: value.grid_position,
            points: value.points,
            status: value.status.clone(),
        }
    }
}

/// `GET /championship-standings/{year}`
#[derive(Debug, Clone, Serialize)]
pub struct StandingsResponse {
    pub year: i32,
    pub driver_standings: Vec<DriverStandingDto>,
    pub constructor_standings: Vec<ConstructorStandingDto>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DriverStandingDto {
    pub position: Option<u32>,
    pub position_text: String,
    pub points: f64,
    pub wins: u32,
    pub driver_id: String,
    pub driver_number: Option<String>,
    pub driver_code: Option<String>,
    pub given_name: String,
    pub family_name: String,
    pub driver_nationality: Option<String>,
    pub constructor_ids: Vec<String>,
    pub constructor_names: Vec<String>,
}

impl From<&DriverStanding> for DriverStandingDto {
    fn from(value: &DriverStanding) -> Self {
        Self {
            position: value.position,
            position_text: value.position_text.clone(),
            points: value.points,
            wins: value.wins,
            driver_id: value.driver.driver_id.clone(),
            driver_number: value.driver.permanent_number.clone(),
            driver_code: value.driver.code.clone(),
            given_name: value.driver.given_name.clone(),
            family_name: value.driver.family_name.clone(),
            driver_nationality: value.driver.nationality.clone(),
            constructor_ids: value
                .constructors
                .iter()
                .map(|c| c.constructor_id.clone())
                .collect(),
            constructor_names: value.constructors.iter().map(|c| c.name.clone()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConstructorStandingDto {
    pub position: Option<u32>,
    pub position_text: String,
    pub points: f64,
    pub wins: u32,
    pub constructor_id: String,
    pub constructor_name: String,
    pub constructor_nationality: Option<String>,
}

impl From<&ConstructorStanding> for ConstructorStandingDto {
    fn from(value: &ConstructorStanding) -> Self {
        Self {
            position: value.position,
            position_text: value.position_text.clone(),
            points: value.points,
            wins: value.wins,
            constructor_id: value.constructor.constructor_id.clone(),
            constructor_name: value.constructor.name.clone(),
            constructor_nationality: value.constructor.nationality.clone(),
        }
    }
}

/// `GET /driver-performance/{year}`
#[derive(Debug, Clone, Serialize)]
pub struct DriverPerformanceResponse {
    pub year: i32,
    pub total_races: usize,
    pub races_analyzed: usize,
    pub skipped_rounds: Vec<u32>,
    pub performance_data: Vec<PerformanceDto>,
}

impl From<&SeasonPerformance> for DriverPerformanceResponse {
    fn from(value: &SeasonPerformance) -> Self {
        Self {
            year: value.year,
            total_races: value.total_races,
            races_analyzed: value.races_analyzed,
            skipped_rounds: value.skipped_rounds.clone(),
            performance_data: value.records.iter().map(PerformanceDto::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PerformanceDto {
    pub year: i32,
    pub round: u32,
    pub event_name: String,
    pub driver: String,
    pub driver_name: String,
    pub team: String,
    pub position: Option<u32>,
    pub points: Option<f64>,
    pub fastest_lap_time: String,
    pub average_lap_time: String,
    pub consistency_score: f64,
    pub laps_completed: usize,
    pub total_race_time: String,
}

impl From<&DriverRacePerformance> for PerformanceDto {
    fn from(value: &DriverRacePerformance) -> Self {
        Self {
            year: value.year,
            round: value.round,
            event_name: value.event_name.clone(),
            driver: value.driver.clone(),
            driver_name: value.driver_name.clone(),
            team: value.team.clone(),
            position: value.position,
            points: value.points,
            fastest_lap_time: format_timedelta(value.fastest_lap_time),
            average_lap_time: format_timedelta(value.average_lap_time),
            consistency_score: value.consistency_score,
            laps_completed: value.laps_completed,
            total_race_time: format_timedelta(value.total_race_time),
        }
    }
}

/// `GET /race-calendar/{year}`
#[derive(Debug, Clone, Serialize)]
pub struct CalendarResponse {
    pub year: i32,
    pub total_events: usize,
    pub calendar: Vec<CalendarEventDto>,
}

impl CalendarResponse {
    pub fn new(year: i32, events: &[Event]) -> Self {
        Self {
            year,
            total_events: events.len(),
            calendar: events.iter().map(CalendarEventDto::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CalendarEventDto {
    pub round: u32,
    pub event_name: String,
    pub location: String,
    pub country: String,
    pub event_format: &'static str,
    /// First day of the weekend, `YYYY-MM-DD`.
    pub date_start: Option<String>,
    pub f1_support_series: bool,
}

impl From<&Event> for CalendarEventDto {
    fn from(value: &Event) -> Self {
        Self {
            round: value.round,
            event_name: value.name.clone(),
            location: value.location.clone(),
            country: value.country.clone(),
            event_format: value.format.as_str(),
            date_start: value.date_start.map(|d| d.format("%Y-%m-%d").to_string()),
            f1_support_series: value.f1_api_support,
        }
    }
}

/// `GET /team-analysis/{year}`
#[derive(Debug, Clone, Serialize)]
pub struct TeamAnalysisResponse {
    pub year: i32,
    pub total_races: usize,
    pub races_analyzed: usize,
    pub skipped_rounds: Vec<u32>,
    pub teams: Vec<TeamDto>,
}

impl From<&SeasonTeams> for TeamAnalysisResponse {
    fn from(value: &SeasonTeams) -> Self {
        Self {
            year: value.year,
            total_races: value.total_races,
            races_analyzed: value.races_analyzed,
            skipped_rounds: value.skipped_rounds.clone(),
            teams: value.teams.iter().map(TeamDto::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TeamDto {
    pub team_name: String,
    pub races: u32,
    pub total_points: f64,
    pub drivers: Vec<String>,
    pub positions: Vec<Option<u32>>,
    pub fastest_laps: u32,
    pub avg_position: Option<f64>,
}

impl From<&TeamSeasonSummary> for TeamDto {
    fn from(value: &TeamSeasonSummary) -> Self {
        Self {
            team_name: value.team_name.clone(),
            races: value.races,
            total_points: value.total_points,
            drivers: value.drivers.clone(),
            positions: value.positions.clone(),
            fastest_laps: value.fastest_laps,
            avg_position: value.avg_position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use f1data_lib::CarSample;

    #[test]
    fn lap_dto_keeps_missing_fields_null() {
        let lap = Lap {
            driver: "VER".to_string(),
            lap_number: 1,
            lap_time: Some(Duration::from_millis(92_608)),
            ..Lap::default()
        };
        let json = serde_json::to_value(LapDto::from(&lap)).unwrap();

        assert_eq!(json["lap_time"], "0 days 00:01:32.608000");
        assert!(json["sector1_time"].is_null());
        assert!(json["pit_in_time"].is_null());
        assert!(json["is_personal_best"].is_null());
    }

    #[test]
    fn telemetry_channels_are_columnar() {
        let data = CarData {
            samples: vec![
                CarSample {
                    time: Duration::ZERO,
                    speed: 100.0,
                    gear: 3,
                    ..CarSample::default()
                },
                CarSample {
                    time: Duration::from_millis(250),
                    speed: 110.0,
                    gear: 4,
                    brake: true,
                    ..CarSample::default()
                },
            ],
        };
        let channels = TelemetryChannels::from(&data);

        assert_eq!(channels.speed, vec![100.0, 110.0]);
        assert_eq!(channels.gear, vec![3, 4]);
        assert_eq!(channels.brake, vec![false, true]);
        assert_eq!(channels.time, vec!["0 days 00:00:00", "0 days 00:00:00.250000"]);
    }

    #[test]
    fn drivers_response_counts_drivers() {
        let drivers = vec![DriverInfo::default(), DriverInfo::default()];
        let response = DriversResponse::new(2023, &drivers);
        assert_eq!(response.driver_count, response.drivers.len());
    }
}
