//! Wire types for the Ergast-compatible results API.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::model::{
    ConstructorRef, ConstructorStanding, DriverInfo, DriverRef, DriverStanding, Event, EventFormat,
    SessionResult,
};

/// First season the official live-timing feed covers.
const F1_API_FIRST_SEASON: i32 = 2018;

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(rename = "MRData")]
    pub mr_data: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RaceTableData {
    #[serde(rename = "RaceTable")]
    pub race_table: RaceTable,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RaceTable {
    #[serde(rename = "Races", default)]
    pub races: Vec<Race>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Race {
    pub round: String,
    #[serde(rename = "raceName")]
    pub race_name: String,
    #[serde(rename = "Circuit")]
    pub circuit: Circuit,
    pub date: Option<String>,
    #[serde(rename = "FirstPractice")]
    pub first_practice: Option<ScheduledSession>,
    #[serde(rename = "Sprint")]
    pub sprint: Option<ScheduledSession>,
    #[serde(rename = "Results", default)]
    pub results: Vec<ResultRow>,
    #[serde(rename = "SprintResults", default)]
    pub sprint_results: Vec<ResultRow>,
    #[serde(rename = "QualifyingResults", default)]
    pub qualifying_results: Vec<ResultRow>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Circuit {
    #[serde(rename = "Location")]
    pub location: Location,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Location {
    pub locality: String,
    pub country: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScheduledSession {
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResultRow {
    pub number: Option<String>,
    pub position: Option<String>,
    pub points: Option<String>,
    #[serde(rename = "Driver")]
    pub driver: Driver,
    #[serde(rename = "Constructor")]
    pub constructor: Option<Constructor>,
    pub grid: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "FastestLap")]
    pub fastest_lap: Option<FastestLap>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Driver {
    #[serde(rename = "driverId")]
    pub driver_id: String,
    #[serde(rename = "permanentNumber")]
    pub permanent_number: Option<String>,
    pub code: Option<String>,
    #[serde(rename = "givenName")]
    pub given_name: String,
    #[serde(rename = "familyName")]
    pub family_name: String,
    pub nationality: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Constructor {
    #[serde(rename = "constructorId")]
    pub constructor_id: String,
    pub name: String,
    pub nationality: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FastestLap {
    pub rank: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StandingsData {
    #[serde(rename = "StandingsTable")]
    pub standings_table: StandingsTable,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StandingsTable {
    #[serde(rename = "StandingsLists", default)]
    pub standings_lists: Vec<StandingsList>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StandingsList {
    #[serde(rename = "DriverStandings", default)]
    pub driver_standings: Vec<DriverStandingRow>,
    #[serde(rename = "ConstructorStandings", default)]
    pub constructor_standings: Vec<ConstructorStandingRow>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DriverStandingRow {
    pub position: Option<String>,
    #[serde(rename = "positionText")]
    pub position_text: Option<String>,
    pub points: Option<String>,
    pub wins: Option<String>,
    #[serde(rename = "Driver")]
    pub driver: Driver,
    #[serde(rename = "Constructors", default)]
    pub constructors: Vec<Constructor>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConstructorStandingRow {
    pub position: Option<String>,
    #[serde(rename = "positionText")]
    pub position_text: Option<String>,
    pub points: Option<String>,
    pub wins: Option<String>,
    #[serde(rename = "Constructor")]
    pub constructor: Constructor,
}

fn parse_u32(raw: Option<&str>) -> Option<u32> {
    raw.and_then(|s| s.trim().parse().ok())
}

fn parse_f64(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse().ok())
}

fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

impl Race {
    pub fn round_number(&self) -> Option<u32> {
        parse_u32(Some(&self.round))
    }

    pub fn into_event(self, year: i32) -> Option<Event> {
        let round = self.round_number()?;
        let race_date = parse_date(self.date.as_deref());
        let date_start = self
            .first_practice
            .as_ref()
            .and_then(|fp| parse_date(fp.date.as_deref()))
            .or(race_date);
        let format = if self.sprint.is_some() {
            EventFormat::sprint_format_for(year)
        } else {
            EventFormat::Conventional
        };

        Some(Event {
            round,
            name: self.race_name,
            location: self.circuit.location.locality,
            country: self.circuit.location.country,
            format,
            date_start,
            race_date,
            f1_api_support: year >= F1_API_FIRST_SEASON,
        })
    }
}

impl Driver {
    /// Three-letter code, derived from the family name when unpublished.
    pub fn abbreviation(&self) -> String {
        match &self.code {
            Some(code) if !code.trim().is_empty() => code.trim().to_ascii_uppercase(),
            _ => self
                .family_name
                .chars()
                .filter(|c| c.is_alphabetic())
                .take(3)
                .collect::<String>()
                .to_uppercase(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.given_name, self.family_name)
    }

    fn into_ref(self) -> DriverRef {
        DriverRef {
            driver_id: self.driver_id,
            code: self.code,
            permanent_number: self.permanent_number,
            given_name: self.given_name,
            family_name: self.family_name,
            nationality: self.nationality,
        }
    }
}

impl From<Constructor> for ConstructorRef {
    fn from(value: Constructor) -> Self {
        Self {
            constructor_id: value.constructor_id,
            name: value.name,
            nationality: value.nationality,
        }
    }
}

impl ResultRow {
    pub fn into_result(self) -> SessionResult {
        SessionResult {
            position: parse_u32(self.position.as_deref()),
            driver_number: self
                .number
                .clone()
                .or_else(|| self.driver.permanent_number.clone())
                .unwrap_or_default(),
            abbreviation: self.driver.abbreviation(),
            full_name: self.driver.full_name(),
            team_name: self.constructor.map(|c| c.name).unwrap_or_default(),
            // Ergast reports pit-lane starts as grid 0.
            grid_position: parse_u32(self.grid.as_deref()).filter(|&g| g > 0),
            points: parse_f64(self.points.as_deref()),
            status: self.status,
            fastest_lap_rank: self
                .fastest_lap
                .and_then(|fl| parse_u32(fl.rank.as_deref())),
        }
    }
}

/// Driver list reconstructed from a classification when no timing feed exists.
pub(crate) fn drivers_from_results(results: &[SessionResult]) -> Vec<DriverInfo> {
    results
        .iter()
        .map(|r| DriverInfo {
            abbreviation: r.abbreviation.clone(),
            driver_number: r.driver_number.clone(),
            full_name: r.full_name.clone(),
            team_name: r.team_name.clone(),
            team_color: super::DEFAULT_TEAM_COLOR.to_string(),
        })
        .collect()
}

impl From<DriverStandingRow> for DriverStanding {
    fn from(row: DriverStandingRow) -> Self {
        Self {
            position: parse_u32(row.position.as_deref()),
            position_text: row.position_text.unwrap_or_else(|| "-".to_string()),
            points: parse_f64(row.points.as_deref()).unwrap_or(0.0),
            wins: parse_u32(row.wins.as_deref()).unwrap_or(0),
            driver: row.driver.into_ref(),
            constructors: row.constructors.into_iter().map(ConstructorRef::from).collect(),
        }
    }
}

impl From<ConstructorStandingRow> for ConstructorStanding {
    fn from(row: ConstructorStandingRow) -> Self {
        Self {
            position: parse_u32(row.position.as_deref()),
            position_text: row.position_text.unwrap_or_else(|| "-".to_string()),
            points: parse_f64(row.points.as_deref()).unwrap_or(0.0),
            wins: parse_u32(row.wins.as_deref()).unwrap_or(0),
            constructor: row.constructor.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEDULE: &str = r#"{"MRData":{"RaceTable":{"season":"2023","Races":[
        {"season":"2023","round":"1","raceName":"Bahrain Grand Prix",
         "Circuit":{"circuitId":"bahrain","circuitName":"Bahrain International Circuit",
           "Location":{"lat":"26.0325","long":"50.5106","locality":"Sakhir","country":"Bahrain"}},
         "date":"2023-03-05","time":"15:00:00Z",
         "FirstPractice":{"date":"2023-03-03","time":"11:30:00Z"}},
        {"season":"2023","round":"4","raceName":"Azerbaijan Grand Prix",
         "Circuit":{"circuitId":"baku","circuitName":"Baku City Circuit",
           "Location":{"lat":"40.3725","long":"49.8533","locality":"Baku","country":"Azerbaijan"}},
         "date":"2023-04-30","time":"11:00:00Z",
         "FirstPractice":{"date":"2023-04-28","time":"09:30:00Z"},
         "Sprint":{"date":"2023-04-29","time":"13:30:00Z"}}
    ]}}}"#;

    const RESULTS: &str = r#"{"MRData":{"RaceTable":{"Races":[{
        "round":"1","raceName":"Bahrain Grand Prix",
        "Circuit":{"Location":{"locality":"Sakhir","country":"Bahrain"}},
        "Results":[
          {"number":"1","position":"1","positionText":"1","points":"25",
           "Driver":{"driverId":"max_verstappen","permanentNumber":"33","code":"VER",
                     "givenName":"Max","familyName":"Verstappen","nationality":"Dutch"},
           "Constructor":{"constructorId":"red_bull","name":"Red Bull","nationality":"Austrian"},
           "grid":"1","laps":"57","status":"Finished",
           "FastestLap":{"rank":"2","lap":"44","Time":{"time":"1:36.236"}}},
          {"number":"2","position":"20","positionText":"R","points":"0",
           "Driver":{"driverId":"sargeant","code":"SAR",
                     "givenName":"Logan","familyName":"Sargeant"},
           "Constructor":{"constructorId":"williams","name":"Williams"},
           "grid":"0","laps":"55","status":"+2 Laps"}
        ]}]}}}"#;

    #[test]
    fn schedule_rows_become_events() {
        let env: Envelope<RaceTableData> = serde_json::from_str(SCHEDULE).unwrap();
        let events: Vec<Event> = env
            .mr_data
            .race_table
            .races
            .into_iter()
            .filter_map(|r| r.into_event(2023))
            .collect();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name, "Bahrain Grand Prix");
        assert_eq!(events[0].location, "Sakhir");
        assert_eq!(events[0].format, EventFormat::Conventional);
        assert_eq!(events[0].date_start, NaiveDate::from_ymd_opt(2023, 3, 3));
        assert_eq!(events[1].format, EventFormat::SprintShootout);
        assert!(events[1].f1_api_support);
    }

    #[test]
    fn result_rows_keep_missing_fields_empty() {
        let env: Envelope<RaceTableData> = serde_json::from_str(RESULTS).unwrap();
        let race = env.mr_data.race_table.races.into_iter().next().unwrap();
        let results: Vec<SessionResult> =
            race.results.into_iter().map(ResultRow::into_result).collect();

        assert_eq!(results[0].abbreviation, "VER");
        assert_eq!(results[0].full_name, "Max Verstappen");
        assert_eq!(results[0].team_name, "Red Bull");
        assert_eq!(results[0].points, Some(25.0));
        assert_eq!(results[0].fastest_lap_rank, Some(2));
        assert_eq!(results[1].grid_position, None);
        assert_eq!(results[1].fastest_lap_rank, None);
    }

    #[test]
    fn abbreviation_falls_back_to_family_name() {
        let driver = Driver {
            driver_id: "fangio".to_string(),
            permanent_number: None,
            code: None,
            given_name: "Juan".to_string(),
            family_name: "Fangio".to_string(),
            nationality: None,
        };
        assert_eq!(driver.abbreviation(), "FAN");
    }

    #[test]
    fn standings_parse_points_and_wins() {
        let json = r#"{"MRData":{"StandingsTable":{"StandingsLists":[{"DriverStandings":[
            {"position":"1","positionText":"1","points":"575","wins":"19",
             "Driver":{"driverId":"max_verstappen","code":"VER",
                       "givenName":"Max","familyName":"Verstappen"},
             "Constructors":[{"constructorId":"red_bull","name":"Red Bull"}]},
            {"positionText":"-","points":"0.5","wins":"0",
             "Driver":{"driverId":"x","givenName":"A","familyName":"B"}}
        ]}]}}}"#;
        let mut env: Envelope<StandingsData> = serde_json::from_str(json).unwrap();
        let rows: Vec<DriverStanding> = env.mr_data.standings_table.standings_lists[0]
            .driver_standings
            .drain(..)
            .map(DriverStanding::from)
            .collect();

        assert_eq!(rows[0].points, 575.0);
        assert_eq!(rows[0].wins, 19);
        assert_eq!(rows[0].constructors[0].name, "Red Bull");
        assert_eq!(rows[1].position, None);
        assert_eq!(rows[1].points, 0.5);
    }
}
