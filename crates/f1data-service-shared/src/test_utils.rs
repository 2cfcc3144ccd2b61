//! Test utilities for handler testing.
//!
//! [`FixtureProvider`] serves a small, fully deterministic 2023 season from
//! memory. It covers the awkward cases the handlers must cope with: a sprint
//! weekend, a round whose race fails to load, a team whose drivers were never
//! classified, and laps with missing timing fields.

use std::time::Duration;

use chrono::NaiveDate;

use f1data_lib::{
    add_distance, CarData, CarSample, ConstructorRef, ConstructorStanding, DataProvider,
    DriverInfo, DriverRef, DriverStanding, Error, Event, EventFormat, Lap, LoadOptions, Result,
    Session, SessionKind, SessionResult,
};

use crate::state::AppState;

/// Known values in the fixture season for use in assertions.
pub mod fixture {
    /// Season served by the fixture.
    pub const YEAR: i32 = 2023;
    /// Season whose schedule lookup fails with an upstream error.
    pub const FAILING_YEAR: i32 = 2019;
    /// Number of events on the fixture schedule.
    pub const SCHEDULE_LEN: usize = 4;
    /// Sprint-format round (skipped by season aggregates).
    pub const SPRINT_ROUND: u32 = 3;
    /// Conventional round whose race fails to load.
    pub const FAILING_ROUND: u32 = 4;
    /// Laps per driver per race.
    pub const LAPS_PER_DRIVER: u32 = 3;
    /// Team whose drivers never receive a classified position.
    pub const UNCLASSIFIED_TEAM: &str = "Haas F1 Team";
    /// Driver with no timed laps at all.
    pub const UNTIMED_DRIVER: &str = "HUL";
}

struct FixtureDriver {
    abbreviation: &'static str,
    number: &'static str,
    given_name: &'static str,
    family_name: &'static str,
    team: &'static str,
    team_id: &'static str,
    colour: &'static str,
    base_lap_ms: Option<u64>,
}

const DRIVERS: [FixtureDriver; 5] = [
    FixtureDriver {
        abbreviation: "VER",
        number: "1",
        given_name: "Max",
        family_name: "Verstappen",
        team: "Red Bull Racing",
        team_id: "red_bull",
        colour: "3671C6",
        base_lap_ms: Some(95_000),
    },
    FixtureDriver {
        abbreviation: "PER",
        number: "11",
        given_name: "Sergio",
        family_name: "Perez",
        team: "Red Bull Racing",
        team_id: "red_bull",
        colour: "3671C6",
        base_lap_ms: Some(95_400),
    },
    FixtureDriver {
        abbreviation: "HAM",
        number: "44",
        given_name: "Lewis",
        family_name: "Hamilton",
        team: "Mercedes",
        team_id: "mercedes",
        colour: "6CD3BF",
        base_lap_ms: Some(95_800),
    },
    FixtureDriver {
        abbreviation: "MAG",
        number: "20",
        given_name: "Kevin",
        family_name: "Magnussen",
        team: "Haas F1 Team",
        team_id: "haas",
        colour: "B6BABD",
        base_lap_ms: Some(97_100),
    },
    FixtureDriver {
        abbreviation: "HUL",
        number: "27",
        given_name: "Nico",
        family_name: "Hulkenberg",
        team: "Haas F1 Team",
        team_id: "haas",
        colour: "B6BABD",
        base_lap_ms: None,
    },
];

/// In-memory [`DataProvider`] with a canned season.
#[derive(Debug, Clone, Default)]
pub struct FixtureProvider;

impl FixtureProvider {
    pub fn new() -> Self {
        Self
    }

    fn schedule() -> Vec<Event> {
        const EVENTS: [(&str, &str, &str, EventFormat, (u32, u32)); 4] = [
            ("Bahrain Grand Prix", "Sakhir", "Bahrain", EventFormat::Conventional, (3, 5)),
            (
                "Saudi Arabian Grand Prix",
                "Jeddah",
                "Saudi Arabia",
                EventFormat::Conventional,
                (3, 19),
            ),
            ("Azerbaijan Grand Prix", "Baku", "Azerbaijan", EventFormat::SprintShootout, (4, 30)),
            ("Miami Grand Prix", "Miami", "United States", EventFormat::Conventional, (5, 7)),
        ];

        EVENTS
            .iter()
            .zip(1..)
            .map(|(&(name, location, country, format, race), round)| {
                let race_date = NaiveDate::from_ymd_opt(fixture::YEAR, race.0, race.1);
                Event {
                    round,
                    name: name.to_string(),
                    location: location.to_string(),
                    country: country.to_string(),
                    format,
                    date_start: race_date.and_then(|d| d.pred_opt()).and_then(|d| d.pred_opt()),
                    race_date,
                    f1_api_support: true,
                }
            })
            .collect()
    }

    fn drivers() -> Vec<DriverInfo> {
        DRIVERS
            .iter()
            .map(|d| DriverInfo {
                abbreviation: d.abbreviation.to_string(),
                driver_number: d.number.to_string(),
                full_name: format!("{} {}", d.given_name, d.family_name),
                team_name: d.team.to_string(),
                team_color: d.colour.to_string(),
            })
            .collect()
    }

    fn results(round: u32, kind: SessionKind) -> Vec<SessionResult> {
        // Round 2 swaps the front runners and hands HAM the fastest lap.
        let (order, fastest): ([usize; 3], &str) = if round == 2 {
            ([2, 0, 1], "HAM")
        } else {
            ([0, 1, 2], "VER")
        };
        let points = [25.0, 18.0, 15.0];

        let mut rows: Vec<SessionResult> = order
            .iter()
            .enumerate()
            .map(|(place, &index)| {
                let d = &DRIVERS[index];
                SessionResult {
                    position: Some(place as u32 + 1),
                    driver_number: d.number.to_string(),
                    abbreviation: d.abbreviation.to_string(),
                    full_name: format!("{} {}", d.given_name, d.family_name),
                    team_name: d.team.to_string(),
                    grid_position: kind.is_race_like().then_some(place as u32 + 2),
                    points: kind.is_race_like().then_some(points[place]),
                    status: kind.is_race_like().then(|| "Finished".to_string()),
                    fastest_lap_rank: (kind.is_race_like() && d.abbreviation == fastest)
                        .then_some(1),
                }
            })
            .collect();

        for d in &DRIVERS[3..] {
            rows.push(SessionResult {
                position: None,
                driver_number: d.number.to_string(),
                abbreviation: d.abbreviation.to_string(),
                full_name: format!("{} {}", d.given_name, d.family_name),
                team_name: d.team.to_string(),
                grid_position: None,
                points: (kind.is_race_like() && d.abbreviation == "MAG").then_some(0.0),
                status: kind.is_race_like().then(|| "Disqualified".to_string()),
                fastest_lap_rank: None,
            });
        }
        rows
    }

    fn unclassified(drivers: &[DriverInfo]) -> Vec<SessionResult> {
        drivers
            .iter()
            .map(|d| SessionResult {
                driver_number: d.driver_number.clone(),
                abbreviation: d.abbreviation.clone(),
                full_name: d.full_name.clone(),
                team_name: d.team_name.clone(),
                ..SessionResult::default()
            })
            .collect()
    }

    fn laps(round: u32) -> Vec<Lap> {
        let mut laps = Vec::new();
        for d in &DRIVERS {
            let mut best: Option<Duration> = None;
            for lap_number in 1..=fixture::LAPS_PER_DRIVER {
                // Lap 2 is each driver's quickest; round 2 runs 500 ms slower.
                let lap_time = d.base_lap_ms.map(|base| {
                    let delta = match lap_number {
                        1 => 1_500,
                        2 => 0,
                        _ => 700,
                    };
                    Duration::from_millis(base + delta + u64::from(round - 1) * 500)
                });
                let is_personal_best = match (lap_time, best) {
                    (Some(t), Some(b)) => t < b,
                    (Some(_), None) => true,
                    (None, _) => false,
                };
                if is_personal_best {
                    best = lap_time;
                }

                let in_lap = d.abbreviation == "HAM" && lap_number == 2;
                let out_lap = d.abbreviation == "HAM" && lap_number == 3;
                laps.push(Lap {
                    driver: d.abbreviation.to_string(),
                    driver_number: d.number.to_string(),
                    lap_number,
                    lap_time,
                    sector1_time: lap_time
                        .filter(|_| lap_number > 1)
                        .map(|_| Duration::from_millis(31_250)),
                    sector2_time: lap_time.map(|_| Duration::from_millis(41_500)),
                    sector3_time: lap_time.map(|t| t - Duration::from_millis(72_750)),
                    compound: lap_time.map(|_| (if out_lap { "HARD" } else { "SOFT" }).to_string()),
                    tyre_life: lap_time.map(|_| if out_lap { 1 } else { lap_number + 2 }),
                    stint: lap_time.map(|_| if out_lap { 2 } else { 1 }),
                    pit_out_time: out_lap.then(|| Duration::from_millis(3_723_456)),
                    pit_in_time: in_lap.then(|| Duration::from_millis(3_700_125)),
                    is_personal_best: Some(is_personal_best),
                    date_start: None,
                });
            }
        }
        laps
    }
}

impl DataProvider for FixtureProvider {
    fn name(&self) -> &str {
        "fixture"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn load_session(
        &self,
        year: i32,
        round: u32,
        kind: SessionKind,
        options: LoadOptions,
    ) -> Result<Session> {
        if year != fixture::YEAR {
            return Err(Error::EventNotFound { year, round });
        }
        let event = Self::schedule()
            .into_iter()
            .find(|e| e.round == round)
            .ok_or(Error::EventNotFound { year, round })?;

        if round == fixture::FAILING_ROUND {
            return Err(Error::Upstream {
                status: 503,
                url: format!("fixture://{}/{}/{}", year, round, kind.code()),
            });
        }
        let sprint_weekend = !event.is_conventional();
        let unavailable = match kind {
            SessionKind::Sprint | SessionKind::SprintQualifying => !sprint_weekend,
            SessionKind::Practice2 | SessionKind::Practice3 => sprint_weekend,
            _ => false,
        };
        if unavailable {
            return Err(Error::SessionNotFound {
                year,
                round,
                session: kind.code().to_string(),
            });
        }

        let drivers = Self::drivers();
        let results = match kind {
            SessionKind::Race | SessionKind::Sprint | SessionKind::Qualifying => {
                Self::results(round, kind)
            }
            _ => Self::unclassified(&drivers),
        };

        Ok(Session {
            year,
            round,
            kind,
            event,
            drivers,
            results,
            laps: if options.laps { Self::laps(round) } else { Vec::new() },
            timing: Default::default(),
        })
    }

    fn car_data(&self, _session: &Session, lap: &Lap) -> Result<CarData> {
        let lap_time = lap.lap_time.ok_or_else(|| Error::TimingWindowUnavailable {
            driver: lap.driver.clone(),
            lap_number: lap.lap_number,
        })?;

        let steps = 4u32;
        let mut samples: Vec<CarSample> = (0..=steps)
            .map(|i| CarSample {
                time: lap_time * i / steps,
                speed: 200.0 + 20.0 * f64::from(i),
                rpm: 10_500.0 + 100.0 * f64::from(i),
                gear: 5 + (i % 3) as u8,
                throttle: if i == 2 { 0.0 } else { 100.0 },
                brake: i == 2,
                distance: 0.0,
            })
            .collect();
        add_distance(&mut samples);
        Ok(CarData { samples })
    }

    fn event_schedule(&self, year: i32) -> Result<Vec<Event>> {
        match year {
            fixture::YEAR => Ok(Self::schedule()),
            fixture::FAILING_YEAR => Err(Error::Upstream {
                status: 502,
                url: format!("fixture://{}/schedule", year),
            }),
            _ => Ok(Vec::new()),
        }
    }

    fn driver_standings(&self, year: i32) -> Result<Vec<DriverStanding>> {
        if year == fixture::FAILING_YEAR {
            return Err(Error::Upstream {
                status: 502,
                url: format!("fixture://{}/driverStandings", year),
            });
        }
        if year != fixture::YEAR {
            return Ok(Vec::new());
        }
        let table = [(0, 43.0, 1), (2, 40.0, 1), (1, 33.0, 0), (3, 0.0, 0), (4, 0.0, 0)];
        Ok(table
            .iter()
            .enumerate()
            .map(|(place, &(index, points, wins))| {
                let d = &DRIVERS[index];
                let classified = points > 0.0;
                DriverStanding {
                    position: classified.then_some(place as u32 + 1),
                    position_text: if classified {
                        (place + 1).to_string()
                    } else {
                        "-".to_string()
                    },
                    points,
                    wins,
                    driver: DriverRef {
                        driver_id: d.family_name.to_lowercase(),
                        code: Some(d.abbreviation.to_string()),
                        permanent_number: Some(d.number.to_string()),
                        given_name: d.given_name.to_string(),
                        family_name: d.family_name.to_string(),
                        nationality: None,
                    },
                    constructors: vec![ConstructorRef {
                        constructor_id: d.team_id.to_string(),
                        name: d.team.to_string(),
                        nationality: None,
                    }],
                }
            })
            .collect())
    }

    fn constructor_standings(&self, year: i32) -> Result<Vec<ConstructorStanding>> {
        if year != fixture::YEAR {
            return Ok(Vec::new());
        }
        let table = [
            ("red_bull", "Red Bull Racing", 76.0, 1),
            ("mercedes", "Mercedes", 40.0, 1),
            ("haas", "Haas F1 Team", 0.0, 0),
        ];
        Ok(table
            .iter()
            .enumerate()
            .map(|(place, &(id, name, points, wins))| ConstructorStanding {
                position: Some(place as u32 + 1),
                position_text: (place + 1).to_string(),
                points,
                wins,
                constructor: ConstructorRef {
                    constructor_id: id.to_string(),
                    name: name.to_string(),
                    nationality: None,
                },
            })
            .collect())
    }
}

/// Application state backed by a [`FixtureProvider`].
pub fn test_state() -> AppState {
    AppState::from_provider(FixtureProvider::new())
}

/// Generate a unique request ID for testing.
pub fn test_request_id() -> String {
    format!("test-{}", uuid::Uuid::now_v7())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_has_expected_shape() {
        let schedule = FixtureProvider::new().event_schedule(fixture::YEAR).unwrap();
        assert_eq!(schedule.len(), fixture::SCHEDULE_LEN);
        assert!(!schedule[fixture::SPRINT_ROUND as usize - 1].is_conventional());
    }

    #[test]
    fn test_failing_round_errors() {
        let err = FixtureProvider::new()
            .load_session(
                fixture::YEAR,
                fixture::FAILING_ROUND,
                SessionKind::Race,
                LoadOptions::default(),
            )
            .unwrap_err();
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_personal_best_flags_follow_lap_times() {
        let session = FixtureProvider::new()
            .load_session(fixture::YEAR, 1, SessionKind::Race, LoadOptions::with_laps())
            .unwrap();
        let flags: Vec<Option<bool>> =
            session.laps_for("VER").map(|l| l.is_personal_best).collect();
        assert_eq!(flags, vec![Some(true), Some(true), Some(false)]);
    }

    #[test]
    fn test_car_data_distance_is_monotonic() {
        let provider = FixtureProvider::new();
        let session = provider
            .load_session(fixture::YEAR, 1, SessionKind::Race, LoadOptions::with_laps())
            .unwrap();
        let lap = session.laps_for("VER").next().unwrap();
        let data = provider.car_data(&session, lap).unwrap();

        assert_eq!(data.len(), 5);
        assert_eq!(data.samples[0].distance, 0.0);
        assert!(data.samples.windows(2).all(|w| w[0].distance < w[1].distance));
    }

    #[test]
    fn test_request_id_unique() {
        assert_ne!(test_request_id(), test_request_id());
    }
}
