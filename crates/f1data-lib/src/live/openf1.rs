//! Wire types for the OpenF1 timing API and the lap assembly built on them.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::model::{CarSample, DriverInfo, Lap, SessionKind};
use crate::timing::duration_from_secs;

/// Days before race day that still belong to the same weekend.
const WEEKEND_LEAD_DAYS: i64 = 4;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TimingSession {
    pub session_key: u64,
    pub session_name: String,
    pub date_start: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TimingDriver {
    pub driver_number: u32,
    pub name_acronym: Option<String>,
    pub full_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub team_name: Option<String>,
    pub team_colour: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TimingLap {
    pub driver_number: u32,
    pub lap_number: u32,
    pub lap_duration: Option<f64>,
    pub duration_sector_1: Option<f64>,
    pub duration_sector_2: Option<f64>,
    pub duration_sector_3: Option<f64>,
    pub date_start: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Stint {
    pub driver_number: u32,
    pub stint_number: u32,
    pub lap_start: Option<u32>,
    pub lap_end: Option<u32>,
    pub compound: Option<String>,
    pub tyre_age_at_start: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PitStop {
    pub driver_number: u32,
    pub lap_number: u32,
    pub date: Option<String>,
    pub pit_duration: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CarDataRow {
    pub date: String,
    pub speed: Option<f64>,
    pub rpm: Option<f64>,
    pub n_gear: Option<u8>,
    pub throttle: Option<f64>,
    pub brake: Option<f64>,
}

pub(crate) fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Name the 2023 season used for sprint qualifying.
const SPRINT_SHOOTOUT: &str = "Sprint Shootout";

fn is_named(session: &TimingSession, kind: SessionKind) -> bool {
    let name = session.session_name.as_str();
    name.eq_ignore_ascii_case(kind.name())
        || (kind == SessionKind::SprintQualifying && name.eq_ignore_ascii_case(SPRINT_SHOOTOUT))
}

/// Find the timing session of `kind` in the weekend ending on `race_date`.
pub(crate) fn find_session(
    sessions: &[TimingSession],
    kind: SessionKind,
    race_date: NaiveDate,
) -> Option<&TimingSession> {
    let earliest = race_date - chrono::Duration::days(WEEKEND_LEAD_DAYS);
    let latest = race_date + chrono::Duration::days(1);

    sessions.iter().find(|s| {
        let in_weekend = parse_timestamp(s.date_start.as_deref())
            .map(|start| {
                let day = start.date_naive();
                day >= earliest && day <= latest
            })
            .unwrap_or(false);
        in_weekend && is_named(s, kind)
    })
}

impl TimingDriver {
    pub fn into_driver_info(self) -> DriverInfo {
        let full_name = match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            _ => self.full_name.clone().unwrap_or_default(),
        };
        DriverInfo {
            abbreviation: self.name_acronym.unwrap_or_default(),
            driver_number: self.driver_number.to_string(),
            full_name,
            team_name: self.team_name.unwrap_or_default(),
            team_color: self
                .team_colour
                .unwrap_or_else(|| super::DEFAULT_TEAM_COLOR.to_string()),
        }
    }
}

/// Inputs for [`assemble_laps`].
pub(crate) struct LapSources<'a> {
    pub drivers: &'a [DriverInfo],
    pub laps: Vec<TimingLap>,
    pub stints: &'a [Stint],
    pub pits: &'a [PitStop],
    pub session_start: Option<DateTime<Utc>>,
}

/// Merge timing laps with stint and pit data into ordered [`Lap`] rows.
///
/// Rows are ordered by the driver list and then by lap number. The personal
/// best flag marks each lap that improves on every earlier timed lap of the
/// same driver.
pub(crate) fn assemble_laps(sources: LapSources<'_>) -> Vec<Lap> {
    let order: HashMap<&str, usize> = sources
        .drivers
        .iter()
        .enumerate()
        .map(|(i, d)| (d.driver_number.as_str(), i))
        .collect();
    let abbreviations: HashMap<&str, &str> = sources
        .drivers
        .iter()
        .map(|d| (d.driver_number.as_str(), d.abbreviation.as_str()))
        .collect();

    let mut pit_in: HashMap<(u32, u32), Duration> = HashMap::new();
    let mut pit_out: HashMap<(u32, u32), Duration> = HashMap::new();
    for pit in sources.pits {
        let entered = match (parse_timestamp(pit.date.as_deref()), sources.session_start) {
            (Some(at), Some(start)) => (at - start).to_std().ok(),
            _ => None,
        };
        if let Some(entered) = entered {
            pit_in.insert((pit.driver_number, pit.lap_number), entered);
            if let Some(stationary) = pit.pit_duration.and_then(duration_from_secs) {
                pit_out.insert((pit.driver_number, pit.lap_number + 1), entered + stationary);
            }
        }
    }

    let mut laps: Vec<Lap> = sources
        .laps
        .into_iter()
        .map(|raw| {
            let number = raw.driver_number.to_string();
            let stint = sources.stints.iter().find(|s| {
                s.driver_number == raw.driver_number
                    && s.lap_start.map_or(false, |start| start <= raw.lap_number)
                    && s.lap_end.map_or(true, |end| raw.lap_number <= end)
            });
            let tyre_life = stint.and_then(|s| {
                let start = s.lap_start?;
                Some(s.tyre_age_at_start.unwrap_or(0) + (raw.lap_number - start) + 1)
            });
            let key = (raw.driver_number, raw.lap_number);

            Lap {
                driver: abbreviations
                    .get(number.as_str())
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| number.clone()),
                driver_number: number,
                lap_number: raw.lap_number,
                lap_time: raw.lap_duration.and_then(duration_from_secs),
                sector1_time: raw.duration_sector_1.and_then(duration_from_secs),
                sector2_time: raw.duration_sector_2.and_then(duration_from_secs),
                sector3_time: raw.duration_sector_3.and_then(duration_from_secs),
                compound: stint.and_then(|s| s.compound.clone()),
                tyre_life,
                stint: stint.map(|s| s.stint_number),
                pit_out_time: pit_out.get(&key).copied(),
                pit_in_time: pit_in.get(&key).copied(),
                is_personal_best: None,
                date_start: parse_timestamp(raw.date_start.as_deref()),
            }
        })
        .collect();

    laps.sort_by_key(|lap| {
        (
            order.get(lap.driver_number.as_str()).copied().unwrap_or(usize::MAX),
            lap.driver_number.clone(),
            lap.lap_number,
        )
    });
    mark_personal_bests(&mut laps);
    laps
}

fn mark_personal_bests(laps: &mut [Lap]) {
    let mut best: HashMap<String, Duration> = HashMap::new();
    for lap in laps.iter_mut() {
        lap.is_personal_best = Some(match lap.lap_time {
            Some(time) => match best.get(&lap.driver) {
                Some(&current) if time >= current => false,
                _ => {
                    best.insert(lap.driver.clone(), time);
                    true
                }
            },
            None => false,
        });
    }
}

/// Convert car-data rows into samples relative to `lap_start`.
pub(crate) fn car_samples(rows: Vec<CarDataRow>, lap_start: DateTime<Utc>) -> Vec<CarSample> {
    let mut samples: Vec<CarSample> = rows
        .into_iter()
        .filter_map(|row| {
            let at = parse_timestamp(Some(&row.date))?;
            Some(CarSample {
                time: (at - lap_start).to_std().unwrap_or_default(),
                speed: row.speed.unwrap_or(0.0),
                rpm: row.rpm.unwrap_or(0.0),
                gear: row.n_gear.unwrap_or(0),
                throttle: row.throttle.unwrap_or(0.0),
                brake: row.brake.map_or(false, |b| b > 0.0),
                distance: 0.0,
            })
        })
        .collect();
    samples.sort_by_key(|s| s.time);
    samples
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver(number: &str, abbr: &str) -> DriverInfo {
        DriverInfo {
            abbreviation: abbr.to_string(),
            driver_number: number.to_string(),
            ..DriverInfo::default()
        }
    }

    fn timing_lap(driver_number: u32, lap_number: u32, duration: Option<f64>) -> TimingLap {
        TimingLap {
            driver_number,
            lap_number,
            lap_duration: duration,
            duration_sector_1: None,
            duration_sector_2: Some(30.5),
            duration_sector_3: None,
            date_start: None,
        }
    }

    #[test]
    fn finds_session_within_weekend() {
        let sessions = vec![
            TimingSession {
                session_key: 1,
                session_name: "Race".to_string(),
                date_start: Some("2023-03-05T15:00:00+00:00".to_string()),
            },
            TimingSession {
                session_key: 2,
                session_name: "Race".to_string(),
                date_start: Some("2023-03-19T17:00:00+00:00".to_string()),
            },
            TimingSession {
                session_key: 3,
                session_name: "Sprint Shootout".to_string(),
                date_start: Some("2023-03-18T13:00:00+00:00".to_string()),
            },
        ];
        let race_day = NaiveDate::from_ymd_opt(2023, 3, 19).unwrap();

        assert_eq!(find_session(&sessions, SessionKind::Race, race_day).unwrap().session_key, 2);
        assert_eq!(
            find_session(&sessions, SessionKind::SprintQualifying, race_day).unwrap().session_key,
            3
        );
        assert!(find_session(&sessions, SessionKind::Practice1, race_day).is_none());
    }

    #[test]
    fn assembles_laps_with_stints_and_pits() {
        let drivers = vec![driver("1", "VER"), driver("44", "HAM")];
        let stints = vec![
            Stint {
                driver_number: 1,
                stint_number: 1,
                lap_start: Some(1),
                lap_end: Some(2),
                compound: Some("SOFT".to_string()),
                tyre_age_at_start: Some(3),
            },
            Stint {
                driver_number: 1,
                stint_number: 2,
                lap_start: Some(3),
                lap_end: Some(3),
                compound: Some("HARD".to_string()),
                tyre_age_at_start: Some(0),
            },
        ];
        let pits = vec![PitStop {
            driver_number: 1,
            lap_number: 2,
            date: Some("2023-03-05T15:05:00+00:00".to_string()),
            pit_duration: Some(22.5),
        }];
        let laps = assemble_laps(LapSources {
            drivers: &drivers,
            laps: vec![
                timing_lap(44, 1, Some(99.0)),
                timing_lap(1, 2, Some(96.0)),
                timing_lap(1, 1, Some(97.0)),
                timing_lap(1, 3, None),
            ],
            stints: &stints,
            pits: &pits,
            session_start: parse_timestamp(Some("2023-03-05T15:00:00+00:00")),
        });

        let order: Vec<(&str, u32)> =
            laps.iter().map(|l| (l.driver.as_str(), l.lap_number)).collect();
        assert_eq!(order, vec![("VER", 1), ("VER", 2), ("VER", 3), ("HAM", 1)]);

        assert_eq!(laps[0].compound.as_deref(), Some("SOFT"));
        assert_eq!(laps[0].tyre_life, Some(4));
        assert_eq!(laps[1].tyre_life, Some(5));
        assert_eq!(laps[2].stint, Some(2));
        assert_eq!(laps[2].tyre_life, Some(1));

        assert_eq!(laps[1].pit_in_time, Some(Duration::from_secs(300)));
        assert_eq!(laps[2].pit_out_time, Some(Duration::from_millis(322_500)));
        assert_eq!(laps[0].pit_in_time, None);

        assert_eq!(laps[0].sector1_time, None);
        assert_eq!(laps[0].sector2_time, Some(Duration::from_millis(30_500)));

        assert_eq!(laps[0].is_personal_best, Some(true));
        assert_eq!(laps[1].is_personal_best, Some(true));
        assert_eq!(laps[2].is_personal_best, Some(false));
        assert_eq!(laps[3].is_personal_best, Some(true));
        assert_eq!(laps[3].compound, None);
    }

    #[test]
    fn car_samples_are_relative_to_lap_start() {
        let start = parse_timestamp(Some("2023-03-05T15:01:00+00:00")).unwrap();
        let rows = vec![
            CarDataRow {
                date: "2023-03-05T15:01:00.250000+00:00".to_string(),
                speed: Some(200.0),
                rpm: Some(11000.0),
                n_gear: Some(6),
                throttle: Some(100.0),
                brake: Some(0.0),
            },
            CarDataRow {
                date: "2023-03-05T15:01:00+00:00".to_string(),
                speed: Some(198.0),
                rpm: Some(10900.0),
                n_gear: Some(6),
                throttle: Some(99.0),
                brake: Some(100.0),
            },
        ];
        let samples = car_samples(rows, start);

        assert_eq!(samples[0].time, Duration::ZERO);
        assert!(samples[0].brake);
        assert_eq!(samples[1].time, Duration::from_millis(250));
        assert!(!samples[1].brake);
    }
}
