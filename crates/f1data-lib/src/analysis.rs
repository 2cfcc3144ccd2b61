//! Season-level aggregates built by walking the event schedule.
//!
//! Both aggregates load one race per conventional-format event, strictly in
//! round order. An event whose race fails to load is skipped and its round is
//! recorded in `skipped_rounds`; the aggregate itself still succeeds.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::model::{Event, LoadOptions, Session, SessionKind};
use crate::provider::DataProvider;

/// One driver's performance in one race.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverRacePerformance {
    pub year: i32,
    pub round: u32,
    pub event_name: String,
    pub driver: String,
    pub driver_name: String,
    pub team: String,
    pub position: Option<u32>,
    pub points: Option<f64>,
    pub fastest_lap_time: Duration,
    pub average_lap_time: Duration,
    pub consistency_score: f64,
    pub laps_completed: usize,
    pub total_race_time: Duration,
}

/// Per-race driver performance across a season.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonPerformance {
    pub year: i32,
    /// Number of events on the full schedule, analysed or not.
    pub total_races: usize,
    pub races_analyzed: usize,
    pub skipped_rounds: Vec<u32>,
    pub records: Vec<DriverRacePerformance>,
}

/// A team's aggregate over all analysed races.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TeamSeasonSummary {
    pub team_name: String,
    pub races: u32,
    pub total_points: f64,
    /// Unique driver names, sorted.
    pub drivers: Vec<String>,
    /// Classified positions in result order; unclassified entries are `None`.
    pub positions: Vec<Option<u32>>,
    pub fastest_laps: u32,
    /// Mean over the non-null positions, `None` when there are none.
    pub avg_position: Option<f64>,
}

/// Team aggregates across a season.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonTeams {
    pub year: i32,
    pub total_races: usize,
    pub races_analyzed: usize,
    pub skipped_rounds: Vec<u32>,
    /// Sorted by team name.
    pub teams: Vec<TeamSeasonSummary>,
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample standard deviation (n − 1 denominator); 0 for fewer than two values.
pub fn sample_stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let Some(avg) = mean(values) else {
        return 0.0;
    };
    let variance =
        values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Consistency of a set of lap times: `1 − stdev / mean`, or 0 when the mean is 0.
pub fn consistency_score(lap_secs: &[f64]) -> f64 {
    match mean(lap_secs) {
        Some(avg) if avg != 0.0 => 1.0 - sample_stdev(lap_secs) / avg,
        _ => 0.0,
    }
}

/// Compute per-driver race performance for every conventional event of `year`.
pub fn driver_performance(provider: &dyn DataProvider, year: i32) -> Result<SeasonPerformance> {
    let schedule = provider.event_schedule(year)?;
    let mut records = Vec::new();
    let mut races_analyzed = 0;
    let mut skipped_rounds = Vec::new();

    for event in schedule.iter().filter(|e| e.is_conventional()) {
        let session = match load_race(provider, year, event, LoadOptions::with_laps()) {
            Some(session) => session,
            None => {
                skipped_rounds.push(event.round);
                continue;
            }
        };
        races_analyzed += 1;
        records.extend(race_performance(&session, event));
    }

    info!(
        year,
        total_races = schedule.len(),
        races_analyzed,
        skipped = skipped_rounds.len(),
        records = records.len(),
        "driver performance computed"
    );

    Ok(SeasonPerformance {
        year,
        total_races: schedule.len(),
        races_analyzed,
        skipped_rounds,
        records,
    })
}

/// Aggregate race results by team for every conventional event of `year`.
pub fn team_analysis(provider: &dyn DataProvider, year: i32) -> Result<SeasonTeams> {
    let schedule = provider.event_schedule(year)?;
    let mut teams: BTreeMap<String, TeamAccumulator> = BTreeMap::new();
    let mut races_analyzed = 0;
    let mut skipped_rounds = Vec::new();

    for event in schedule.iter().filter(|e| e.is_conventional()) {
        let session = match load_race(provider, year, event, LoadOptions::results_only()) {
            Some(session) => session,
            None => {
                skipped_rounds.push(event.round);
                continue;
            }
        };
        races_analyzed += 1;

        let mut seen_this_race = BTreeSet::new();
        for result in &session.results {
            let team = teams.entry(result.team_name.clone()).or_default();
            if seen_this_race.insert(result.team_name.as_str()) {
                team.races += 1;
            }
            team.total_points += result.points.unwrap_or(0.0);
            team.drivers.insert(result.full_name.clone());
            team.positions.push(result.position);
            if result.holds_fastest_lap() {
                team.fastest_laps += 1;
            }
        }
    }

    let teams: Vec<TeamSeasonSummary> = teams
        .into_iter()
        .map(|(team_name, acc)| acc.finish(team_name))
        .collect();

    info!(
        year,
        total_races = schedule.len(),
        races_analyzed,
        skipped = skipped_rounds.len(),
        teams = teams.len(),
        "team analysis computed"
    );

    Ok(SeasonTeams {
        year,
        total_races: schedule.len(),
        races_analyzed,
        skipped_rounds,
        teams,
    })
}

fn load_race(
    provider: &dyn DataProvider,
    year: i32,
    event: &Event,
    options: LoadOptions,
) -> Option<Session> {
    debug!(year, round = event.round, event = %event.name, "loading race");
    match provider.load_session(year, event.round, SessionKind::Race, options) {
        Ok(session) => Some(session),
        Err(err) => {
            warn!(
                year,
                round = event.round,
                event = %event.name,
                error = %err,
                "skipping event that failed to load"
            );
            None
        }
    }
}

fn race_performance(session: &Session, event: &Event) -> Vec<DriverRacePerformance> {
    let mut records = Vec::new();

    for driver in &session.drivers {
        let laps: Vec<_> = session.laps_for(&driver.abbreviation).collect();
        let timed: Vec<Duration> = laps.iter().filter_map(|lap| lap.lap_time).collect();
        let Some(fastest) = timed.iter().min().copied() else {
            continue;
        };

        let secs: Vec<f64> = timed.iter().map(Duration::as_secs_f64).collect();
        let total: Duration = timed.iter().sum();
        let average = total / timed.len() as u32;
        let result = session.result_for(&driver.abbreviation);

        records.push(DriverRacePerformance {
            year: session.year,
            round: event.round,
            event_name: event.name.clone(),
            driver: driver.abbreviation.clone(),
            driver_name: driver.full_name.clone(),
            team: driver.team_name.clone(),
            position: result.and_then(|r| r.position),
            points: result.and_then(|r| r.points),
            fastest_lap_time: fastest,
            average_lap_time: average,
            consistency_score: consistency_score(&secs),
            laps_completed: laps.len(),
            total_race_time: total,
        });
    }

    records
}

#[derive(Debug, Default)]
struct TeamAccumulator {
    races: u32,
    total_points: f64,
    drivers: BTreeSet<String>,
    positions: Vec<Option<u32>>,
    fastest_laps: u32,
}

impl TeamAccumulator {
    fn finish(self, team_name: String) -> TeamSeasonSummary {
        let classified: Vec<f64> = self.positions.iter().flatten().map(|&p| f64::from(p)).collect();
        TeamSeasonSummary {
            team_name,
            races: self.races,
            total_points: self.total_points,
            drivers: self.drivers.into_iter().collect(),
            positions: self.positions,
            fastest_laps: self.fastest_laps,
            avg_position: mean(&classified),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_empty_is_none() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[2.0, 4.0]), Some(3.0));
    }

    #[test]
    fn sample_stdev_uses_n_minus_one() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let expected = (32.0_f64 / 7.0).sqrt();
        assert!((sample_stdev(&values) - expected).abs() < 1e-12);
        assert_eq!(sample_stdev(&[90.0]), 0.0);
    }

    #[test]
    fn consistency_of_identical_laps_is_one() {
        assert_eq!(consistency_score(&[90.0, 90.0, 90.0]), 1.0);
    }

    #[test]
    fn consistency_with_zero_mean_is_zero() {
        assert_eq!(consistency_score(&[0.0, 0.0]), 0.0);
        assert_eq!(consistency_score(&[]), 0.0);
    }

    #[test]
    fn consistency_drops_with_spread() {
        let steady = consistency_score(&[90.0, 90.5, 90.2]);
        let erratic = consistency_score(&[90.0, 99.0, 85.0]);
        assert!(steady > erratic);
        assert!(steady < 1.0);
    }

    #[test]
    fn team_average_ignores_null_positions() {
        let acc = TeamAccumulator {
            races: 2,
            positions: vec![Some(1), None, Some(3)],
            ..TeamAccumulator::default()
        };
        let summary = acc.finish("Ferrari".to_string());
        assert_eq!(summary.positions, vec![Some(1), None, Some(3)]);
        assert_eq!(summary.avg_position, Some(2.0));
    }

    #[test]
    fn team_average_is_none_without_positions() {
        let acc = TeamAccumulator {
            positions: vec![None, None],
            ..TeamAccumulator::default()
        };
        assert_eq!(acc.finish("Haas".to_string()).avg_position, None);
    }
}
