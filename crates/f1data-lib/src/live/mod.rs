//! Provider backed by the public Ergast-compatible and OpenF1 HTTP APIs.
//!
//! Schedules, classified results and standings come from the Ergast-compatible
//! endpoint. Driver lists, lap timing, tyre stints, pit stops and car telemetry
//! come from OpenF1. Every successful response is written to the optional
//! [`ResponseCache`] and served from there on later calls, permanently for
//! finished seasons and up to the cache's max age otherwise.

mod ergast;
mod openf1;

use std::env;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::cache::{Freshness, ResponseCache};
use crate::error::{Error, Result};
use crate::model::{
    CarData, ConstructorStanding, DriverInfo, DriverStanding, Event, Lap, LoadOptions, Session,
    SessionKind, SessionResult, TimingRef,
};
use crate::provider::DataProvider;
use crate::telemetry::add_distance;

use ergast::{Envelope, RaceTableData, StandingsData};
use openf1::{
    CarDataRow, LapSources, PitStop, Stint, TimingDriver, TimingLap, TimingSession,
};

/// Team colour used when the upstream driver list has none.
pub const DEFAULT_TEAM_COLOR: &str = "000000";

pub const DEFAULT_ERGAST_URL: &str = "https://api.jolpi.ca/ergast/f1";
pub const DEFAULT_OPENF1_URL: &str = "https://api.openf1.org/v1";

const ERGAST_URL_ENV: &str = "F1DATA_ERGAST_URL";
const OPENF1_URL_ENV: &str = "F1DATA_OPENF1_URL";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const PAGE_LIMIT: u32 = 100;
const USER_AGENT: &str = concat!("f1data-lib/", env!("CARGO_PKG_VERSION"));

/// Upstream endpoints for [`LiveProvider`].
#[derive(Debug, Clone)]
pub struct LiveProviderConfig {
    pub ergast_url: String,
    pub openf1_url: String,
    pub timeout: Duration,
}

impl Default for LiveProviderConfig {
    fn default() -> Self {
        Self {
            ergast_url: DEFAULT_ERGAST_URL.to_string(),
            openf1_url: DEFAULT_OPENF1_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl LiveProviderConfig {
    /// Read endpoint overrides from `F1DATA_ERGAST_URL` and `F1DATA_OPENF1_URL`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ergast_url: env_url(ERGAST_URL_ENV).unwrap_or(defaults.ergast_url),
            openf1_url: env_url(OPENF1_URL_ENV).unwrap_or(defaults.openf1_url),
            timeout: defaults.timeout,
        }
    }
}

fn env_url(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().trim_end_matches('/').to_string())
        .filter(|v| !v.is_empty())
}

/// [`DataProvider`] talking to the live HTTP APIs.
///
/// Calls block; async callers must run them on a blocking thread. The HTTP
/// client is created on first use so that it is always built inside that
/// blocking context.
pub struct LiveProvider {
    config: LiveProviderConfig,
    cache: Option<ResponseCache>,
    client: OnceCell<Client>,
}

impl LiveProvider {
    pub fn new(config: LiveProviderConfig, cache: Option<ResponseCache>) -> Self {
        Self {
            config,
            cache,
            client: OnceCell::new(),
        }
    }

    fn client(&self) -> Result<&Client> {
        self.client.get_or_try_init(|| {
            Client::builder()
                .user_agent(USER_AGENT)
                .timeout(self.config.timeout)
                .build()
                .map_err(Error::from)
        })
    }

    /// Fetch raw bytes for `url`, consulting the cache first.
    ///
    /// Returns `Ok(None)` for a 404 so list endpoints can treat it as empty.
    /// A body that cannot be cached is still returned.
    fn fetch(&self, url: &str, freshness: Freshness) -> Result<Option<Vec<u8>>> {
        if let Some(body) = self.cache.as_ref().and_then(|c| c.get(url, freshness)) {
            return Ok(Some(body));
        }

        debug!(url, "requesting upstream");
        let response = self.client()?.get(url).send()?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::Upstream {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes()?.to_vec();
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.put(url, &body) {
                warn!(url, error = %err, "failed to cache response");
            }
        }
        Ok(Some(body))
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str, freshness: Freshness) -> Result<T> {
        match self.fetch(url, freshness)? {
            Some(body) => Ok(serde_json::from_slice(&body)?),
            None => Err(Error::Upstream {
                status: StatusCode::NOT_FOUND.as_u16(),
                url: url.to_string(),
            }),
        }
    }

    fn get_list<T: DeserializeOwned>(&self, url: &str, freshness: Freshness) -> Result<Vec<T>> {
        match self.fetch(url, freshness)? {
            Some(body) => Ok(serde_json::from_slice(&body)?),
            None => Ok(Vec::new()),
        }
    }

    fn ergast(&self, path: &str) -> String {
        format!("{}/{}", self.config.ergast_url, path)
    }

    fn openf1(&self, path: &str) -> String {
        format!("{}/{}", self.config.openf1_url, path)
    }

    fn schedule(&self, year: i32) -> Result<Vec<ergast::Race>> {
        let url = self.ergast(&format!("{}.json?limit={}", year, PAGE_LIMIT));
        let envelope: Envelope<RaceTableData> = self.get_json(&url, Freshness::for_season(year))?;
        Ok(envelope.mr_data.race_table.races)
    }

    fn ergast_results(
        &self,
        year: i32,
        round: u32,
        kind: SessionKind,
    ) -> Result<Vec<SessionResult>> {
        let endpoint = match kind {
            SessionKind::Race => "results",
            SessionKind::Sprint => "sprint",
            SessionKind::Qualifying => "qualifying",
            _ => return Ok(Vec::new()),
        };
        let url = self.ergast(&format!(
            "{}/{}/{}.json?limit={}",
            year, round, endpoint, PAGE_LIMIT
        ));
        let envelope: Envelope<RaceTableData> = self.get_json(&url, Freshness::for_season(year))?;

        let rows = envelope
            .mr_data
            .race_table
            .races
            .into_iter()
            .next()
            .map(|race| match kind {
                SessionKind::Sprint => race.sprint_results,
                SessionKind::Qualifying => race.qualifying_results,
                _ => race.results,
            })
            .unwrap_or_default();
        Ok(rows.into_iter().map(ergast::ResultRow::into_result).collect())
    }

    fn timing_session(
        &self,
        year: i32,
        kind: SessionKind,
        event: &Event,
    ) -> Result<Option<TimingSession>> {
        let Some(race_date) = event.race_date else {
            return Ok(None);
        };
        let url = self.openf1(&format!("sessions?year={}", year));
        let sessions: Vec<TimingSession> = self.get_list(&url, Freshness::for_season(year))?;
        Ok(openf1::find_session(&sessions, kind, race_date).cloned())
    }

    fn timing_drivers(&self, session_key: u64, freshness: Freshness) -> Result<Vec<DriverInfo>> {
        let url = self.openf1(&format!("drivers?session_key={}", session_key));
        let rows: Vec<TimingDriver> = self.get_list(&url, freshness)?;
        let mut drivers: Vec<DriverInfo> = Vec::with_capacity(rows.len());
        for row in rows {
            if !drivers.iter().any(|d| d.driver_number == row.driver_number.to_string()) {
                drivers.push(row.into_driver_info());
            }
        }
        Ok(drivers)
    }

    fn timing_laps(
        &self,
        session_key: u64,
        drivers: &[DriverInfo],
        session_start: Option<DateTime<Utc>>,
        freshness: Freshness,
    ) -> Result<Vec<Lap>> {
        let query = format!("session_key={}", session_key);
        let laps: Vec<TimingLap> =
            self.get_list(&self.openf1(&format!("laps?{}", query)), freshness)?;
        let stints: Vec<Stint> =
            self.get_list(&self.openf1(&format!("stints?{}", query)), freshness)?;
        let pits: Vec<PitStop> = self.get_list(&self.openf1(&format!("pit?{}", query)), freshness)?;

        Ok(openf1::assemble_laps(LapSources {
            drivers,
            laps,
            stints: &stints,
            pits: &pits,
            session_start,
        }))
    }
}

/// Merge classified results with the timing driver list.
///
/// Practice and sprint-qualifying sessions have no classification upstream, so
/// every driver gets a row with empty result fields.
fn complete_results(results: Vec<SessionResult>, drivers: &[DriverInfo]) -> Vec<SessionResult> {
    if !results.is_empty() {
        return results;
    }
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

fn format_instant(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl DataProvider for LiveProvider {
    fn name(&self) -> &str {
        "f1data-live"
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
        let freshness = Freshness::for_season(year);
        let race = self
            .schedule(year)?
            .into_iter()
            .find(|race| race.round_number() == Some(round))
            .ok_or(Error::EventNotFound { year, round })?;
        let event = race.into_event(year).ok_or(Error::EventNotFound { year, round })?;

        let results = self.ergast_results(year, round, kind)?;
        let timing = self.timing_session(year, kind, &event)?;

        if kind.is_race_like() && results.is_empty() && timing.is_none() {
            return Err(Error::SessionNotFound {
                year,
                round,
                session: kind.code().to_string(),
            });
        }

        let timing_ref = TimingRef {
            session_key: timing.as_ref().map(|t| t.session_key),
            date_start: timing
                .as_ref()
                .and_then(|t| openf1::parse_timestamp(t.date_start.as_deref())),
        };

        let drivers = match timing_ref.session_key {
            Some(key) => {
                let drivers = self.timing_drivers(key, freshness)?;
                if drivers.is_empty() {
                    ergast::drivers_from_results(&results)
                } else {
                    drivers
                }
            }
            None => ergast::drivers_from_results(&results),
        };

        let laps = if options.laps {
            let key = timing_ref.session_key.ok_or_else(|| Error::SessionNotFound {
                year,
                round,
                session: kind.code().to_string(),
            })?;
            self.timing_laps(key, &drivers, timing_ref.date_start, freshness)?
        } else {
            Vec::new()
        };

        info!(
            year,
            round,
            session = kind.code(),
            event = %event.name,
            drivers = drivers.len(),
            laps = laps.len(),
            "session loaded"
        );

        Ok(Session {
            year,
            round,
            kind,
            results: complete_results(results, &drivers),
            event,
            drivers,
            laps,
            timing: timing_ref,
        })
    }

    fn car_data(&self, session: &Session, lap: &Lap) -> Result<CarData> {
        let window_error = || Error::TimingWindowUnavailable {
            driver: lap.driver.clone(),
            lap_number: lap.lap_number,
        };
        let session_key = session.timing.session_key.ok_or_else(window_error)?;
        let start = lap.date_start.ok_or_else(window_error)?;
        let end = match lap.lap_time {
            Some(lap_time) => chrono::Duration::from_std(lap_time)
                .ok()
                .map(|d| start + d),
            None => session
                .laps
                .iter()
                .find(|next| {
                    next.driver_number == lap.driver_number
                        && next.lap_number == lap.lap_number + 1
                })
                .and_then(|next| next.date_start),
        }
        .ok_or_else(window_error)?;

        let url = self.openf1(&format!(
            "car_data?session_key={}&driver_number={}&date>={}&date<{}",
            session_key,
            lap.driver_number,
            format_instant(start),
            format_instant(end)
        ));
        let rows: Vec<CarDataRow> = self.get_list(&url, Freshness::for_season(session.year))?;
        let mut samples = openf1::car_samples(rows, start);
        add_distance(&mut samples);

        let data = CarData { samples };
        if data.is_empty() {
            warn!(driver = %lap.driver, lap = lap.lap_number, "no car data in lap window");
        } else {
            debug!(
                driver = %lap.driver,
                lap = lap.lap_number,
                samples = data.len(),
                "car data loaded"
            );
        }
        Ok(data)
    }

    fn event_schedule(&self, year: i32) -> Result<Vec<Event>> {
        let events: Vec<Event> = self
            .schedule(year)?
            .into_iter()
            .filter_map(|race| race.into_event(year))
            .collect();
        info!(year, events = events.len(), "event schedule loaded");
        Ok(events)
    }

    fn driver_standings(&self, year: i32) -> Result<Vec<DriverStanding>> {
        let url = self.ergast(&format!("{}/driverStandings.json?limit={}", year, PAGE_LIMIT));
        let envelope: Envelope<StandingsData> = self.get_json(&url, Freshness::for_season(year))?;
        Ok(envelope
            .mr_data
            .standings_table
            .standings_lists
            .into_iter()
            .next()
            .map(|list| list.driver_standings.into_iter().map(DriverStanding::from).collect())
            .unwrap_or_default())
    }

    fn constructor_standings(&self, year: i32) -> Result<Vec<ConstructorStanding>> {
        let url = self.ergast(&format!(
            "{}/constructorStandings.json?limit={}",
            year, PAGE_LIMIT
        ));
        let envelope: Envelope<StandingsData> = self.get_json(&url, Freshness::for_season(year))?;
        Ok(envelope
            .mr_data
            .standings_table
            .standings_lists
            .into_iter()
            .next()
            .map(|list| {
                list.constructor_standings
                    .into_iter()
                    .map(ConstructorStanding::from)
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn config_defaults_point_at_public_apis() {
        let config = LiveProviderConfig::default();
        assert_eq!(config.ergast_url, DEFAULT_ERGAST_URL);
        assert_eq!(config.openf1_url, DEFAULT_OPENF1_URL);
    }

    #[test]
    fn urls_join_base_and_path() {
        let provider = LiveProvider::new(
            LiveProviderConfig {
                ergast_url: "http://ergast.test/f1".to_string(),
                openf1_url: "http://openf1.test/v1".to_string(),
                timeout: DEFAULT_TIMEOUT,
            },
            None,
        );
        assert_eq!(provider.ergast("2023.json"), "http://ergast.test/f1/2023.json");
        assert_eq!(
            provider.openf1("laps?session_key=1"),
            "http://openf1.test/v1/laps?session_key=1"
        );
    }

    #[test]
    fn cached_schedule_is_served_without_network() {
        let temp = TempDir::new().unwrap();
        let cache = ResponseCache::enable(temp.path()).unwrap();
        let config = LiveProviderConfig {
            ergast_url: "http://127.0.0.1:9/f1".to_string(),
            openf1_url: "http://127.0.0.1:9/v1".to_string(),
            timeout: Duration::from_millis(200),
        };
        let provider = LiveProvider::new(config, Some(cache.clone()));

        let body = r#"{"MRData":{"RaceTable":{"Races":[
            {"round":"1","raceName":"Bahrain Grand Prix","date":"2023-03-05",
             "Circuit":{"Location":{"locality":"Sakhir","country":"Bahrain"}},
             "FirstPractice":{"date":"2023-03-03"}}
        ]}}}"#;
        cache
            .put(&provider.ergast("2023.json?limit=100"), body.as_bytes())
            .unwrap();

        let events = provider.event_schedule(2023).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "Bahrain Grand Prix");
        assert_eq!(events[0].location, "Sakhir");
    }

    #[test]
    fn practice_results_are_built_from_drivers() {
        let drivers = vec![DriverInfo {
            abbreviation: "NOR".to_string(),
            driver_number: "4".to_string(),
            full_name: "Lando Norris".to_string(),
            team_name: "McLaren".to_string(),
            team_color: "FF8000".to_string(),
        }];
        let results = complete_results(Vec::new(), &drivers);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].abbreviation, "NOR");
        assert_eq!(results[0].position, None);
        assert_eq!(results[0].points, None);
    }

    #[test]
    fn instants_use_millisecond_precision() {
        let at = DateTime::parse_from_rfc3339("2023-03-05T15:01:02.123456+00:00")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_instant(at), "2023-03-05T15:01:02.123Z");
    }
}
