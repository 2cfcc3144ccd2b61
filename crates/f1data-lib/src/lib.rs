//! F1 data library entry points.
//!
//! This crate loads sessions, lap timing, car telemetry, event schedules and
//! championship standings through the [`DataProvider`] seam, and derives the
//! season-level aggregates served by the HTTP facade. Higher-level consumers
//! (the service crates) should only depend on the functions exported here
//! instead of reimplementing behavior.
//!

#![deny(warnings)]

pub mod analysis;
pub mod cache;
pub mod error;
pub mod live;
pub mod model;
pub mod provider;
pub mod telemetry;
pub mod timing;

pub use analysis::{
    driver_performance, team_analysis, DriverRacePerformance, SeasonPerformance, SeasonTeams,
    TeamSeasonSummary,
};
pub use cache::{default_cache_dir, Freshness, ResponseCache, DEFAULT_MAX_AGE};
pub use error::{Error, Result};
pub use live::{LiveProvider, LiveProviderConfig};
pub use model::{
    CarData, CarSample, ConstructorRef, ConstructorStanding, DriverInfo, DriverRef,
    DriverStanding, Event, EventFormat, Lap, LoadOptions, Session, SessionKind, SessionResult,
    TimingRef,
};
pub use provider::DataProvider;
pub use telemetry::{add_distance, select_lap};
pub use timing::format_timedelta;
