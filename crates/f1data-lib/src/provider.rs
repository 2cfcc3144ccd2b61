//! The motorsport data provider seam.
//!
//! Everything the HTTP facade knows about F1 data flows through
//! [`DataProvider`]. The live implementation lives in [`crate::live`]; tests
//! substitute in-memory fixtures.

use crate::error::Result;
use crate::model::{
    CarData, ConstructorStanding, DriverStanding, Event, Lap, LoadOptions, Session, SessionKind,
};

/// Source of sessions, car data, schedules, and standings.
///
/// Implementations perform blocking I/O. Async callers should dispatch calls
/// onto a blocking thread pool.
pub trait DataProvider: Send + Sync {
    /// Short provider identifier reported by health checks.
    fn name(&self) -> &str;

    /// Provider version reported by health checks.
    fn version(&self) -> &str;

    /// Load one session of an event weekend.
    fn load_session(
        &self,
        year: i32,
        round: u32,
        kind: SessionKind,
        options: LoadOptions,
    ) -> Result<Session>;

    /// Car-data channels for one lap of a loaded session.
    ///
    /// The returned samples carry time relative to the lap start; the
    /// distance channel is filled in by [`crate::telemetry::add_distance`].
    fn car_data(&self, session: &Session, lap: &Lap) -> Result<CarData>;

    /// Full event schedule of a season, in round order.
    fn event_schedule(&self, year: i32) -> Result<Vec<Event>>;

    /// Drivers' championship table after the latest round of a season.
    fn driver_standings(&self, year: i32) -> Result<Vec<DriverStanding>>;

    /// Constructors' championship table after the latest round of a season.
    fn constructor_standings(&self, year: i32) -> Result<Vec<ConstructorStanding>>;
}
