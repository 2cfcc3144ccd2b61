//! Lap selection and derived telemetry channels.

use crate::error::{Error, Result};
use crate::model::{CarSample, Lap, Session};

/// Pick a single lap of `driver` from a loaded session.
///
/// With `lap_number` the matching lap is returned; without it the driver's
/// fastest timed lap is chosen (earliest lap wins a tie). A driver absent
/// from the session yields [`Error::DriverNotFound`]. Any lap number the
/// driver did not complete, zero and negatives included, yields
/// [`Error::LapNotFound`].
pub fn select_lap<'a>(
    session: &'a Session,
    driver: &str,
    lap_number: Option<i64>,
) -> Result<&'a Lap> {
    let mut laps = session
        .laps
        .iter()
        .filter(|lap| lap.driver.eq_ignore_ascii_case(driver))
        .peekable();
    if laps.peek().is_none() && session.driver(driver).is_none() {
        return Err(Error::DriverNotFound {
            driver: driver.to_string(),
        });
    }

    let selected = match lap_number {
        Some(number) => laps.find(|lap| i64::from(lap.lap_number) == number),
        None => laps
            .filter_map(|lap| lap.lap_time.map(|time| (time, lap)))
            .min_by(|(a, a_lap), (b, b_lap)| {
                a.cmp(b).then(a_lap.lap_number.cmp(&b_lap.lap_number))
            })
            .map(|(_, lap)| lap),
    };

    selected.ok_or_else(|| Error::LapNotFound {
        driver: driver.to_string(),
        lap_number,
    })
}

/// Fill in the cumulative distance channel.
///
/// Distance is integrated from speed (km/h) over the time delta between
/// consecutive samples; the first sample sits at 0 m.
pub fn add_distance(samples: &mut [CarSample]) {
    let mut distance = 0.0;
    let mut previous_time = None;

    for sample in samples.iter_mut() {
        if let Some(prev) = previous_time {
            let dt = sample.time.saturating_sub(prev).as_secs_f64();
            distance += sample.speed / 3.6 * dt;
        }
        sample.distance = distance;
        previous_time = Some(sample.time);
    }
}
