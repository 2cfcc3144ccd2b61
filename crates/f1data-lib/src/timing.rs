//! Duration helpers for lap and session timings.
//!
//! Durations are rendered in the timedelta notation the downstream backend
//! already consumes, e.g. `0 days 00:01:32.608000`.

use std::time::Duration;

const SECONDS_PER_DAY: u64 = 86_400;

/// Render a duration as a timedelta string (`D days HH:MM:SS[.ffffff]`).
///
/// The fractional part is printed with microsecond precision and omitted
/// entirely when the duration is a whole number of seconds.
pub fn format_timedelta(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let days = total_secs / SECONDS_PER_DAY;
    let rem = total_secs % SECONDS_PER_DAY;
    let (hours, minutes, seconds) = (rem / 3600, (rem % 3600) / 60, rem % 60);
    let micros = duration.subsec_micros();

    if micros == 0 {
        format!("{days} days {hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{days} days {hours:02}:{minutes:02}:{seconds:02}.{micros:06}")
    }
}

/// Convert a floating point number of seconds into a duration.
///
/// The value is rounded to whole microseconds. Negative, NaN and infinite
/// inputs have no meaningful duration and map to `None`.
pub fn duration_from_secs(secs: f64) -> Option<Duration> {
    if secs.is_finite() && secs >= 0.0 {
        Some(Duration::from_micros((secs * 1_000_000.0).round() as u64))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_lap_time_with_micros() {
        let d = Duration::from_millis(92_608);
        assert_eq!(format_timedelta(d), "0 days 00:01:32.608000");
    }

    #[test]
    fn formats_whole_seconds_without_fraction() {
        assert_eq!(format_timedelta(Duration::from_secs(61)), "0 days 00:01:01");
    }

    #[test]
    fn formats_multi_hour_and_days() {
        let d = Duration::from_secs(SECONDS_PER_DAY + 2 * 3600 + 5);
        assert_eq!(format_timedelta(d), "1 days 02:00:05");
    }

    #[test]
    fn rejects_invalid_seconds() {
        assert_eq!(duration_from_secs(-1.0), None);
        assert_eq!(duration_from_secs(f64::NAN), None);
        assert!(duration_from_secs(0.0).is_some());
    }

    #[test]
    fn float_seconds_round_to_micros() {
        let d = duration_from_secs(91.608).unwrap();
        assert_eq!(format_timedelta(d), "0 days 00:01:31.608000");
    }
}
