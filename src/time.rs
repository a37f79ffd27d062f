//! Fixed-point archive timestamps.
//!
//! An archive timestamp is a 64-bit value whose high 36 bits are extended Unix seconds and
//! whose low 28 bits are fractional seconds in units of 2^-28 s.
//!
//! **Precision:** converting nanoseconds to 2^-28 s units and back truncates on both legs, so
//! a round trip through [`to_archive_time`] and [`from_archive_time`] may lose up to roughly
//! 4 ns.
//!
//! **Range:** the encoding holds seconds in `0..=MAX_ARCHIVE_SECONDS`, from the Unix epoch to
//! roughly the year 3058.

use crate::error::StreamError;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::fmt;

/// Multiplier from an archive timestamp to Unix seconds with fraction (2^-28).
pub const SECONDS_SCALER: f64 = 3.725290298461914e-9;

/// Multiplier from 2^-28 s units to nanoseconds (10^9 / 2^28).
const TO_NANOS_SCALER: f64 = 3.725290298461914;

/// Multiplier from nanoseconds to 2^-28 s units (2^28 / 10^9).
const FROM_NANOS_SCALER: f64 = 0.268435456;

/// Number of bits holding fractional seconds.
pub const FRACTION_BITS: u32 = 28;

const FRACTION_MASK: i64 = (1 << FRACTION_BITS) - 1;

/// Largest whole second an archive timestamp can hold without turning negative.
pub const MAX_ARCHIVE_SECONDS: i64 = (1 << (63 - FRACTION_BITS)) - 1;

/// Encodes a calendar instant as an archive timestamp.
///
/// Instants before the epoch encode as `0` and instants past [`MAX_ARCHIVE_SECONDS`] as
/// `i64::MAX`. Use [`try_to_archive_time`] to reject them instead.
pub fn to_archive_time(instant: DateTime<Utc>) -> i64 {
    match instant.timestamp() {
        hi if hi < 0 => 0,
        hi if hi > MAX_ARCHIVE_SECONDS => i64::MAX,
        hi => encode(hi, instant.timestamp_subsec_nanos()),
    }
}

/// Encodes a calendar instant, failing with [`StreamError::Configuration`] when its seconds do
/// not fit the 36-bit field.
pub fn try_to_archive_time(instant: DateTime<Utc>) -> Result<i64, StreamError> {
    let hi = instant.timestamp();
    if !(0..=MAX_ARCHIVE_SECONDS).contains(&hi) {
        return Err(StreamError::Configuration(format!(
            "{} is outside the archive time range",
            format_instant(&instant, 0)
        )));
    }
    Ok(encode(hi, instant.timestamp_subsec_nanos()))
}

fn encode(hi: i64, nanos: u32) -> i64 {
    let lo = (f64::from(nanos) * FROM_NANOS_SCALER) as i64;
    (hi << FRACTION_BITS) | (lo & FRACTION_MASK)
}

/// Decodes an archive timestamp into a calendar instant.
pub fn from_archive_time(timestamp: i64) -> DateTime<Utc> {
    let hi = ((timestamp as u64) >> FRACTION_BITS) as i64;
    let units = timestamp & FRACTION_MASK;
    let nanos = (units as f64 * TO_NANOS_SCALER) as u32;

    // 36-bit seconds and sub-second nanos are always representable.
    DateTime::from_timestamp(hi, nanos).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Converts an archive timestamp to Unix seconds including the fractional part.
pub fn archive_time_as_seconds(timestamp: i64) -> f64 {
    timestamp as f64 * SECONDS_SCALER
}

/// Returns the current wall-clock time as an archive timestamp.
pub fn now() -> i64 {
    to_archive_time(Utc::now())
}

/// Adds whole milliseconds to an instant in calendar time, or `None` past chrono's range.
pub fn plus_millis(instant: DateTime<Utc>, millis: i64) -> Option<DateTime<Utc>> {
    instant.checked_add_signed(Duration::try_milliseconds(millis)?)
}

/// Renders an instant as `yyyy-MM-dd HH:mm:ss` followed by `digits` fractional-second digits
/// (capped at 9, truncated rather than rounded).
pub fn format_instant<Tz>(instant: &DateTime<Tz>, digits: u8) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let mut out = instant.format("%Y-%m-%d %H:%M:%S").to_string();
    let digits = usize::from(digits.min(9));
    if digits > 0 {
        let nanos = format!("{:09}", instant.timestamp_subsec_nanos() % 1_000_000_000);
        out.push('.');
        out.push_str(&nanos[..digits]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_seconds_are_exact() {
        let instant = Utc.with_ymd_and_hms(2019, 3, 1, 12, 30, 0).unwrap();
        let ts = to_archive_time(instant);

        assert_eq!(ts >> FRACTION_BITS, instant.timestamp());
        assert_eq!(ts & FRACTION_MASK, 0);
        assert_eq!(from_archive_time(ts), instant);
    }

    #[test]
    fn test_round_trip_within_tolerance() {
        let base = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        for nanos in [1, 999, 1_000, 123_456_789, 500_000_000, 999_999_999] {
            let instant = base + Duration::nanoseconds(nanos);
            let decoded = from_archive_time(to_archive_time(instant));
            let drift = (decoded - instant).num_nanoseconds().unwrap().abs();
            assert!(drift <= 100, "drift of {drift}ns at {nanos}ns");
        }
    }

    #[test]
    fn test_half_second_fraction() {
        let instant = Utc.timestamp_opt(1_000, 500_000_000).unwrap();
        let ts = to_archive_time(instant);
        assert_eq!(ts & FRACTION_MASK, 1 << 27);
        assert!((archive_time_as_seconds(ts) - 1_000.5).abs() < 1e-9);
    }

    #[test]
    fn test_encoding_is_ordered() {
        let a = Utc.timestamp_opt(1_600_000_000, 10).unwrap();
        let b = Utc.timestamp_opt(1_600_000_000, 900_000_000).unwrap();
        let c = Utc.timestamp_opt(1_600_000_001, 0).unwrap();
        assert!(to_archive_time(a) < to_archive_time(b));
        assert!(to_archive_time(b) < to_archive_time(c));
    }

    #[test]
    fn test_out_of_range_seconds_do_not_wrap() {
        let last = Utc.timestamp_opt(MAX_ARCHIVE_SECONDS, 0).unwrap();
        assert_eq!(
            try_to_archive_time(last).unwrap(),
            MAX_ARCHIVE_SECONDS << FRACTION_BITS
        );
        assert_eq!(from_archive_time(to_archive_time(last)), last);

        let beyond = Utc.timestamp_opt(MAX_ARCHIVE_SECONDS + 1, 0).unwrap();
        assert!(matches!(
            try_to_archive_time(beyond),
            Err(StreamError::Configuration(_))
        ));
        assert_eq!(to_archive_time(beyond), i64::MAX);

        let before_epoch = Utc.timestamp_opt(-1, 0).unwrap();
        assert!(try_to_archive_time(before_epoch).is_err());
        assert_eq!(to_archive_time(before_epoch), 0);
    }

    #[test]
    fn test_plus_millis_is_checked() {
        let base = Utc.timestamp_opt(1_000, 0).unwrap();
        assert_eq!(
            plus_millis(base, 1_500),
            Some(Utc.timestamp_opt(1_001, 500_000_000).unwrap())
        );
        assert_eq!(plus_millis(DateTime::<Utc>::MAX_UTC, 1), None);
        assert_eq!(plus_millis(base, i64::MAX), None);
    }

    #[test]
    fn test_format_instant() {
        let instant = Utc.timestamp_opt(1_488_326_400, 123_456_789).unwrap();
        assert_eq!(format_instant(&instant, 0), "2017-03-01 00:00:00");
        assert_eq!(format_instant(&instant, 3), "2017-03-01 00:00:00.123");
        assert_eq!(format_instant(&instant, 12), "2017-03-01 00:00:00.123456789");
    }
}
