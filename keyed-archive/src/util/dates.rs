/*!
 Contains date parsing functions for Apple reference-date timestamps.

 Foundation stores dates as a number of seconds relative to `2001-01-01T00:00:00Z`.
*/

use chrono::{DateTime, Utc};

/// Seconds between the Unix epoch and `2001-01-01T00:00:00Z`
pub const APPLE_EPOCH_OFFSET: i64 = 978_307_200;

const NANOS_PER_SECOND: f64 = 1_000_000_000.;

/// The instant that `NS.time` values are measured from
pub fn reference_epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(APPLE_EPOCH_OFFSET, 0).unwrap_or_default()
}

/// Convert an offset in seconds from the reference epoch into an absolute timestamp.
///
/// Offsets may be negative. Sub-second precision is kept to the nanosecond.
/// Returns [`None`] if the offset is not finite or the result is not representable.
pub fn from_reference_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }

    let whole = seconds.floor();
    // Anything outside of `i64` seconds is far beyond what chrono can represent
    if whole.abs() >= i64::MAX as f64 / 2. {
        return None;
    }
    let nanos = ((seconds - whole) * NANOS_PER_SECOND).round() as u32;

    // Rounding can carry a full second
    let (whole, nanos) = if nanos >= 1_000_000_000 {
        (whole as i64 + 1, 0)
    } else {
        (whole as i64, nanos)
    };

    DateTime::from_timestamp(whole.checked_add(APPLE_EPOCH_OFFSET)?, nanos)
}

/// Convert an absolute timestamp into an offset in seconds from the reference epoch
pub fn to_reference_seconds(date: &DateTime<Utc>) -> f64 {
    (date.timestamp() - APPLE_EPOCH_OFFSET) as f64
        + f64::from(date.timestamp_subsec_nanos()) / NANOS_PER_SECOND
}
