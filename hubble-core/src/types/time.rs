//! Time counter conversions.
//!
//! The time counter is the coarse input to the key schedule: the number of
//! whole UTC days since the Unix epoch.

use chrono::{DateTime, Utc};

use crate::constants::SECONDS_PER_DAY;

/// Whole days since the Unix epoch, UTC.
pub type TimeCounter = u32;

/// 10-bit per-message counter carried in the packet header.
pub type SequenceCounter = u16;

/// Converts a timestamp into its time counter.
///
/// Timestamps before the epoch clamp to counter 0.
pub fn time_to_counter(t: DateTime<Utc>) -> TimeCounter {
    let days = t.timestamp().div_euclid(SECONDS_PER_DAY);
    TimeCounter::try_from(days.max(0)).unwrap_or(TimeCounter::MAX)
}

/// Returns midnight UTC of the day identified by `counter`.
///
/// Counters beyond the range representable by `chrono` map to
/// [`DateTime::<Utc>::MAX_UTC`].
pub fn counter_to_time(counter: TimeCounter) -> DateTime<Utc> {
    DateTime::from_timestamp(i64::from(counter) * SECONDS_PER_DAY, 0)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
