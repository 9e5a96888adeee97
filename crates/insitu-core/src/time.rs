//! Epoch conversion helpers.
//!
//! Files carry time as integer counts of some unit since an origin; in
//! memory everything is `DateTime<Utc>`. The canonical on-disk encoding is
//! milliseconds since the Unix epoch, but readers may override both unit
//! and origin for files produced elsewhere.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unit of a stored epoch variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpochUnit {
    Days,
    Seconds,
    Milliseconds,
    Microseconds,
    Nanoseconds,
}

impl EpochUnit {
    /// Milliseconds per one of this unit.
    pub fn millis_factor(&self) -> f64 {
        match self {
            EpochUnit::Days => 86_400_000.0,
            EpochUnit::Seconds => 1_000.0,
            EpochUnit::Milliseconds => 1.0,
            EpochUnit::Microseconds => 1.0e-3,
            EpochUnit::Nanoseconds => 1.0e-6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EpochUnit::Days => "D",
            EpochUnit::Seconds => "s",
            EpochUnit::Milliseconds => "ms",
            EpochUnit::Microseconds => "us",
            EpochUnit::Nanoseconds => "ns",
        }
    }
}

impl Default for EpochUnit {
    fn default() -> Self {
        EpochUnit::Milliseconds
    }
}

/// Origin of a stored epoch variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpochOrigin {
    /// 1970-01-01T00:00:00Z.
    Unix,
    /// Any caller-supplied origin.
    Custom(DateTime<Utc>),
}

impl EpochOrigin {
    pub fn timestamp_millis(&self) -> i64 {
        match self {
            EpochOrigin::Unix => 0,
            EpochOrigin::Custom(dt) => dt.timestamp_millis(),
        }
    }
}

impl Default for EpochOrigin {
    fn default() -> Self {
        EpochOrigin::Unix
    }
}

/// Convert raw stored counts to UTC datetimes.
pub fn to_datetimes(raw: &[i64], unit: EpochUnit, origin: EpochOrigin) -> Vec<DateTime<Utc>> {
    let base = origin.timestamp_millis();
    raw.iter()
        .map(|&v| {
            let millis = (v as f64 * unit.millis_factor()) as i64 + base;
            DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
        })
        .collect()
}

/// Convert UTC datetimes to milliseconds since the Unix epoch, the canonical
/// write-side encoding.
pub fn to_millis(times: &[DateTime<Utc>]) -> Vec<i64> {
    times.iter().map(|t| t.timestamp_millis()).collect()
}

/// Strict monotonic increase.
pub fn strictly_increasing<T: PartialOrd>(values: &[T]) -> bool {
    values.windows(2).all(|w| w[0] < w[1])
}

/// Strict monotonic decrease.
pub fn strictly_decreasing<T: PartialOrd>(values: &[T]) -> bool {
    values.windows(2).all(|w| w[0] > w[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_millis_roundtrip() {
        let times = vec![
            Utc.with_ymd_and_hms(2014, 5, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2014, 5, 1, 0, 0, 1).unwrap(),
        ];
        let millis = to_millis(&times);
        let back = to_datetimes(&millis, EpochUnit::Milliseconds, EpochOrigin::Unix);
        assert_eq!(times, back);
    }

    #[test]
    fn test_seconds_unit() {
        let raw = vec![0_i64, 60];
        let times = to_datetimes(&raw, EpochUnit::Seconds, EpochOrigin::Unix);
        assert_eq!(times[1] - times[0], chrono::Duration::seconds(60));
    }

    #[test]
    fn test_custom_origin() {
        let origin = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        let times = to_datetimes(&[0], EpochUnit::Milliseconds, EpochOrigin::Custom(origin));
        assert_eq!(times[0], origin);
    }

    #[test]
    fn test_strict_monotonic() {
        assert!(strictly_increasing(&[1, 2, 3]));
        assert!(!strictly_increasing(&[1, 2, 2]));
        assert!(strictly_decreasing(&[3.0, 2.0, 1.0]));
        assert!(!strictly_decreasing(&[3.0, 3.0, 1.0]));
        // Single element and empty slices are trivially monotonic both ways
        assert!(strictly_increasing::<i64>(&[]));
        assert!(strictly_decreasing(&[5]));
    }
}
