use chrono::{DateTime, Utc};

const MINUTE: i64 = 60;
const HOUR: i64 = 3_600;
const DAY: i64 = 86_400;

/// Coarse, human-readable distance between two instants, e.g. `"2 day(s)"`.
/// Order of the arguments does not matter. Sub-second precision is dropped.
pub fn diff(a: DateTime<Utc>, b: DateTime<Utc>) -> String {
    diff_seconds(a.timestamp(), b.timestamp())
}

/// Same as [`diff`] on unix seconds.
///
/// Thresholds are strict: exactly one hour still reads as minutes. Larger
/// units round half away from zero, so 90 seconds is "2 minute(s)".
pub fn diff_seconds(a: i64, b: i64) -> String {
    let d = a.abs_diff(b);
    let scaled = |unit: i64| (d as f64 / unit as f64).round() as u64;
    if d > DAY as u64 {
        format!("{} day(s)", scaled(DAY))
    } else if d > HOUR as u64 {
        format!("{} hour(s)", scaled(HOUR))
    } else if d > MINUTE as u64 {
        format!("{} minute(s)", scaled(MINUTE))
    } else {
        format!("{d} second(s)")
    }
}
