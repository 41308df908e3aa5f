//! Commit date distribution
//!
//! Spreads one timestamp per pending change across the window between the
//! latest commit and now.

use chrono::{DateTime, Duration, FixedOffset};

/// Generate `count` commit dates for the window `[start, end]`.
///
/// - `end < start`: one second apart, starting at `start`
/// - window shorter than a day: evenly spaced strictly inside the window
/// - a single change: the midpoint
/// - more changes than whole days: evenly spaced strictly inside the window
/// - otherwise: one change per day, starting at `start`
///
/// The result always has exactly `count` elements.
pub fn generate(
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    count: usize,
) -> Vec<DateTime<FixedOffset>> {
    if end < start {
        return (0..count)
            .map(|i| start + Duration::seconds(i as i64))
            .collect();
    }

    let delta = end - start;
    let days = delta.num_days();

    if days <= 0 {
        // Already committed today
        return interpolate(start, delta, count);
    }

    match count {
        0 => Vec::new(),
        1 => vec![start + delta / 2],
        n if days < n as i64 => interpolate(start, delta, n),
        n => (0..n).map(|i| start + Duration::days(i as i64)).collect(),
    }
}

/// Number of whole days between two timestamps, remainder discarded.
pub fn day_span(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> i64 {
    (end - start).num_days()
}

/// `start + delta * (i + 1) / (count + 1)` for each `i`, in microseconds.
///
/// Git records whole seconds, so when the window is shorter than `count + 1`
/// seconds some commits end up dated exactly `start` once written.
fn interpolate(
    start: DateTime<FixedOffset>,
    delta: Duration,
    count: usize,
) -> Vec<DateTime<FixedOffset>> {
    let micros = delta.num_microseconds().unwrap_or(i64::MAX) as i128;
    let parts = count as i128 + 1;

    (0..count)
        .map(|i| {
            let offset = micros * (i as i128 + 1) / parts;
            start + Duration::microseconds(offset as i64)
        })
        .collect()
}
