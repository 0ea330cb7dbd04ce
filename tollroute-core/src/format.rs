//! Display text for distances and durations.

use crate::output::Measure;

const SECONDS_PER_HOUR: u64 = 3_600;
const SECONDS_PER_MINUTE: u64 = 60;

/// Distance as whole kilometres, keeping the raw metres as the value.
///
/// # Examples
///
/// ```
/// use tollroute_core::format::distance;
///
/// let d = distance(1_234_567.0);
/// assert_eq!(d.text, "1235 km");
/// assert!((d.value - 1_234_567.0).abs() < f64::EPSILON);
/// ```
#[must_use]
#[expect(clippy::float_arithmetic, reason = "metres are scaled to kilometres")]
pub fn distance(metres: f64) -> Measure {
    Measure {
        text: format!("{:.0} km", metres / 1000.0),
        value: metres,
    }
}

/// Duration as `<h>h<m>m<s>s`, keeping the raw seconds as the value.
#[must_use]
pub fn duration(seconds: f64) -> Measure {
    let (h, m, s) = split_seconds(whole_seconds(seconds));
    Measure {
        text: format!("{h}h{m}m{s}s"),
        value: seconds,
    }
}

/// Compact duration dropping leading zero units: `1h2m3s`, `10m0s`, `45s`.
#[must_use]
pub fn compact_duration(seconds: u64) -> String {
    match split_seconds(seconds) {
        (0, 0, s) => format!("{s}s"),
        (0, m, s) => format!("{m}m{s}s"),
        (h, m, s) => format!("{h}h{m}m{s}s"),
    }
}

/// Truncate a non-negative duration to whole seconds.
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "value is clamped to a non-negative whole number first"
)]
pub fn whole_seconds(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds.trunc() as u64
    } else {
        0
    }
}

const fn split_seconds(total: u64) -> (u64, u64, u64) {
    let hours = total.div_euclid(SECONDS_PER_HOUR);
    let rest = total.rem_euclid(SECONDS_PER_HOUR);
    (
        hours,
        rest.div_euclid(SECONDS_PER_MINUTE),
        rest.rem_euclid(SECONDS_PER_MINUTE),
    )
}
