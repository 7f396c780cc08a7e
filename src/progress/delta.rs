use crate::shared::time::Time;

/// Short relative label for `target` as seen from `now`.
///
/// ```
/// use livetrack::{progress::format_delta, shared::Time};
///
/// let now = Time::from_hms(17, 0, 0);
/// assert_eq!(format_delta(Time::from_hms(17, 5, 0), now), "in 5m");
/// assert_eq!(format_delta(Time::from_hms(15, 45, 0), now), "1h 15m ago");
/// ```
pub fn format_delta(target: Time, now: Time) -> String {
    let diff = target - now;
    let past = diff.is_negative();
    let abs = diff.abs().as_seconds();

    if abs < 60 {
        return if past { "Departed just now" } else { "Arriving soon" }.to_string();
    }

    let mins = abs / 60;
    if mins < 60 {
        return if past {
            format!("{mins}m ago")
        } else {
            format!("in {mins}m")
        };
    }

    let hours = mins / 60;
    let rem = mins % 60;
    let span = if rem > 0 {
        format!("{hours}h {rem}m")
    } else {
        format!("{hours}h")
    };
    if past {
        format!("{span} ago")
    } else {
        format!("in {span}")
    }
}
