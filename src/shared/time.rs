use std::{
    borrow::Cow,
    fmt::Display,
    ops::{Add, Neg, Sub},
};

use chrono::{DateTime, Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

pub const SECONDS_PER_DAY: u32 = 24 * 60 * 60;

const HOUR_TO_SEC: u32 = 60 * 60;
const MINUTE_TO_SEC: u32 = 60;

/// Wall-clock time of day, stored as seconds past local midnight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Time(u32);

impl Sub<Time> for Time {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Self::Output {
        Duration(self.0 as i32 - rhs.0 as i32)
    }
}

impl Add<Duration> for Time {
    type Output = Self;

    /// Wraps around midnight.
    fn add(self, rhs: Duration) -> Self::Output {
        let secs = (self.0 as i64 + rhs.0 as i64).rem_euclid(SECONDS_PER_DAY as i64);
        Self(secs as u32)
    }
}

impl Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hms_string())
    }
}

impl Time {
    /// Samples the local clock. Call once per computation.
    pub fn now() -> Self {
        let now = Local::now();
        Self(now.num_seconds_from_midnight())
    }

    /// Values past the end of the day wrap around.
    pub const fn from_seconds(secs: u32) -> Self {
        Self(secs % SECONDS_PER_DAY)
    }

    pub const fn from_hms(hours: u32, minutes: u32, seconds: u32) -> Self {
        Self::from_seconds(hours * HOUR_TO_SEC + minutes * MINUTE_TO_SEC + seconds)
    }

    pub const fn as_seconds(&self) -> u32 {
        self.0
    }

    pub fn to_hms_string(&self) -> String {
        let h = self.0 / 3600;
        let m = (self.0 % 3600) / 60;
        let s = self.0 % 60;
        format!("{:02}:{:02}:{:02}", h, m, s)
    }

    /// Parses the loose time formats found on live tracking pages:
    /// an ISO-8601 timestamp, `"17:18"` or `"5:18pm"`.
    ///
    /// Only the time of day is kept. Timestamps carrying an offset are
    /// converted to the local clock first, naive timestamps are taken as local.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        parse_timestamp(value).or_else(|| parse_clock(value))
    }
}

fn parse_timestamp(value: &str) -> Option<Time> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        let local = dt.with_timezone(&Local);
        return Some(Time(local.num_seconds_from_midnight()));
    }
    // Offsets without seconds or without a colon, `Z` read as UTC.
    const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M%#z"];
    let with_offset = match value.strip_suffix(['Z', 'z']) {
        Some(rest) => Cow::Owned(format!("{rest}+00:00")),
        None => Cow::Borrowed(value),
    };
    if let Some(dt) = OFFSET_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(&with_offset, format).ok())
    {
        let local = dt.with_timezone(&Local);
        return Some(Time(local.num_seconds_from_midnight()));
    }
    const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|dt| Time(dt.time().num_seconds_from_midnight()))
}

/// `h:mm` or `hh:mm`, optionally followed directly by `am`/`pm`.
fn parse_clock(value: &str) -> Option<Time> {
    let lower = value.to_ascii_lowercase();
    let (clock, meridiem) = if let Some(rest) = lower.strip_suffix("am") {
        (rest, Some(false))
    } else if let Some(rest) = lower.strip_suffix("pm") {
        (rest, Some(true))
    } else {
        (lower.as_str(), None)
    };

    let (hours, minutes) = clock.split_once(':')?;
    if !(1..=2).contains(&hours.len()) || minutes.len() != 2 {
        return None;
    }
    if !hours.bytes().chain(minutes.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;

    match meridiem {
        Some(true) if hours != 12 => hours += 12,
        Some(false) if hours == 12 => hours = 0,
        _ => {}
    }
    if hours >= 24 || minutes >= 60 {
        return None;
    }
    Some(Time(hours * HOUR_TO_SEC + minutes * MINUTE_TO_SEC))
}

/// Signed span between two times of day, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Duration(i32);

impl From<i32> for Duration {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl Duration {
    pub const fn from_seconds(secs: i32) -> Self {
        Self(secs)
    }

    pub const fn from_minutes(minutes: i32) -> Self {
        Self(minutes * 60)
    }

    pub const fn from_hours(hours: i32) -> Self {
        Self(hours * 60 * 60)
    }

    pub const fn as_seconds(&self) -> i32 {
        self.0
    }

    /// Whole minutes, truncated toward zero.
    pub const fn as_minutes(&self) -> i32 {
        self.0 / 60
    }

    pub const fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

impl Neg for Duration {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Add for Duration {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Duration {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

#[test]
fn parse_unparse_1() {
    let time = Time::parse("00:00").unwrap();
    assert_eq!("00:00:00", time.to_hms_string())
}

#[test]
fn parse_unparse_2() {
    let time = Time::parse("12:30pm").unwrap();
    assert_eq!("12:30:00", time.to_hms_string())
}

#[test]
fn parse_unparse_3() {
    let time = Time::parse("12:05am").unwrap();
    assert_eq!("00:05:00", time.to_hms_string())
}

#[test]
fn add_wraps_midnight() {
    let time = Time::from_hms(23, 59, 0) + Duration::from_minutes(2);
    assert_eq!(time.as_seconds(), 60)
}

#[test]
fn sub_is_signed() {
    let early = Time::from_hms(17, 0, 0);
    let late = Time::from_hms(17, 10, 0);
    assert_eq!((early - late).as_minutes(), -10);
    assert_eq!((late - early).as_minutes(), 10);
}
