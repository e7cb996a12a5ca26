//! Human friendly time-to-live parsing.
//!
//! Cache lifetimes can be configured as booleans, plain numbers or duration
//! strings. [`parse`] turns every accepted shape into a whole number of
//! seconds, and `0` means caching is disabled for that call:
//!
//! | Input | Seconds |
//! |-------|---------|
//! | `false`, `0`, `""`, absent | `0` |
//! | `true` | [`DEFAULT_EXPIRE_SECONDS`] (one hour) |
//! | `90` | `90` |
//! | `"2s"`, `"2000ms"` | `2` |
//! | `"1.5h"`, `"90 minutes"` | `5400` |
//! | `"10,000s"`, `"10_000s"` | `10000` |
//! | `"soon"` | `0` |
//!
//! A string without a recognised unit is read as seconds. Any non-zero
//! magnitude that would round down to zero is kept at one second so a short
//! duration never silently turns caching off.
//!
//! ```
//! use fetchbox_core::parse;
//!
//! assert_eq!(parse("1s"), parse("1000ms"));
//! assert_eq!(parse("1d"), parse("24h"));
//! assert_eq!(parse(true), 3600);
//! assert_eq!(parse(false), 0);
//! ```

use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Lifetime used when caching is enabled with a bare `true`.
pub const DEFAULT_EXPIRE_SECONDS: u64 = 60 * 60;

const MILLISECOND: f64 = 1.0;
const SECOND: f64 = MILLISECOND * 1000.0;
const MINUTE: f64 = SECOND * 60.0;
const HOUR: f64 = MINUTE * 60.0;
const DAY: f64 = HOUR * 24.0;
const WEEK: f64 = DAY * 7.0;
const YEAR: f64 = DAY * 365.25;
const MONTH: f64 = YEAR / 12.0;

lazy_static! {
    static ref DURATION: Regex =
        Regex::new(r"(-?(?:\d+\.?\d*|\d*\.?\d+)(?:e[-+]?\d+)?)\s*(\p{L}*)")
            .expect("duration pattern is valid");
}

/// Raw lifetime value as found in configuration.
///
/// Deserializes from a boolean, a number or a string, in that order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expire {
    /// `true` caches for one hour, `false` disables caching.
    Flag(bool),
    /// Number of seconds.
    Seconds(f64),
    /// Duration expression such as `"2s"` or `"1 week"`.
    Text(String),
}

impl Expire {
    /// Resolves the value to whole seconds.
    pub fn seconds(&self) -> u64 {
        match self {
            Expire::Flag(true) => DEFAULT_EXPIRE_SECONDS,
            Expire::Flag(false) => 0,
            Expire::Seconds(seconds) => whole_seconds(*seconds),
            Expire::Text(text) => parse_text(text),
        }
    }

    /// Returns `true` if the value resolves to zero seconds.
    pub fn is_disabled(&self) -> bool {
        self.seconds() == 0
    }
}

/// Parses any accepted lifetime shape into whole seconds.
pub fn parse(input: impl Into<Expire>) -> u64 {
    input.into().seconds()
}

fn parse_text(text: &str) -> u64 {
    let normalized: String = text
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, ',' | '_'))
        .collect();

    let Some(captures) = DURATION.captures(&normalized) else {
        return 0;
    };
    let Ok(value) = captures[1].parse::<f64>() else {
        return 0;
    };
    let unit = captures.get(2).map_or("", |unit| unit.as_str());
    let millis = unit_millis(unit)
        .or_else(|| unit.strip_suffix('s').and_then(unit_millis))
        .unwrap_or(SECOND);

    whole_seconds(value * millis / SECOND)
}

fn unit_millis(unit: &str) -> Option<f64> {
    let millis = match unit {
        "ns" | "nanosecond" => MILLISECOND / 1_000_000.0,
        "us" | "µs" | "μs" | "microsecond" => MILLISECOND / 1000.0,
        "ms" | "millisecond" => MILLISECOND,
        "" | "s" | "sec" | "second" => SECOND,
        "m" | "min" | "minute" => MINUTE,
        "h" | "hr" | "hour" => HOUR,
        "d" | "day" => DAY,
        "w" | "wk" | "week" => WEEK,
        "b" | "month" => MONTH,
        "y" | "yr" | "year" => YEAR,
        _ => return None,
    };
    Some(millis)
}

fn whole_seconds(seconds: f64) -> u64 {
    if seconds.is_nan() || seconds == 0.0 {
        return 0;
    }
    // `as` saturates, so infinities end up at u64::MAX.
    (seconds.abs().round() as u64).max(1)
}

impl From<bool> for Expire {
    fn from(flag: bool) -> Self {
        Expire::Flag(flag)
    }
}

impl From<f64> for Expire {
    fn from(seconds: f64) -> Self {
        Expire::Seconds(seconds)
    }
}

impl From<u64> for Expire {
    fn from(seconds: u64) -> Self {
        Expire::Seconds(seconds as f64)
    }
}

impl From<u32> for Expire {
    fn from(seconds: u32) -> Self {
        Expire::Seconds(f64::from(seconds))
    }
}

impl From<i64> for Expire {
    fn from(seconds: i64) -> Self {
        Expire::Seconds(seconds as f64)
    }
}

impl From<i32> for Expire {
    fn from(seconds: i32) -> Self {
        Expire::Seconds(f64::from(seconds))
    }
}

impl From<&str> for Expire {
    fn from(text: &str) -> Self {
        Expire::Text(text.to_owned())
    }
}

impl From<String> for Expire {
    fn from(text: String) -> Self {
        Expire::Text(text)
    }
}

impl From<Duration> for Expire {
    fn from(duration: Duration) -> Self {
        Expire::Seconds(duration.as_secs_f64())
    }
}

impl<T> From<Option<T>> for Expire
where
    T: Into<Expire>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Expire::Flag(false), Into::into)
    }
}
