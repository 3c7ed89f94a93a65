//! Signed nanosecond durations with the `1h30m0s` text grammar.

use std::{fmt::Display, str::FromStr};

use thiserror::Error;

const NANOSECOND: u64 = 1;
const MICROSECOND: u64 = 1_000 * NANOSECOND;
const MILLISECOND: u64 = 1_000 * MICROSECOND;
const SECOND: u64 = 1_000 * MILLISECOND;
const MINUTE: u64 = 60 * SECOND;
const HOUR: u64 = 60 * MINUTE;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DurationError {
    #[error("invalid duration")]
    Invalid,
    #[error("missing unit in duration")]
    MissingUnit,
    #[error("unknown unit `{0}` in duration")]
    UnknownUnit(String),
    #[error("duration out of range")]
    Overflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(i64);

impl Duration {
    pub const ZERO: Duration = Duration(0);

    pub fn from_nanos(nanos: i64) -> Self {
        Duration(nanos)
    }

    pub fn as_nanos(&self) -> i64 {
        self.0
    }

    pub fn checked_add(self, rhs: Duration) -> Option<Duration> {
        self.0.checked_add(rhs.0).map(Duration)
    }

    pub fn checked_sub(self, rhs: Duration) -> Option<Duration> {
        self.0.checked_sub(rhs.0).map(Duration)
    }
}

fn unit_nanos(unit: &str) -> Option<u64> {
    Some(match unit {
        "ns" => NANOSECOND,
        "us" | "µs" | "μs" => MICROSECOND,
        "ms" => MILLISECOND,
        "s" => SECOND,
        "m" => MINUTE,
        "h" => HOUR,
        _ => return None,
    })
}

impl FromStr for Duration {
    type Err = DurationError;

    /// Parses `[-+]?(<digits>[.<digits>]<unit>)+`, or a bare `0`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (negative, mut rest) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };
        if rest == "0" {
            return Ok(Duration::ZERO);
        }
        if rest.is_empty() {
            return Err(DurationError::Invalid);
        }

        let mut total: u128 = 0;
        while !rest.is_empty() {
            let whole_len = rest.bytes().take_while(u8::is_ascii_digit).count();
            let (whole, after) = rest.split_at(whole_len);
            rest = after;

            let mut fraction = "";
            if let Some(after_dot) = rest.strip_prefix('.') {
                let len = after_dot.bytes().take_while(u8::is_ascii_digit).count();
                fraction = &after_dot[..len];
                rest = &after_dot[len..];
            }
            if whole.is_empty() && fraction.is_empty() {
                return Err(DurationError::Invalid);
            }

            let unit_len = rest
                .find(|c: char| c == '.' || c.is_ascii_digit())
                .unwrap_or(rest.len());
            let (unit, after) = rest.split_at(unit_len);
            rest = after;
            if unit.is_empty() {
                return Err(DurationError::MissingUnit);
            }
            let scale = unit_nanos(unit).ok_or_else(|| DurationError::UnknownUnit(unit.into()))?;

            let whole: u128 = if whole.is_empty() {
                0
            } else {
                whole.parse().map_err(|_| DurationError::Overflow)?
            };
            total = whole
                .checked_mul(u128::from(scale))
                .and_then(|v| total.checked_add(v))
                .ok_or(DurationError::Overflow)?;

            // digits past the nanosecond resolution of the unit cannot matter
            let fraction = &fraction[..fraction.len().min(18)];
            if !fraction.is_empty() {
                let digits: u128 = fraction.parse().map_err(|_| DurationError::Invalid)?;
                let divisor = 10u128.pow(fraction.len() as u32);
                total += digits * u128::from(scale) / divisor;
            }

            if total > u128::from(i64::MAX.unsigned_abs()) + 1 {
                return Err(DurationError::Overflow);
            }
        }

        let nanos = if negative {
            0i128 - total as i128
        } else {
            total as i128
        };
        i64::try_from(nanos)
            .map(Duration)
            .map_err(|_| DurationError::Overflow)
    }
}

/// `value` split at `precision` decimal places, rendered as `.ddd` with
/// trailing zeros removed; empty when the fractional part is zero.
fn fraction_text(value: u64, precision: u32) -> String {
    if value == 0 {
        return String::new();
    }
    let digits = format!("{value:0width$}", width = precision as usize);
    format!(".{}", digits.trim_end_matches('0'))
}

impl Display for Duration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let mut u = self.0.unsigned_abs();

        if u < SECOND {
            let (unit, precision) = match u {
                0 => return f.write_str("0s"),
                _ if u < MICROSECOND => return write!(f, "{sign}{u}ns"),
                _ if u < MILLISECOND => ("µs", 3),
                _ => ("ms", 6),
            };
            let divisor = 10u64.pow(precision);
            let fraction = fraction_text(u % divisor, precision);
            return write!(f, "{sign}{}{fraction}{unit}", u / divisor);
        }

        let fraction = fraction_text(u % SECOND, 9);
        u /= SECOND;
        let seconds = u % 60;
        u /= 60;
        if u == 0 {
            return write!(f, "{sign}{seconds}{fraction}s");
        }
        let minutes = u % 60;
        let hours = u / 60;
        if hours == 0 {
            write!(f, "{sign}{minutes}m{seconds}{fraction}s")
        } else {
            write!(f, "{sign}{hours}h{minutes}m{seconds}{fraction}s")
        }
    }
}
