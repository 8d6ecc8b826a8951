// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)

//! Period text and directory interval codec.
//!
//! Template validity and renewal periods are displayed as `"<count> <unit>"`
//! (for example `"1 years"` or `"6 weeks"`) and stored in the directory as an
//! 8-byte little-endian negative interval in 100-nanosecond ticks.
//!
//! The unit table is fixed and not calendar-aware:
//!
//! | Unit   | Hours |
//! |--------|-------|
//! | hours  | 1     |
//! | days   | 24    |
//! | weeks  | 168   |
//! | months | 720   |
//! | years  | 8760  |

use std::fmt;

use crate::error::{Result, TemplateError};

const SECONDS_PER_HOUR: u64 = 3600;
const TICKS_PER_SECOND: i64 = 10_000_000;

/// Unit of a period string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodUnit {
    /// One hour.
    Hours,
    /// 24 hours.
    Days,
    /// 168 hours.
    Weeks,
    /// 720 hours (30 days).
    Months,
    /// 8760 hours (365 days).
    Years,
}

impl PeriodUnit {
    /// Units from largest to smallest.
    pub const DESCENDING: [PeriodUnit; 5] = [
        Self::Years,
        Self::Months,
        Self::Weeks,
        Self::Days,
        Self::Hours,
    ];

    /// Parse a unit name, ignoring case. Singular forms are accepted.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hours" | "hour" => Some(Self::Hours),
            "days" | "day" => Some(Self::Days),
            "weeks" | "week" => Some(Self::Weeks),
            "months" | "month" => Some(Self::Months),
            "years" | "year" => Some(Self::Years),
            _ => None,
        }
    }

    /// Length of one unit in seconds.
    pub fn seconds(&self) -> u64 {
        let hours = match self {
            Self::Hours => 1,
            Self::Days => 24,
            Self::Weeks => 168,
            Self::Months => 720,
            Self::Years => 8760,
        };
        hours * SECONDS_PER_HOUR
    }

    /// Canonical (plural, lowercase) unit name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hours => "hours",
            Self::Days => "days",
            Self::Weeks => "weeks",
            Self::Months => "months",
            Self::Years => "years",
        }
    }
}

impl fmt::Display for PeriodUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convert a period string such as `"6 weeks"` to seconds.
///
/// # Errors
///
/// Returns [`TemplateError::Format`] when the text is not `<integer> <unit>`
/// or the unit is unknown, and [`TemplateError::Range`] when the count does
/// not fit in a 32-bit signed integer.
///
/// # Examples
///
/// ```
/// use adcs_templates::duration::parse_duration;
///
/// assert_eq!(parse_duration("2 weeks").unwrap(), 1_209_600);
/// assert!(parse_duration("bogus").is_err());
/// ```
pub fn parse_duration(text: &str) -> Result<u64> {
    let mut parts = text.split_whitespace();
    let (Some(count), Some(unit), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(TemplateError::format(format!(
            "Invalid period '{text}': expected '<integer> <unit>'"
        )));
    };

    if count.is_empty() || !count.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TemplateError::format(format!(
            "Invalid period '{text}': '{count}' is not an integer"
        )));
    }

    let count: i32 = count.parse().map_err(|_| {
        TemplateError::range(format!("Invalid period '{text}': count exceeds 32-bit range"))
    })?;

    let unit = PeriodUnit::parse(unit).ok_or_else(|| {
        TemplateError::format(format!("Invalid period '{text}': unknown unit '{unit}'"))
    })?;

    Ok(u64::from(count.unsigned_abs()) * unit.seconds())
}

/// Render seconds as canonical period text.
///
/// Picks the largest unit that divides the value evenly. The text always
/// parses back to the same number of seconds.
///
/// # Errors
///
/// Returns [`TemplateError::Range`] when `seconds` is not a whole number of
/// hours, or when the count does not fit a 32-bit signed integer.
///
/// # Examples
///
/// ```
/// use adcs_templates::duration::format_duration;
///
/// assert_eq!(format_duration(1_209_600).unwrap(), "2 weeks");
/// assert!(format_duration(5400).is_err());
/// ```
pub fn format_duration(seconds: u64) -> Result<String> {
    if seconds % SECONDS_PER_HOUR != 0 {
        return Err(TemplateError::range(format!(
            "Period of {seconds}s is not a whole number of hours"
        )));
    }

    let unit = PeriodUnit::DESCENDING
        .into_iter()
        .find(|unit| seconds != 0 && seconds % unit.seconds() == 0)
        .unwrap_or(PeriodUnit::Hours);

    let count = seconds / unit.seconds();
    if i32::try_from(count).is_err() {
        return Err(TemplateError::range(format!(
            "Period of {seconds}s exceeds 32-bit range"
        )));
    }

    Ok(format!("{count} {unit}"))
}

/// Decode a directory interval (`pKIExpirationPeriod`, `pKIOverlapPeriod`) to seconds.
pub fn period_from_bytes(bytes: &[u8]) -> Result<u64> {
    let raw: [u8; 8] = bytes.try_into().map_err(|_| {
        TemplateError::format(format!(
            "Period interval must be 8 bytes, got {}",
            bytes.len()
        ))
    })?;

    let ticks = i64::from_le_bytes(raw);
    Ok(ticks.unsigned_abs() / TICKS_PER_SECOND as u64)
}

/// Encode seconds as a directory interval.
pub fn period_to_bytes(seconds: u64) -> Result<[u8; 8]> {
    let ticks = i64::try_from(seconds)
        .ok()
        .and_then(|s| s.checked_mul(TICKS_PER_SECOND))
        .ok_or_else(|| TemplateError::range(format!("Period of {seconds}s is too large")))?;

    Ok((-ticks).to_le_bytes())
}
