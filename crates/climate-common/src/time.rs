//! Time axis handling for gridded climate data.
//!
//! NetCDF files encode time as numeric offsets with a CF-convention
//! `units` attribute such as `hours since 1800-01-01 00:00:0.0`.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error parsing CF time metadata.
#[derive(Debug, Error, PartialEq)]
pub enum TimeParseError {
    #[error("invalid time units '{0}': expected '<unit> since <reference>'")]
    InvalidUnits(String),

    #[error("unsupported time step '{0}'")]
    UnsupportedStep(String),

    #[error("unsupported calendar '{0}'")]
    UnsupportedCalendar(String),

    #[error("invalid reference date '{0}'")]
    InvalidReference(String),

    #[error("time offset {0} is not representable as a date")]
    OutOfRange(f64),
}

/// Step size of a CF time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeStep {
    Days,
    Hours,
    Minutes,
    Seconds,
}

impl TimeStep {
    fn seconds(&self) -> f64 {
        match self {
            TimeStep::Days => 86_400.0,
            TimeStep::Hours => 3_600.0,
            TimeStep::Minutes => 60.0,
            TimeStep::Seconds => 1.0,
        }
    }

    fn parse(s: &str) -> Result<Self, TimeParseError> {
        match s.to_lowercase().as_str() {
            "day" | "days" | "d" => Ok(TimeStep::Days),
            "hour" | "hours" | "hr" | "hrs" | "h" => Ok(TimeStep::Hours),
            "minute" | "minutes" | "min" | "mins" => Ok(TimeStep::Minutes),
            "second" | "seconds" | "sec" | "secs" | "s" => Ok(TimeStep::Seconds),
            other => Err(TimeParseError::UnsupportedStep(other.to_string())),
        }
    }
}

/// Decoded CF `units` for a time coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CfTimeUnits {
    pub step: TimeStep,
    pub reference: NaiveDateTime,
}

impl CfTimeUnits {
    /// Parse a CF units string, checking the calendar is Gregorian.
    pub fn parse(units: &str, calendar: Option<&str>) -> Result<Self, TimeParseError> {
        if let Some(cal) = calendar {
            match cal.trim().to_lowercase().as_str() {
                "standard" | "gregorian" | "proleptic_gregorian" => {}
                other => return Err(TimeParseError::UnsupportedCalendar(other.to_string())),
            }
        }

        let lower = units.trim().to_lowercase();
        let (step, reference) = lower
            .split_once(" since ")
            .ok_or_else(|| TimeParseError::InvalidUnits(units.to_string()))?;

        Ok(Self {
            step: TimeStep::parse(step.trim())?,
            reference: parse_reference(reference.trim())?,
        })
    }

    /// Convert a raw offset into a timestamp.
    ///
    /// Non-finite offsets and offsets past chrono's date range are
    /// `OutOfRange`.
    pub fn decode(&self, value: f64) -> Result<NaiveDateTime, TimeParseError> {
        let millis = (value * self.step.seconds() * 1000.0).round();
        if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
            return Err(TimeParseError::OutOfRange(value));
        }
        Duration::try_milliseconds(millis as i64)
            .and_then(|delta| self.reference.checked_add_signed(delta))
            .ok_or(TimeParseError::OutOfRange(value))
    }
}

/// Parse the reference part of a CF units string.
///
/// Accepts `YYYY-MM-DD`, optionally followed by a time of day separated by
/// a space or `T`, with fractional or single-digit fields
/// (`1800-01-01 00:00:0.0`) and an optional trailing `Z` or `UTC`.
fn parse_reference(s: &str) -> Result<NaiveDateTime, TimeParseError> {
    let invalid = || TimeParseError::InvalidReference(s.to_string());

    let cleaned = s.trim_end_matches(" utc").trim_end_matches('z').trim();
    let (date_part, time_part) = match cleaned.split_once(|c: char| c == ' ' || c == 't') {
        Some((d, t)) => (d, Some(t.trim())),
        None => (cleaned, None),
    };

    let mut fields = date_part.split('-');
    let year: i32 = fields.next().and_then(|v| v.parse().ok()).ok_or_else(invalid)?;
    let month: u32 = fields.next().and_then(|v| v.parse().ok()).unwrap_or(1);
    let day: u32 = fields.next().and_then(|v| v.parse().ok()).unwrap_or(1);
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)?;

    let time = match time_part {
        None | Some("") => NaiveTime::MIN,
        Some(t) => {
            let mut parts = t.split(':');
            let hour: u32 = parts.next().and_then(|v| v.parse().ok()).ok_or_else(invalid)?;
            let minute: u32 = parts.next().and_then(|v| v.parse().ok()).unwrap_or(0);
            let second: f64 = parts.next().and_then(|v| v.parse().ok()).unwrap_or(0.0);
            let whole = second.trunc() as u32;
            let nanos = ((second - second.trunc()) * 1e9).round() as u32;
            NaiveTime::from_hms_nano_opt(hour, minute, whole, nanos).ok_or_else(invalid)?
        }
    };

    Ok(NaiveDateTime::new(date, time))
}

/// Distinct calendar years of an ordered time axis, ascending.
pub fn distinct_years(times: &[NaiveDateTime]) -> Vec<i32> {
    let mut years: Vec<i32> = times.iter().map(|t| t.year()).collect();
    years.sort_unstable();
    years.dedup();
    years
}
