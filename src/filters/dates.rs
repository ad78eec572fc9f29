use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::JournalError;

// "3/14/2024", "3/14/2024, 10:30:00 AM", "03/14/2024 22:15"
static LOCALE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(\d{1,2})/(\d{1,2})/(\d{4})(?:,?\s+(\d{1,2}):(\d{2})(?::(\d{2})(?:\.(\d{1,3}))?)?\s*([AaPp][Mm])?)?\s*$",
    )
    .expect("locale date pattern is valid")
});

const ISO_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Normalize a trade date from either the locale numeric form (month/day/year,
/// optional time) or an ISO-8601 / RFC 3339 form into one comparable instant.
///
/// Offset-bearing timestamps are converted to UTC; naive ones are taken as-is.
pub fn parse_trade_date(raw: &str) -> Result<NaiveDateTime, JournalError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(JournalError::InvalidInput("Empty trade date".to_string()));
    }

    if let Some(caps) = LOCALE_DATE.captures(trimmed) {
        return parse_locale_captures(&caps)
            .ok_or_else(|| JournalError::InvalidInput(format!("Invalid date: {}", raw)));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.naive_utc());
    }

    for format in ISO_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(dt);
        }
    }

    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .map(|d| d.and_time(NaiveTime::MIN))
        .map_err(|_| JournalError::InvalidInput(format!("Unrecognized date format: {}", raw)))
}

fn parse_locale_captures(caps: &regex::Captures<'_>) -> Option<NaiveDateTime> {
    let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());

    let date = NaiveDate::from_ymd_opt(num(3)? as i32, num(1)?, num(2)?)?;

    let Some(mut hour) = num(4) else {
        return Some(date.and_time(NaiveTime::MIN));
    };
    let minute = num(5)?;
    let second = num(6).unwrap_or(0);
    // "5" → 500ms, "05" → 50ms
    let millis = caps
        .get(7)
        .and_then(|m| format!("{:0<3}", m.as_str()).parse::<u32>().ok())
        .unwrap_or(0);

    if let Some(meridiem) = caps.get(8) {
        if hour == 0 || hour > 12 {
            return None;
        }
        let pm = meridiem.as_str().eq_ignore_ascii_case("pm");
        hour = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, true) => h + 12,
            (h, false) => h,
        };
    }

    let time = NaiveTime::from_hms_milli_opt(hour, minute, second, millis)?;
    Some(date.and_time(time))
}

fn earliest_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn latest_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX)
}

/// Inclusive calendar-day range. The default spans every representable journal date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, JournalError> {
        if start > end {
            return Err(JournalError::InvalidFilter(format!(
                "Date range start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn all() -> Self {
        Self {
            start: earliest_date(),
            end: latest_date(),
        }
    }

    pub fn is_all(&self) -> bool {
        *self == Self::all()
    }

    /// Start of the first day, 00:00:00.000.
    pub fn lower_bound(&self) -> NaiveDateTime {
        self.start.and_time(NaiveTime::MIN)
    }

    /// End of the last day, 23:59:59.999.
    pub fn upper_bound(&self) -> NaiveDateTime {
        let end_of_day = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
        self.end.and_time(end_of_day)
    }

    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        instant >= self.lower_bound() && instant <= self.upper_bound()
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self::all()
    }
}

pub fn parse_filter_date(raw: &str) -> Result<NaiveDate, JournalError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| JournalError::InvalidFilter(format!("Invalid filter date: {}", raw)))
}

pub fn format_filter_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
