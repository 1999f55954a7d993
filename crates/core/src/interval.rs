//! Closed calendar-date intervals.
//!
//! Dates are `YYYY-MM-DD` (`chrono::NaiveDate`) everywhere inside the
//! system; the `DD-MM-YYYY` display form exists only at the roster
//! site's grid filter and in the notification email.

use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

/// The format the roster site displays and filters dates in.
const SITE_DATE_FORMAT: &str = "%d-%m-%Y";

#[derive(Error, Debug, PartialEq, Eq)]
#[error("interval start {start} is after end {end}")]
pub struct InvalidInterval {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Closed `[start, end]` date range in the service's local timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateInterval {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateInterval {
    /// Construct an interval, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, InvalidInterval> {
        if start > end {
            return Err(InvalidInterval { start, end });
        }
        Ok(Self { start, end })
    }

    /// Single-day interval.
    pub fn single(day: NaiveDate) -> Self {
        Self { start: day, end: day }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Render for the roster grid's date filter, e.g.
    /// `"17-12-2025 to 19-12-2025"`.
    pub fn site_filter(&self) -> String {
        format!(
            "{} to {}",
            format_site_date(self.start),
            format_site_date(self.end)
        )
    }
}

impl fmt::Display for DateInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Format a date the way the roster site displays it (`DD-MM-YYYY`).
pub fn format_site_date(date: NaiveDate) -> String {
    date.format(SITE_DATE_FORMAT).to_string()
}

/// Parse a `DD-MM-YYYY` date as shown in the roster grids.
pub fn parse_site_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), SITE_DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_new_rejects_reversed() {
        let err = DateInterval::new(d(2025, 12, 18), d(2025, 12, 17)).unwrap_err();
        assert_eq!(err.start, d(2025, 12, 18));
    }

    #[test]
    fn test_contains_is_closed() {
        let interval = DateInterval::new(d(2025, 12, 16), d(2025, 12, 18)).unwrap();
        assert!(interval.contains(d(2025, 12, 16)));
        assert!(interval.contains(d(2025, 12, 18)));
        assert!(!interval.contains(d(2025, 12, 19)));
        assert!(!interval.contains(d(2025, 12, 15)));
    }

    #[test]
    fn test_site_filter_format() {
        let interval = DateInterval::new(d(2025, 12, 17), d(2025, 12, 19)).unwrap();
        assert_eq!(interval.site_filter(), "17-12-2025 to 19-12-2025");
    }

    #[test]
    fn test_site_date_round_trip() {
        assert_eq!(parse_site_date("08-11-2025"), Some(d(2025, 11, 8)));
        assert_eq!(format_site_date(d(2025, 11, 8)), "08-11-2025");
        assert_eq!(parse_site_date("not a date"), None);
    }
}
