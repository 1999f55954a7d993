//! Shift records parsed from the roster search grid.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::interval::format_site_date;

/// Opaque roster shift identifier (the last segment of the row's link).
pub type ShiftId = String;

/// One row of the shift search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftRecord {
    pub shift_id: ShiftId,
    pub client_name: String,
    /// Calendar date of the shift; `None` when the grid row did not parse.
    /// Dateless records are kept but excluded from range filtering.
    pub date: Option<NaiveDate>,
    /// Display time as shown in the grid, e.g. `"02:00 PM"`.
    pub time: String,
    /// The grid's "Type" column, normally `"Shift"`.
    pub shift_type: String,
}

impl ShiftRecord {
    /// Date in the site's `DD-MM-YYYY` display form, or `"unknown"`.
    pub fn date_display(&self) -> String {
        match self.date {
            Some(date) => format_site_date(date),
            None => "unknown".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_display() {
        let shift = ShiftRecord {
            shift_id: "196437".into(),
            client_name: "Anthea Bassi".into(),
            date: NaiveDate::from_ymd_opt(2025, 11, 8),
            time: "12:00 PM".into(),
            shift_type: "Shift".into(),
        };
        assert_eq!(shift.date_display(), "08-11-2025");

        let undated = ShiftRecord { date: None, ..shift };
        assert_eq!(undated.date_display(), "unknown");
    }
}
