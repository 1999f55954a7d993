//! Shift search with the site's server-side date filter.

use std::time::Duration;

use call_assistant_config::SiteConfig;
use call_assistant_core::{parse_site_date, DateInterval, ShiftRecord};

use crate::browser::{BrowserSession, TableRow};
use crate::WorkflowError;

const RESULTS_TABLE: &str = "table";
const RESULTS_ROWS: &str = "table tbody tr";
const DATE_FILTER_INPUT: &str = "input[name='daterange']";

/// Search the site for the staff member's shifts inside the interval.
///
/// Navigates to the search page keyed by the full name, submits the
/// interval into the grid's date filter (applied server-side), and
/// parses the resulting rows. An empty grid is an empty result, not an
/// error.
pub async fn search_shifts(
    session: &dyn BrowserSession,
    site: &SiteConfig,
    staff_name: &str,
    interval: &DateInterval,
) -> Result<Vec<ShiftRecord>, WorkflowError> {
    let timeout = Duration::from_secs(site.navigation_timeout_secs);

    let keyword = staff_name.replace(' ', "+");
    let url = format!("{}/search?keyword={}", site.base_url, keyword);
    tracing::info!(staff_name, interval = %interval, "searching shifts");
    session.goto(&url).await?;

    if session.wait_for(RESULTS_ROWS, timeout).await.is_err() {
        tracing::info!(staff_name, "no shift rows for staff");
        return Ok(Vec::new());
    }

    session
        .fill(DATE_FILTER_INPUT, &interval.site_filter())
        .await?;

    // The grid re-renders after the filter round trip.
    if session.wait_for(RESULTS_ROWS, timeout).await.is_err() {
        tracing::info!(staff_name, "no shift rows inside the date filter");
        return Ok(Vec::new());
    }

    let rows = session.table_rows(RESULTS_TABLE).await?;
    let shifts: Vec<ShiftRecord> = rows.iter().filter_map(parse_shift_row).collect();

    tracing::info!(count = shifts.len(), "shift rows parsed");
    Ok(shifts)
}

/// Parse one grid row into a shift record.
///
/// Columns: Type | Staff Name | Client Info, where client info reads
/// `"<Client> on <DD-MM-YYYY> at <HH:MM AM/PM>"`. The shift id is the
/// last segment of the row's link. Rows without a link are not shifts.
pub fn parse_shift_row(row: &TableRow) -> Option<ShiftRecord> {
    if row.cells.len() < 3 {
        return None;
    }

    let link = row.link.as_deref()?;
    let shift_id = link.rsplit('/').next()?.trim();
    if shift_id.is_empty() {
        return None;
    }

    let shift_type = row.cells[0].clone();
    let client_info = row.cells[2].as_str();

    let (client_name, date, time) = match client_info.split_once(" on ") {
        Some((client, remainder)) => match remainder.split_once(" at ") {
            Some((date_raw, time_raw)) => (
                client.trim().to_string(),
                parse_site_date(date_raw),
                time_raw.trim().to_string(),
            ),
            None => (client.trim().to_string(), None, String::new()),
        },
        // Unstructured rows are kept; they just carry no date.
        None => (client_info.trim().to_string(), None, String::new()),
    };

    Some(ShiftRecord {
        shift_id: shift_id.to_string(),
        client_name,
        date,
        time,
        shift_type,
    })
}

/// Redundant local filter over the server-side one: keep only records
/// whose date parses and falls inside the interval.
pub fn filter_by_interval(shifts: &[ShiftRecord], interval: &DateInterval) -> Vec<ShiftRecord> {
    shifts
        .iter()
        .filter(|shift| shift.date.is_some_and(|d| interval.contains(d)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn row(client_info: &str, link: Option<&str>) -> TableRow {
        TableRow {
            cells: vec![
                "Shift".to_string(),
                "Alannah Courtnay".to_string(),
                client_info.to_string(),
            ],
            link: link.map(str::to_string),
        }
    }

    #[test]
    fn test_parse_well_formed_row() {
        let shift = parse_shift_row(&row(
            "Anthea Bassi on 08-11-2025 at 12:00 PM",
            Some("https://site/roster/196437"),
        ))
        .unwrap();

        assert_eq!(shift.shift_id, "196437");
        assert_eq!(shift.client_name, "Anthea Bassi");
        assert_eq!(shift.date, Some(d(2025, 11, 8)));
        assert_eq!(shift.time, "12:00 PM");
        assert_eq!(shift.shift_type, "Shift");
    }

    #[test]
    fn test_unstructured_row_kept_without_date() {
        let shift = parse_shift_row(&row("Anthea Bassi", Some("https://site/roster/7"))).unwrap();
        assert_eq!(shift.client_name, "Anthea Bassi");
        assert_eq!(shift.date, None);
    }

    #[test]
    fn test_linkless_row_is_not_a_shift() {
        assert!(parse_shift_row(&row("Anthea Bassi on 08-11-2025 at 12:00 PM", None)).is_none());
    }

    #[test]
    fn test_bad_date_kept_but_dateless() {
        let shift = parse_shift_row(&row(
            "Anthea Bassi on someday at 12:00 PM",
            Some("https://site/roster/9"),
        ))
        .unwrap();
        assert_eq!(shift.date, None);
        assert_eq!(shift.time, "12:00 PM");
    }

    #[test]
    fn test_local_filter_dominates() {
        let interval = DateInterval::new(d(2025, 12, 17), d(2025, 12, 18)).unwrap();
        let shifts = vec![
            parse_shift_row(&row("A on 17-12-2025 at 02:00 PM", Some("x/roster/1"))).unwrap(),
            // The server-side filter let these through; the local pass drops them.
            parse_shift_row(&row("B on 25-12-2025 at 02:00 PM", Some("x/roster/2"))).unwrap(),
            parse_shift_row(&row("C on garbage at 02:00 PM", Some("x/roster/3"))).unwrap(),
        ];

        let kept = filter_by_interval(&shifts, &interval);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].shift_id, "1");
    }
}
