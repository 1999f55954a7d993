//! Staff lookup by caller phone number.

use std::time::Duration;

use call_assistant_config::SiteConfig;
use call_assistant_core::{phones_match, strip_title, StaffRecord};

use crate::browser::BrowserSession;
use crate::WorkflowError;

const STAFF_SEARCH_INPUT: &str = "input[type='search'].form-control";
const STAFF_TABLE: &str = "#task-table";
const STAFF_TABLE_ROWS: &str = "#task-table tbody tr";

/// Expected staff grid column order:
/// checkbox, ID, Full Name, Team, Email, Mobile, Address, Status
const STAFF_COLUMNS: usize = 8;

/// Find the staff member whose phone matches the caller.
///
/// Types the number into the grid's search box, waits for the grid to
/// re-render, and reads the first row.
pub async fn lookup_staff_by_phone(
    session: &dyn BrowserSession,
    site: &SiteConfig,
    phone: &str,
) -> Result<StaffRecord, WorkflowError> {
    let timeout = Duration::from_secs(site.navigation_timeout_secs);

    tracing::info!(phone, "looking up staff by phone");
    session.goto(&format!("{}/staff/4", site.base_url)).await?;

    let url = session.current_url().await?;
    if url.to_lowercase().contains("login") {
        return Err(WorkflowError::AuthFailed(
            "bounced to the login page during staff lookup".to_string(),
        ));
    }

    session.wait_for(STAFF_SEARCH_INPUT, timeout).await?;
    session.fill(STAFF_SEARCH_INPUT, phone).await?;

    // The grid filters asynchronously after typing.
    session
        .wait_for(STAFF_TABLE_ROWS, timeout)
        .await
        .map_err(|_| WorkflowError::StaffNotFound(phone.to_string()))?;

    let rows = session.table_rows(STAFF_TABLE).await?;
    let first = rows
        .first()
        .ok_or_else(|| WorkflowError::StaffNotFound(phone.to_string()))?;

    if first.cells.len() < STAFF_COLUMNS {
        return Err(WorkflowError::Browser(format!(
            "unexpected staff grid layout ({} columns)",
            first.cells.len()
        )));
    }

    let staff = StaffRecord {
        id: first.cells[1].clone(),
        full_name: strip_title(&first.cells[2]),
        team: first.cells[3].clone(),
        email: first.cells[4].clone(),
        mobile: first.cells[5].clone(),
    };

    if !phones_match(&staff.mobile, phone) {
        tracing::warn!(
            grid_mobile = %staff.mobile,
            caller = %phone,
            "first staff row does not match the caller's number exactly"
        );
    }

    tracing::info!(name = %staff.full_name, id = %staff.id, "staff found");
    Ok(staff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::TableRow;
    use async_trait::async_trait;
    use call_assistant_config::SiteConfig;
    use parking_lot::Mutex;

    /// Scripted page: canned URL and table rows, logged actions.
    struct FakePage {
        url: String,
        rows: Vec<TableRow>,
        log: Mutex<Vec<String>>,
    }

    impl FakePage {
        fn new(url: &str, rows: Vec<TableRow>) -> Self {
            Self {
                url: url.to_string(),
                rows,
                log: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl BrowserSession for FakePage {
        async fn goto(&self, url: &str) -> Result<(), WorkflowError> {
            self.log.lock().push(format!("goto {url}"));
            Ok(())
        }
        async fn current_url(&self) -> Result<String, WorkflowError> {
            Ok(self.url.clone())
        }
        async fn fill(&self, css: &str, value: &str) -> Result<(), WorkflowError> {
            self.log.lock().push(format!("fill {css} = {value}"));
            Ok(())
        }
        async fn click(&self, css: &str) -> Result<(), WorkflowError> {
            self.log.lock().push(format!("click {css}"));
            Ok(())
        }
        async fn wait_for(&self, _css: &str, _timeout: Duration) -> Result<(), WorkflowError> {
            if self.rows.is_empty() {
                Err(WorkflowError::NavigationTimeout("no rows".to_string()))
            } else {
                Ok(())
            }
        }
        async fn table_rows(&self, _css: &str) -> Result<Vec<TableRow>, WorkflowError> {
            Ok(self.rows.clone())
        }
        async fn cookies(&self) -> Result<String, WorkflowError> {
            Ok("[]".to_string())
        }
        async fn restore_cookies(&self, _json: &str) -> Result<(), WorkflowError> {
            Ok(())
        }
        async fn close(&self) -> Result<(), WorkflowError> {
            Ok(())
        }
    }

    fn staff_row() -> TableRow {
        TableRow {
            cells: vec![
                "".into(),
                "1728".into(),
                "Ms Alannah Courtnay".into(),
                "VIC Team".into(),
                "alannah@example.com".into(),
                "0431256441".into(),
                "836 Highbury Rd".into(),
                "Active".into(),
            ],
            link: None,
        }
    }

    #[tokio::test]
    async fn test_lookup_strips_title_and_maps_columns() {
        let page = FakePage::new("https://site/staff/4", vec![staff_row()]);
        let staff = lookup_staff_by_phone(&page, &SiteConfig::default(), "0431256441")
            .await
            .unwrap();

        assert_eq!(staff.full_name, "Alannah Courtnay");
        assert_eq!(staff.id, "1728");
        assert_eq!(staff.email, "alannah@example.com");
        assert_eq!(staff.team, "VIC Team");
        assert_eq!(staff.mobile, "0431256441");
    }

    #[tokio::test]
    async fn test_lookup_fails_when_grid_stays_empty() {
        let page = FakePage::new("https://site/staff/4", vec![]);
        let err = lookup_staff_by_phone(&page, &SiteConfig::default(), "0400000000")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::StaffNotFound(_)));
    }

    #[tokio::test]
    async fn test_lookup_detects_login_bounce() {
        let page = FakePage::new("https://site/login?next=staff", vec![staff_row()]);
        let err = lookup_staff_by_phone(&page, &SiteConfig::default(), "0431256441")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::AuthFailed(_)));
    }

    #[tokio::test]
    async fn test_lookup_rejects_short_rows() {
        let row = TableRow {
            cells: vec!["only".into(), "three".into(), "cells".into()],
            link: None,
        };
        let page = FakePage::new("https://site/staff/4", vec![row]);
        let err = lookup_staff_by_phone(&page, &SiteConfig::default(), "0431256441")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Browser(_)));
    }
}
