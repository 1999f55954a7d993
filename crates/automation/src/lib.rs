//! Roster site automation
//!
//! Everything that touches the shift-management website or the outbound
//! mailbox: authenticated browser sessions, staff lookup, date-filtered
//! shift search, and the cancellation notification email. Composed by
//! `ShiftWorkflow`.

pub mod browser;
pub mod cookies;
pub mod login;
pub mod mail;
pub mod notify;
pub mod shifts;
pub mod staff;
pub mod webdriver;
pub mod workflow;

pub use browser::{BrowserConnector, BrowserSession, TableRow};
pub use cookies::CookieStore;
pub use login::login;
pub use mail::{DisabledMailer, Mailer, SmtpMailer};
pub use notify::format_cancellation_email;
pub use webdriver::WebDriverConnector;
pub use workflow::{ShiftService, ShiftWorkflow, WorkflowResult};

use thiserror::Error;

/// Workflow failures, each mapping to a distinct spoken apology upstream.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("no staff record matches phone {0}")]
    StaffNotFound(String),

    #[error("navigation timed out: {0}")]
    NavigationTimeout(String),

    #[error("cancellation submission failed: {0}")]
    SubmissionFailed(String),

    #[error("browser error: {0}")]
    Browser(String),

    #[error("workflow interrupted by session stop")]
    Interrupted,
}
