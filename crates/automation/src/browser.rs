//! Browser abstraction.
//!
//! The browser itself is an external collaborator; the workflow code is
//! written against these traits and exercised against scripted fakes.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::WorkflowError;

/// One parsed row of a results grid.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableRow {
    /// Visible cell texts, in column order.
    pub cells: Vec<String>,
    /// The row's link (`data-href`), when present.
    #[serde(default)]
    pub link: Option<String>,
}

/// A live, possibly authenticated browser page.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn goto(&self, url: &str) -> Result<(), WorkflowError>;

    async fn current_url(&self) -> Result<String, WorkflowError>;

    /// Clear the matched input and type `value` into it.
    async fn fill(&self, css: &str, value: &str) -> Result<(), WorkflowError>;

    async fn click(&self, css: &str) -> Result<(), WorkflowError>;

    /// Poll until `css` matches an element or the deadline passes.
    async fn wait_for(&self, css: &str, timeout: Duration) -> Result<(), WorkflowError>;

    /// Extract the body rows of the table matched by `css`.
    async fn table_rows(&self, css: &str) -> Result<Vec<TableRow>, WorkflowError>;

    /// Serialize the session cookies for reuse.
    async fn cookies(&self) -> Result<String, WorkflowError>;

    /// Install previously serialized cookies into this session.
    async fn restore_cookies(&self, json: &str) -> Result<(), WorkflowError>;

    async fn close(&self) -> Result<(), WorkflowError>;
}

/// Opens fresh browser sessions.
#[async_trait]
pub trait BrowserConnector: Send + Sync {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, WorkflowError>;
}
