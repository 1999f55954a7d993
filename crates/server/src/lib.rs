//! Webhook server
//!
//! A thin HTTP adapter over the session registry: telephony webhooks
//! create and tear down per-call sessions.

pub mod http;
pub mod manager;
pub mod state;

pub use http::create_router;
pub use manager::{RegistryStatus, SessionFactory, SessionRegistry, SessionStatus};
pub use state::AppState;

use thiserror::Error;

/// Session lifecycle failures surfaced at the webhook boundary.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("session already exists: {0}")]
    AlreadyExists(String),

    #[error("no active session: {0}")]
    NotFound(String),

    #[error("failed to start session: {0}")]
    Init(String),
}
