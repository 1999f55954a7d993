//! Application state shared across handlers.

use std::sync::Arc;

use call_assistant_config::Settings;

use crate::manager::SessionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(settings: Settings, sessions: Arc<SessionRegistry>) -> Self {
        Self {
            settings: Arc::new(settings),
            sessions,
        }
    }
}
