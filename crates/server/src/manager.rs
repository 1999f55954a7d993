//! Session registry
//!
//! Process-wide map of live sessions keyed by call id. All per-call work
//! runs outside the registry lock; sessions never reach back in except
//! to deregister themselves on exit.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use call_assistant_agent::Session;
use call_assistant_agent::AgentError;

use crate::ServerError;

/// Builds one session's object graph; called under the registry lock,
/// so construction must not block.
pub type SessionFactory =
    Arc<dyn Fn(&str, &str, CancellationToken) -> Result<Session, AgentError> + Send + Sync>;

/// Grace period for a cooperative stop before the task is aborted.
const STOP_GRACE: Duration = Duration::from_secs(5);

struct SessionEntry {
    caller_phone: String,
    started_at: Instant,
    started_wall: DateTime<Utc>,
    stop: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// One live-session row of the status snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub call_id: String,
    pub uptime: f64,
    pub started_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistryStatus {
    pub active_sessions: usize,
    pub sessions: Vec<SessionStatus>,
}

pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<SessionEntry>>>,
    factory: SessionFactory,
    grace: Duration,
}

impl SessionRegistry {
    pub fn new(factory: SessionFactory) -> Arc<Self> {
        Arc::new(Self {
            sessions: Mutex::new(HashMap::new()),
            factory,
            grace: STOP_GRACE,
        })
    }

    /// Create, register and launch a session for a started call.
    pub fn start(self: &Arc<Self>, call_id: &str, caller_phone: &str) -> Result<(), ServerError> {
        let mut sessions = self.sessions.lock();

        if sessions.contains_key(call_id) {
            return Err(ServerError::AlreadyExists(call_id.to_string()));
        }

        let stop = CancellationToken::new();
        let session = (self.factory)(call_id, caller_phone, stop.clone())
            .map_err(|e| ServerError::Init(e.to_string()))?;

        let entry = Arc::new(SessionEntry {
            caller_phone: caller_phone.to_string(),
            started_at: Instant::now(),
            started_wall: Utc::now(),
            stop: stop.clone(),
            task: Mutex::new(None),
        });

        let registry = Arc::downgrade(self);
        let id = call_id.to_string();
        let task = tokio::spawn(async move {
            if let Err(e) = session.run(stop).await {
                tracing::error!(call_id = %id, "session ended with error: {e}");
            }
            if let Some(registry) = registry.upgrade() {
                registry.deregister(&id);
            }
        });

        *entry.task.lock() = Some(task);
        sessions.insert(call_id.to_string(), entry);

        tracing::info!(call_id, caller_phone, "session started");
        Ok(())
    }

    /// Signal a session to stop and wait out the grace period.
    pub async fn stop(&self, call_id: &str) -> Result<(), ServerError> {
        let entry = self
            .sessions
            .lock()
            .remove(call_id)
            .ok_or_else(|| ServerError::NotFound(call_id.to_string()))?;

        entry.stop.cancel();

        let task = entry.task.lock().take();
        if let Some(mut task) = task {
            if tokio::time::timeout(self.grace, &mut task).await.is_err() {
                tracing::warn!(call_id, "session did not stop in time, forcing release");
                task.abort();
            }
        }

        tracing::info!(call_id, "session stopped");
        Ok(())
    }

    /// Snapshot of the live sessions; safe alongside start/stop.
    pub fn status(&self) -> RegistryStatus {
        let sessions = self.sessions.lock();
        let mut rows: Vec<SessionStatus> = sessions
            .iter()
            .map(|(call_id, entry)| SessionStatus {
                call_id: call_id.clone(),
                uptime: entry.started_at.elapsed().as_secs_f64(),
                started_at: entry.started_wall.to_rfc3339(),
            })
            .collect();
        rows.sort_by(|a, b| a.call_id.cmp(&b.call_id));

        RegistryStatus {
            active_sessions: sessions.len(),
            sessions: rows,
        }
    }

    pub fn count(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Caller phone for a live session, if any (used by tests and logs).
    pub fn caller_phone(&self, call_id: &str) -> Option<String> {
        self.sessions
            .lock()
            .get(call_id)
            .map(|e| e.caller_phone.clone())
    }

    /// Stop every live session (process shutdown).
    pub async fn drain(&self) {
        let ids: Vec<String> = self.sessions.lock().keys().cloned().collect();
        for id in ids {
            if let Err(e) = self.stop(&id).await {
                tracing::warn!(call_id = %id, "drain: {e}");
            }
        }
    }

    fn deregister(&self, call_id: &str) {
        if self.sessions.lock().remove(call_id).is_some() {
            tracing::info!(call_id, "session removed");
        }
    }
}
