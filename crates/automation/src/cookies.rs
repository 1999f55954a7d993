//! On-disk browser session cache.
//!
//! One JSON file per service under a dedicated directory. The store is
//! shared between sessions, so writes go through a sibling `.lock` file;
//! whoever creates it owns the store until the guard drops.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::WorkflowError;

const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(50);
const LOCK_WAIT_LIMIT: Duration = Duration::from_secs(2);

/// Per-service cookie storage under one directory.
#[derive(Debug, Clone)]
pub struct CookieStore {
    dir: PathBuf,
}

impl CookieStore {
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path(&self, service: &str) -> PathBuf {
        self.dir.join(format!("{service}_auth.json"))
    }

    /// Saved state for the service, if any.
    pub fn load(&self, service: &str) -> Option<String> {
        let path = self.path(service);
        let _lock = FileLock::acquire(&path).ok()?;
        fs::read_to_string(&path).ok()
    }

    pub fn save(&self, service: &str, state: &str) -> Result<(), WorkflowError> {
        let path = self.path(service);
        let _lock = FileLock::acquire(&path)?;
        fs::write(&path, state)
            .map_err(|e| WorkflowError::Browser(format!("failed to save session state: {e}")))?;
        tracing::info!(service, "browser session state saved");
        Ok(())
    }

    /// Drop a cached state the site rejected.
    pub fn discard(&self, service: &str) {
        let path = self.path(service);
        if let Ok(_lock) = FileLock::acquire(&path) {
            let _ = fs::remove_file(&path);
        }
        tracing::info!(service, "stale browser session state discarded");
    }
}

/// Guard over `<file>.lock`; created exclusively, removed on drop.
struct FileLock {
    lock_path: PathBuf,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self, WorkflowError> {
        let lock_path = path.with_extension("lock");
        let deadline = Instant::now() + LOCK_WAIT_LIMIT;

        loop {
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&lock_path)
            {
                Ok(_) => return Ok(Self { lock_path }),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    if Instant::now() >= deadline {
                        return Err(WorkflowError::Browser(format!(
                            "session store locked: {}",
                            lock_path.display()
                        )));
                    }
                    std::thread::sleep(LOCK_RETRY_INTERVAL);
                }
                Err(e) => {
                    return Err(WorkflowError::Browser(format!(
                        "failed to lock session store: {e}"
                    )))
                }
            }
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}
