//! Configuration file watcher for hot reload.
//!
//! Polls the file's directory on a fixed interval using notify's portable
//! poll backend, so a file that does not exist yet is picked up once it
//! appears. The callback fires at most once per observed timestamp increase
//! of the target file, so several writes inside one interval collapse into a
//! single notification.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use notify::{Config, Event, PollWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;

/// Default polling cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// A watcher that monitors one configuration file for changes.
pub struct FileWatcher {
    path: PathBuf,
    poll_interval: Duration,
    last_modified: Arc<Mutex<Option<SystemTime>>>,
    watcher: Mutex<Option<PollWatcher>>,
}

impl FileWatcher {
    /// Create a watcher. The file's current timestamp is the baseline, so
    /// starting never fires for an unchanged file. A missing file has no
    /// baseline and fires on its first appearance.
    pub fn new(path: &Path, poll_interval: Duration) -> Self {
        Self {
            path: path.to_path_buf(),
            poll_interval,
            last_modified: Arc::new(Mutex::new(modified_time(path))),
            watcher: Mutex::new(None),
        }
    }

    /// Start polling in the background. Only the parent directory has to
    /// exist. Calling it again while running is a no-op.
    pub fn start<F>(&self, on_change: F) -> Result<(), notify::Error>
    where
        F: Fn() + Send + 'static,
    {
        let mut slot = self.watcher.lock();
        if slot.is_some() {
            return Ok(());
        }
        let dir = watch_dir(&self.path);
        // The poll backend reports a missing root through the handler only.
        fs::metadata(&dir).map_err(|e| notify::Error::io(e).add_path(dir.clone()))?;

        let path = self.path.clone();
        let last_modified = Arc::clone(&self.last_modified);

        let handler = move |res: notify::Result<Event>| match res {
            Ok(_) => {
                if advance(&last_modified, modified_time(&path)) {
                    tracing::info!(path = %path.display(), "Config file change detected, reloading...");
                    on_change();
                }
            }
            Err(e) => tracing::error!("Watch error: {:?}", e),
        };

        let mut watcher = PollWatcher::new(
            handler,
            Config::default().with_poll_interval(self.poll_interval),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        *slot = Some(watcher);

        tracing::info!(
            path = ?self.path,
            interval_ms = self.poll_interval.as_millis() as u64,
            "Config watcher started"
        );
        Ok(())
    }

    /// Stop polling. Safe to call repeatedly or before `start`.
    pub fn stop(&self) {
        if self.watcher.lock().take().is_some() {
            tracing::debug!(path = ?self.path, "Config watcher stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.watcher.lock().is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn watch_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Record `current` if it is newer than the stored timestamp.
fn advance(last: &Mutex<Option<SystemTime>>, current: Option<SystemTime>) -> bool {
    let Some(current) = current else {
        return false;
    };
    let mut last = last.lock();
    match *last {
        Some(previous) if current <= previous => false,
        _ => {
            *last = Some(current);
            true
        }
    }
}
