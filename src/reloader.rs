use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tracing::debug;

use crate::engine::TimeslotCatalog;
use crate::loader;

/// Tracks the catalog file's modification time and reloads the catalog
/// when it changes.
pub struct CatalogWatcher {
    catalog: Arc<dyn TimeslotCatalog>,
    path: PathBuf,
    last_modified: Option<SystemTime>,
}

impl CatalogWatcher {
    /// The current mtime is taken as already loaded.
    pub fn new(catalog: Arc<dyn TimeslotCatalog>, path: PathBuf) -> Self {
        let last_modified = modified(&path);
        Self {
            catalog,
            path,
            last_modified,
        }
    }

    /// Check the file once. Returns true when a reload succeeded.
    pub fn poll(&mut self) -> bool {
        let Some(mtime) = modified(&self.path) else {
            debug!("catalog file {} not readable, skipping", self.path.display());
            return false;
        };
        if self.last_modified == Some(mtime) {
            return false;
        }
        // Record the mtime even when the reload fails, so a broken file is
        // not re-parsed on every tick.
        self.last_modified = Some(mtime);
        loader::reload(self.catalog.as_ref(), &self.path).is_ok()
    }
}

fn modified(path: &std::path::Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Background task that reloads the catalog whenever its file changes.
pub async fn run_catalog_reloader(catalog: Arc<dyn TimeslotCatalog>, path: PathBuf, every: Duration) {
    let mut watcher = CatalogWatcher::new(catalog, path);
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately; the bootstrap load already ran.
    interval.tick().await;
    loop {
        interval.tick().await;
        watcher.poll();
    }
}
