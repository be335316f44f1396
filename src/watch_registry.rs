//! Registry of live directory watches, keyed by connection and directory.
//!
//! Each entry exclusively owns its [`DirWatcher`]; dropping the entry is the
//! only way a watch stops. The registry is handed to the pieces that need it
//! rather than living in a global, so a test can stand up two registries side
//! by side without them seeing each other's watches.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crossbeam_channel::Sender;
use dirwatch::{ChangeEvent, DirWatcher};

use crate::broadcast::ConnectionId;
use crate::path_util;

/// Identity of one watch: which connection asked, and for which directory.
/// The directory is stored normalized so `/a/b` and `/a/./b` collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WatchKey {
    pub connection: ConnectionId,
    pub dir: PathBuf,
}

struct WatchEntry {
    // Held for its Drop; the watcher pushes into the shared event channel
    // on its own debounce thread.
    _watcher: DirWatcher,
}

/// Tracks which connections watch which directories and tears watches down
/// when the directories they cover are destroyed or moved.
pub struct WatchRegistry {
    entries: Mutex<HashMap<WatchKey, WatchEntry>>,
    events: Sender<ChangeEvent>,
}

impl WatchRegistry {
    /// `events` is the channel every watcher created by this registry will
    /// deliver into, normally the session's event pump input.
    pub fn new(events: Sender<ChangeEvent>) -> Self {
        WatchRegistry {
            entries: Mutex::new(HashMap::new()),
            events,
        }
    }

    /// Starts watching `dir` on behalf of `connection`. Idempotent: watching
    /// an already-watched directory again is a no-op, not a second watcher.
    pub fn watch(&self, connection: ConnectionId, dir: &Path) -> io::Result<()> {
        let key = WatchKey {
            connection,
            dir: path_util::normalize(dir),
        };

        let mut entries = self.entries.lock().unwrap();
        if entries.contains_key(&key) {
            log::trace!("Watch already present for {} on {}", connection, key.dir.display());
            return Ok(());
        }

        let watcher = DirWatcher::new(&key.dir, self.events.clone())?;
        log::debug!("Watching {} for {}", key.dir.display(), connection);
        entries.insert(key, WatchEntry { _watcher: watcher });
        Ok(())
    }

    /// Stops the watch `connection` holds on `dir`, if any. Idempotent.
    pub fn unwatch(&self, connection: ConnectionId, dir: &Path) {
        let key = WatchKey {
            connection,
            dir: path_util::normalize(dir),
        };

        if self.entries.lock().unwrap().remove(&key).is_some() {
            log::debug!("Unwatched {} for {}", key.dir.display(), connection);
        }
    }

    /// Drops every watch held by `connection`. Called when the connection
    /// goes away; returns how many watches were released.
    pub fn remove_connection(&self, connection: ConnectionId) -> usize {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|key, _| key.connection != connection);
        let removed = before - entries.len();
        if removed > 0 {
            log::debug!("Released {} watches for {}", removed, connection);
        }
        removed
    }

    /// Drops every watch whose directory equals `target`, lies underneath
    /// it, or contains it, across all connections. Called after a rename,
    /// move, or delete invalidates the paths those watchers were opened on;
    /// the UI re-issues watches for whatever it still displays. Returns how
    /// many watches were dropped.
    pub fn invalidate_subtree(&self, target: &Path) -> usize {
        let target = path_util::normalize(target);

        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|key, _| {
            !path_util::contains(&target, &key.dir) && !path_util::contains(&key.dir, &target)
        });
        let removed = before - entries.len();
        if removed > 0 {
            log::debug!(
                "Invalidated {} watches under or above {}",
                removed,
                target.display()
            );
        }
        removed
    }

    pub fn watch_count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_watching(&self, connection: ConnectionId, dir: &Path) -> bool {
        let key = WatchKey {
            connection,
            dir: path_util::normalize(dir),
        };
        self.entries.lock().unwrap().contains_key(&key)
    }
}
