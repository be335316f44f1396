//! Contains the state for a served project folder.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::broadcast::EventBroadcaster;
use crate::event_pump::EventPump;
use crate::ops::FsOperationService;
use crate::path_util;
use crate::watch_registry::WatchRegistry;

/// Everything a running server session needs: the root folder being served,
/// the filesystem service, the watch registry, and the broadcaster that fans
/// watcher output out to connections.
///
/// All watchers deliver into one crossbeam channel whose receiving end is
/// drained by the [`EventPump`] thread.
pub struct EditorSession {
    /// The event pump uses the watch registry's channel and the broadcaster.
    /// It goes first so its thread is joined before they are torn down.
    _event_pump: EventPump,

    root: PathBuf,
    start_time: Instant,
    ops: FsOperationService,
    registry: Arc<WatchRegistry>,
    broadcaster: Arc<EventBroadcaster>,
}

impl EditorSession {
    /// Starts a session serving `root`, which must be an existing directory.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<EditorSession, SessionError> {
        let root = path_util::normalize(root.as_ref());
        let start_time = Instant::now();

        log::trace!("Starting EditorSession at {}", root.display());

        let meta = fs_err::metadata(&root).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => SessionError::RootNotFound { path: root.clone() },
            _ => SessionError::Io(err),
        })?;
        if !meta.is_dir() {
            return Err(SessionError::RootNotADirectory { path: root });
        }

        let (event_sender, event_receiver) = crossbeam_channel::unbounded();
        let registry = Arc::new(WatchRegistry::new(event_sender));
        let broadcaster = Arc::new(EventBroadcaster::new());
        let event_pump = EventPump::start(event_receiver, Arc::clone(&broadcaster));

        Ok(EditorSession {
            _event_pump: event_pump,
            root,
            start_time,
            ops: FsOperationService::new(),
            registry,
            broadcaster,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn start_time(&self) -> Instant {
        self.start_time
    }

    pub fn ops(&self) -> &FsOperationService {
        &self.ops
    }

    pub fn registry(&self) -> &Arc<WatchRegistry> {
        &self.registry
    }

    pub fn broadcaster(&self) -> &Arc<EventBroadcaster> {
        &self.broadcaster
    }

    /// The project name shown in logs and the web UI: the root's final
    /// component.
    pub fn project_name(&self) -> String {
        path_util::basename(&self.root)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No folder to serve at {}", .path.display())]
    RootNotFound { path: PathBuf },

    #[error("Cannot serve {}: not a directory", .path.display())]
    RootNotADirectory { path: PathBuf },

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;
    use tokio::sync::mpsc::unbounded_channel;

    #[test]
    fn session_requires_an_existing_directory() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            EditorSession::new(dir.path().join("ghost")),
            Err(SessionError::RootNotFound { .. })
        ));

        let file = dir.path().join("file.txt");
        fs_err::write(&file, "x").unwrap();
        assert!(matches!(
            EditorSession::new(&file),
            Err(SessionError::RootNotADirectory { .. })
        ));
    }

    #[test]
    fn watched_mutation_reaches_a_subscriber() {
        let dir = tempdir().unwrap();
        let session = EditorSession::new(dir.path()).unwrap();

        let (tx, mut rx) = unbounded_channel();
        let conn = session.broadcaster().register(tx);
        session.registry().watch(conn, dir.path()).unwrap();

        fs_err::write(dir.path().join("hello.txt"), "hi").unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Ok(event) = rx.try_recv() {
                assert_eq!(event.path(), Path::new(&dir.path().join("hello.txt")));
                break;
            }
            assert!(Instant::now() < deadline, "no event before deadline");
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn session_shuts_down_cleanly_with_live_watches() {
        let dir = tempdir().unwrap();
        let session = EditorSession::new(dir.path()).unwrap();

        let (tx, _rx) = unbounded_channel();
        let conn = session.broadcaster().register(tx);
        session.registry().watch(conn, dir.path()).unwrap();

        // Dropping with watches outstanding must not deadlock the pump join.
        drop(session);
    }
}
