use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crossbeam_channel::Sender;
use notify::RecursiveMode;
use notify_debouncer_full::{
    new_debouncer,
    notify::event::{CreateKind, EventKind, ModifyKind, RemoveKind, RenameMode},
    DebounceEventResult, Debouncer, RecommendedCache,
};

use crate::{is_ignored, ChangeEvent};

/// Quiet period before a burst of raw events is forwarded. Rapid writes to a
/// single file coalesce into one `Change` within this window. Best-effort:
/// consumers must not assume exact coalescing counts.
const DEBOUNCE_TIMEOUT: Duration = Duration::from_millis(50);

/// Watches a single directory for changes to its immediate children.
///
/// Each `DirWatcher` exclusively owns one native watcher. Events are
/// converted to [`ChangeEvent`] and sent over the channel supplied at
/// construction; dropping the watcher tears the native handle down and stops
/// all future delivery.
///
/// Watching is non-recursive. A deeper directory gets live updates only once
/// something watches it directly, which keeps event volume bounded on large
/// trees.
pub struct DirWatcher {
    dir: PathBuf,

    /// Held for its side effects: dropping the debouncer closes the native
    /// watcher and joins its worker.
    #[allow(unused)]
    debouncer: Debouncer<notify::RecommendedWatcher, RecommendedCache>,
}

impl DirWatcher {
    /// Starts watching `dir`, forwarding converted events into `events`.
    ///
    /// No synthetic events are generated for files that already exist; only
    /// changes observed after this call are reported.
    pub fn new(dir: &Path, events: Sender<ChangeEvent>) -> io::Result<DirWatcher> {
        let root = dir.to_path_buf();
        let callback_root = root.clone();

        let mut debouncer = new_debouncer(
            DEBOUNCE_TIMEOUT,
            None,
            move |result: DebounceEventResult| match result {
                Ok(batch) => {
                    for debounced in batch {
                        for event in convert_event(&callback_root, &debounced.event) {
                            if events.send(event).is_err() {
                                // Receiver hung up; the watcher is about to be
                                // dropped, so there is nothing left to do.
                                return;
                            }
                        }
                    }
                }
                Err(errors) => {
                    for error in errors {
                        let path = error
                            .paths
                            .first()
                            .cloned()
                            .unwrap_or_else(|| callback_root.clone());
                        let event = ChangeEvent::Error {
                            path,
                            message: format!("{:?}", error.kind),
                        };
                        if events.send(event).is_err() {
                            return;
                        }
                    }
                }
            },
        )
        .map_err(|err| io::Error::other(format!("{:?}", err)))?;

        debouncer
            .watch(&root, RecursiveMode::NonRecursive)
            .map_err(|err| io::Error::other(format!("{:?}", err)))?;

        log::debug!("Watching directory: {}", root.display());

        Ok(DirWatcher {
            dir: root,
            debouncer,
        })
    }

    /// The directory this watcher is bound to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Drop for DirWatcher {
    fn drop(&mut self) {
        log::debug!("Unwatched directory: {}", self.dir.display());
    }
}

/// True if the path is the watched directory itself or one of its immediate
/// children. Even with non-recursive watching, some platforms report events
/// for deeper paths during renames; those belong to descendant watchers.
fn in_scope(root: &Path, path: &Path) -> bool {
    if is_ignored(root, path) {
        return false;
    }
    path == root || path.parent() == Some(root)
}

/// Convert a raw notify event into our event shape, filtered to the watched
/// directory's scope.
fn convert_event(root: &Path, event: &notify::Event) -> Vec<ChangeEvent> {
    let mut out = Vec::new();

    match &event.kind {
        EventKind::Create(kind) => {
            for path in &event.paths {
                if !in_scope(root, path) {
                    continue;
                }
                out.push(created_event(kind, path));
            }
        }

        EventKind::Modify(ModifyKind::Data(_))
        | EventKind::Modify(ModifyKind::Any)
        | EventKind::Modify(ModifyKind::Other) => {
            for path in &event.paths {
                if !in_scope(root, path) {
                    continue;
                }
                out.push(ChangeEvent::Change { path: path.clone() });
            }
        }

        // Metadata-only changes are invisible at the listing level.
        EventKind::Modify(ModifyKind::Metadata(_)) => {}

        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            if event.paths.len() >= 2 {
                let old_path = &event.paths[0];
                let new_path = &event.paths[1];
                match (in_scope(root, old_path), in_scope(root, new_path)) {
                    (true, true) => out.push(ChangeEvent::Rename {
                        old_path: old_path.clone(),
                        new_path: new_path.clone(),
                    }),
                    // Only one half is ours; report it as a removal or an
                    // arrival so the view stays consistent.
                    (true, false) => out.push(removed_event(old_path)),
                    (false, true) => out.push(arrived_event(new_path)),
                    (false, false) => {}
                }
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            for path in &event.paths {
                if !in_scope(root, path) {
                    continue;
                }
                out.push(removed_event(path));
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            for path in &event.paths {
                if !in_scope(root, path) {
                    continue;
                }
                out.push(arrived_event(path));
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Any))
        | EventKind::Modify(ModifyKind::Name(RenameMode::Other)) => {
            for path in &event.paths {
                if !in_scope(root, path) {
                    continue;
                }
                out.push(ChangeEvent::Change { path: path.clone() });
            }
        }

        EventKind::Remove(kind) => {
            for path in &event.paths {
                if !in_scope(root, path) {
                    continue;
                }
                out.push(match kind {
                    RemoveKind::Folder => ChangeEvent::UnlinkDir { path: path.clone() },
                    _ => ChangeEvent::Unlink { path: path.clone() },
                });
            }
        }

        EventKind::Access(_) => {}

        EventKind::Other | EventKind::Any => {
            for path in &event.paths {
                if !in_scope(root, path) {
                    continue;
                }
                out.push(ChangeEvent::Change { path: path.clone() });
            }
        }
    }

    out
}

fn created_event(kind: &CreateKind, path: &Path) -> ChangeEvent {
    match kind {
        CreateKind::Folder => ChangeEvent::AddDir {
            path: path.to_path_buf(),
        },
        CreateKind::File => ChangeEvent::Add {
            path: path.to_path_buf(),
        },
        // Kind unknown; ask the filesystem.
        _ => arrived_event(path),
    }
}

/// A path appeared but notify didn't say what it is.
fn arrived_event(path: &Path) -> ChangeEvent {
    if path.is_dir() {
        ChangeEvent::AddDir {
            path: path.to_path_buf(),
        }
    } else {
        ChangeEvent::Add {
            path: path.to_path_buf(),
        }
    }
}

/// A path went away; it can no longer be stat'd, so assume it was a file
/// unless notify said otherwise.
fn removed_event(path: &Path) -> ChangeEvent {
    ChangeEvent::Unlink {
        path: path.to_path_buf(),
    }
}
