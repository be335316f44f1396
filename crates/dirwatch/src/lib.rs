/*!
Per-directory filesystem watching with debouncing.

dirwatch wraps the `notify` crate behind a deliberately small surface: one
[`DirWatcher`] per directory, watching immediate children only, coalescing
rapid write bursts into a single event after a short quiet period. Its primary
consumer is Quill, a code-editor shell that keeps one watcher per expanded
directory view.

## Current Features
* Non-recursive (depth-limited) directory watching
* Debounced event delivery over a `crossbeam_channel`
* Conversion of raw notify events into a stable [`ChangeEvent`] shape

## Future Features
* Optional recursive mode
* Pluggable ignore rules
*/

mod watcher;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use watcher::DirWatcher;

/// Directory names whose events are dropped before forwarding. These trees
/// churn constantly (dependency caches, VCS metadata) and are never shown
/// live in the editor's file tree.
pub const IGNORED_DIR_NAMES: &[&str] = &["node_modules", ".git"];

/// A filesystem change observed inside a watched directory.
///
/// This is the unit of cross-boundary notification: it serializes to the wire
/// shape the UI consumes (`{"type": "add", "path": ...}`) and is never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ChangeEvent {
    /// A file appeared.
    Add { path: PathBuf },
    /// A directory appeared.
    AddDir { path: PathBuf },
    /// A file went away.
    Unlink { path: PathBuf },
    /// A directory went away.
    UnlinkDir { path: PathBuf },
    /// A file's contents changed.
    Change { path: PathBuf },
    /// A path moved; both halves were observed.
    Rename { old_path: PathBuf, new_path: PathBuf },
    /// The watcher itself failed. Advisory: the watch may no longer be
    /// reliable, but consumers should not tear down their own state.
    Error { path: PathBuf, message: String },
}

impl ChangeEvent {
    /// The primary path this event concerns. For renames, the new path.
    pub fn path(&self) -> &Path {
        match self {
            ChangeEvent::Add { path }
            | ChangeEvent::AddDir { path }
            | ChangeEvent::Unlink { path }
            | ChangeEvent::UnlinkDir { path }
            | ChangeEvent::Change { path }
            | ChangeEvent::Error { path, .. } => path,
            ChangeEvent::Rename { new_path, .. } => new_path,
        }
    }

    /// Whether the event is known to concern a directory.
    pub fn is_directory(&self) -> bool {
        matches!(
            self,
            ChangeEvent::AddDir { .. } | ChangeEvent::UnlinkDir { .. }
        )
    }
}

/// Returns true if any component of `path` below `root` is on the ignore
/// list. With non-recursive watching this is normally just the file name,
/// but rename events can carry paths outside the watched directory.
pub(crate) fn is_ignored(root: &Path, path: &Path) -> bool {
    let relative = match path.strip_prefix(root) {
        Ok(relative) => relative,
        Err(_) => path,
    };

    relative.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .map(|name| IGNORED_DIR_NAMES.contains(&name))
            .unwrap_or(false)
    })
}
