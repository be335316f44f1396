//! Client-side state machine for one expandable directory node.
//!
//! A node holds the listed entries for a single directory and reconciles
//! incoming change events against them incrementally, without re-listing.
//! Events are applied at most one level deep: a node only reacts to events
//! whose path sits directly inside its directory, because deeper paths belong
//! to the descendant node watching that directory itself.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use dirwatch::ChangeEvent;

use crate::ops::{sort_entries, DirectoryEntry};
use crate::path_util;

/// An in-progress inline creation: the placeholder row the UI renders while
/// the user types a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftEntry {
    pub name: String,
    pub is_directory: bool,
}

#[derive(Debug)]
pub struct DirectoryNode {
    path: PathBuf,
    entries: Vec<DirectoryEntry>,
    expanded: bool,
    loading: bool,
    /// Names flagged by content-change events since the last listing. The UI
    /// renders these as a modified badge; a fresh listing clears them.
    modified: BTreeSet<String>,
    /// Last watcher error, if any. Advisory: entries stay visible, the node
    /// just stops receiving live updates.
    watch_error: Option<String>,
    draft: Option<DraftEntry>,
}

impl DirectoryNode {
    pub fn new<P: Into<PathBuf>>(path: P) -> DirectoryNode {
        DirectoryNode {
            path: path.into(),
            entries: Vec::new(),
            expanded: false,
            loading: false,
            modified: BTreeSet::new(),
            watch_error: None,
            draft: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_modified(&self, name: &str) -> bool {
        self.modified.contains(name)
    }

    pub fn watch_error(&self) -> Option<&str> {
        self.watch_error.as_deref()
    }

    /// Marks the node as loading. The caller lists the directory and watches
    /// it, then hands the results to [`complete_expand`][Self::complete_expand].
    pub fn begin_expand(&mut self) {
        self.loading = true;
    }

    /// Installs a fresh listing. The listing supersedes everything
    /// reconciliation accumulated, including modified badges.
    pub fn complete_expand(&mut self, mut entries: Vec<DirectoryEntry>) {
        sort_entries(&mut entries);
        self.entries = entries;
        self.expanded = true;
        self.loading = false;
        self.modified.clear();
    }

    /// Listing failed; the node stays collapsed.
    pub fn fail_expand(&mut self) {
        self.loading = false;
        self.expanded = false;
    }

    /// Collapses the node. Entries are dropped; the caller unwatches the
    /// directory. A later re-expand lists from scratch.
    pub fn collapse(&mut self) {
        self.expanded = false;
        self.loading = false;
        self.entries.clear();
        self.modified.clear();
        self.draft = None;
    }

    /// Whether an event is this node's to handle: the node is expanded and
    /// the event's path lies directly inside its directory. Rename events
    /// are relevant if either endpoint does.
    pub fn observes(&self, event: &ChangeEvent) -> bool {
        if !self.expanded {
            return false;
        }
        match event {
            ChangeEvent::Rename { old_path, new_path } => {
                path_util::parent_is(&self.path, old_path)
                    || path_util::parent_is(&self.path, new_path)
            }
            // Watcher errors name the watched directory itself.
            ChangeEvent::Error { path, .. } => {
                path_util::is_same(&self.path, path) || path_util::parent_is(&self.path, path)
            }
            other => path_util::parent_is(&self.path, other.path()),
        }
    }

    /// Reconciles one event into the entry list. Idempotent: replaying an
    /// event the listing already reflects changes nothing.
    pub fn apply_event(&mut self, event: &ChangeEvent) {
        if !self.observes(event) {
            return;
        }

        match event {
            ChangeEvent::Add { path } => self.insert(path, false),
            ChangeEvent::AddDir { path } => self.insert(path, true),
            ChangeEvent::Unlink { path } | ChangeEvent::UnlinkDir { path } => self.remove(path),
            ChangeEvent::Change { path } => {
                let name = path_util::basename(path);
                if self.entries.iter().any(|entry| entry.name == name) {
                    self.modified.insert(name);
                }
            }
            ChangeEvent::Rename { old_path, new_path } => self.rename(old_path, new_path),
            ChangeEvent::Error { message, .. } => {
                self.watch_error = Some(message.clone());
            }
        }
    }

    fn insert(&mut self, path: &Path, is_directory: bool) {
        let name = path_util::basename(path);
        if name.is_empty() || self.entries.iter().any(|entry| entry.name == name) {
            return;
        }
        self.entries.push(DirectoryEntry {
            name,
            is_directory,
            // Unknown until the next full listing.
            size: 0,
        });
        sort_entries(&mut self.entries);
    }

    fn remove(&mut self, path: &Path) {
        let name = path_util::basename(path);
        self.entries.retain(|entry| entry.name != name);
        self.modified.remove(&name);
    }

    fn rename(&mut self, old_path: &Path, new_path: &Path) {
        let here_old = path_util::parent_is(&self.path, old_path);
        let here_new = path_util::parent_is(&self.path, new_path);
        let old_name = path_util::basename(old_path);
        let new_name = path_util::basename(new_path);

        if here_old && here_new {
            // Rename within this directory: carry kind and size over.
            if self.entries.iter().any(|entry| entry.name == old_name) {
                // A stale listing may still hold an entry under the new
                // name; the rename supersedes it.
                self.entries.retain(|entry| entry.name != new_name);
                self.modified.remove(&new_name);
                if let Some(entry) =
                    self.entries.iter_mut().find(|entry| entry.name == old_name)
                {
                    entry.name = new_name.clone();
                }
                if self.modified.remove(&old_name) {
                    self.modified.insert(new_name);
                }
                sort_entries(&mut self.entries);
            } else {
                // Old name unknown; treat as an arrival. Kind is unknown on
                // the wire, assume file until the next listing corrects it.
                self.insert(new_path, false);
            }
        } else if here_old {
            // Moved away.
            self.remove(old_path);
        } else {
            // Moved in.
            self.insert(new_path, false);
        }
    }

    /// Begins an inline creation draft.
    pub fn begin_create(&mut self, is_directory: bool) {
        self.draft = Some(DraftEntry {
            name: String::new(),
            is_directory,
        });
    }

    pub fn draft(&self) -> Option<&DraftEntry> {
        self.draft.as_ref()
    }

    pub fn set_draft_name(&mut self, name: &str) {
        if let Some(draft) = &mut self.draft {
            draft.name = name.to_owned();
        }
    }

    /// Commits the draft: optimistically inserts the entry and returns the
    /// absolute path to create plus whether it is a directory. Returns `None`
    /// and discards the draft if the name is empty or already taken; the
    /// later watch event for the real creation is then a no-op thanks to
    /// idempotent reconciliation.
    pub fn confirm_create(&mut self) -> Option<(PathBuf, bool)> {
        let draft = self.draft.take()?;
        if draft.name.is_empty() || self.entries.iter().any(|entry| entry.name == draft.name) {
            return None;
        }

        let target = self.path.join(&draft.name);
        self.insert(&target, draft.is_directory);
        Some((target, draft.is_directory))
    }

    pub fn cancel_create(&mut self) {
        self.draft = None;
    }
}
