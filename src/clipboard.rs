//! Copy/cut/paste intents over filesystem paths.
//!
//! The clipboard is a single slot holding an intent, not file content. Paste
//! materializes the intent through [`FsOperationService`]; a cut that lands
//! clears the slot, a copy leaves it armed for repeated pastes into other
//! directories.

use std::path::{Path, PathBuf};

use crate::ops::{FsOperationService, OpError};
use crate::path_util;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardOp {
    Copy,
    Cut,
}

/// What the user asked to transfer, captured at copy/cut time. The source is
/// not validated until paste; a path deleted in between surfaces as the
/// paste's error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardIntent {
    pub operation: ClipboardOp,
    pub source_path: PathBuf,
    pub is_directory: bool,
}

#[derive(Debug, Default)]
pub struct ClipboardCoordinator {
    slot: Option<ClipboardIntent>,
}

impl ClipboardCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the clipboard with a copy intent, replacing any prior intent.
    pub fn copy(&mut self, source: &Path, is_directory: bool) {
        self.slot = Some(ClipboardIntent {
            operation: ClipboardOp::Copy,
            source_path: source.to_path_buf(),
            is_directory,
        });
    }

    /// Arms the clipboard with a cut intent, replacing any prior intent.
    pub fn cut(&mut self, source: &Path, is_directory: bool) {
        self.slot = Some(ClipboardIntent {
            operation: ClipboardOp::Cut,
            source_path: source.to_path_buf(),
            is_directory,
        });
    }

    pub fn current(&self) -> Option<&ClipboardIntent> {
        self.slot.as_ref()
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }

    /// Pastes the held intent into `dest_dir`, returning the created path.
    ///
    /// An empty clipboard is a quiet no-op (`Ok(None)`). The destination is
    /// `dest_dir` joined with the source's basename; if something already
    /// lives there the paste fails with [`OpError::DestinationExists`] and
    /// the intent stays armed. A successful cut clears the slot, a
    /// successful copy keeps it.
    pub fn paste(
        &mut self,
        ops: &FsOperationService,
        dest_dir: &Path,
    ) -> Result<Option<PathBuf>, OpError> {
        let intent = match &self.slot {
            Some(intent) => intent.clone(),
            None => return Ok(None),
        };

        let dest = dest_dir.join(path_util::basename(&intent.source_path));

        match intent.operation {
            ClipboardOp::Copy => {
                // Copies would silently overwrite; apply the same guard the
                // rename path enforces.
                if fs_err::symlink_metadata(&dest).is_ok() {
                    return Err(OpError::DestinationExists);
                }
                if intent.is_directory {
                    ops.copy_directory(&intent.source_path, &dest)?;
                } else {
                    ops.copy_file(&intent.source_path, &dest)?;
                }
            }
            ClipboardOp::Cut => {
                ops.rename_or_move(&intent.source_path, &dest)?;
                self.slot = None;
            }
        }

        Ok(Some(dest))
    }
}
