//! Privileged-side filesystem primitives.
//!
//! Every operation the UI can request lands here. Operations return a
//! `Result` to their single caller and never panic across the boundary; the
//! web layer turns errors into `{success: false, error}` payloads so the UI
//! can render them inline.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One entry of a directory listing. An immutable snapshot: the UI wraps it
/// in a tree node when it needs expansion state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    pub name: String,
    pub is_directory: bool,
    pub size: u64,
}

/// Captured output of a shell command run on the UI's behalf.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Error)]
pub enum OpError {
    #[error("Not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("Permission denied: {}", .path.display())]
    PermissionDenied { path: PathBuf },

    /// The one deliberately strict guard in the system: rename and move never
    /// silently overwrite. Surfaced to the user verbatim.
    #[error("Destination already exists")]
    DestinationExists,

    #[error("Not a directory: {}", .path.display())]
    NotADirectory { path: PathBuf },

    #[error("Not a file: {}", .path.display())]
    NotAFile { path: PathBuf },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl OpError {
    /// Attaches a path to the interesting `io::ErrorKind`s; everything else
    /// passes through with fs-err's own path-bearing message.
    fn classify(err: io::Error, path: &Path) -> OpError {
        match err.kind() {
            io::ErrorKind::NotFound => OpError::NotFound {
                path: path.to_path_buf(),
            },
            io::ErrorKind::PermissionDenied => OpError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => OpError::Io(err),
        }
    }
}

/// The privileged filesystem service. Stateless: all state lives on disk.
///
/// No path sandboxing is applied; this is a trusted single-user desktop tool
/// and any absolute path the UI sends is honored.
#[derive(Debug, Default)]
pub struct FsOperationService;

impl FsOperationService {
    pub fn new() -> Self {
        FsOperationService
    }

    /// Reads a file as UTF-8 text.
    pub fn read_file(&self, path: &Path) -> Result<String, OpError> {
        let meta = fs_err::metadata(path).map_err(|err| OpError::classify(err, path))?;
        if !meta.is_file() {
            return Err(OpError::NotAFile {
                path: path.to_path_buf(),
            });
        }
        fs_err::read_to_string(path).map_err(|err| OpError::classify(err, path))
    }

    /// Creates or truncates a file with the given content.
    pub fn write_file(&self, path: &Path, contents: &str) -> Result<(), OpError> {
        fs_err::write(path, contents).map_err(|err| OpError::classify(err, path))
    }

    /// Lists a directory's immediate children, directories first, then
    /// case-insensitive ascending by name within each group.
    pub fn list_directory(&self, path: &Path) -> Result<Vec<DirectoryEntry>, OpError> {
        let meta = fs_err::metadata(path).map_err(|err| OpError::classify(err, path))?;
        if !meta.is_dir() {
            return Err(OpError::NotADirectory {
                path: path.to_path_buf(),
            });
        }

        let mut entries = Vec::new();
        for entry in fs_err::read_dir(path).map_err(|err| OpError::classify(err, path))? {
            let entry = entry.map_err(OpError::Io)?;
            // An entry can vanish between readdir and stat; skip it rather
            // than failing the whole listing.
            let meta = match entry.metadata() {
                Ok(meta) => meta,
                Err(err) => {
                    log::debug!(
                        "Skipping unstattable entry {}: {}",
                        entry.path().display(),
                        err
                    );
                    continue;
                }
            };

            entries.push(DirectoryEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_directory: meta.is_dir(),
                size: if meta.is_file() { meta.len() } else { 0 },
            });
        }

        sort_entries(&mut entries);
        Ok(entries)
    }

    /// Creates a directory, including missing parents. Idempotent.
    pub fn make_directory(&self, path: &Path) -> Result<(), OpError> {
        fs_err::create_dir_all(path).map_err(|err| OpError::classify(err, path))
    }

    /// Copies one file. Fails if the source is missing or the destination's
    /// parent does not exist.
    pub fn copy_file(&self, src: &Path, dst: &Path) -> Result<(), OpError> {
        fs_err::copy(src, dst)
            .map(|_| ())
            .map_err(|err| OpError::classify(err, src))
    }

    /// Recursively copies a directory, preserving structure. Any unreadable
    /// entry aborts the whole operation; already-copied files are left in
    /// place (no rollback).
    pub fn copy_directory(&self, src: &Path, dst: &Path) -> Result<(), OpError> {
        fs_err::create_dir_all(dst).map_err(|err| OpError::classify(err, dst))?;

        for entry in fs_err::read_dir(src).map_err(|err| OpError::classify(err, src))? {
            let entry = entry.map_err(OpError::Io)?;
            let source = entry.path();
            let dest = dst.join(entry.file_name());
            let meta = entry.metadata().map_err(OpError::Io)?;

            if meta.is_dir() {
                self.copy_directory(&source, &dest)?;
            } else {
                self.copy_file(&source, &dest)?;
            }
        }

        Ok(())
    }

    /// Renames or moves a path. Fails with [`OpError::DestinationExists`] if
    /// the destination is already present; the source is left untouched.
    pub fn rename_or_move(&self, old: &Path, new: &Path) -> Result<(), OpError> {
        if fs_err::symlink_metadata(new).is_ok() {
            return Err(OpError::DestinationExists);
        }
        fs_err::rename(old, new).map_err(|err| OpError::classify(err, old))
    }

    /// Deletes a file. A missing file is already-satisfied, not an error.
    pub fn delete_file(&self, path: &Path) -> Result<(), OpError> {
        match fs_err::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(OpError::classify(err, path)),
        }
    }

    /// Recursively deletes a directory. Best-effort: a missing path is not
    /// an error.
    pub fn delete_directory(&self, path: &Path) -> Result<(), OpError> {
        match fs_err::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(OpError::classify(err, path)),
        }
    }

    /// Runs a shell command in the given working directory, capturing output.
    /// A non-zero exit is reported through `success`, not as an error; only a
    /// failure to launch the shell at all is an `Err`.
    pub fn run_command(&self, command: &str, cwd: &Path) -> Result<CommandOutput, OpError> {
        let output = shell_command(command)
            .current_dir(cwd)
            .output()
            .map_err(|err| OpError::classify(err, cwd))?;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

#[cfg(not(windows))]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

/// Directories first, then case-insensitive name order within each group.
pub fn sort_entries(entries: &mut [DirectoryEntry]) {
    entries.sort_by(|a, b| {
        b.is_directory
            .cmp(&a.is_directory)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn names(entries: &[DirectoryEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn listing_order_directories_first_case_insensitive() {
        let dir = tempdir().unwrap();
        fs_err::write(dir.path().join("Zeta.txt"), "z").unwrap();
        fs_err::write(dir.path().join("alpha.txt"), "a").unwrap();
        fs_err::create_dir(dir.path().join("beta")).unwrap();
        fs_err::create_dir(dir.path().join("Alpha")).unwrap();

        let service = FsOperationService::new();
        let entries = service.list_directory(dir.path()).unwrap();

        assert_eq!(names(&entries), vec!["Alpha", "beta", "alpha.txt", "Zeta.txt"]);
        assert!(entries[0].is_directory && entries[1].is_directory);
        assert!(!entries[2].is_directory && !entries[3].is_directory);
    }

    #[test]
    fn list_of_file_is_not_a_directory() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        fs_err::write(&file, "x").unwrap();

        let service = FsOperationService::new();
        assert!(matches!(
            service.list_directory(&file),
            Err(OpError::NotADirectory { .. })
        ));
    }

    #[test]
    fn read_of_directory_is_not_a_file() {
        let dir = tempdir().unwrap();
        let service = FsOperationService::new();
        assert!(matches!(
            service.read_file(dir.path()),
            Err(OpError::NotAFile { .. })
        ));
    }

    #[test]
    fn read_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let service = FsOperationService::new();
        assert!(matches!(
            service.read_file(&dir.path().join("ghost.txt")),
            Err(OpError::NotFound { .. })
        ));
    }

    #[test]
    fn rename_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        fs_err::write(&a, "source").unwrap();
        fs_err::write(&b, "already here").unwrap();

        let service = FsOperationService::new();
        let err = service.rename_or_move(&a, &b).unwrap_err();
        assert!(matches!(err, OpError::DestinationExists));
        assert_eq!(err.to_string(), "Destination already exists");

        // Source untouched, destination unclobbered.
        assert_eq!(fs_err::read_to_string(&a).unwrap(), "source");
        assert_eq!(fs_err::read_to_string(&b).unwrap(), "already here");
    }

    #[test]
    fn rename_moves_when_destination_free() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        fs_err::write(&a, "content").unwrap();

        let service = FsOperationService::new();
        service.rename_or_move(&a, &b).unwrap();
        assert!(!a.exists());
        assert_eq!(fs_err::read_to_string(&b).unwrap(), "content");
    }

    #[test]
    fn delete_file_is_permissive() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("once.txt");
        fs_err::write(&file, "x").unwrap();

        let service = FsOperationService::new();
        service.delete_file(&file).unwrap();
        // Already gone: still success.
        service.delete_file(&file).unwrap();
    }

    #[test]
    fn delete_directory_recursive_and_permissive() {
        let dir = tempdir().unwrap();
        let victim = dir.path().join("victim");
        fs_err::create_dir_all(victim.join("nested/deep")).unwrap();
        fs_err::write(victim.join("nested/file.txt"), "x").unwrap();

        let service = FsOperationService::new();
        service.delete_directory(&victim).unwrap();
        assert!(!victim.exists());
        service.delete_directory(&victim).unwrap();
    }

    #[test]
    fn copy_directory_preserves_structure() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        fs_err::create_dir_all(src.join("sub")).unwrap();
        fs_err::write(src.join("top.txt"), "top").unwrap();
        fs_err::write(src.join("sub/inner.txt"), "inner").unwrap();

        let dst = dir.path().join("dst");
        let service = FsOperationService::new();
        service.copy_directory(&src, &dst).unwrap();

        assert_eq!(fs_err::read_to_string(dst.join("top.txt")).unwrap(), "top");
        assert_eq!(
            fs_err::read_to_string(dst.join("sub/inner.txt")).unwrap(),
            "inner"
        );
    }

    #[test]
    fn copy_file_requires_destination_parent() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.txt");
        fs_err::write(&src, "x").unwrap();

        let service = FsOperationService::new();
        let result = service.copy_file(&src, &dir.path().join("missing/dst.txt"));
        assert!(result.is_err());
    }

    #[test]
    fn make_directory_is_idempotent() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a/b/c");
        let service = FsOperationService::new();
        service.make_directory(&nested).unwrap();
        service.make_directory(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn run_command_captures_output() {
        let dir = tempdir().unwrap();
        let service = FsOperationService::new();
        let output = service.run_command("echo hello", dir.path()).unwrap();
        assert!(output.success);
        assert!(output.stdout.contains("hello"));
    }

    #[test]
    fn run_command_reports_failure_without_erroring() {
        let dir = tempdir().unwrap();
        let service = FsOperationService::new();
        let output = service
            .run_command("exit 3", dir.path())
            .expect("launch itself should succeed");
        assert!(!output.success);
    }
}
