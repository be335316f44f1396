//! Pure path helpers: normalization, comparison, and containment.
//!
//! These never touch the filesystem. Symlinks are deliberately not resolved;
//! the watch registry and the UI agree on lexical paths, and resolving links
//! here would make the two sides disagree about identity.

use std::path::{Component, Path, PathBuf};

/// Lexically normalizes a path: resolves `.` and `..` components and unifies
/// separators via `PathBuf`'s own joining rules. A leading `..` that would
/// escape the root is dropped rather than preserved.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Popping past a root prefix is a no-op; "/.." is "/".
                if !matches!(
                    out.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                ) {
                    out.pop();
                }
            }
            other => out.push(other),
        }
    }

    out
}

/// Whether two paths name the same location, after normalization.
pub fn is_same(a: &Path, b: &Path) -> bool {
    normalize(a) == normalize(b)
}

/// Whether `inner` is `outer` itself or a descendant of it.
///
/// Containment is component-wise, so `/a/bc` is not inside `/a/b`.
pub fn contains(outer: &Path, inner: &Path) -> bool {
    normalize(inner).starts_with(normalize(outer))
}

/// Whether `path`'s immediate parent is `dir`. This is the filter a directory
/// view applies to incoming change events: deeper events belong to the
/// descendant node watching its own directory.
pub fn parent_is(dir: &Path, path: &Path) -> bool {
    normalize(path).parent() == Some(normalize(dir).as_path())
}

/// The final component of a path, as a string. Empty for root paths.
pub fn basename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
