//! Recursive text search over a directory tree.
//!
//! Search is a lazily-produced sequence of matches rather than one blocking
//! call: [`SearchWalker`] implements `Iterator`, so callers can stop after
//! the first page of results and a pathological root never pins the process.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::{DirEntry, IntoIter, WalkDir};

/// Directories never descended into: VCS metadata, dependency caches, build
/// output.
const IGNORED_DIRS: &[&str] = &[".git", ".hg", ".svn", "node_modules", "target", "dist", "build"];

/// Extensions assumed binary and skipped without opening.
const IGNORED_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "pdf", "zip", "rar", "7z", "gz", "exe", "dll",
    "so", "dylib", "class", "o", "woff", "woff2", "ttf", "mp3", "mp4",
];

/// One search hit: a line in a file containing the query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMatch {
    pub file_path: PathBuf,
    /// 1-based.
    pub line_number: u32,
    /// The matching line with surrounding whitespace trimmed.
    pub line_content: String,
}

/// Depth-first, pre-order walk of a tree yielding case-insensitive substring
/// matches. Unreadable files and directories are skipped silently; a locked
/// file never aborts the search.
pub struct SearchWalker {
    query_lower: String,
    walker: walkdir::FilterEntry<IntoIter, fn(&DirEntry) -> bool>,
    /// Remaining matches from the file currently being scanned.
    pending: VecDeque<SearchMatch>,
    exhausted: bool,
}

impl SearchWalker {
    pub fn new(query: &str, root: &Path) -> SearchWalker {
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(keep_entry as fn(&DirEntry) -> bool);

        SearchWalker {
            query_lower: query.to_lowercase(),
            walker,
            pending: VecDeque::new(),
            // An empty query matches every line of every file; treat it as
            // no query at all, like the source system does.
            exhausted: query.is_empty(),
        }
    }

    fn scan_file(&mut self, path: &Path) {
        let contents = match fs_err::read_to_string(path) {
            Ok(contents) => contents,
            // Binary or unreadable; skip silently.
            Err(_) => return,
        };

        for (index, line) in contents.lines().enumerate() {
            if line.to_lowercase().contains(&self.query_lower) {
                self.pending.push_back(SearchMatch {
                    file_path: path.to_path_buf(),
                    line_number: (index + 1) as u32,
                    line_content: line.trim().to_owned(),
                });
            }
        }
    }
}

impl Iterator for SearchWalker {
    type Item = SearchMatch;

    fn next(&mut self) -> Option<SearchMatch> {
        loop {
            if let Some(found) = self.pending.pop_front() {
                return Some(found);
            }
            if self.exhausted {
                return None;
            }

            match self.walker.next() {
                Some(Ok(entry)) => {
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    if has_ignored_extension(entry.path()) {
                        continue;
                    }
                    let path = entry.path().to_path_buf();
                    self.scan_file(&path);
                }
                // Unreadable directory: skip and keep walking.
                Some(Err(err)) => {
                    log::trace!("Search skipping unreadable entry: {}", err);
                }
                None => {
                    self.exhausted = true;
                }
            }
        }
    }
}

/// Collects matches eagerly, up to an optional cap. `None` means unbounded,
/// which preserves the source system's behavior at the boundary.
pub fn search_text(query: &str, root: &Path, max_results: Option<usize>) -> Vec<SearchMatch> {
    let walker = SearchWalker::new(query, root);
    match max_results {
        Some(max) => walker.take(max).collect(),
        None => walker.collect(),
    }
}

fn keep_entry(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return true;
    }
    // Depth 0 is the search root itself; never filter it out.
    if entry.depth() == 0 {
        return true;
    }
    entry
        .file_name()
        .to_str()
        .map(|name| !IGNORED_DIRS.contains(&name))
        .unwrap_or(true)
}

fn has_ignored_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let lower = ext.to_lowercase();
            IGNORED_EXTENSIONS.contains(&lower.as_str())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn finds_matches_with_line_numbers() {
        let dir = tempdir().unwrap();
        fs_err::write(dir.path().join("a.txt"), "first\n// TODO fix\nlast").unwrap();

        let matches = search_text("TODO", dir.path(), None);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].file_path, dir.path().join("a.txt"));
        assert_eq!(matches[0].line_number, 2);
        assert_eq!(matches[0].line_content, "// TODO fix");
    }

    #[test]
    fn match_is_case_insensitive_and_trimmed() {
        let dir = tempdir().unwrap();
        fs_err::write(dir.path().join("a.txt"), "   Hello World   \n").unwrap();

        let matches = search_text("hello", dir.path(), None);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].line_content, "Hello World");
    }

    #[test]
    fn denylisted_directories_are_excluded() {
        let dir = tempdir().unwrap();
        fs_err::write(dir.path().join("a.txt"), "// TODO fix\n").unwrap();
        fs_err::create_dir(dir.path().join(".git")).unwrap();
        fs_err::write(dir.path().join(".git/b.txt"), "// TODO also\n").unwrap();
        fs_err::create_dir(dir.path().join("node_modules")).unwrap();
        fs_err::write(dir.path().join("node_modules/c.txt"), "TODO dep\n").unwrap();

        let matches = search_text("TODO", dir.path(), None);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].file_path, dir.path().join("a.txt"));
    }

    #[test]
    fn binary_extensions_are_skipped() {
        let dir = tempdir().unwrap();
        fs_err::write(dir.path().join("image.PNG"), "TODO inside").unwrap();
        fs_err::write(dir.path().join("notes.md"), "TODO real").unwrap();

        let matches = search_text("TODO", dir.path(), None);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].file_path, dir.path().join("notes.md"));
    }

    #[test]
    fn early_termination_stops_after_cap() {
        let dir = tempdir().unwrap();
        for i in 0..20 {
            fs_err::write(
                dir.path().join(format!("f{:02}.txt", i)),
                "needle\nneedle\n",
            )
            .unwrap();
        }

        let matches = search_text("needle", dir.path(), Some(3));
        assert_eq!(matches.len(), 3);
    }

    #[test]
    fn empty_query_yields_nothing() {
        let dir = tempdir().unwrap();
        fs_err::write(dir.path().join("a.txt"), "anything\n").unwrap();
        assert!(search_text("", dir.path(), None).is_empty());
    }

    #[test]
    fn descends_subdirectories_in_order() {
        let dir = tempdir().unwrap();
        fs_err::create_dir(dir.path().join("sub")).unwrap();
        fs_err::write(dir.path().join("sub/inner.txt"), "needle\n").unwrap();
        fs_err::write(dir.path().join("outer.txt"), "needle\n").unwrap();

        let matches = search_text("needle", dir.path(), None);
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn unreadable_files_do_not_abort() {
        let dir = tempdir().unwrap();
        fs_err::write(dir.path().join("good.txt"), "needle\n").unwrap();
        // Invalid UTF-8: read_to_string fails, search should keep going.
        std::fs::write(dir.path().join("bad.txt"), [0xFF, 0xFE, 0x00]).unwrap();

        let matches = search_text("needle", dir.path(), None);
        assert_eq!(matches.len(), 1);
    }
}
