use std::path::PathBuf;

use anyhow::bail;
use clap::Parser;

use crate::search::SearchWalker;

use super::resolve_folder;

/// Search a folder for lines containing the given text.
#[derive(Debug, Parser)]
pub struct SearchCommand {
    /// Text to search for, case-insensitive.
    pub query: String,

    /// Folder to search. Defaults to the current directory.
    #[clap(default_value = "")]
    pub root: PathBuf,

    /// Stop after this many matches.
    #[clap(long)]
    pub limit: Option<usize>,
}

impl SearchCommand {
    pub fn run(self) -> anyhow::Result<()> {
        if self.query.is_empty() {
            bail!("Search query must not be empty");
        }

        let root = resolve_folder(&self.root);
        let walker = SearchWalker::new(&self.query, &root);
        let limit = self.limit.unwrap_or(usize::MAX);

        let mut count = 0usize;
        for found in walker.take(limit) {
            println!(
                "{}:{}: {}",
                found.file_path.display(),
                found.line_number,
                found.line_content
            );
            count += 1;
        }

        log::info!("{} matches", count);
        Ok(())
    }
}
