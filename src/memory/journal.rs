//! Daily activity journal
//!
//! Appends one markdown file per day under the data directory. Journal
//! writes are best-effort; a failed append is logged and swallowed so it
//! can never take the assistant down.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

/// Append-only daily journal
#[derive(Clone)]
pub struct Journal {
    dir: PathBuf,
}

impl Journal {
    /// Create a journal rooted at `data_dir/journal`
    #[must_use]
    pub fn new(data_dir: &Path) -> Self {
        let dir = data_dir.join("journal");
        if let Err(e) = fs::create_dir_all(&dir) {
            tracing::warn!(error = %e, path = %dir.display(), "failed to create journal directory");
        }

        Self { dir }
    }

    /// Append an entry to today's journal file, best-effort
    pub fn log(&self, category: &str, message: &str) {
        let line = format!("- [{}] {}\n", category.to_uppercase(), message);

        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.today_path())
            .and_then(|mut file| file.write_all(line.as_bytes()));

        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to append journal entry");
        }
    }

    /// Read back today's journal, empty when nothing was logged yet
    #[must_use]
    pub fn today(&self) -> String {
        fs::read_to_string(self.today_path()).unwrap_or_default()
    }

    /// Path of today's journal file (`YYYY-MM-DD.md`)
    fn today_path(&self) -> PathBuf {
        self.dir
            .join(format!("{}.md", Local::now().format("%Y-%m-%d")))
    }
}
