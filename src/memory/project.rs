//! Project ledger
//!
//! A `.valet` dotfile at a project root tracks status, tasks, and the
//! current blocker. The ledger is read fresh for each operation so edits
//! made outside the assistant are always picked up.

use std::fs;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Ledger file name at the project root
pub const LEDGER_FILE: &str = ".valet";

/// Characters of ledger content injected into agent prompts
const CONTEXT_LIMIT: usize = 2000;

/// Handle on a project's `.valet` ledger
#[derive(Debug, Clone)]
pub struct ProjectLedger {
    path: PathBuf,
}

impl ProjectLedger {
    /// Load the ledger for the project at `dir`
    ///
    /// # Errors
    ///
    /// Returns error if `dir` has no ledger file
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(LEDGER_FILE);
        if !path.exists() {
            return Err(Error::Tool(format!(
                "no project ledger found at {}",
                path.display()
            )));
        }

        Ok(Self { path })
    }

    /// Create a fresh ledger at `dir`, overwriting nothing
    ///
    /// # Errors
    ///
    /// Returns error if a ledger already exists or the write fails
    pub fn init(dir: &Path) -> Result<Self> {
        let path = dir.join(LEDGER_FILE);
        if path.exists() {
            return Err(Error::Tool(format!(
                "project ledger already exists at {}",
                path.display()
            )));
        }

        fs::write(
            &path,
            "# Project\n\n## Status\nCurrent issue: none\n\n## Tasks\n",
        )?;
        Ok(Self { path })
    }

    /// Full ledger content
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read
    pub fn content(&self) -> Result<String> {
        Ok(fs::read_to_string(&self.path)?)
    }

    /// Ledger content trimmed for prompt injection, best-effort
    #[must_use]
    pub fn context(&self) -> String {
        match self.content() {
            Ok(content) => {
                let mut context: String = content.chars().take(CONTEXT_LIMIT).collect();
                if content.chars().count() > CONTEXT_LIMIT {
                    context.push_str("\n[truncated]");
                }
                context
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read project ledger");
                String::new()
            }
        }
    }

    /// Append an open task line
    ///
    /// # Errors
    ///
    /// Returns error if the ledger cannot be updated
    pub fn add_task(&self, task: &str) -> Result<()> {
        let mut content = self.content()?;
        if !content.ends_with('\n') && !content.is_empty() {
            content.push('\n');
        }
        content.push_str(&format!("- [ ] {task}\n"));

        fs::write(&self.path, content)?;
        Ok(())
    }

    /// Check off the first open task containing `needle`
    ///
    /// Returns `false` when no open task matches.
    ///
    /// # Errors
    ///
    /// Returns error if the ledger cannot be updated
    pub fn complete_task(&self, needle: &str) -> Result<bool> {
        let content = self.content()?;
        let needle = needle.to_lowercase();
        let mut found = false;

        let updated: Vec<String> = content
            .lines()
            .map(|line| {
                if !found
                    && line.trim_start().starts_with("- [ ]")
                    && line.to_lowercase().contains(&needle)
                {
                    found = true;
                    line.replacen("- [ ]", "- [x]", 1)
                } else {
                    line.to_string()
                }
            })
            .collect();

        if found {
            fs::write(&self.path, updated.join("\n") + "\n")?;
        }

        Ok(found)
    }

    /// Record the current blocker, replacing any previous one
    ///
    /// # Errors
    ///
    /// Returns error if the ledger cannot be updated
    pub fn set_blocker(&self, blocker: &str) -> Result<()> {
        let content = self.content()?;
        let mut replaced = false;

        let mut updated: Vec<String> = content
            .lines()
            .map(|line| {
                if line.trim_start().starts_with("Current issue:") {
                    replaced = true;
                    format!("Current issue: {blocker}")
                } else {
                    line.to_string()
                }
            })
            .collect();

        if !replaced {
            updated.push(format!("Current issue: {blocker}"));
        }

        fs::write(&self.path, updated.join("\n") + "\n")?;
        Ok(())
    }

    /// Path of the ledger file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
