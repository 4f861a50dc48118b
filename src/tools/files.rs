//! File reading, writing, and directory listing
//!
//! Results are spoken aloud, so reads are capped and listings are kept
//! short. Paths may use `~` for the home directory.

use std::fs;
use std::path::PathBuf;

use crate::{Error, Result};

/// Characters of file content handed back for speech or prompts
const READ_LIMIT: usize = 2000;

/// Directory entries listed before cutting off
const LIST_LIMIT: usize = 100;

/// Read a text file, truncated to a speakable length
///
/// # Errors
///
/// Returns error if the file cannot be read
pub fn read_file(path: &str) -> Result<String> {
    let path = expand_tilde(path);
    let content = fs::read_to_string(&path)
        .map_err(|e| Error::Tool(format!("failed to read {}: {e}", path.display())))?;

    if content.chars().count() > READ_LIMIT {
        let truncated: String = content.chars().take(READ_LIMIT).collect();
        Ok(format!("{truncated}\n[truncated]"))
    } else {
        Ok(content)
    }
}

/// Write content to a file, creating parent directories as needed
///
/// # Errors
///
/// Returns error if the file cannot be written
pub fn write_file(path: &str, content: &str) -> Result<String> {
    let path = expand_tilde(path);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::Tool(format!("failed to create {}: {e}", parent.display())))?;
    }

    fs::write(&path, content)
        .map_err(|e| Error::Tool(format!("failed to write {}: {e}", path.display())))?;

    Ok(format!(
        "Wrote {} characters to {}.",
        content.chars().count(),
        path.display()
    ))
}

/// List a directory's entries, directories first
///
/// # Errors
///
/// Returns error if the directory cannot be read
pub fn list_directory(path: &str) -> Result<String> {
    let path = expand_tilde(path);
    let entries = fs::read_dir(&path)
        .map_err(|e| Error::Tool(format!("failed to list {}: {e}", path.display())))?;

    let mut dirs = Vec::new();
    let mut files = Vec::new();

    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if entry.path().is_dir() {
            dirs.push(format!("{name}/"));
        } else {
            files.push(name);
        }
    }

    dirs.sort();
    files.sort();

    let total = dirs.len() + files.len();
    if total == 0 {
        return Ok(format!("{} is empty.", path.display()));
    }

    let mut names: Vec<String> = dirs.into_iter().chain(files).collect();
    if names.len() > LIST_LIMIT {
        names.truncate(LIST_LIMIT);
        names.push(format!("... and {} more", total - LIST_LIMIT));
    }

    Ok(names.join(", "))
}

/// Expand a leading `~` to the user's home directory
pub(crate) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(dirs) = directories::BaseDirs::new() {
            return dirs.home_dir().join(rest);
        }
    }

    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn read_write_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("note.txt").to_string_lossy().to_string();

        let ack = write_file(&path, "remember the milk").unwrap();
        assert!(ack.contains("17 characters"));

        assert_eq!(read_file(&path).unwrap(), "remember the milk");
    }

    #[test]
    fn long_files_are_truncated() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("big.txt");
        let mut file = fs::File::create(&path).unwrap();
        for _ in 0..500 {
            writeln!(file, "0123456789").unwrap();
        }

        let content = read_file(&path.to_string_lossy()).unwrap();
        assert!(content.ends_with("[truncated]"));
        assert!(content.chars().count() <= READ_LIMIT + 20);
    }

    #[test]
    fn write_creates_parent_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp
            .path()
            .join("deep/nested/note.txt")
            .to_string_lossy()
            .to_string();

        write_file(&path, "hello").unwrap();
        assert!(read_file(&path).is_ok());
    }

    #[test]
    fn listing_separates_dirs_from_files() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("a.txt"), "x").unwrap();

        let listing = list_directory(&tmp.path().to_string_lossy()).unwrap();
        assert_eq!(listing, "sub/, a.txt");
    }

    #[test]
    fn empty_directory_reads_as_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let listing = list_directory(&tmp.path().to_string_lossy()).unwrap();
        assert!(listing.ends_with("is empty."));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(read_file("/definitely/not/here.txt").is_err());
    }
}
