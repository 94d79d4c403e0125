//! Directory listing for categorization runs.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;

use crate::FileType;

/// Names that are never worth categorizing, compared case-insensitively.
const JUNK_FILES: &[&str] = &[".DS_Store", "Thumbs.db", "desktop.ini", ".directory"];

/// Which kinds of entries a scan returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub files: bool,
    pub directories: bool,
    pub hidden: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            files: true,
            directories: false,
            hidden: false,
        }
    }
}

/// One immediate child of a scanned directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub full_path: PathBuf,
    pub file_name: String,
    pub file_type: FileType,
}

/// Lists the immediate children of a directory.
pub struct FileScanner;

impl FileScanner {
    /// Scans `dir` and returns matching entries sorted by name.
    ///
    /// Junk names are always skipped. Dot-files are hidden. Entries whose
    /// names are not valid UTF-8 are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if `dir` is missing, not a directory, or unreadable.
    pub fn scan(dir: &Path, options: ScanOptions) -> Result<Vec<FileEntry>> {
        if !dir.is_dir() {
            bail!("Not a directory: {}", dir.display());
        }

        let mut entries = Vec::new();
        let read_dir =
            fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?;

        for entry in read_dir {
            let entry = entry.with_context(|| format!("Failed to read entry in {}", dir.display()))?;
            let Ok(file_name) = entry.file_name().into_string() else {
                tracing::warn!(path = %entry.path().display(), "Skipping non UTF-8 file name");
                continue;
            };

            if is_junk_file(&file_name) {
                continue;
            }
            if !options.hidden && file_name.starts_with('.') {
                continue;
            }

            let Ok(metadata) = entry.metadata() else {
                tracing::warn!(file_name = %file_name, "Skipping entry with unreadable metadata");
                continue;
            };
            let file_type = if metadata.is_dir() {
                FileType::Directory
            } else {
                FileType::File
            };

            let wanted = match file_type {
                FileType::File => options.files,
                FileType::Directory => options.directories,
            };
            if wanted {
                entries.push(FileEntry {
                    full_path: entry.path(),
                    file_name,
                    file_type,
                });
            }
        }

        entries.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        tracing::debug!(dir = %dir.display(), count = entries.len(), "Scanned directory");
        Ok(entries)
    }
}

/// True for OS metadata files such as `.DS_Store` or `Thumbs.db`.
pub fn is_junk_file(file_name: &str) -> bool {
    JUNK_FILES
        .iter()
        .any(|junk| junk.eq_ignore_ascii_case(file_name))
}
