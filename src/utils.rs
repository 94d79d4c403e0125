//! Shared path helpers used by the CLI and the categorization session.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Gets the cross-platform database path.
///
/// Returns the path as `{data_dir}/ftax/categorizations.db` where `data_dir` is:
/// - Linux: `~/.local/share`
/// - macOS: `~/Library/Application Support`
/// - Windows: `C:\Users\<user>\AppData\Roaming`
///
/// # Errors
///
/// Returns an error if the data directory cannot be determined.
pub fn get_database_path() -> Result<PathBuf> {
    let data_dir =
        dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Failed to determine data directory"))?;

    Ok(data_dir.join("ftax").join("categorizations.db"))
}

/// Ensures the parent directory of the database file exists.
///
/// # Errors
///
/// Returns an error if directory creation fails.
pub fn ensure_database_directory(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create database directory: {}", parent.display())
        })?;
    }
    Ok(())
}

/// The `dir_path` string under which a directory's categorizations are stored.
///
/// Canonicalized, so `./Downloads` and `/home/me/Downloads` share records.
///
/// # Errors
///
/// Returns an error if the directory does not exist.
pub fn directory_key(dir: &Path) -> Result<String> {
    let canonical = dir
        .canonicalize()
        .with_context(|| format!("Directory not found: {}", dir.display()))?;
    Ok(canonical.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn get_database_path_returns_valid_path() {
        let path = get_database_path().unwrap();
        assert!(path.to_string_lossy().contains("ftax"));
        assert!(path.to_string_lossy().contains("categorizations.db"));
    }

    #[test]
    fn ensure_database_directory_creates_parents() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("deeper").join("db.sqlite");

        ensure_database_directory(&db_path).unwrap();

        assert!(db_path.parent().unwrap().is_dir());
    }

    #[test]
    fn directory_key_is_stable_across_spellings() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("inbox")).unwrap();

        let direct = directory_key(&dir.path().join("inbox")).unwrap();
        let dotted = directory_key(&dir.path().join("inbox").join(".")).unwrap();

        assert_eq!(direct, dotted);
        assert!(directory_key(&dir.path().join("missing")).is_err());
    }
}
