//! Moves categorized items into `<category>/<subcategory>` folders.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;

use crate::utils::directory_key;
use crate::{CategorizationService, CategorizedFile};

/// One planned rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedMove {
    pub file_name: String,
    pub source: PathBuf,
    pub target: PathBuf,
}

/// Outcome of [`apply_moves`].
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct SortReport {
    pub moved: Vec<PlannedMove>,
    pub failed: Vec<(PlannedMove, String)>,
    pub dry_run: bool,
}

/// Builds `base_dir/<category>/<subcategory>/<file_name>` targets for `files`.
///
/// Characters that are unsafe in path components are replaced by `_`.
pub fn plan_moves(base_dir: &Path, files: &[CategorizedFile]) -> Vec<PlannedMove> {
    files
        .iter()
        .map(|file| PlannedMove {
            file_name: file.file_name.clone(),
            source: base_dir.join(&file.file_name),
            target: base_dir
                .join(sanitize_component(&file.category))
                .join(sanitize_component(&file.subcategory))
                .join(&file.file_name),
        })
        .collect()
}

/// Performs the planned renames, collecting per-item failures.
///
/// Existing targets are never overwritten. With `dry_run` nothing on disk
/// changes and every move that would be attempted is reported as moved.
pub fn apply_moves(plan: &[PlannedMove], dry_run: bool) -> SortReport {
    let mut report = SortReport {
        dry_run,
        ..SortReport::default()
    };

    for planned in plan {
        let result = if dry_run {
            Ok(())
        } else {
            move_one(planned)
        };
        match result {
            Ok(()) => report.moved.push(planned.clone()),
            Err(error) => {
                tracing::warn!(source = %planned.source.display(), error = %error, "Move failed");
                report.failed.push((planned.clone(), format!("{error:#}")));
            }
        }
    }

    tracing::info!(
        moved = report.moved.len(),
        failed = report.failed.len(),
        dry_run,
        "Sort finished"
    );
    report
}

/// Sorts everything recorded for `dir_key` and keeps the records in step.
///
/// Each moved item's record follows it to its new folder, so listing the
/// original directory no longer shows it and a later run of the new folder
/// reuses it. A dry run leaves the database untouched.
///
/// # Errors
///
/// Fails if the records cannot be read or updated. Per-item move failures
/// are reported in the [`SortReport`] instead.
pub fn sort_directory(
    service: &mut CategorizationService,
    dir_key: &str,
    dry_run: bool,
) -> Result<SortReport> {
    let files = service.get_categorized_files(dir_key)?;
    let report = apply_moves(&plan_moves(Path::new(dir_key), &files), dry_run);
    if dry_run {
        return Ok(report);
    }

    for planned in &report.moved {
        let Some(parent) = planned.target.parent() else {
            continue;
        };
        let new_dir = directory_key(parent)?;
        service
            .relocate_file_categorization(&planned.file_name, dir_key, &new_dir)
            .with_context(|| format!("Failed to update record for {}", planned.file_name))?;
    }
    Ok(report)
}

fn move_one(planned: &PlannedMove) -> Result<()> {
    if !planned.source.exists() {
        bail!("source {} no longer exists", planned.source.display());
    }
    if planned.target.starts_with(&planned.source) {
        bail!("cannot move {} into itself", planned.source.display());
    }
    if planned.target.exists() {
        bail!("target {} already exists", planned.target.display());
    }
    if let Some(parent) = planned.target.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::rename(&planned.source, &planned.target).with_context(|| {
        format!(
            "Failed to move {} to {}",
            planned.source.display(),
            planned.target.display()
        )
    })
}

/// Makes a taxonomy label usable as a single path component.
pub fn sanitize_component(label: &str) -> String {
    let cleaned: String = label
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').trim();

    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned.to_string()
    }
}
