//! One categorization pass over a directory.
//!
//! Ties the scanner, an LLM collaborator, the response parser, the resolver
//! and the file cache together. Items already recorded for the directory are
//! reused without asking the model again.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::llm::{CategorizationClient, parse_category_response};
use crate::scanner::{FileEntry, FileScanner, ScanOptions};
use crate::taxonomy::TaxonomyError;
use crate::utils::directory_key;
use crate::{CategorizationService, CategorizedFile};

/// An item that could not be categorized, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedEntry {
    pub file_name: String,
    pub reason: String,
}

/// Outcome of [`CategorizationSession::run`].
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    /// Newly categorized in this run.
    pub categorized: Vec<CategorizedFile>,
    /// Already recorded; no model call was made.
    pub reused: Vec<CategorizedFile>,
    /// Not reached because the run was cancelled.
    pub skipped: Vec<String>,
    pub failed: Vec<FailedEntry>,
    /// Recorded for the directory but no longer on disk.
    pub stale: Vec<String>,
    /// True if the stale records were deleted.
    pub stale_pruned: bool,
    pub cancelled: bool,
}

impl SessionReport {
    /// All categorizations, new and reused, ordered by file name.
    pub fn all_files(&self) -> Vec<&CategorizedFile> {
        let mut files: Vec<&CategorizedFile> =
            self.categorized.iter().chain(self.reused.iter()).collect();
        files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        files
    }
}

type ProgressCallback = Box<dyn FnMut(usize, usize, &str) + Send>;

/// Drives one directory through scan → ask → parse → resolve → record.
pub struct CategorizationSession {
    client: Box<dyn CategorizationClient>,
    options: ScanOptions,
    cancel: Arc<AtomicBool>,
    progress: Option<ProgressCallback>,
    prune_stale: bool,
}

impl CategorizationSession {
    pub fn new(client: Box<dyn CategorizationClient>) -> Self {
        Self {
            client,
            options: ScanOptions::default(),
            cancel: Arc::new(AtomicBool::new(false)),
            progress: None,
            prune_stale: false,
        }
    }

    pub fn with_options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }

    /// Deletes records of items that are no longer on disk at the end of a run.
    pub fn prune_stale(mut self, prune: bool) -> Self {
        self.prune_stale = prune;
        self
    }

    /// Registers a callback receiving `(index, total, file_name)` before each item.
    pub fn on_progress(mut self, callback: impl FnMut(usize, usize, &str) + Send + 'static) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Flag that stops the run before the next item when set.
    ///
    /// The item being resolved when the flag flips is always finished.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Categorizes the contents of `dir`.
    ///
    /// Per-item model failures and unusable answers are recorded in the
    /// report and the run continues.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be scanned or a database write fails.
    pub fn run(
        &mut self,
        service: &mut CategorizationService,
        dir: &Path,
    ) -> Result<SessionReport> {
        let dir_key = directory_key(dir)?;
        let entries = FileScanner::scan(dir, self.options)?;
        let total = entries.len();
        let mut report = SessionReport::default();

        tracing::info!(dir = %dir_key, total, "Starting categorization");

        for (index, entry) in entries.iter().enumerate() {
            if self.cancel.load(Ordering::SeqCst) {
                report.cancelled = true;
                report
                    .skipped
                    .extend(entries[index..].iter().map(|e| e.file_name.clone()));
                tracing::info!(remaining = total - index, "Categorization cancelled");
                break;
            }
            if let Some(progress) = self.progress.as_mut() {
                progress(index, total, &entry.file_name);
            }

            if let Some(existing) = service
                .categorization_for(&entry.file_name, &dir_key)
                .context("Failed to read cached categorization")?
            {
                report.reused.push(existing);
                continue;
            }

            match self.categorize_entry(service, entry, &dir_key) {
                Ok(Some(file)) => report.categorized.push(file),
                Ok(None) => {}
                Err(EntryError::Skip(reason)) => {
                    tracing::warn!(file_name = %entry.file_name, %reason, "Could not categorize");
                    report.failed.push(FailedEntry {
                        file_name: entry.file_name.clone(),
                        reason,
                    });
                }
                Err(EntryError::Abort(error)) => {
                    return Err(error).with_context(|| {
                        format!("Failed to record categorization for {}", entry.file_name)
                    });
                }
            }
        }

        if self.prune_stale {
            report.stale = service
                .prune_missing_files(&dir_key, dir)
                .context("Failed to prune stale records")?;
            report.stale_pruned = true;
        } else {
            report.stale = service
                .get_dir_contents_from_db(&dir_key)
                .context("Failed to list recorded files")?
                .into_iter()
                .filter(|name| !dir.join(name).exists())
                .collect();
        }

        tracing::info!(
            categorized = report.categorized.len(),
            reused = report.reused.len(),
            failed = report.failed.len(),
            stale = report.stale.len(),
            "Categorization finished"
        );
        Ok(report)
    }

    fn categorize_entry(
        &self,
        service: &mut CategorizationService,
        entry: &FileEntry,
        dir_key: &str,
    ) -> Result<Option<CategorizedFile>, EntryError> {
        let answer = self
            .client
            .categorize_file(&entry.file_name, Some(&entry.full_path), entry.file_type)
            .map_err(|e| EntryError::Skip(e.to_string()))?;

        let (category, subcategory) = parse_category_response(&answer)?;
        let resolved = service.resolve_category(&category, &subcategory)?;
        service.insert_or_update_file_with_categorization(
            &entry.file_name,
            entry.file_type,
            dir_key,
            &resolved,
        )?;

        Ok(service.categorization_for(&entry.file_name, dir_key)?)
    }
}

enum EntryError {
    Skip(String),
    Abort(TaxonomyError),
}

impl From<TaxonomyError> for EntryError {
    fn from(error: TaxonomyError) -> Self {
        match error {
            TaxonomyError::InvalidLabel { .. } => Self::Skip(error.to_string()),
            other => Self::Abort(other),
        }
    }
}
