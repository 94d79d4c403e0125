use std::collections::HashMap;
use std::path::Path;

use rusqlite::{OptionalExtension, params};
use serde::Serialize;
use time::OffsetDateTime;

use crate::taxonomy::{Resolution, ResolverConfig, TaxonomyError, TaxonomyStore};
use crate::{CategorizedFile, Database, FileType, ResolvedCategory, TaxonomyId};

/// Row counts reported by [`CategorizationService::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub taxonomy_entries: usize,
    pub aliases: usize,
    pub categorized_files: i64,
}

/// Service layer tying the taxonomy to per-directory file categorizations.
///
/// CategorizationService owns the [`TaxonomyStore`] (and through it the
/// database) plus a per-run map of category strings already looked up. It
/// is UI-independent and is driven by the CLI and the categorization session.
///
/// All mutating methods take `&mut self`; wrap the service in a `Mutex` to
/// share it between threads.
///
/// # Examples
///
/// ```
/// use ftax::{CategorizationService, Database, FileType};
///
/// # fn main() -> anyhow::Result<()> {
/// let mut service = CategorizationService::new(Database::in_memory()?)?;
///
/// let resolved = service.resolve_category("Documents", "Invoices")?;
/// service.insert_or_update_file_with_categorization(
///     "march.pdf",
///     FileType::File,
///     "/home/user/Downloads",
///     &resolved,
/// )?;
///
/// assert!(service.is_file_already_categorized("march.pdf")?);
/// # Ok(())
/// # }
/// ```
pub struct CategorizationService {
    store: TaxonomyStore,
    cached_results: HashMap<(String, FileType), (String, String)>,
}

impl CategorizationService {
    /// Creates a service over the given database with default resolver settings.
    ///
    /// Loads the whole taxonomy into memory.
    pub fn new(db: Database) -> Result<Self, TaxonomyError> {
        Self::with_config(db, ResolverConfig::default())
    }

    pub fn with_config(db: Database, config: ResolverConfig) -> Result<Self, TaxonomyError> {
        Ok(Self {
            store: TaxonomyStore::with_config(db, config)?,
            cached_results: HashMap::new(),
        })
    }

    /// Returns a reference to the underlying database.
    pub fn database(&self) -> &Database {
        self.store.database()
    }

    pub fn taxonomy(&self) -> &TaxonomyStore {
        &self.store
    }

    pub fn taxonomy_mut(&mut self) -> &mut TaxonomyStore {
        &mut self.store
    }

    /// Resolves a raw label pair to its canonical taxonomy entry.
    ///
    /// See [`TaxonomyStore::resolve_category`].
    pub fn resolve_category(
        &mut self,
        category: &str,
        subcategory: &str,
    ) -> Result<ResolvedCategory, TaxonomyError> {
        self.store.resolve_category(category, subcategory)
    }

    pub fn resolve_category_detailed(
        &mut self,
        category: &str,
        subcategory: &str,
    ) -> Result<Resolution, TaxonomyError> {
        self.store.resolve_category_detailed(category, subcategory)
    }

    /// Re-confirms an existing entry, returning its new frequency.
    pub fn increment_taxonomy_frequency(
        &mut self,
        taxonomy_id: TaxonomyId,
    ) -> Result<i64, TaxonomyError> {
        self.store.increment_taxonomy_frequency(taxonomy_id)
    }

    /// True if `file_name` has been categorized in any directory.
    pub fn is_file_already_categorized(&self, file_name: &str) -> Result<bool, TaxonomyError> {
        let found: Option<i64> = self
            .database()
            .connection()
            .query_row(
                "SELECT 1 FROM categorized_files WHERE file_name = ?1 LIMIT 1",
                [file_name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Records (or replaces) the categorization of `file_name` in `dir_path`.
    ///
    /// A second call for the same `(file_name, dir_path)` overwrites the
    /// previous row. The per-run lookup map is refreshed after the write.
    ///
    /// # Errors
    ///
    /// `UnknownTaxonomy` if `resolved` does not name a stored entry,
    /// `Persistence` if the write fails.
    pub fn insert_or_update_file_with_categorization(
        &mut self,
        file_name: &str,
        file_type: FileType,
        dir_path: &str,
        resolved: &ResolvedCategory,
    ) -> Result<(), TaxonomyError> {
        let entry = self
            .store
            .find_taxonomy_entry(resolved.taxonomy_id)
            .ok_or(TaxonomyError::UnknownTaxonomy(resolved.taxonomy_id))?;
        let labels = (entry.category().to_string(), entry.subcategory().to_string());

        let now = OffsetDateTime::now_utc().unix_timestamp();
        self.database().connection().execute(
            "INSERT INTO categorized_files (file_name, dir_path, file_type, taxonomy_id, categorized_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(file_name, dir_path) DO UPDATE SET
                 file_type = excluded.file_type,
                 taxonomy_id = excluded.taxonomy_id,
                 categorized_at = excluded.categorized_at",
            params![
                file_name,
                dir_path,
                file_type.as_str(),
                resolved.taxonomy_id.get(),
                now
            ],
        )?;

        tracing::debug!(file_name, dir_path, id = %resolved.taxonomy_id, "Stored categorization");
        self.cached_results
            .insert((file_name.to_string(), file_type), labels);
        Ok(())
    }

    /// Lists every categorization recorded for a directory, ordered by file name.
    pub fn get_categorized_files(
        &self,
        dir_path: &str,
    ) -> Result<Vec<CategorizedFile>, TaxonomyError> {
        let mut stmt = self.database().connection().prepare(
            "SELECT f.file_name, f.dir_path, f.file_type, f.taxonomy_id,
                    t.category, t.subcategory, f.categorized_at
             FROM categorized_files f
             JOIN taxonomy t ON t.id = f.taxonomy_id
             WHERE f.dir_path = ?1
             ORDER BY f.file_name",
        )?;
        let rows = stmt.query_map([dir_path], categorized_file_from_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// The categorization of one item, if any.
    pub fn categorization_for(
        &self,
        file_name: &str,
        dir_path: &str,
    ) -> Result<Option<CategorizedFile>, TaxonomyError> {
        Ok(self
            .database()
            .connection()
            .query_row(
                "SELECT f.file_name, f.dir_path, f.file_type, f.taxonomy_id,
                        t.category, t.subcategory, f.categorized_at
                 FROM categorized_files f
                 JOIN taxonomy t ON t.id = f.taxonomy_id
                 WHERE f.file_name = ?1 AND f.dir_path = ?2",
                [file_name, dir_path],
                categorized_file_from_row,
            )
            .optional()?)
    }

    /// Names previously recorded for a directory, ordered by name.
    pub fn get_dir_contents_from_db(&self, dir_path: &str) -> Result<Vec<String>, TaxonomyError> {
        let mut stmt = self.database().connection().prepare(
            "SELECT file_name FROM categorized_files WHERE dir_path = ?1 ORDER BY file_name",
        )?;
        let rows = stmt.query_map([dir_path], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Deletes the record of `file_name` in `dir_path`.
    ///
    /// Returns false if there was nothing to delete. The per-run lookup map
    /// forgets the name so the next lookup goes back to the database.
    pub fn remove_file_categorization(
        &mut self,
        file_name: &str,
        dir_path: &str,
    ) -> Result<bool, TaxonomyError> {
        let removed = self.database().connection().execute(
            "DELETE FROM categorized_files WHERE file_name = ?1 AND dir_path = ?2",
            [file_name, dir_path],
        )?;

        self.cached_results.retain(|(name, _), _| name != file_name);
        tracing::debug!(file_name, dir_path, removed, "Removed categorization");
        Ok(removed > 0)
    }

    /// Moves the record of `file_name` from `from_dir` to `to_dir`.
    ///
    /// A record already present under `to_dir` is replaced. Returns false if
    /// nothing was recorded under `from_dir`.
    pub fn relocate_file_categorization(
        &mut self,
        file_name: &str,
        from_dir: &str,
        to_dir: &str,
    ) -> Result<bool, TaxonomyError> {
        let moved = self.database().connection().execute(
            "UPDATE OR REPLACE categorized_files SET dir_path = ?3
             WHERE file_name = ?1 AND dir_path = ?2",
            [file_name, from_dir, to_dir],
        )?;

        tracing::debug!(file_name, from_dir, to_dir, moved, "Relocated categorization");
        Ok(moved > 0)
    }

    /// Deletes records of `dir_path` whose items are no longer in `dir`.
    ///
    /// Returns the pruned names, ordered by name.
    pub fn prune_missing_files(
        &mut self,
        dir_path: &str,
        dir: &Path,
    ) -> Result<Vec<String>, TaxonomyError> {
        let missing: Vec<String> = self
            .get_dir_contents_from_db(dir_path)?
            .into_iter()
            .filter(|name| !dir.join(name).exists())
            .collect();

        let tx = self.database().connection().unchecked_transaction()?;
        for name in &missing {
            tx.execute(
                "DELETE FROM categorized_files WHERE file_name = ?1 AND dir_path = ?2",
                [name.as_str(), dir_path],
            )?;
        }
        tx.commit()?;

        self.cached_results
            .retain(|(name, _), _| !missing.contains(name));
        if !missing.is_empty() {
            tracing::info!(dir_path, pruned = missing.len(), "Pruned missing files");
        }
        Ok(missing)
    }

    /// Category strings last stored for `file_name`, served from memory
    /// after the first lookup.
    pub fn get_categorization_from_db(
        &mut self,
        file_name: &str,
        file_type: FileType,
    ) -> Result<Option<(String, String)>, TaxonomyError> {
        let key = (file_name.to_string(), file_type);
        if let Some(labels) = self.cached_results.get(&key) {
            return Ok(Some(labels.clone()));
        }

        let labels: Option<(String, String)> = self
            .database()
            .connection()
            .query_row(
                "SELECT t.category, t.subcategory
                 FROM categorized_files f
                 JOIN taxonomy t ON t.id = f.taxonomy_id
                 WHERE f.file_name = ?1 AND f.file_type = ?2
                 ORDER BY f.categorized_at DESC
                 LIMIT 1",
                [file_name, file_type.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        if let Some(labels) = &labels {
            self.cached_results.insert(key, labels.clone());
        }
        Ok(labels)
    }

    pub fn stats(&self) -> Result<CacheStats, TaxonomyError> {
        let categorized_files: i64 = self.database().connection().query_row(
            "SELECT COUNT(*) FROM categorized_files",
            [],
            |row| row.get(0),
        )?;
        Ok(CacheStats {
            taxonomy_entries: self.store.entries().len(),
            aliases: self.store.alias_count(),
            categorized_files,
        })
    }
}

fn categorized_file_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CategorizedFile> {
    let file_type: String = row.get(2)?;
    let file_type = file_type.parse::<FileType>().map_err(|message| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            message.into(),
        )
    })?;
    let categorized_at: i64 = row.get(6)?;
    let categorized_at = OffsetDateTime::from_unix_timestamp(categorized_at).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Integer, Box::new(e))
    })?;

    Ok(CategorizedFile {
        file_name: row.get(0)?,
        dir_path: row.get(1)?,
        file_type,
        taxonomy_id: TaxonomyId::new(row.get(3)?),
        category: row.get(4)?,
        subcategory: row.get(5)?,
        categorized_at,
    })
}
