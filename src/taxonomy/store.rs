use std::collections::HashMap;

use rusqlite::{OptionalExtension, params};
use time::OffsetDateTime;

use crate::{AliasMapping, Database, TaxonomyEntry, TaxonomyId};

use super::TaxonomyError;
use super::resolver::ResolverConfig;

/// Composite normalized (category, subcategory) key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LabelKey {
    pub category: String,
    pub subcategory: String,
}

impl LabelKey {
    pub fn new(category: impl Into<String>, subcategory: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            subcategory: subcategory.into(),
        }
    }
}

/// Durable taxonomy table plus its in-memory indices.
///
/// The whole taxonomy is loaded eagerly when the store is opened. Every
/// mutation writes to SQLite first and touches the indices only after the
/// write (or its transaction) has committed, so a failed write never leaves
/// memory ahead of disk.
pub struct TaxonomyStore {
    db: Database,
    config: ResolverConfig,
    entries: Vec<TaxonomyEntry>,
    canonical_lookup: HashMap<LabelKey, TaxonomyId>,
    alias_lookup: HashMap<LabelKey, TaxonomyId>,
    taxonomy_index: HashMap<TaxonomyId, usize>,
}

impl TaxonomyStore {
    /// Opens a store over the given database with default resolver settings.
    pub fn new(db: Database) -> Result<Self, TaxonomyError> {
        Self::with_config(db, ResolverConfig::default())
    }

    /// Opens a store with explicit resolver settings.
    pub fn with_config(db: Database, config: ResolverConfig) -> Result<Self, TaxonomyError> {
        let mut store = Self {
            db,
            config,
            entries: Vec::new(),
            canonical_lookup: HashMap::new(),
            alias_lookup: HashMap::new(),
            taxonomy_index: HashMap::new(),
        };
        store.load_taxonomy_cache()?;
        Ok(store)
    }

    /// Returns the underlying database.
    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> ResolverConfig {
        self.config
    }

    /// Rebuilds every in-memory index from durable storage.
    ///
    /// Canonical entries missing their self-alias get one persisted here.
    /// On failure the previous indices are left untouched.
    pub fn load_taxonomy_cache(&mut self) -> Result<(), TaxonomyError> {
        let conn = self.db.connection();

        let entries: Vec<TaxonomyEntry> = {
            let mut stmt = conn.prepare(
                "SELECT id, category, subcategory, normalized_category, normalized_subcategory, frequency
                 FROM taxonomy ORDER BY id",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(TaxonomyEntry::new(
                    TaxonomyId::new(row.get(0)?),
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get(5)?,
                ))
            })?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        let mut alias_lookup = HashMap::new();
        {
            let mut stmt = conn.prepare(
                "SELECT normalized_category, normalized_subcategory, taxonomy_id FROM taxonomy_aliases",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    LabelKey::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?),
                    TaxonomyId::new(row.get(2)?),
                ))
            })?;
            for row in rows {
                let (key, id) = row?;
                alias_lookup.insert(key, id);
            }
        }

        let mut canonical_lookup = HashMap::with_capacity(entries.len());
        let mut taxonomy_index = HashMap::with_capacity(entries.len());
        let mut missing_self_aliases = Vec::new();
        for (position, entry) in entries.iter().enumerate() {
            let key = LabelKey::new(entry.normalized_category(), entry.normalized_subcategory());
            if !alias_lookup.contains_key(&key) {
                missing_self_aliases.push((key.clone(), entry.id()));
            }
            canonical_lookup.insert(key, entry.id());
            taxonomy_index.insert(entry.id(), position);
        }

        if !missing_self_aliases.is_empty() {
            let tx = conn.unchecked_transaction()?;
            let now = OffsetDateTime::now_utc().unix_timestamp();
            for (key, id) in &missing_self_aliases {
                tx.execute(
                    "INSERT OR IGNORE INTO taxonomy_aliases
                     (normalized_category, normalized_subcategory, taxonomy_id, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![key.category, key.subcategory, id.get(), now],
                )?;
            }
            tx.commit()?;
            tracing::warn!(
                count = missing_self_aliases.len(),
                "Restored missing self-aliases for canonical taxonomy entries"
            );
            for (key, id) in missing_self_aliases {
                alias_lookup.insert(key, id);
            }
        }

        tracing::debug!(
            entries = entries.len(),
            aliases = alias_lookup.len(),
            "Loaded taxonomy cache"
        );

        self.entries = entries;
        self.canonical_lookup = canonical_lookup;
        self.alias_lookup = alias_lookup;
        self.taxonomy_index = taxonomy_index;
        Ok(())
    }

    /// Inserts a new canonical entry with frequency 1 and its self-alias.
    ///
    /// Both rows are written in one transaction. Fails with a persistence
    /// error if the normalized key is already taken.
    pub fn create_taxonomy_entry(
        &mut self,
        category: &str,
        subcategory: &str,
        normalized_category: &str,
        normalized_subcategory: &str,
    ) -> Result<TaxonomyId, TaxonomyError> {
        let conn = self.db.connection();
        let now = OffsetDateTime::now_utc().unix_timestamp();

        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO taxonomy
             (category, subcategory, normalized_category, normalized_subcategory, frequency, created_at)
             VALUES (?1, ?2, ?3, ?4, 1, ?5)",
            params![
                category,
                subcategory,
                normalized_category,
                normalized_subcategory,
                now
            ],
        )?;
        let id = TaxonomyId::new(tx.last_insert_rowid());
        tx.execute(
            "INSERT INTO taxonomy_aliases
             (normalized_category, normalized_subcategory, taxonomy_id, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![normalized_category, normalized_subcategory, id.get(), now],
        )?;
        tx.commit()?;

        let key = LabelKey::new(normalized_category, normalized_subcategory);
        self.entries.push(TaxonomyEntry::new(
            id,
            category,
            subcategory,
            normalized_category,
            normalized_subcategory,
            1,
        ));
        self.taxonomy_index.insert(id, self.entries.len() - 1);
        self.canonical_lookup.insert(key.clone(), id);
        self.alias_lookup.insert(key, id);

        Ok(id)
    }

    /// Records `normalized_category`/`normalized_subcategory` as an alias of
    /// `taxonomy_id`.
    ///
    /// Idempotent: an existing alias key is never rebound. Returns whether a
    /// new alias was written.
    pub fn ensure_alias_mapping(
        &mut self,
        taxonomy_id: TaxonomyId,
        normalized_category: &str,
        normalized_subcategory: &str,
    ) -> Result<bool, TaxonomyError> {
        let key = LabelKey::new(normalized_category, normalized_subcategory);
        if self.alias_lookup.contains_key(&key) {
            return Ok(false);
        }
        if !self.taxonomy_index.contains_key(&taxonomy_id) {
            return Err(TaxonomyError::UnknownTaxonomy(taxonomy_id));
        }

        let now = OffsetDateTime::now_utc().unix_timestamp();
        self.db.connection().execute(
            "INSERT OR IGNORE INTO taxonomy_aliases
             (normalized_category, normalized_subcategory, taxonomy_id, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![key.category, key.subcategory, taxonomy_id.get(), now],
        )?;

        self.alias_lookup.insert(key, taxonomy_id);
        Ok(true)
    }

    /// Adds one to an entry's usage counter, persisting immediately.
    ///
    /// Returns the new frequency.
    pub fn increment_taxonomy_frequency(
        &mut self,
        taxonomy_id: TaxonomyId,
    ) -> Result<i64, TaxonomyError> {
        let Some(&position) = self.taxonomy_index.get(&taxonomy_id) else {
            return Err(TaxonomyError::UnknownTaxonomy(taxonomy_id));
        };

        let changed = self.db.connection().execute(
            "UPDATE taxonomy SET frequency = frequency + 1 WHERE id = ?1",
            [taxonomy_id.get()],
        )?;
        if changed == 0 {
            return Err(TaxonomyError::UnknownTaxonomy(taxonomy_id));
        }

        let entry = &mut self.entries[position];
        entry.increment_frequency();
        Ok(entry.frequency())
    }

    /// Writes a fuzzy-match alias and the frequency bump in one transaction.
    pub(crate) fn accept_fuzzy_match(
        &mut self,
        taxonomy_id: TaxonomyId,
        normalized_category: &str,
        normalized_subcategory: &str,
    ) -> Result<i64, TaxonomyError> {
        let Some(&position) = self.taxonomy_index.get(&taxonomy_id) else {
            return Err(TaxonomyError::UnknownTaxonomy(taxonomy_id));
        };
        let key = LabelKey::new(normalized_category, normalized_subcategory);
        let now = OffsetDateTime::now_utc().unix_timestamp();

        let tx = self.db.connection().unchecked_transaction()?;
        tx.execute(
            "INSERT OR IGNORE INTO taxonomy_aliases
             (normalized_category, normalized_subcategory, taxonomy_id, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![key.category, key.subcategory, taxonomy_id.get(), now],
        )?;
        tx.execute(
            "UPDATE taxonomy SET frequency = frequency + 1 WHERE id = ?1",
            [taxonomy_id.get()],
        )?;
        tx.commit()?;

        self.alias_lookup.entry(key).or_insert(taxonomy_id);
        let entry = &mut self.entries[position];
        entry.increment_frequency();
        Ok(entry.frequency())
    }

    /// Looks up an entry by id in O(1).
    pub fn find_taxonomy_entry(&self, taxonomy_id: TaxonomyId) -> Option<&TaxonomyEntry> {
        self.taxonomy_index
            .get(&taxonomy_id)
            .and_then(|&position| self.entries.get(position))
    }

    /// Alias lookup; covers canonical keys as well.
    pub fn lookup_alias(
        &self,
        normalized_category: &str,
        normalized_subcategory: &str,
    ) -> Option<TaxonomyId> {
        self.alias_lookup
            .get(&LabelKey::new(normalized_category, normalized_subcategory))
            .copied()
    }

    /// Canonical-only lookup.
    pub fn lookup_canonical(
        &self,
        normalized_category: &str,
        normalized_subcategory: &str,
    ) -> Option<TaxonomyId> {
        self.canonical_lookup
            .get(&LabelKey::new(normalized_category, normalized_subcategory))
            .copied()
    }

    /// All canonical entries in creation (id) order.
    pub fn entries(&self) -> &[TaxonomyEntry] {
        &self.entries
    }

    /// Entries for display: most used first, oldest first among equals.
    pub fn entries_by_frequency(&self) -> Vec<&TaxonomyEntry> {
        let mut sorted: Vec<&TaxonomyEntry> = self.entries.iter().collect();
        sorted.sort_by(|a, b| b.frequency().cmp(&a.frequency()).then(a.id().cmp(&b.id())));
        sorted
    }

    pub fn alias_count(&self) -> usize {
        self.alias_lookup.len()
    }

    /// Lists every persisted alias, grouped by taxonomy id.
    pub fn list_aliases(&self) -> Result<Vec<AliasMapping>, TaxonomyError> {
        self.query_aliases(None)
    }

    /// Lists the aliases pointing at one entry, its self-alias included.
    pub fn aliases_for(&self, taxonomy_id: TaxonomyId) -> Result<Vec<AliasMapping>, TaxonomyError> {
        self.query_aliases(Some(taxonomy_id))
    }

    fn query_aliases(
        &self,
        taxonomy_id: Option<TaxonomyId>,
    ) -> Result<Vec<AliasMapping>, TaxonomyError> {
        let mut stmt = self.db.connection().prepare(
            "SELECT normalized_category, normalized_subcategory, taxonomy_id, created_at
             FROM taxonomy_aliases
             WHERE ?1 IS NULL OR taxonomy_id = ?1
             ORDER BY taxonomy_id, normalized_category, normalized_subcategory",
        )?;
        let rows = stmt.query_map([taxonomy_id.map(TaxonomyId::get)], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let mut aliases = Vec::new();
        for row in rows {
            let (category, subcategory, id, created_at) = row?;
            let created_at = OffsetDateTime::from_unix_timestamp(created_at)
                .unwrap_or(OffsetDateTime::UNIX_EPOCH);
            aliases.push(AliasMapping::new(
                category,
                subcategory,
                TaxonomyId::new(id),
                created_at,
            ));
        }
        Ok(aliases)
    }

    /// Re-verifies the taxonomy invariants against durable storage.
    ///
    /// Returns one message per violation; an empty list means healthy.
    pub fn check_invariants(&self) -> Result<Vec<String>, TaxonomyError> {
        let conn = self.db.connection();
        let mut violations = Vec::new();

        let mut stmt = conn.prepare(
            "SELECT normalized_category, normalized_subcategory, COUNT(*)
             FROM taxonomy
             GROUP BY normalized_category, normalized_subcategory
             HAVING COUNT(*) > 1",
        )?;
        let duplicates = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;
        for duplicate in duplicates {
            let (category, subcategory, count) = duplicate?;
            violations.push(format!(
                "{count} canonical entries share the key '{category} : {subcategory}'"
            ));
        }

        for entry in &self.entries {
            let self_alias: Option<i64> = conn
                .query_row(
                    "SELECT taxonomy_id FROM taxonomy_aliases
                     WHERE normalized_category = ?1 AND normalized_subcategory = ?2",
                    params![entry.normalized_category(), entry.normalized_subcategory()],
                    |row| row.get(0),
                )
                .optional()?;
            if self_alias != Some(entry.id().get()) {
                violations.push(format!(
                    "entry {} is missing its self-alias (found {:?})",
                    entry.id(),
                    self_alias
                ));
            }
        }

        let durable_entries: i64 =
            conn.query_row("SELECT COUNT(*) FROM taxonomy", [], |row| row.get(0))?;
        if durable_entries != self.entries.len() as i64 {
            violations.push(format!(
                "in-memory cache holds {} entries but storage holds {}",
                self.entries.len(),
                durable_entries
            ));
        }

        let durable_aliases: i64 =
            conn.query_row("SELECT COUNT(*) FROM taxonomy_aliases", [], |row| row.get(0))?;
        if durable_aliases != self.alias_lookup.len() as i64 {
            violations.push(format!(
                "in-memory alias index holds {} keys but storage holds {}",
                self.alias_lookup.len(),
                durable_aliases
            ));
        }

        for entry in &self.entries {
            let frequency: Option<i64> = conn
                .query_row(
                    "SELECT frequency FROM taxonomy WHERE id = ?1",
                    [entry.id().get()],
                    |row| row.get(0),
                )
                .optional()?;
            if frequency != Some(entry.frequency()) {
                violations.push(format!(
                    "entry {} frequency is {} in memory but {:?} in storage",
                    entry.id(),
                    entry.frequency(),
                    frequency
                ));
            }
        }

        Ok(violations)
    }
}
