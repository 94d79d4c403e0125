mod migration;

use std::path::Path;

use rusqlite::Connection;

pub use migration::{MIGRATIONS, Migration};

/// Database wrapper providing connection management and schema initialization.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens an in-memory SQLite database.
    ///
    /// Automatically applies all migrations on connection open.
    pub fn in_memory() -> rusqlite::Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(conn)
    }

    /// Opens a file-based SQLite database at the given path.
    ///
    /// Creates the database file if it does not exist.
    /// Automatically applies pending migrations on connection open.
    pub fn open(path: impl AsRef<Path>) -> rusqlite::Result<Self> {
        let conn = Connection::open(path)?;
        Self::initialize(conn)
    }

    fn initialize(mut conn: Connection) -> rusqlite::Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migration::apply_pending_migrations(&mut conn)?;
        Ok(Self { conn })
    }

    /// Returns a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Lists applied migrations as (version, applied_at, description), oldest first.
    pub fn applied_migrations(&self) -> rusqlite::Result<Vec<(u32, i64, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT version, applied_at, COALESCE(description, '') FROM schema_migrations ORDER BY version",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
        rows.collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn table_names(db: &Database) -> Vec<String> {
        db.connection()
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect()
    }

    #[test]
    fn in_memory_opens_successfully() {
        let result = Database::in_memory();
        assert!(result.is_ok());
    }

    #[test]
    fn schema_tables_exist() {
        let db = Database::in_memory().unwrap();
        let tables = table_names(&db);

        assert!(tables.contains(&"taxonomy".to_string()));
        assert!(tables.contains(&"taxonomy_aliases".to_string()));
        assert!(tables.contains(&"categorized_files".to_string()));
        assert!(tables.contains(&"schema_migrations".to_string()));
    }

    #[test]
    fn schema_indexes_exist() {
        let db = Database::in_memory().unwrap();

        let indexes: Vec<String> = db
            .connection()
            .prepare("SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(indexes.contains(&"idx_taxonomy_aliases_taxonomy".to_string()));
        assert!(indexes.contains(&"idx_categorized_files_dir".to_string()));
        assert!(indexes.contains(&"idx_categorized_files_taxonomy".to_string()));
    }

    #[test]
    fn foreign_keys_enabled() {
        let db = Database::in_memory().unwrap();

        let fk_enabled: i32 = db
            .connection()
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();

        assert_eq!(fk_enabled, 1);
    }

    #[test]
    fn taxonomy_rejects_duplicate_normalized_key() {
        let db = Database::in_memory().unwrap();
        let conn = db.connection();

        conn.execute(
            "INSERT INTO taxonomy (category, subcategory, normalized_category, normalized_subcategory, frequency, created_at)
             VALUES ('Images', 'Photos', 'images', 'photos', 1, 0)",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO taxonomy (category, subcategory, normalized_category, normalized_subcategory, frequency, created_at)
             VALUES ('IMAGES', 'photos', 'images', 'photos', 1, 0)",
            [],
        );

        let error = result.unwrap_err();
        assert!(
            error.to_string().contains("UNIQUE"),
            "Error should be about uniqueness: {}",
            error
        );
    }

    #[test]
    fn alias_must_reference_existing_taxonomy() {
        let db = Database::in_memory().unwrap();

        let result = db.connection().execute(
            "INSERT INTO taxonomy_aliases (normalized_category, normalized_subcategory, taxonomy_id, created_at)
             VALUES ('image', 'photo', 99, 0)",
            [],
        );

        assert!(result.is_err(), "dangling alias should violate FOREIGN KEY");
    }

    #[test]
    fn categorized_files_rejects_unknown_file_type() {
        let db = Database::in_memory().unwrap();
        let conn = db.connection();

        conn.execute(
            "INSERT INTO taxonomy (id, category, subcategory, normalized_category, normalized_subcategory, frequency, created_at)
             VALUES (1, 'Media', 'Music', 'media', 'music', 1, 0)",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO categorized_files (file_name, dir_path, file_type, taxonomy_id, categorized_at)
             VALUES ('song.mp3', '/music', 'Symlink', 1, 0)",
            [],
        );

        assert!(result.is_err());
    }

    #[test]
    fn open_creates_database_file() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");

        let result = Database::open(&db_path);
        assert!(result.is_ok());
        assert!(db_path.exists());
    }

    #[test]
    fn reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");

        {
            let db = Database::open(&db_path).unwrap();
            db.connection()
                .execute(
                    "INSERT INTO taxonomy (category, subcategory, normalized_category, normalized_subcategory, frequency, created_at)
                     VALUES ('Documents', 'Invoices', 'documents', 'invoices', 1, 0)",
                    [],
                )
                .unwrap();
        }

        // Reopen - migrations must not re-run or fail
        let db2 = Database::open(&db_path).unwrap();

        let count: i32 = db2
            .connection()
            .query_row("SELECT COUNT(*) FROM taxonomy", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);

        let migrations = db2.applied_migrations().unwrap();
        assert_eq!(migrations.len(), MIGRATIONS.len());
        assert_eq!(migrations[0].0, 1);
    }
}
