pub mod config;
pub mod db;
pub mod doctor;
pub mod llm;
pub mod models;
pub mod scanner;
pub mod service;
pub mod session;
pub mod sorter;
pub mod taxonomy;
pub mod utils;

pub use config::Settings;
pub use db::Database;
pub use models::{
    AliasMapping, CategorizedFile, FileType, ResolvedCategory, TaxonomyEntry, TaxonomyId,
};
pub use service::CategorizationService;
pub use session::{CategorizationSession, SessionReport};
pub use taxonomy::{ResolverConfig, TaxonomyError, TaxonomyStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_accessible_from_crate_root() {
        let db = Database::in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn types_accessible_from_crate_root() {
        let mut store = TaxonomyStore::new(Database::in_memory().unwrap()).unwrap();
        let resolved: ResolvedCategory = store.resolve_category("Images", "Photos").unwrap();

        let entry: &TaxonomyEntry = store.find_taxonomy_entry(resolved.taxonomy_id).unwrap();
        assert_eq!(entry.id(), TaxonomyId::new(1));
        assert_eq!(FileType::Directory.to_string(), "Directory");
        assert_eq!(ResolverConfig::default().threshold, 0.80);
    }
}
