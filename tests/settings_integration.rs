//! Integration tests for environment-driven settings.
//!
//! These mutate process environment variables, so they run serially.

use ftax::Settings;
use ftax::config::{CATEGORY_WEIGHT_VAR, DB_PATH_VAR, FUZZY_THRESHOLD_VAR, OLLAMA_MODEL_VAR};
use ftax::{CategorizationService, Database, TaxonomyId};
use serial_test::serial;
use tempfile::tempdir;

fn clear_env() {
    for key in [DB_PATH_VAR, FUZZY_THRESHOLD_VAR, CATEGORY_WEIGHT_VAR, OLLAMA_MODEL_VAR] {
        unsafe {
            std::env::remove_var(key);
        }
    }
}

#[test]
#[serial]
fn test_settings_from_env_drive_resolution() {
    clear_env();
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("env.db");
    unsafe {
        std::env::set_var(DB_PATH_VAR, &db_path);
        std::env::set_var(FUZZY_THRESHOLD_VAR, "0.99");
    }

    let settings = Settings::from_env().unwrap();
    clear_env();

    assert_eq!(settings.db_path, db_path);
    let mut service = CategorizationService::with_config(
        Database::open(&settings.db_path).unwrap(),
        settings.resolver,
    )
    .unwrap();

    let images = service.resolve_category("Images", "Photos").unwrap();
    let image = service.resolve_category("Image", "Photo").unwrap();

    assert_eq!(images.taxonomy_id, TaxonomyId::new(1));
    assert_eq!(image.taxonomy_id, TaxonomyId::new(2));
}

#[test]
#[serial]
fn test_invalid_threshold_is_rejected() {
    clear_env();
    unsafe {
        std::env::set_var(FUZZY_THRESHOLD_VAR, "lots");
    }

    let result = Settings::from_env();
    clear_env();

    let error = result.unwrap_err();
    assert!(error.to_string().contains(FUZZY_THRESHOLD_VAR));
}
