//! Runtime settings read from the environment (and `.env`, loaded by the binary).

use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use crate::taxonomy::{DEFAULT_CATEGORY_WEIGHT, DEFAULT_FUZZY_THRESHOLD, ResolverConfig};
use crate::utils::get_database_path;

pub const DB_PATH_VAR: &str = "FTAX_DB_PATH";
pub const OLLAMA_HOST_VAR: &str = "OLLAMA_HOST";
pub const OLLAMA_MODEL_VAR: &str = "OLLAMA_MODEL";
pub const FUZZY_THRESHOLD_VAR: &str = "FTAX_FUZZY_THRESHOLD";
pub const CATEGORY_WEIGHT_VAR: &str = "FTAX_CATEGORY_WEIGHT";

const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub db_path: PathBuf,
    pub ollama_host: String,
    /// Empty means "largest installed model".
    pub ollama_model: String,
    pub resolver: ResolverConfig,
}

impl Settings {
    /// Reads settings from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, applying defaults for unset or empty values.
    ///
    /// # Errors
    ///
    /// Fails when a numeric variable does not parse or is outside `[0, 1]`,
    /// or when no default database location can be determined.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let db_path = match get(DB_PATH_VAR) {
            Some(path) => PathBuf::from(path),
            None => get_database_path()?,
        };

        let resolver = ResolverConfig::new(
            unit_interval(FUZZY_THRESHOLD_VAR, get(FUZZY_THRESHOLD_VAR), DEFAULT_FUZZY_THRESHOLD)?,
            unit_interval(CATEGORY_WEIGHT_VAR, get(CATEGORY_WEIGHT_VAR), DEFAULT_CATEGORY_WEIGHT)?,
        );

        Ok(Self {
            db_path,
            ollama_host: get(OLLAMA_HOST_VAR).unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string()),
            ollama_model: get(OLLAMA_MODEL_VAR).unwrap_or_default(),
            resolver,
        })
    }
}

fn unit_interval(name: &str, raw: Option<String>, default: f64) -> Result<f64> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    let value: f64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{name} must be a number, got {raw:?}"))?;
    if !(0.0..=1.0).contains(&value) {
        bail!("{name} must be between 0 and 1, got {value}");
    }
    Ok(value)
}
