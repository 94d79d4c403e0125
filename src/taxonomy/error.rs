use thiserror::Error;

use crate::TaxonomyId;

/// Errors raised by the taxonomy store, resolver and categorization cache.
#[derive(Debug, Error)]
pub enum TaxonomyError {
    /// The raw label could not be turned into a usable category or subcategory.
    ///
    /// `field` is `"category"`, `"subcategory"` or `"response"` (unparseable LLM line).
    #[error("invalid {field} label: {raw:?}")]
    InvalidLabel { field: &'static str, raw: String },

    /// A durable read or write failed. In-memory indices were not advanced.
    #[error("persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),

    /// The referenced taxonomy entry does not exist.
    #[error("taxonomy entry {0} does not exist")]
    UnknownTaxonomy(TaxonomyId),
}

impl TaxonomyError {
    pub(crate) fn invalid_label(field: &'static str, raw: impl Into<String>) -> Self {
        Self::InvalidLabel {
            field,
            raw: raw.into(),
        }
    }

    /// True for errors caused by the caller's input rather than storage.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::InvalidLabel { .. } | Self::UnknownTaxonomy(_))
    }
}
