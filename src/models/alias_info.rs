use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::TaxonomyId;

/// A persisted alias: an alternate normalized spelling and the canonical
/// taxonomy entry it resolves to.
///
/// Every canonical entry also has an alias for its own normalized key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasMapping {
    normalized_category: String,
    normalized_subcategory: String,
    taxonomy_id: TaxonomyId,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
}

impl AliasMapping {
    /// Creates a new AliasMapping.
    ///
    /// # Examples
    ///
    /// ```
    /// use ftax::{AliasMapping, TaxonomyId};
    /// use time::OffsetDateTime;
    ///
    /// let alias = AliasMapping::new("image", "photo", TaxonomyId::new(1), OffsetDateTime::now_utc());
    ///
    /// assert_eq!(alias.normalized_category(), "image");
    /// assert_eq!(alias.taxonomy_id(), TaxonomyId::new(1));
    /// ```
    pub fn new(
        normalized_category: impl Into<String>,
        normalized_subcategory: impl Into<String>,
        taxonomy_id: TaxonomyId,
        created_at: OffsetDateTime,
    ) -> Self {
        Self {
            normalized_category: normalized_category.into(),
            normalized_subcategory: normalized_subcategory.into(),
            taxonomy_id,
            created_at,
        }
    }

    pub fn normalized_category(&self) -> &str {
        &self.normalized_category
    }

    pub fn normalized_subcategory(&self) -> &str {
        &self.normalized_subcategory
    }

    /// Returns the canonical taxonomy id this alias resolves to.
    pub fn taxonomy_id(&self) -> TaxonomyId {
        self.taxonomy_id
    }

    /// Returns when this alias was recorded.
    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }
}

impl fmt::Display for AliasMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} : {} -> {}",
            self.normalized_category,
            self.normalized_subcategory,
            self.taxonomy_id.get()
        )
    }
}
