use serde::{Deserialize, Serialize};

use super::TaxonomyId;

/// A canonical taxonomy row.
///
/// `category`/`subcategory` keep the display strings exactly as they were
/// first created. The normalized pair is the matching key and is unique
/// across all canonical entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyEntry {
    id: TaxonomyId,
    category: String,
    subcategory: String,
    normalized_category: String,
    normalized_subcategory: String,
    frequency: i64,
}

impl TaxonomyEntry {
    /// Creates a taxonomy entry from its stored fields.
    ///
    /// # Examples
    ///
    /// ```
    /// use ftax::{TaxonomyEntry, TaxonomyId};
    ///
    /// let entry = TaxonomyEntry::new(TaxonomyId::new(1), "Images", "Photos", "images", "photos", 1);
    /// assert_eq!(entry.category(), "Images");
    /// assert_eq!(entry.normalized_key(), ("images", "photos"));
    /// ```
    pub fn new(
        id: TaxonomyId,
        category: impl Into<String>,
        subcategory: impl Into<String>,
        normalized_category: impl Into<String>,
        normalized_subcategory: impl Into<String>,
        frequency: i64,
    ) -> Self {
        Self {
            id,
            category: category.into(),
            subcategory: subcategory.into(),
            normalized_category: normalized_category.into(),
            normalized_subcategory: normalized_subcategory.into(),
            frequency,
        }
    }

    pub fn id(&self) -> TaxonomyId {
        self.id
    }

    /// Display category as first created.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Display subcategory as first created.
    pub fn subcategory(&self) -> &str {
        &self.subcategory
    }

    pub fn normalized_category(&self) -> &str {
        &self.normalized_category
    }

    pub fn normalized_subcategory(&self) -> &str {
        &self.normalized_subcategory
    }

    /// Returns the normalized (category, subcategory) pair used for matching.
    pub fn normalized_key(&self) -> (&str, &str) {
        (&self.normalized_category, &self.normalized_subcategory)
    }

    /// Number of resolutions that landed on this entry.
    pub fn frequency(&self) -> i64 {
        self.frequency
    }

    pub(crate) fn increment_frequency(&mut self) {
        self.frequency += 1;
    }
}
