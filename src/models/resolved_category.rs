use std::fmt;

use serde::{Deserialize, Serialize};

use super::{TaxonomyEntry, TaxonomyId};

/// Outcome of resolving a raw label pair: the canonical entry's id and its
/// display strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedCategory {
    pub taxonomy_id: TaxonomyId,
    pub category: String,
    pub subcategory: String,
}

impl ResolvedCategory {
    pub fn new(
        taxonomy_id: TaxonomyId,
        category: impl Into<String>,
        subcategory: impl Into<String>,
    ) -> Self {
        Self {
            taxonomy_id,
            category: category.into(),
            subcategory: subcategory.into(),
        }
    }
}

impl From<&TaxonomyEntry> for ResolvedCategory {
    fn from(entry: &TaxonomyEntry) -> Self {
        Self::new(entry.id(), entry.category(), entry.subcategory())
    }
}

impl fmt::Display for ResolvedCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {}", self.category, self.subcategory)
    }
}
