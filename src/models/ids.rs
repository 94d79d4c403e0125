use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a canonical taxonomy entry.
///
/// Wraps the database row id. Ids are assigned by the store on creation and
/// never change afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxonomyId(i64);

impl TaxonomyId {
    /// Creates a new taxonomy ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the underlying ID value.
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TaxonomyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_id_serializes_as_raw_integer() {
        let id = TaxonomyId::new(42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "42");

        let deserialized: TaxonomyId = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, id);
    }

    #[test]
    fn taxonomy_ids_order_by_value() {
        assert!(TaxonomyId::new(1) < TaxonomyId::new(2));
        assert_eq!(format!("{}", TaxonomyId::new(7)), "7");
    }
}
