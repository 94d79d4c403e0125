//! Canonical category taxonomy.
//!
//! Raw `(category, subcategory)` labels proposed by an LLM are normalized,
//! matched against known entries (exactly, through an alias, or fuzzily) and
//! folded into a single canonical entry per concept. The [`TaxonomyStore`]
//! owns both the SQLite tables and the in-memory indices built from them.

mod error;
mod normalizer;
mod resolver;
mod similarity;
mod store;

pub use error::TaxonomyError;
pub use normalizer::LabelNormalizer;
pub use resolver::{
    DEFAULT_CATEGORY_WEIGHT, DEFAULT_FUZZY_THRESHOLD, FuzzyMatch, Resolution, ResolutionPath,
    ResolverConfig, find_fuzzy_match,
};
pub use similarity::{pair_similarity, similarity};
pub use store::{LabelKey, TaxonomyStore};
