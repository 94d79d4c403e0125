use serde::{Deserialize, Serialize};

use crate::{ResolvedCategory, TaxonomyEntry, TaxonomyId};

use super::{LabelNormalizer, TaxonomyError, TaxonomyStore, pair_similarity};

/// Default minimum combined similarity for a fuzzy match.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.80;

/// Default share of the combined score carried by the category.
pub const DEFAULT_CATEGORY_WEIGHT: f64 = 0.5;

/// Tunables for the fuzzy-match step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Candidates scoring at or above this value are accepted.
    pub threshold: f64,
    /// Weight of category similarity; subcategory gets `1 - category_weight`.
    pub category_weight: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_FUZZY_THRESHOLD,
            category_weight: DEFAULT_CATEGORY_WEIGHT,
        }
    }
}

impl ResolverConfig {
    pub fn new(threshold: f64, category_weight: f64) -> Self {
        Self {
            threshold,
            category_weight,
        }
    }

    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn category_weight(mut self, category_weight: f64) -> Self {
        self.category_weight = category_weight;
        self
    }
}

/// Best fuzzy candidate for a normalized pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyMatch {
    pub taxonomy_id: TaxonomyId,
    pub score: f64,
}

/// Which step of the resolution algorithm produced the answer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum ResolutionPath {
    /// Exact normalized key or a previously recorded alias.
    Alias,
    /// Accepted near match; an alias was recorded.
    Fuzzy { score: f64 },
    /// No acceptable match; a new canonical entry was created.
    Created,
}

/// A resolved category together with the path that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    #[serde(flatten)]
    pub resolved: ResolvedCategory,
    #[serde(flatten)]
    pub path: ResolutionPath,
    pub frequency: i64,
}

/// Scores closer than this are treated as equal.
///
/// Weighted sums of equal ratios can differ in the last bit depending on the
/// operands.
const SCORE_EPSILON: f64 = 1e-9;

/// Scans `entries` for the most similar normalized pair.
///
/// Returns the winner only if it scores at least `config.threshold`. Equal
/// scores (within `SCORE_EPSILON`) go to the higher frequency, then to the
/// lower id.
pub fn find_fuzzy_match(
    entries: &[TaxonomyEntry],
    normalized_category: &str,
    normalized_subcategory: &str,
    config: &ResolverConfig,
) -> Option<FuzzyMatch> {
    let mut best: Option<(&TaxonomyEntry, f64)> = None;

    for entry in entries {
        let score = pair_similarity(
            (normalized_category, normalized_subcategory),
            entry.normalized_key(),
            config.category_weight,
        );

        let better = match best {
            None => true,
            Some((current, best_score)) => {
                score > best_score + SCORE_EPSILON
                    || ((score - best_score).abs() <= SCORE_EPSILON
                        && (entry.frequency() > current.frequency()
                            || (entry.frequency() == current.frequency()
                                && entry.id() < current.id())))
            }
        };
        if better {
            best = Some((entry, score));
        }
    }

    best.filter(|&(_, score)| score + SCORE_EPSILON >= config.threshold)
        .map(|(entry, score)| FuzzyMatch {
            taxonomy_id: entry.id(),
            score,
        })
}

impl TaxonomyStore {
    /// Maps a raw (category, subcategory) pair to its canonical entry.
    ///
    /// Tries, in order: alias lookup, fuzzy match, new entry. Every
    /// successful call bumps exactly one entry's frequency. Returned display
    /// strings are the canonical entry's, never the caller's raw input
    /// (except when the entry was just created from it).
    ///
    /// # Errors
    ///
    /// `InvalidLabel` if either side normalizes to an empty string; nothing
    /// is written in that case. `Persistence` if a durable write fails.
    pub fn resolve_category(
        &mut self,
        category: &str,
        subcategory: &str,
    ) -> Result<ResolvedCategory, TaxonomyError> {
        self.resolve_category_detailed(category, subcategory)
            .map(|resolution| resolution.resolved)
    }

    /// Same as [`resolve_category`](Self::resolve_category), also reporting
    /// the path taken and the entry's new frequency.
    pub fn resolve_category_detailed(
        &mut self,
        category: &str,
        subcategory: &str,
    ) -> Result<Resolution, TaxonomyError> {
        let (normalized_category, normalized_subcategory) =
            LabelNormalizer::normalize_pair(category, subcategory);
        if normalized_category.is_empty() {
            return Err(TaxonomyError::invalid_label("category", category));
        }
        if normalized_subcategory.is_empty() {
            return Err(TaxonomyError::invalid_label("subcategory", subcategory));
        }

        if let Some(id) = self.lookup_alias(&normalized_category, &normalized_subcategory) {
            let frequency = self.increment_taxonomy_frequency(id)?;
            tracing::debug!(%id, frequency, "Resolved '{category} : {subcategory}' via alias");
            return self.resolution(id, ResolutionPath::Alias, frequency);
        }

        let config = self.config();
        if let Some(candidate) = find_fuzzy_match(
            self.entries(),
            &normalized_category,
            &normalized_subcategory,
            &config,
        ) {
            let frequency = self.accept_fuzzy_match(
                candidate.taxonomy_id,
                &normalized_category,
                &normalized_subcategory,
            )?;
            tracing::info!(
                id = %candidate.taxonomy_id,
                score = candidate.score,
                "Fuzzy-matched '{category} : {subcategory}'"
            );
            return self.resolution(
                candidate.taxonomy_id,
                ResolutionPath::Fuzzy {
                    score: candidate.score,
                },
                frequency,
            );
        }

        let id = self.create_taxonomy_entry(
            category.trim(),
            subcategory.trim(),
            &normalized_category,
            &normalized_subcategory,
        )?;
        tracing::info!(%id, "Created taxonomy entry '{category} : {subcategory}'");
        self.resolution(id, ResolutionPath::Created, 1)
    }

    fn resolution(
        &self,
        id: TaxonomyId,
        path: ResolutionPath,
        frequency: i64,
    ) -> Result<Resolution, TaxonomyError> {
        let entry = self
            .find_taxonomy_entry(id)
            .ok_or(TaxonomyError::UnknownTaxonomy(id))?;
        Ok(Resolution {
            resolved: ResolvedCategory::from(entry),
            path,
            frequency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    fn store() -> TaxonomyStore {
        TaxonomyStore::new(Database::in_memory().unwrap()).unwrap()
    }

    fn frequency(store: &TaxonomyStore, id: TaxonomyId) -> i64 {
        store.find_taxonomy_entry(id).unwrap().frequency()
    }

    #[test]
    fn resolving_twice_is_idempotent() {
        let mut store = store();

        let first = store.resolve_category("Images", "Photos").unwrap();
        let second = store.resolve_category("Images", "Photos").unwrap();

        assert_eq!(first.taxonomy_id, second.taxonomy_id);
        assert_eq!(frequency(&store, first.taxonomy_id), 2);
        assert_eq!(store.entries().len(), 1);
    }

    #[test]
    fn case_and_whitespace_do_not_matter() {
        let mut store = store();

        let first = store.resolve_category("Images", "Photos").unwrap();
        let second = store.resolve_category("  images ", "photos").unwrap();

        assert_eq!(first.taxonomy_id, second.taxonomy_id);
        assert_eq!(second.category, "Images");
        assert_eq!(second.subcategory, "Photos");
    }

    #[test]
    fn near_match_converges_and_records_alias() {
        let mut store = store();
        let images = store.resolve_category("Images", "Photos").unwrap();

        let fuzzy = store.resolve_category_detailed("Image", "Photo").unwrap();
        assert_eq!(fuzzy.resolved.taxonomy_id, images.taxonomy_id);
        assert!(matches!(fuzzy.path, ResolutionPath::Fuzzy { score } if score >= 0.80));
        assert_eq!(store.lookup_alias("image", "photo"), Some(images.taxonomy_id));

        let repeat = store.resolve_category_detailed("Image", "Photo").unwrap();
        assert_eq!(repeat.path, ResolutionPath::Alias);
        assert_eq!(repeat.frequency, 3);
        assert_eq!(store.entries().len(), 1);
    }

    #[test]
    fn dissimilar_pairs_stay_distinct() {
        let mut store = store();

        let images = store.resolve_category("Images", "Photos").unwrap();
        let videos = store.resolve_category_detailed("Videos", "Clips").unwrap();

        assert_ne!(images.taxonomy_id, videos.resolved.taxonomy_id);
        assert_eq!(videos.path, ResolutionPath::Created);
    }

    #[test]
    fn empty_labels_are_rejected_without_side_effects() {
        let mut store = store();
        let existing = store.resolve_category("Documents", "Invoices").unwrap();

        let missing_category = store.resolve_category("", "Invoices");
        let missing_subcategory = store.resolve_category("Documents", " ?! ");

        assert!(matches!(
            missing_category,
            Err(TaxonomyError::InvalidLabel { field: "category", .. })
        ));
        assert!(matches!(
            missing_subcategory,
            Err(TaxonomyError::InvalidLabel { field: "subcategory", .. })
        ));
        assert_eq!(store.entries().len(), 1);
        assert_eq!(store.alias_count(), 1);
        assert_eq!(frequency(&store, existing.taxonomy_id), 1);
    }

    #[test]
    fn end_to_end_resolution_sequence() {
        let mut store = store();

        let created = store.resolve_category_detailed("Documents", "Invoices").unwrap();
        assert_eq!(created.resolved.taxonomy_id, TaxonomyId::new(1));
        assert_eq!(created.frequency, 1);

        let exact = store.resolve_category_detailed("documents", "invoices").unwrap();
        assert_eq!(exact.resolved.taxonomy_id, TaxonomyId::new(1));
        assert_eq!(exact.frequency, 2);

        let fuzzy = store.resolve_category_detailed("Document", "Invoice").unwrap();
        assert_eq!(fuzzy.resolved.taxonomy_id, TaxonomyId::new(1));
        assert_eq!(fuzzy.frequency, 3);
        assert!(matches!(fuzzy.path, ResolutionPath::Fuzzy { .. }));
        assert_eq!(store.aliases_for(TaxonomyId::new(1)).unwrap().len(), 2);

        let music = store.resolve_category_detailed("Media", "Music").unwrap();
        assert_eq!(music.resolved.taxonomy_id, TaxonomyId::new(2));
        assert_eq!(music.frequency, 1);

        assert!(store.check_invariants().unwrap().is_empty());
    }

    #[test]
    fn new_entry_keeps_caller_display_strings() {
        let mut store = store();

        let resolved = store.resolve_category(" Tax Returns ", "2023 Filings").unwrap();

        assert_eq!(resolved.category, "Tax Returns");
        assert_eq!(resolved.subcategory, "2023 Filings");
        let entry = store.find_taxonomy_entry(resolved.taxonomy_id).unwrap();
        assert_eq!(entry.normalized_key(), ("tax returns", "2023 filings"));
    }

    #[test]
    fn uniqueness_holds_across_many_spellings() {
        let mut store = store();
        let spellings = [
            ("Images", "Photos"),
            ("IMAGES", "photos"),
            ("images.", "photos!"),
            ("Image", "Photo"),
            ("Images", "Screenshots"),
            ("Media", "Music"),
            ("media", "MUSIC"),
            ("Source_Code", "Rust"),
            ("source code", "rust"),
        ];

        for (category, subcategory) in spellings {
            store.resolve_category(category, subcategory).unwrap();
        }

        assert_eq!(store.entries().len(), 4);
        assert!(store.check_invariants().unwrap().is_empty());
    }

    #[test]
    fn strict_threshold_creates_new_entry() {
        let config = ResolverConfig::default().threshold(0.95);
        let mut store =
            TaxonomyStore::with_config(Database::in_memory().unwrap(), config).unwrap();

        let images = store.resolve_category("Images", "Photos").unwrap();
        let image = store.resolve_category("Image", "Photo").unwrap();

        assert_ne!(images.taxonomy_id, image.taxonomy_id);
    }

    #[test]
    fn fuzzy_tie_prefers_higher_frequency_then_lower_id() {
        let entries = vec![
            TaxonomyEntry::new(TaxonomyId::new(1), "Docs", "Ab", "docs", "ab", 1),
            TaxonomyEntry::new(TaxonomyId::new(2), "Docs", "Ac", "docs", "ac", 5),
            TaxonomyEntry::new(TaxonomyId::new(3), "Docs", "Ad", "docs", "ad", 5),
        ];
        let config = ResolverConfig::new(0.5, 0.5);

        let best = find_fuzzy_match(&entries, "docs", "ax", &config).unwrap();

        assert_eq!(best.taxonomy_id, TaxonomyId::new(2));
        assert!((best.score - 0.75).abs() < 1e-9);
    }

    #[test]
    fn fuzzy_tie_ignores_rounding_noise() {
        // 0.5 * 1.0 + 0.5 * 0.7 and 0.5 * 0.8 + 0.5 * 0.9 round apart.
        let entries = vec![
            TaxonomyEntry::new(TaxonomyId::new(1), "aaaaa", "bbbbbbbxxx", "aaaaa", "bbbbbbbxxx", 5),
            TaxonomyEntry::new(TaxonomyId::new(2), "aaaax", "bbbbbbbbbx", "aaaax", "bbbbbbbbbx", 1),
        ];

        let best =
            find_fuzzy_match(&entries, "aaaaa", "bbbbbbbbbb", &ResolverConfig::default()).unwrap();

        assert_eq!(best.taxonomy_id, TaxonomyId::new(1));
        assert!((best.score - 0.85).abs() < 1e-9);

        let reversed: Vec<TaxonomyEntry> = entries.into_iter().rev().collect();
        let best =
            find_fuzzy_match(&reversed, "aaaaa", "bbbbbbbbbb", &ResolverConfig::default()).unwrap();
        assert_eq!(best.taxonomy_id, TaxonomyId::new(1));
    }

    #[test]
    fn fuzzy_match_respects_threshold() {
        let entries = vec![TaxonomyEntry::new(
            TaxonomyId::new(1),
            "Images",
            "Photos",
            "images",
            "photos",
            1,
        )];

        assert!(
            find_fuzzy_match(&entries, "videos", "clips", &ResolverConfig::default()).is_none()
        );
        assert!(find_fuzzy_match(&[], "images", "photos", &ResolverConfig::default()).is_none());
    }

    #[test]
    fn resolution_serializes_path_tag() {
        let mut store = store();
        let resolution = store.resolve_category_detailed("Media", "Music").unwrap();

        let json = serde_json::to_value(&resolution).unwrap();

        assert_eq!(json["path"], "created");
        assert_eq!(json["category"], "Media");
        assert_eq!(json["frequency"], 1);
    }
}
