//! Edit-distance similarity between normalized labels.

/// Similarity in `[0, 1]` between two already-normalized labels.
///
/// `1 - levenshtein(a, b) / max(len(a), len(b))`, counted in characters.
/// Symmetric, and `1.0` for identical input.
///
/// # Examples
///
/// ```
/// use ftax::taxonomy::similarity;
///
/// assert_eq!(similarity("photos", "photos"), 1.0);
/// assert!((similarity("photo", "photos") - 5.0 / 6.0).abs() < 1e-9);
/// assert_eq!(similarity("abc", "xyz"), 0.0);
/// ```
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// Weighted combination of category and subcategory similarity.
///
/// `category_weight` is clamped to `[0, 1]`; the subcategory gets the rest.
#[must_use]
pub fn pair_similarity(
    (category_a, subcategory_a): (&str, &str),
    (category_b, subcategory_b): (&str, &str),
    category_weight: f64,
) -> f64 {
    let weight = category_weight.clamp(0.0, 1.0);
    weight * similarity(category_a, category_b)
        + (1.0 - weight) * similarity(subcategory_a, subcategory_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn identical_labels_score_one() {
        for label in ["images", "tax returns", "c++ code", "x"] {
            assert_eq!(similarity(label, label), 1.0);
        }
    }

    #[test]
    fn similarity_is_symmetric() {
        let pairs = [
            ("images", "image"),
            ("videos", "clips"),
            ("documents", "docs"),
            ("", "music"),
        ];
        for (a, b) in pairs {
            assert!((similarity(a, b) - similarity(b, a)).abs() < EPSILON);
        }
    }

    #[test]
    fn similarity_stays_in_unit_interval() {
        let pairs = [("a", "bcdefgh"), ("music", ""), ("invoice", "invoices")];
        for (a, b) in pairs {
            let score = similarity(a, b);
            assert!((0.0..=1.0).contains(&score), "{a} vs {b}: {score}");
        }
    }

    #[test]
    fn single_edit_scales_with_length() {
        assert!((similarity("invoice", "invoices") - 7.0 / 8.0).abs() < EPSILON);
        assert!((similarity("document", "documents") - 8.0 / 9.0).abs() < EPSILON);
    }

    #[test]
    fn pair_similarity_weights_components() {
        let a = ("images", "photos");
        let b = ("images", "clips");

        let even = pair_similarity(a, b, 0.5);
        let category_only = pair_similarity(a, b, 1.0);
        let subcategory_only = pair_similarity(a, b, 0.0);

        assert!((category_only - 1.0).abs() < EPSILON);
        assert!((subcategory_only - similarity("photos", "clips")).abs() < EPSILON);
        assert!((even - (category_only + subcategory_only) / 2.0).abs() < EPSILON);
    }

    #[test]
    fn pair_similarity_clamps_weight() {
        let a = ("media", "music");
        let b = ("media", "movies");
        assert!((pair_similarity(a, b, 7.0) - pair_similarity(a, b, 1.0)).abs() < EPSILON);
        assert!((pair_similarity(a, b, -1.0) - pair_similarity(a, b, 0.0)).abs() < EPSILON);
    }
}
