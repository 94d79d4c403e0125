/// Punctuation dropped entirely during normalization.
const STRIPPED: &[char] = &[
    '.', ',', ';', ':', '!', '?', '\'', '"', '`', '(', ')', '[', ']', '{', '}',
];

/// Characters treated as word separators, same as whitespace.
const SEPARATORS: &[char] = &['_', '-', '/', '\\'];

/// Canonicalizes raw category/subcategory text for comparison.
///
/// The normalized form is only used as a matching key; display strings are
/// stored separately and never normalized.
pub struct LabelNormalizer;

impl LabelNormalizer {
    /// Normalizes a single label.
    ///
    /// # Normalization rules
    ///
    /// - Converts to lowercase
    /// - Removes `.,;:!?'"` backticks, parentheses, brackets and braces
    /// - Treats `_`, `-`, `/` and `\` as spaces
    /// - Trims and collapses whitespace runs to a single space
    ///
    /// Other characters (`&`, `+`, `#`, ...) are kept because they change meaning.
    ///
    /// # Examples
    ///
    /// ```
    /// use ftax::taxonomy::LabelNormalizer;
    ///
    /// assert_eq!(LabelNormalizer::normalize("  Images "), "images");
    /// assert_eq!(LabelNormalizer::normalize("Tax   Returns"), "tax returns");
    /// assert_eq!(LabelNormalizer::normalize("\"Photos!\""), "photos");
    /// assert_eq!(LabelNormalizer::normalize("Photo-Albums"), "photo albums");
    /// assert_eq!(LabelNormalizer::normalize("C++ Code"), "c++ code");
    /// assert_eq!(LabelNormalizer::normalize("   "), "");
    /// ```
    #[must_use]
    pub fn normalize(label: &str) -> String {
        let cleaned: String = label
            .to_lowercase()
            .chars()
            .filter(|c| !STRIPPED.contains(c))
            .map(|c| if SEPARATORS.contains(&c) { ' ' } else { c })
            .collect();

        cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Normalizes a (category, subcategory) pair.
    #[must_use]
    pub fn normalize_pair(category: &str, subcategory: &str) -> (String, String) {
        (Self::normalize(category), Self::normalize(subcategory))
    }
}
