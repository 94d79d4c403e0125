use crate::taxonomy::TaxonomyError;

/// Splits a model answer into a raw `(category, subcategory)` pair.
///
/// Accepts `"<category> : <subcategory>"` on the first non-empty line
/// (split on the first `:`), and the labelled two-line form
/// `Category: X` / `Subcategory: Y`. Surrounding code fences, quotes and
/// list markers are ignored. Anything else is an `InvalidLabel` with field
/// `"response"`; no category is ever guessed.
///
/// The returned strings are trimmed but otherwise raw; normalization happens
/// during resolution.
///
/// # Examples
///
/// ```
/// use ftax::llm::parse_category_response;
///
/// let (category, subcategory) = parse_category_response("Images : Photos\n").unwrap();
/// assert_eq!((category.as_str(), subcategory.as_str()), ("Images", "Photos"));
///
/// assert!(parse_category_response("I am not sure.").is_err());
/// ```
pub fn parse_category_response(text: &str) -> Result<(String, String), TaxonomyError> {
    let lines: Vec<&str> = text
        .lines()
        .map(clean_line)
        .filter(|line| !line.is_empty() && !line.starts_with("```"))
        .collect();

    if let Some(pair) = labelled_pair(&lines) {
        return Ok(pair);
    }

    let Some(first) = lines.first() else {
        return Err(TaxonomyError::invalid_label("response", text));
    };
    let Some((category, subcategory)) = first.split_once(':') else {
        return Err(TaxonomyError::invalid_label("response", text));
    };
    if is_label_key(category) {
        return Err(TaxonomyError::invalid_label("response", text));
    }

    let category = clean_line(category);
    let subcategory = clean_line(subcategory);
    if category.is_empty() || subcategory.is_empty() {
        return Err(TaxonomyError::invalid_label("response", text));
    }
    Ok((category.to_string(), subcategory.to_string()))
}

fn clean_line(line: &str) -> &str {
    line.trim()
        .trim_start_matches(['-', '*'])
        .trim()
        .trim_matches(['"', '\'', '`'])
        .trim()
}

/// `Category: X` followed somewhere by `Subcategory: Y`.
fn labelled_pair(lines: &[&str]) -> Option<(String, String)> {
    let category = labelled_value(lines, "category")?;
    let subcategory = labelled_value(lines, "subcategory")?;
    Some((category.to_string(), subcategory.to_string()))
}

fn labelled_value<'a>(lines: &[&'a str], label: &str) -> Option<&'a str> {
    lines.iter().copied().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        let key = key.trim();
        if !key.eq_ignore_ascii_case(label) && !key.eq_ignore_ascii_case(&format!("main {label}")) {
            return None;
        }
        let value = clean_line(value);
        (!value.is_empty()).then_some(value)
    })
}

fn is_label_key(key: &str) -> bool {
    ["category", "main category", "subcategory"]
        .iter()
        .any(|label| key.trim().eq_ignore_ascii_case(label))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> (String, String) {
        parse_category_response(text).unwrap()
    }

    #[test]
    fn splits_on_first_colon() {
        assert_eq!(parse("Documents : Invoices"), ("Documents".into(), "Invoices".into()));
        assert_eq!(parse("Media:Music: Live"), ("Media".into(), "Music: Live".into()));
    }

    #[test]
    fn ignores_fences_quotes_and_blank_lines() {
        assert_eq!(
            parse("\n```\n\"Images : Screenshots\"\n```\n"),
            ("Images".into(), "Screenshots".into())
        );
        assert_eq!(parse("- Archives : Backups"), ("Archives".into(), "Backups".into()));
    }

    #[test]
    fn accepts_labelled_form() {
        assert_eq!(
            parse("Category: Applications\nSubcategory: Text Editors"),
            ("Applications".into(), "Text Editors".into())
        );
        assert_eq!(
            parse("Main category: Videos\nsubcategory: Tutorials"),
            ("Videos".into(), "Tutorials".into())
        );
    }

    #[test]
    fn malformed_answers_are_invalid_labels() {
        for text in ["", "   ", "Just some prose", "Images :", ": Photos", "Category: Images"] {
            let result = parse_category_response(text);
            assert!(
                matches!(result, Err(TaxonomyError::InvalidLabel { field: "response", .. })),
                "{text:?} should be rejected"
            );
        }
    }
}
