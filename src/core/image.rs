use crate::models::ImageLabel;
use std::collections::BTreeSet;
use thiserror::Error;

/// Number of labels considered per image
pub const TOP_LABELS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error("classification returned no labels")]
    NoLabelsDetected,
}

/// Search terms derived from an image
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImageTerms {
    pub tokens: BTreeSet<String>,
    pub category_hint: Option<String>,
    /// Descriptions of the labels that were used, highest confidence first
    pub labels: Vec<String>,
}

struct Category {
    hint: &'static str,
    labels: &'static [&'static str],
    expansion: &'static [&'static str],
}

// Keyword expansion stands in for visual similarity until a real index exists.
const CATEGORIES: &[Category] = &[Category {
    hint: "electronics",
    labels: &["electronics", "gadget", "device", "phone"],
    expansion: &["earbuds", "charger"],
}];

/// Extra search terms implied by a category hint
pub fn expansion_terms(category_hint: &str) -> &'static [&'static str] {
    CATEGORIES
        .iter()
        .find(|c| c.hint == category_hint)
        .map(|c| c.expansion)
        .unwrap_or(&[])
}

fn category_for(label: &str) -> Option<&'static str> {
    CATEGORIES
        .iter()
        .find(|c| c.labels.contains(&label))
        .map(|c| c.hint)
}

/// Map classification labels to search tokens and a category hint
///
/// Only the [`TOP_LABELS`] most confident labels count. Ties keep the
/// service's original order.
pub fn translate(labels: &[ImageLabel]) -> Result<ImageTerms, TranslateError> {
    let mut ranked: Vec<&ImageLabel> = labels
        .iter()
        .filter(|l| !l.description.trim().is_empty())
        .collect();

    if ranked.is_empty() {
        return Err(TranslateError::NoLabelsDetected);
    }

    ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    ranked.truncate(TOP_LABELS);

    let mut terms = ImageTerms::default();
    for label in ranked {
        let description = label.description.trim().to_lowercase();
        if terms.category_hint.is_none() {
            terms.category_hint = category_for(&description).map(str::to_string);
        }
        terms.labels.push(label.description.trim().to_string());
        terms.tokens.insert(description);
    }

    Ok(terms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_takes_top_three_by_confidence() {
        let labels = vec![
            ImageLabel::new("Headphones", 0.71),
            ImageLabel::new("Electronics", 0.93),
            ImageLabel::new("Audio equipment", 0.88),
            ImageLabel::new("Gadget", 0.65),
        ];

        let terms = translate(&labels).unwrap();

        assert_eq!(terms.labels, vec!["Electronics", "Audio equipment", "Headphones"]);
        assert!(terms.tokens.contains("electronics"));
        assert!(terms.tokens.contains("audio equipment"));
        assert!(!terms.tokens.contains("gadget"));
        assert_eq!(terms.category_hint.as_deref(), Some("electronics"));
    }

    #[test]
    fn test_no_category_for_unmapped_labels() {
        let labels = vec![ImageLabel::new("Textile", 0.9), ImageLabel::new("Pattern", 0.8)];
        let terms = translate(&labels).unwrap();
        assert_eq!(terms.category_hint, None);
        assert_eq!(terms.tokens.len(), 2);
    }

    #[test]
    fn test_category_only_from_top_labels() {
        let labels = vec![
            ImageLabel::new("Bag", 0.95),
            ImageLabel::new("Leather", 0.9),
            ImageLabel::new("Luggage", 0.85),
            ImageLabel::new("Phone", 0.5),
        ];
        let terms = translate(&labels).unwrap();
        assert_eq!(terms.category_hint, None);
    }

    #[test]
    fn test_empty_labels() {
        assert_eq!(translate(&[]), Err(TranslateError::NoLabelsDetected));
        assert_eq!(
            translate(&[ImageLabel::new("  ", 0.9)]),
            Err(TranslateError::NoLabelsDetected)
        );
    }

    #[test]
    fn test_expansion_terms() {
        assert_eq!(expansion_terms("electronics"), &["earbuds", "charger"]);
        assert!(expansion_terms("furniture").is_empty());
    }
}
