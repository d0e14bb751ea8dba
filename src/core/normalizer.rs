use crate::models::{SearchQuery, UNBOUNDED_PRICE};
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors raised while normalizing a buyer query
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    #[error("invalid filter {field}: {reason}")]
    InvalidFilter { field: &'static str, reason: String },
}

/// Buyer constraints as they arrive from the presentation layer
#[derive(Debug, Clone, Default)]
pub struct FilterInput {
    pub gold_only: bool,
    pub max_price: Option<String>,
    pub min_rating: Option<String>,
}

impl FilterInput {
    pub fn gold_only() -> Self {
        Self {
            gold_only: true,
            ..Self::default()
        }
    }

    pub fn with_max_price(mut self, max_price: impl Into<String>) -> Self {
        self.max_price = Some(max_price.into());
        self
    }

    pub fn with_min_rating(mut self, min_rating: impl Into<String>) -> Self {
        self.min_rating = Some(min_rating.into());
        self
    }
}

/// Minimum token length in characters
const MIN_TOKEN_CHARS: usize = 2;

/// Articles, connectives and marketplace noise that carry no product meaning
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "the", "of", "for", "with", "in", "on", "to", "or", "by", "at", "from",
    "buy", "wholesale", "cheap", "best", "sale", "price", "prices", "supplier", "suppliers",
    "factory", "manufacturer", "bulk", "new", "hot", "free", "shipping", "oem", "odm",
];

#[inline]
fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

/// Split free text into lower-cased, de-duplicated search tokens
pub fn tokenize(raw: &str) -> BTreeSet<String> {
    raw.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS)
        .filter(|t| !is_stop_word(t))
        .collect()
}

/// Parse an optional numeric filter field
///
/// Blank input counts as absent; anything else must be a finite number.
fn parse_number(field: &'static str, raw: Option<&str>) -> Result<Option<f64>, NormalizeError> {
    let Some(text) = raw.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };

    let value: f64 = text.parse().map_err(|_| NormalizeError::InvalidFilter {
        field,
        reason: format!("'{}' is not a number", text),
    })?;

    if !value.is_finite() {
        return Err(NormalizeError::InvalidFilter {
            field,
            reason: format!("'{}' is not a finite number", text),
        });
    }

    Ok(Some(value))
}

/// Turn raw text plus buyer filters into a canonical [`SearchQuery`]
///
/// A missing or non-positive price ceiling becomes [`UNBOUNDED_PRICE`].
/// The result may carry zero tokens; callers short-circuit on that.
pub fn normalize(raw_text: &str, filter: &FilterInput) -> Result<SearchQuery, NormalizeError> {
    let max_price = match parse_number("maxPrice", filter.max_price.as_deref())? {
        Some(price) if price > 0.0 => price,
        _ => UNBOUNDED_PRICE,
    };

    let min_rating = parse_number("minRating", filter.min_rating.as_deref())?;
    if let Some(rating) = min_rating {
        if !(0.0..=5.0).contains(&rating) {
            return Err(NormalizeError::InvalidFilter {
                field: "minRating",
                reason: format!("{} is outside 0-5", rating),
            });
        }
    }

    Ok(SearchQuery {
        tokens: tokenize(raw_text),
        max_price,
        verified_only: filter.gold_only,
        min_rating,
    })
}
