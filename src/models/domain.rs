use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Price ceiling used when the buyer did not give one
pub const UNBOUNDED_PRICE: f64 = 1_000_000_000.0;

/// Placeholder for text fields a marketplace entry did not expose
pub const UNKNOWN_FIELD: &str = "unknown";

/// Canonical search request produced by the normalizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub tokens: BTreeSet<String>,
    #[serde(rename = "maxPrice")]
    pub max_price: f64,
    #[serde(rename = "verifiedOnly")]
    pub verified_only: bool,
    #[serde(rename = "minRating")]
    pub min_rating: Option<f64>,
}

impl SearchQuery {
    /// Query with the given tokens and no buyer constraints
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            max_price: UNBOUNDED_PRICE,
            verified_only: false,
            min_rating: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn has_price_ceiling(&self) -> bool {
        self.max_price < UNBOUNDED_PRICE
    }

    /// Search phrase sent to the live marketplace
    pub fn phrase(&self) -> String {
        self.tokens.iter().cloned().collect::<Vec<_>>().join(" ")
    }
}

/// Quoted unit price range of an offer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    #[serde(rename = "priceLow")]
    pub low: f64,
    #[serde(rename = "priceHigh")]
    pub high: f64,
}

impl PriceRange {
    /// Builds a range, swapping the bounds if they arrive reversed
    pub fn new(a: f64, b: f64) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    pub fn single(price: f64) -> Self {
        Self { low: price, high: price }
    }
}

/// One supplier offer retrieved from a catalog source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateListing {
    pub id: String,
    pub title: String,
    #[serde(rename = "supplierName")]
    pub supplier_name: String,
    /// Identifier used when contacting the supplier, if the source has one
    #[serde(rename = "supplierId", default, skip_serializing_if = "Option::is_none")]
    pub supplier_id: Option<String>,
    /// `None` when the marketplace entry had no readable price
    #[serde(flatten)]
    pub price: Option<PriceRange>,
    #[serde(rename = "minimumOrderQuantity", default)]
    pub minimum_order_quantity: Option<u32>,
    #[serde(default)]
    pub rating: f64,
    #[serde(rename = "reviewCount", default)]
    pub review_count: u32,
    #[serde(default)]
    pub verified: bool,
    #[serde(default = "unknown_field")]
    pub region: String,
    #[serde(rename = "responseTimeHint", default = "unknown_field")]
    pub response_time_hint: String,
    #[serde(rename = "imageUrl", default)]
    pub image_url: String,
    #[serde(rename = "sourceUrl", default)]
    pub source_url: String,
}

fn unknown_field() -> String {
    UNKNOWN_FIELD.to_string()
}

impl CandidateListing {
    pub fn price_low(&self) -> Option<f64> {
        self.price.map(|p| p.low)
    }

    /// Case-insensitive substring test against the title
    pub fn title_contains(&self, token: &str) -> bool {
        self.title.to_lowercase().contains(token)
    }
}

/// Candidate listing with its relevance score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredListing {
    #[serde(flatten)]
    pub listing: CandidateListing,
    #[serde(rename = "matchScore")]
    pub match_score: u8,
}

/// Label returned by the classification service for an image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageLabel {
    pub description: String,
    #[serde(alias = "score")]
    pub confidence: f64,
}

impl ImageLabel {
    pub fn new(description: impl Into<String>, confidence: f64) -> Self {
        Self {
            description: description.into(),
            confidence,
        }
    }
}

/// Which catalog source produced a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Local,
    Live,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Local => f.write_str("local"),
            SourceKind::Live => f.write_str("live"),
        }
    }
}

/// Point weights for the match score, summing to 100 by default
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub token_overlap: f64,
    pub price_fit: f64,
    pub verified: f64,
    pub rating: f64,
    /// Fraction above the ceiling at which price fit reaches zero
    pub price_tolerance: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            token_overlap: 60.0,
            price_fit: 20.0,
            verified: 12.0,
            rating: 8.0,
            price_tolerance: 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_range_orders_bounds() {
        let range = PriceRange::new(6.5, 4.2);
        assert_eq!(range.low, 4.2);
        assert_eq!(range.high, 6.5);
    }

    #[test]
    fn test_phrase_is_sorted() {
        let query = SearchQuery::from_tokens(["wireless", "earbuds"]);
        assert_eq!(query.phrase(), "earbuds wireless");
        assert!(!query.has_price_ceiling());
    }

    #[test]
    fn test_listing_json_shape() {
        let listing: CandidateListing = serde_json::from_value(serde_json::json!({
            "id": "SUP001-1",
            "title": "TWS Wireless Earbuds",
            "supplierName": "Shenzhen TechMaster",
            "priceLow": 4.2,
            "priceHigh": 6.5,
            "rating": 4.9,
            "reviewCount": 127,
            "verified": true
        }))
        .unwrap();

        assert_eq!(listing.price, Some(PriceRange::new(4.2, 6.5)));
        assert_eq!(listing.region, UNKNOWN_FIELD);
        assert_eq!(listing.minimum_order_quantity, None);

        let value = serde_json::to_value(&listing).unwrap();
        assert_eq!(value["priceLow"], 4.2);
        assert_eq!(value["supplierName"], "Shenzhen TechMaster");
        assert!(value.get("supplierId").is_none());
    }

    #[test]
    fn test_listing_without_price() {
        let listing: CandidateListing = serde_json::from_value(serde_json::json!({
            "id": "x",
            "title": "Phone charger",
            "supplierName": "unknown"
        }))
        .unwrap();

        assert_eq!(listing.price, None);
        assert!(listing.title_contains("charger"));
    }
}
