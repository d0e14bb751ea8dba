use crate::core::filters::within_price_ceiling;
use crate::core::image::expansion_terms;
use crate::models::{CandidateListing, PriceRange, SearchQuery, SourceKind};
use crate::services::marketplace::ScrapeError;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Retrieval of candidate listings for a query
///
/// Local and live sources share this shape so the orchestrator can switch
/// between them.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    async fn fetch(
        &self,
        query: &SearchQuery,
        category_hint: Option<&str>,
    ) -> Result<Vec<CandidateListing>, ScrapeError>;
}

/// Errors loading a catalog snapshot
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid catalog file: {0}")]
    Json(#[from] serde_json::Error),
}

/// In-memory catalog snapshot
#[derive(Debug, Clone)]
pub struct LocalCatalog {
    listings: Arc<Vec<CandidateListing>>,
}

impl LocalCatalog {
    pub fn new(listings: Vec<CandidateListing>) -> Self {
        Self {
            listings: Arc::new(listings),
        }
    }

    /// Load a JSON array of listings
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        let listings: Vec<CandidateListing> = serde_json::from_str(&raw)?;
        Ok(Self::new(listings))
    }

    /// Built-in demo catalog
    pub fn sample() -> Self {
        Self::new(vec![CandidateListing {
            id: "1".to_string(),
            title: "TWS Wireless Earbuds Bluetooth 5.3 ANC".to_string(),
            supplier_name: "Shenzhen TechMaster Electronics Co., Ltd.".to_string(),
            supplier_id: Some("SUP001".to_string()),
            price: Some(PriceRange::new(4.20, 6.50)),
            minimum_order_quantity: Some(100),
            rating: 4.9,
            review_count: 127,
            verified: true,
            region: "Guangdong, China".to_string(),
            response_time_hint: "< 2h".to_string(),
            image_url: "https://images.unsplash.com/photo-1590658268037-6bf12165a8df?w=400".to_string(),
            source_url: "https://www.alibaba.com/product-detail/earbuds".to_string(),
        }])
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    /// Every listing, unfiltered
    pub fn browse(&self) -> Vec<CandidateListing> {
        self.listings.as_ref().clone()
    }

    /// Listings whose title contains a query token (or a hint's expansion
    /// term) and that satisfy the price ceiling and verified-only flag
    pub fn search(&self, query: &SearchQuery, category_hint: Option<&str>) -> Vec<CandidateListing> {
        let mut terms: Vec<&str> = query.tokens.iter().map(String::as_str).collect();
        if let Some(hint) = category_hint {
            terms.extend(expansion_terms(hint));
        }

        if terms.is_empty() {
            return Vec::new();
        }

        self.listings
            .iter()
            .filter(|listing| {
                let title = listing.title.to_lowercase();
                terms.iter().any(|term| title.contains(term))
            })
            .filter(|listing| !query.has_price_ceiling() || within_price_ceiling(listing, query.max_price))
            .filter(|listing| !query.verified_only || listing.verified)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CatalogSource for LocalCatalog {
    fn kind(&self) -> SourceKind {
        SourceKind::Local
    }

    async fn fetch(
        &self,
        query: &SearchQuery,
        category_hint: Option<&str>,
    ) -> Result<Vec<CandidateListing>, ScrapeError> {
        Ok(self.search(query, category_hint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_listing(id: &str, title: &str, price_low: f64, verified: bool) -> CandidateListing {
        CandidateListing {
            id: id.to_string(),
            title: title.to_string(),
            supplier_name: "Supplier".to_string(),
            supplier_id: None,
            price: Some(PriceRange::single(price_low)),
            minimum_order_quantity: Some(50),
            rating: 4.5,
            review_count: 20,
            verified,
            region: "Zhejiang, China".to_string(),
            response_time_hint: "< 24h".to_string(),
            image_url: String::new(),
            source_url: String::new(),
        }
    }

    fn create_catalog() -> LocalCatalog {
        LocalCatalog::new(vec![
            create_listing("1", "TWS Wireless Earbuds", 4.2, true),
            create_listing("2", "USB-C Charger 20W", 2.5, false),
            create_listing("3", "Wireless Earbuds Pro", 18.0, true),
        ])
    }

    #[test]
    fn test_token_match() {
        let catalog = create_catalog();
        let query = SearchQuery::from_tokens(["earbuds"]);

        let ids: Vec<String> = catalog.search(&query, None).into_iter().map(|l| l.id).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_price_and_verified_filters() {
        let catalog = create_catalog();
        let mut query = SearchQuery::from_tokens(["earbuds", "charger"]);
        query.max_price = 10.0;
        query.verified_only = true;

        let ids: Vec<String> = catalog.search(&query, None).into_iter().map(|l| l.id).collect();
        assert_eq!(ids, vec!["1"]);
    }

    #[test]
    fn test_category_hint_expands_terms() {
        let catalog = create_catalog();
        let query = SearchQuery::from_tokens(["gadget"]);

        assert!(catalog.search(&query, None).is_empty());
        assert_eq!(catalog.search(&query, Some("electronics")).len(), 3);
    }

    #[test]
    fn test_no_match_is_empty() {
        let catalog = create_catalog();
        let query = SearchQuery::from_tokens(["sofa"]);
        assert!(catalog.search(&query, None).is_empty());
    }

    #[test]
    fn test_load_from_path() {
        let path = std::env::temp_dir().join(format!("sourcepro-catalog-{}.json", uuid::Uuid::new_v4()));
        let listings = create_catalog().browse();
        std::fs::write(&path, serde_json::to_string(&listings).unwrap()).unwrap();

        let catalog = LocalCatalog::from_path(&path).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.browse(), listings);

        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_fetch_never_fails() {
        let catalog = LocalCatalog::sample();
        let listings = catalog
            .fetch(&SearchQuery::from_tokens(["earbuds"]), None)
            .await
            .unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(catalog.kind(), SourceKind::Local);
    }
}
