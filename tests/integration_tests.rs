// Integration tests for SourcePro search

use async_trait::async_trait;
use sourcepro_search::core::{FilterInput, Pipeline, PipelineConfig, Ranker, SearchInput};
use sourcepro_search::models::{CandidateListing, ImageLabel, PriceRange, SearchQuery, SourceKind};
use sourcepro_search::services::{
    CatalogSource, HttpTransport, LabelClassifier, LiveCatalog, LiveCatalogConfig, LocalCatalog,
    ScrapeError, VisionError,
};
use std::sync::Arc;
use std::time::Duration;

fn create_listing(id: &str, title: &str, price_low: f64, verified: bool, rating: f64, reviews: u32) -> CandidateListing {
    CandidateListing {
        id: id.to_string(),
        title: title.to_string(),
        supplier_name: format!("Supplier {}", id),
        supplier_id: None,
        price: Some(PriceRange::new(price_low, price_low * 1.5)),
        minimum_order_quantity: Some(100),
        rating,
        review_count: reviews,
        verified,
        region: "Guangdong, China".to_string(),
        response_time_hint: "< 24h".to_string(),
        image_url: String::new(),
        source_url: String::new(),
    }
}

fn create_pipeline(local: LocalCatalog, fetch_timeout: Duration) -> Pipeline {
    Pipeline::new(
        local,
        Ranker::with_default_weights(),
        PipelineConfig {
            fetch_timeout,
            result_limit: 50,
        },
    )
}

fn text(query: &str, filter: FilterInput) -> SearchInput {
    SearchInput::Text {
        query: query.to_string(),
        filter,
    }
}

/// Live source that never answers in time
struct StalledSource;

#[async_trait]
impl CatalogSource for StalledSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Live
    }

    async fn fetch(
        &self,
        _query: &SearchQuery,
        _category_hint: Option<&str>,
    ) -> Result<Vec<CandidateListing>, ScrapeError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Vec::new())
    }
}

struct FixedLabels(Vec<ImageLabel>);

#[async_trait]
impl LabelClassifier for FixedLabels {
    async fn classify(&self, _image: &[u8]) -> Result<Vec<ImageLabel>, VisionError> {
        Ok(self.0.clone())
    }
}

#[tokio::test]
async fn test_integration_text_search_sample_catalog() {
    let pipeline = create_pipeline(LocalCatalog::sample(), Duration::from_secs(5));

    let filter = FilterInput::gold_only().with_max_price("10");
    let outcome = pipeline.run(text("earbuds", filter)).await.unwrap();

    assert_eq!(outcome.source, SourceKind::Local);
    assert!(!outcome.fallback_used);
    assert_eq!(outcome.listings.len(), 1);

    let top = &outcome.listings[0];
    assert_eq!(top.listing.id, "1");
    assert!(top.match_score >= 90, "Expected a strong match, got {}", top.match_score);
    assert!(top.listing.verified);
    assert_eq!(outcome.tokens_used, vec!["earbuds".to_string()]);
}

#[tokio::test]
async fn test_integration_stalled_live_source_falls_back() {
    let local = LocalCatalog::new(vec![
        create_listing("a", "Wireless Earbuds", 4.0, true, 4.8, 200),
        create_listing("b", "Phone Case", 1.0, false, 4.0, 10),
    ]);
    let pipeline = create_pipeline(local, Duration::from_millis(200)).with_live_source(Arc::new(StalledSource));

    let started = std::time::Instant::now();
    let outcome = pipeline.run(text("wireless earbuds", FilterInput::default())).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(5), "Fetch budget was not enforced");
    assert!(outcome.fallback_used);
    assert_eq!(outcome.source, SourceKind::Local);
    assert_eq!(outcome.listings.len(), 1);
    assert_eq!(outcome.listings[0].listing.id, "a");
}

#[tokio::test]
async fn test_integration_live_marketplace_over_http() {
    let mut server = mockito::Server::new_async().await;
    let page = r#"
        <html><body>
          <div class="offer-item">
            <a href="/product-detail/earbuds-1"><img src="/img/1.jpg"></a>
            <h2 class="title">TWS Wireless Earbuds</h2>
            <span class="price">$3.80 - $5.10</span>
            <span class="company">Dongguan Audio Co.</span>
            <span class="gold-supplier">Gold</span>
            <span class="rating">4.7</span>
          </div>
          <div class="offer-item">
            <h2 class="title">Wireless Earbuds Case</h2>
            <span class="price">$0.90</span>
          </div>
        </body></html>
    "#;

    let mock = server
        .mock("GET", "/trade/search")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(page)
        .create_async()
        .await;

    let config = LiveCatalogConfig {
        base_url: server.url(),
        ..LiveCatalogConfig::default()
    };
    let transport = HttpTransport::new(&config).unwrap();
    let live = LiveCatalog::new(Arc::new(transport), config);

    let pipeline = create_pipeline(LocalCatalog::sample(), Duration::from_secs(5)).with_live_source(Arc::new(live));
    let outcome = pipeline.run(text("wireless earbuds", FilterInput::default())).await.unwrap();

    mock.assert_async().await;
    assert_eq!(outcome.source, SourceKind::Live);
    assert!(!outcome.fallback_used);
    assert_eq!(outcome.listings.len(), 2);

    let top = &outcome.listings[0];
    assert_eq!(top.listing.title, "TWS Wireless Earbuds");
    assert!(top.listing.verified);
    assert!(top.listing.source_url.ends_with("/product-detail/earbuds-1"));

    let second = &outcome.listings[1];
    assert_eq!(second.listing.supplier_name, "unknown");
    assert_eq!(second.listing.region, "unknown");
}

#[tokio::test]
async fn test_integration_marketplace_error_falls_back() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/trade/search")
        .match_query(mockito::Matcher::Any)
        .with_status(503)
        .create_async()
        .await;

    let config = LiveCatalogConfig {
        base_url: server.url(),
        ..LiveCatalogConfig::default()
    };
    let live = LiveCatalog::new(Arc::new(HttpTransport::new(&config).unwrap()), config);

    let pipeline = create_pipeline(LocalCatalog::sample(), Duration::from_secs(5)).with_live_source(Arc::new(live));
    let outcome = pipeline.run(text("earbuds", FilterInput::default())).await.unwrap();

    assert!(outcome.fallback_used);
    assert_eq!(outcome.source, SourceKind::Local);
    assert_eq!(outcome.listings[0].listing.id, "1");
}

#[tokio::test]
async fn test_integration_image_without_labels_browses() {
    let local = LocalCatalog::new(vec![
        create_listing("low", "Desk Lamp", 8.0, false, 3.9, 5),
        create_listing("high", "Yoga Mat", 6.0, true, 4.9, 50),
    ]);
    let pipeline = create_pipeline(local, Duration::from_secs(5)).with_classifier(Arc::new(FixedLabels(vec![])));

    let outcome = pipeline
        .run(SearchInput::Image { bytes: vec![0xff, 0xd8, 0xff] })
        .await
        .unwrap();

    assert!(outcome.tokens_used.is_empty());
    assert!(!outcome.fallback_used);
    assert_eq!(outcome.source, SourceKind::Local);
    assert_eq!(outcome.listings.len(), 2);
    assert!(outcome.listings.iter().all(|l| l.match_score == 0));
    assert_eq!(outcome.listings[0].listing.id, "high");
}

#[tokio::test]
async fn test_integration_image_labels_expand_category() {
    let pipeline = create_pipeline(LocalCatalog::sample(), Duration::from_secs(5)).with_classifier(Arc::new(
        FixedLabels(vec![
            ImageLabel::new("Electronics", 0.95),
            ImageLabel::new("Gadget", 0.90),
            ImageLabel::new("Audio equipment", 0.80),
            ImageLabel::new("Technology", 0.70),
        ]),
    ));

    let outcome = pipeline
        .run(SearchInput::Image { bytes: b"jpeg".to_vec() })
        .await
        .unwrap();

    assert_eq!(outcome.category_hint.as_deref(), Some("electronics"));
    assert_eq!(
        outcome.detected_labels,
        Some(vec!["Electronics".to_string(), "Gadget".to_string(), "Audio equipment".to_string()])
    );
    assert!(outcome.tokens_used.contains(&"earbuds".to_string()));
    assert_eq!(outcome.listings.len(), 1);
    assert!(outcome.listings[0].match_score > 0);
}

#[tokio::test]
async fn test_integration_ranking_order() {
    let local = LocalCatalog::new(vec![
        create_listing("1", "Bluetooth Speaker Portable", 12.0, false, 4.2, 30),
        create_listing("2", "Bluetooth Speaker", 9.0, true, 4.8, 300),
        create_listing("3", "Portable Bluetooth Speaker Waterproof", 30.0, false, 3.5, 2),
        create_listing("4", "Bluetooth Speaker", 9.0, true, 4.8, 100),
        create_listing("5", "Speaker Stand", 5.0, true, 4.9, 800),
    ]);
    let pipeline = create_pipeline(local, Duration::from_secs(5));

    let filter = FilterInput::default().with_max_price("15");
    let outcome = pipeline.run(text("portable bluetooth speaker", filter)).await.unwrap();

    for pair in outcome.listings.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(a.match_score >= b.match_score);
        if a.match_score == b.match_score {
            assert!(
                a.listing.rating > b.listing.rating
                    || (a.listing.rating == b.listing.rating && a.listing.review_count >= b.listing.review_count)
            );
        }
    }

    // Same score and rating: more reviews first
    let pos = |id: &str| outcome.listings.iter().position(|l| l.listing.id == id).unwrap();
    assert!(pos("2") < pos("4"));

    // Price ceiling is a hard filter in the local catalog
    assert!(outcome.listings.iter().all(|l| l.listing.id != "3"));
}

#[tokio::test]
async fn test_integration_invalid_filter_rejected() {
    let pipeline = create_pipeline(LocalCatalog::sample(), Duration::from_secs(5));

    let filter = FilterInput::default().with_min_rating("7");
    assert!(pipeline.run(text("earbuds", filter)).await.is_err());

    let filter = FilterInput::default().with_max_price("abc");
    assert!(pipeline.run(text("earbuds", filter)).await.is_err());
}

#[tokio::test]
async fn test_integration_stop_words_only() {
    let pipeline = create_pipeline(LocalCatalog::sample(), Duration::from_secs(5));

    let outcome = pipeline.run(text("the and of a", FilterInput::default())).await.unwrap();
    assert!(outcome.listings.is_empty());
    assert!(outcome.tokens_used.is_empty());
}
