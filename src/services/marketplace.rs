use crate::models::{CandidateListing, PriceRange, SearchQuery, SourceKind, UNKNOWN_FIELD};
use crate::services::cache::{CacheKey, ListingCache};
use crate::services::catalog::CatalogSource;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use url::Url;

/// Failures of a live marketplace fetch
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScrapeError {
    #[error("result container did not appear within {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("unexpected page structure: {0}")]
    Parse(String),

    #[error("transport failure: {0}")]
    Transport(String),
}

/// Coarse failure kind, used in logs and responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeFailureKind {
    Timeout,
    Parse,
    Transport,
}

impl ScrapeFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrapeFailureKind::Timeout => "timeout",
            ScrapeFailureKind::Parse => "parse",
            ScrapeFailureKind::Transport => "transport",
        }
    }
}

impl ScrapeError {
    pub fn kind(&self) -> ScrapeFailureKind {
        match self {
            ScrapeError::Timeout { .. } => ScrapeFailureKind::Timeout,
            ScrapeError::Parse(_) => ScrapeFailureKind::Parse,
            ScrapeError::Transport(_) => ScrapeFailureKind::Transport,
        }
    }
}

impl From<reqwest::Error> for ScrapeError {
    fn from(err: reqwest::Error) -> Self {
        ScrapeError::Transport(err.to_string())
    }
}

/// Something that can load a marketplace search results page
///
/// Implementations may be an HTTP client, a headless browser, or a fixture.
#[async_trait]
pub trait MarketplaceTransport: Send + Sync {
    /// Load the current results document for a search phrase
    async fn load(&self, phrase: &str) -> Result<String, ScrapeError>;
}

/// Plain HTTP transport against the marketplace search page
pub struct HttpTransport {
    client: Client,
    search_url: String,
    query_param: String,
}

impl HttpTransport {
    pub fn new(config: &LiveCatalogConfig) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.fetch_timeout)
            .build()?;

        Ok(Self {
            client,
            search_url: format!(
                "{}/{}",
                config.base_url.trim_end_matches('/'),
                config.search_path.trim_start_matches('/')
            ),
            query_param: config.query_param.clone(),
        })
    }
}

#[async_trait]
impl MarketplaceTransport for HttpTransport {
    async fn load(&self, phrase: &str) -> Result<String, ScrapeError> {
        let url = format!(
            "{}?{}={}",
            self.search_url,
            self.query_param,
            urlencoding::encode(phrase)
        );

        tracing::debug!("Loading marketplace page: {}", url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(ScrapeError::Transport(format!(
                "marketplace returned {}",
                response.status()
            )));
        }

        Ok(response.text().await?)
    }
}

/// Bounded set of transport sessions
///
/// Acquisition waits for a free slot instead of failing.
#[derive(Clone)]
pub struct SessionPool {
    permits: Arc<Semaphore>,
}

/// A held transport session, returned to the pool on drop
pub struct Session {
    _permit: OwnedSemaphorePermit,
}

impl Drop for Session {
    fn drop(&mut self) {
        tracing::trace!("Marketplace session released");
    }
}

impl SessionPool {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_sessions.max(1))),
        }
    }

    pub async fn acquire(&self) -> Result<Session, ScrapeError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ScrapeError::Transport("session pool closed".to_string()))?;

        Ok(Session { _permit: permit })
    }

    /// Sessions currently free
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

/// CSS selectors for each listing field on the results page
#[derive(Debug, Clone)]
pub struct SelectorMap {
    pub item: String,
    pub title: String,
    pub price: String,
    pub supplier: String,
    pub moq: String,
    pub rating: String,
    pub reviews: String,
    pub region: String,
    pub response_time: String,
    pub verified: String,
    pub image: String,
    pub link: String,
}

impl Default for SelectorMap {
    fn default() -> Self {
        Self {
            item: ".offer-item".to_string(),
            title: ".title".to_string(),
            price: ".price".to_string(),
            supplier: ".company".to_string(),
            moq: ".moq".to_string(),
            rating: ".rating".to_string(),
            reviews: ".reviews".to_string(),
            region: ".location".to_string(),
            response_time: ".response-time".to_string(),
            verified: ".gold-supplier, .verified".to_string(),
            image: "img".to_string(),
            link: "a[href]".to_string(),
        }
    }
}

struct CompiledSelectors {
    item: Selector,
    title: Selector,
    price: Selector,
    supplier: Selector,
    moq: Selector,
    rating: Selector,
    reviews: Selector,
    region: Selector,
    response_time: Selector,
    verified: Selector,
    image: Selector,
    link: Selector,
}

fn compile(selector: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(selector)
        .map_err(|e| ScrapeError::Parse(format!("invalid selector '{}': {:?}", selector, e)))
}

impl SelectorMap {
    fn compile(&self) -> Result<CompiledSelectors, ScrapeError> {
        Ok(CompiledSelectors {
            item: compile(&self.item)?,
            title: compile(&self.title)?,
            price: compile(&self.price)?,
            supplier: compile(&self.supplier)?,
            moq: compile(&self.moq)?,
            rating: compile(&self.rating)?,
            reviews: compile(&self.reviews)?,
            region: compile(&self.region)?,
            response_time: compile(&self.response_time)?,
            verified: compile(&self.verified)?,
            image: compile(&self.image)?,
            link: compile(&self.link)?,
        })
    }

    /// Fail early on selectors that do not parse
    pub fn validate(&self) -> Result<(), ScrapeError> {
        self.compile().map(|_| ())
    }
}

lazy_static! {
    static ref NUMBER_RE: Regex = Regex::new(r"\d[\d,]*(?:\.\d+)?").unwrap();
}

fn numbers(text: &str) -> Vec<f64> {
    NUMBER_RE
        .find_iter(text)
        .filter_map(|m| m.as_str().replace(',', "").parse::<f64>().ok())
        .collect()
}

/// Parse "US $4.20 - 6.50" style price text
pub fn parse_price_range(text: &str) -> Option<PriceRange> {
    let values = numbers(text);
    match values.as_slice() {
        [] => None,
        [single] => Some(PriceRange::single(*single)),
        [a, b, ..] => Some(PriceRange::new(*a, *b)),
    }
}

fn first_number(text: &str) -> Option<f64> {
    numbers(text).into_iter().next()
}

fn select_text(item: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    item.select(selector)
        .next()
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty())
}

fn select_attr(item: &ElementRef<'_>, selector: &Selector, attrs: &[&str]) -> Option<String> {
    let el = item.select(selector).next()?;
    attrs
        .iter()
        .find_map(|attr| el.value().attr(attr))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn absolute_url(base: Option<&Url>, href: &str) -> String {
    match base.and_then(|b| b.join(href).ok()) {
        Some(url) => url.to_string(),
        None => href.to_string(),
    }
}

/// Extract listings from a results document
///
/// Returns `Ok(None)` while no result entry is present yet. Fields an entry
/// lacks become [`UNKNOWN_FIELD`] (or `None`/0 for numbers) instead of
/// dropping the entry. An error means entries exist but none of them
/// exposes a title or a price, i.e. the page layout no longer matches.
pub fn extract_listings(
    html: &str,
    selectors: &SelectorMap,
    max_results: usize,
    base_url: &str,
) -> Result<Option<Vec<CandidateListing>>, ScrapeError> {
    let compiled = selectors.compile()?;
    let document = Html::parse_document(html);
    let base = Url::parse(base_url).ok();

    let items: Vec<ElementRef<'_>> = document.select(&compiled.item).take(max_results).collect();
    if items.is_empty() {
        return Ok(None);
    }

    let mut readable = 0usize;
    let listings: Vec<CandidateListing> = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let title = select_text(item, &compiled.title);
            let price = select_text(item, &compiled.price).and_then(|t| parse_price_range(&t));
            if title.is_some() || price.is_some() {
                readable += 1;
            }

            let title = title.unwrap_or_else(|| UNKNOWN_FIELD.to_string());
            let supplier_name =
                select_text(item, &compiled.supplier).unwrap_or_else(|| UNKNOWN_FIELD.to_string());
            let source_url = select_attr(item, &compiled.link, &["href"])
                .map(|href| absolute_url(base.as_ref(), &href))
                .unwrap_or_default();

            let id = if source_url.is_empty() {
                format!("live:{}:{}", index, title.to_lowercase())
            } else {
                source_url.clone()
            };

            CandidateListing {
                id,
                title,
                supplier_name,
                supplier_id: None,
                price,
                minimum_order_quantity: select_text(item, &compiled.moq)
                    .and_then(|t| first_number(&t))
                    .map(|n| n as u32)
                    .filter(|n| *n > 0),
                rating: select_text(item, &compiled.rating)
                    .and_then(|t| first_number(&t))
                    .map(|r| r.clamp(0.0, 5.0))
                    .unwrap_or(0.0),
                review_count: select_text(item, &compiled.reviews)
                    .and_then(|t| first_number(&t))
                    .map(|n| n as u32)
                    .unwrap_or(0),
                verified: item.select(&compiled.verified).next().is_some(),
                region: select_text(item, &compiled.region)
                    .unwrap_or_else(|| UNKNOWN_FIELD.to_string()),
                response_time_hint: select_text(item, &compiled.response_time)
                    .unwrap_or_else(|| UNKNOWN_FIELD.to_string()),
                image_url: select_attr(item, &compiled.image, &["src", "data-src"])
                    .map(|src| absolute_url(base.as_ref(), &src))
                    .unwrap_or_default(),
                source_url,
            }
        })
        .collect();

    if readable == 0 {
        return Err(ScrapeError::Parse(format!(
            "{} entries matched '{}' but none had a title or price",
            listings.len(),
            selectors.item
        )));
    }

    Ok(Some(listings))
}

/// Settings for the live marketplace source
#[derive(Debug, Clone)]
pub struct LiveCatalogConfig {
    pub base_url: String,
    pub search_path: String,
    pub query_param: String,
    pub user_agent: String,
    /// Budget for one fetch, including waiting for a session
    pub fetch_timeout: Duration,
    pub poll_interval: Duration,
    /// Page loads before a page without result entries counts as a timeout
    pub max_page_loads: usize,
    pub max_results: usize,
    pub max_sessions: usize,
    pub selectors: SelectorMap,
}

impl Default for LiveCatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.alibaba.com".to_string(),
            search_path: "/trade/search".to_string(),
            query_param: "SearchText".to_string(),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".to_string(),
            fetch_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(500),
            max_page_loads: 2,
            max_results: 5,
            max_sessions: 4,
            selectors: SelectorMap::default(),
        }
    }
}

/// Live marketplace catalog source
pub struct LiveCatalog {
    transport: Arc<dyn MarketplaceTransport>,
    pool: SessionPool,
    config: LiveCatalogConfig,
    cache: Option<ListingCache>,
}

impl LiveCatalog {
    pub fn new(transport: Arc<dyn MarketplaceTransport>, config: LiveCatalogConfig) -> Self {
        Self {
            transport,
            pool: SessionPool::new(config.max_sessions),
            config,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: ListingCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn pool(&self) -> &SessionPool {
        &self.pool
    }

    /// Fetch up to `max_results` listings for a phrase within the fetch budget
    pub async fn search(&self, phrase: &str) -> Result<Vec<CandidateListing>, ScrapeError> {
        let cache_key = CacheKey::live_results(phrase);
        if let Some(cache) = &self.cache {
            if let Some(listings) = cache.get(&cache_key).await {
                tracing::debug!("Live results served from cache for '{}'", phrase);
                return Ok(listings);
            }
        }

        let started = Instant::now();
        let outcome = tokio::time::timeout(self.config.fetch_timeout, self.scrape(phrase)).await;

        let listings = match outcome {
            Ok(result) => result?,
            Err(_) => {
                return Err(ScrapeError::Timeout {
                    elapsed_ms: started.elapsed().as_millis() as u64,
                })
            }
        };

        tracing::info!(
            "Scraped {} listings for '{}' in {}ms",
            listings.len(),
            phrase,
            started.elapsed().as_millis()
        );

        if let Some(cache) = &self.cache {
            cache.insert(cache_key, listings.clone()).await;
        }

        Ok(listings)
    }

    async fn scrape(&self, phrase: &str) -> Result<Vec<CandidateListing>, ScrapeError> {
        let started = Instant::now();
        let _session = self.pool.acquire().await?;
        let max_loads = self.config.max_page_loads.max(1);

        for load in 1..=max_loads {
            let html = self.transport.load(phrase).await?;
            let extracted = extract_listings(
                &html,
                &self.config.selectors,
                self.config.max_results,
                &self.config.base_url,
            )?;

            if let Some(listings) = extracted {
                return Ok(listings);
            }

            if load < max_loads {
                tokio::time::sleep(self.config.poll_interval).await;
            }
        }

        tracing::debug!("No result entries for '{}' after {} page loads", phrase, max_loads);
        Err(ScrapeError::Timeout {
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }
}

#[async_trait]
impl CatalogSource for LiveCatalog {
    fn kind(&self) -> SourceKind {
        SourceKind::Live
    }

    async fn fetch(
        &self,
        query: &SearchQuery,
        category_hint: Option<&str>,
    ) -> Result<Vec<CandidateListing>, ScrapeError> {
        if let Some(hint) = category_hint {
            tracing::debug!("Live fetch for '{}' with category hint {}", query.phrase(), hint);
        }
        self.search(&query.phrase()).await
    }
}
