use crate::core::image::{expansion_terms, translate, TranslateError};
use crate::core::normalizer::{normalize, FilterInput, NormalizeError};
use crate::core::ranker::Ranker;
use crate::models::{CandidateListing, ImageLabel, ScoredListing, SearchQuery, SourceKind};
use crate::services::{CatalogSource, LabelClassifier, LocalCatalog, ScrapeError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// The only failure a search can surface to the buyer
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error(transparent)]
    InvalidFilter(#[from] NormalizeError),
}

/// One inbound search
#[derive(Debug, Clone)]
pub enum SearchInput {
    Text { query: String, filter: FilterInput },
    Image { bytes: Vec<u8> },
}

/// Progress of a single search, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Normalizing,
    Fetching,
    Scoring,
    Done,
    Failed,
}

/// Ranked listings plus how they were produced
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub listings: Vec<ScoredListing>,
    pub tokens_used: Vec<String>,
    pub fallback_used: bool,
    pub source: SourceKind,
    pub detected_labels: Option<Vec<String>>,
    pub category_hint: Option<String>,
    pub total_candidates: usize,
}

impl SearchOutcome {
    fn empty(query: &SearchQuery) -> Self {
        Self {
            listings: Vec::new(),
            tokens_used: query.tokens.iter().cloned().collect(),
            fallback_used: false,
            source: SourceKind::Local,
            detected_labels: None,
            category_hint: None,
            total_candidates: 0,
        }
    }
}

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Upper bound on one live fetch, independent of the caller's timeout
    pub fetch_timeout: Duration,
    pub result_limit: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(5),
            result_limit: 50,
        }
    }
}

/// Supplier discovery pipeline
///
/// input → (image translation) → normalization → fetch → scoring → ranked list.
/// Only an invalid filter fails the request; live-source and classifier
/// failures degrade to the local catalog or to an unfiltered browse.
pub struct Pipeline {
    local: LocalCatalog,
    live: Option<Arc<dyn CatalogSource>>,
    classifier: Option<Arc<dyn LabelClassifier>>,
    ranker: Ranker,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(local: LocalCatalog, ranker: Ranker, config: PipelineConfig) -> Self {
        Self {
            local,
            live: None,
            classifier: None,
            ranker,
            config,
        }
    }

    pub fn with_live_source(mut self, live: Arc<dyn CatalogSource>) -> Self {
        self.live = Some(live);
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn LabelClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn has_live_source(&self) -> bool {
        self.live.is_some()
    }

    pub async fn run(&self, input: SearchInput) -> Result<SearchOutcome, PipelineError> {
        enter(Stage::Start);
        match input {
            SearchInput::Text { query, filter } => self.search_text(&query, &filter, None).await,
            SearchInput::Image { bytes } => Ok(self.search_image(&bytes).await),
        }
    }

    async fn search_text(
        &self,
        raw_text: &str,
        filter: &FilterInput,
        category_hint: Option<&str>,
    ) -> Result<SearchOutcome, PipelineError> {
        enter(Stage::Normalizing);
        let mut query = normalize(raw_text, filter).map_err(|e| {
            enter(Stage::Failed);
            tracing::info!("Rejected search '{}': {}", raw_text, e);
            e
        })?;

        if let Some(hint) = category_hint {
            query
                .tokens
                .extend(expansion_terms(hint).iter().map(|t| t.to_string()));
        }

        if query.is_empty() {
            tracing::debug!("Query '{}' has no usable tokens, returning no results", raw_text);
            enter(Stage::Done);
            return Ok(SearchOutcome::empty(&query));
        }

        enter(Stage::Fetching);
        let (candidates, source, fallback_used) = self.fetch(&query, category_hint).await;

        enter(Stage::Scoring);
        let mut result = self.ranker.rank(&query, candidates);
        result.listings.truncate(self.config.result_limit);

        tracing::info!(
            "Returning {} listings for '{}' (source: {}, fallback: {}, from {} candidates)",
            result.listings.len(),
            query.phrase(),
            source,
            fallback_used,
            result.total_candidates
        );

        enter(Stage::Done);
        Ok(SearchOutcome {
            listings: result.listings,
            tokens_used: query.tokens.into_iter().collect(),
            fallback_used,
            source,
            detected_labels: None,
            category_hint: category_hint.map(str::to_string),
            total_candidates: result.total_candidates,
        })
    }

    async fn search_image(&self, image: &[u8]) -> SearchOutcome {
        let labels = self.classify(image).await;

        let terms = match translate(&labels) {
            Ok(terms) => terms,
            Err(TranslateError::NoLabelsDetected) => {
                tracing::info!("No labels detected for image, browsing local catalog");
                return self.browse();
            }
        };

        let raw_text = terms.tokens.iter().cloned().collect::<Vec<_>>().join(" ");
        let hint = terms.category_hint.as_deref();

        // Label text carries no numeric filters, so normalization cannot fail
        let mut outcome = match self.search_text(&raw_text, &FilterInput::default(), hint).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("Image query could not be normalized: {}", e);
                self.browse()
            }
        };

        outcome.detected_labels = Some(terms.labels);
        outcome.category_hint = terms.category_hint;
        outcome
    }

    async fn classify(&self, image: &[u8]) -> Vec<ImageLabel> {
        let Some(classifier) = &self.classifier else {
            tracing::warn!("No label classifier configured, treating image as unlabeled");
            return Vec::new();
        };

        match classifier.classify(image).await {
            Ok(labels) => labels,
            Err(e) => {
                tracing::warn!("Label classification failed, treating image as unlabeled: {}", e);
                Vec::new()
            }
        }
    }

    fn browse(&self) -> SearchOutcome {
        let mut result = self.ranker.browse(self.local.browse());
        result.listings.truncate(self.config.result_limit);

        enter(Stage::Done);
        SearchOutcome {
            listings: result.listings,
            tokens_used: Vec::new(),
            fallback_used: false,
            source: SourceKind::Local,
            detected_labels: Some(Vec::new()),
            category_hint: None,
            total_candidates: result.total_candidates,
        }
    }

    /// Prefer the live source; fall back to the local catalog on any failure
    async fn fetch(
        &self,
        query: &SearchQuery,
        category_hint: Option<&str>,
    ) -> (Vec<CandidateListing>, SourceKind, bool) {
        let mut fallback_used = false;

        if let Some(live) = &self.live {
            let started = Instant::now();
            let outcome = tokio::time::timeout(self.config.fetch_timeout, live.fetch(query, category_hint))
                .await
                .unwrap_or_else(|_| {
                    Err(ScrapeError::Timeout {
                        elapsed_ms: started.elapsed().as_millis() as u64,
                    })
                });

            match outcome {
                Ok(candidates) => return (candidates, live.kind(), false),
                Err(e) => {
                    let elapsed_ms = started.elapsed().as_millis() as u64;
                    let kind = e.kind().as_str();
                    tracing::warn!(
                        phrase = %query.phrase(),
                        elapsed_ms,
                        kind,
                        "Live fetch failed, falling back to local catalog: {}",
                        e
                    );
                    fallback_used = true;
                }
            }
        }

        let candidates = match self.local.fetch(query, category_hint).await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::error!("Local catalog fetch failed: {}", e);
                Vec::new()
            }
        };

        (candidates, SourceKind::Local, fallback_used)
    }
}

#[inline]
fn enter(stage: Stage) {
    tracing::trace!("Search stage: {:?}", stage);
}
