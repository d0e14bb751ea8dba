//! SourcePro Search - supplier discovery service
//!
//! Turns a buyer's free-text query or product photo into a ranked list of
//! wholesale supplier listings. Listings come from a live marketplace scrape
//! when it is available and from the local catalog snapshot otherwise.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{normalize, tokenize, FilterInput, Pipeline, PipelineConfig, Ranker, SearchInput, SearchOutcome};
pub use crate::models::{CandidateListing, ScoredListing, SearchQuery, ScoringWeights, SourceKind};
pub use crate::services::{CatalogSource, LiveCatalog, LocalCatalog};
