// Core algorithm exports
pub mod filters;
pub mod image;
pub mod normalizer;
pub mod pipeline;
pub mod ranker;
pub mod scoring;

pub use filters::{matches_constraints, shared_tokens, within_price_ceiling};
pub use image::{translate, expansion_terms, ImageTerms, TranslateError};
pub use normalizer::{normalize, tokenize, FilterInput, NormalizeError};
pub use pipeline::{Pipeline, PipelineConfig, PipelineError, SearchInput, SearchOutcome};
pub use ranker::{Ranker, RankResult};
pub use scoring::calculate_match_score;
