// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{SearchQuery, PriceRange, CandidateListing, ScoredListing, ImageLabel, SourceKind, ScoringWeights, UNBOUNDED_PRICE, UNKNOWN_FIELD};
pub use requests::{SearchParams, ScrapeParams, ContactSupplierRequest};
pub use responses::{SearchResponse, ScrapeResponse, HealthResponse, ErrorResponse, ContactSupplierResponse};
