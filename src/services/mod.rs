// Service exports
pub mod cache;
pub mod catalog;
pub mod inquiries;
pub mod marketplace;
pub mod vision;

pub use cache::{ListingCache, CacheKey, CacheStats};
pub use catalog::{CatalogSource, CatalogError, LocalCatalog};
pub use inquiries::{Inquiry, InquiryStore, InquiryError};
pub use marketplace::{HttpTransport, LiveCatalog, LiveCatalogConfig, MarketplaceTransport, ScrapeError, ScrapeFailureKind, SelectorMap, SessionPool};
pub use vision::{LabelClassifier, VisionClient, VisionError};
