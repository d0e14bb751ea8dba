use serde::{Deserialize, Serialize};
use crate::models::domain::{CandidateListing, ScoredListing, SourceKind};

/// Ranked result set returned to the presentation layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub success: bool,
    pub products: Vec<ScoredListing>,
    #[serde(rename = "tokensUsed")]
    pub tokens_used: Vec<String>,
    #[serde(rename = "fallbackUsed")]
    pub fallback_used: bool,
    pub source: SourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(rename = "detectedLabels", skip_serializing_if = "Option::is_none")]
    pub detected_labels: Option<Vec<String>>,
    #[serde(rename = "categoryHint", skip_serializing_if = "Option::is_none")]
    pub category_hint: Option<String>,
}

/// Raw listings from the protected scrape endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeResponse {
    pub products: Vec<CandidateListing>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(rename = "liveSource")]
    pub live_source: bool,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

/// Inquiry confirmation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactSupplierResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "inquiryId")]
    pub inquiry_id: String,
}
