use actix_multipart::form::{bytes::Bytes as UploadedBytes, MultipartForm};
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use validator::Validate;
use crate::core::{FilterInput, Pipeline, PipelineError, SearchInput, SearchOutcome};
use crate::models::{
    ContactSupplierRequest, ContactSupplierResponse, ErrorResponse, HealthResponse, ScrapeParams,
    ScrapeResponse, SearchParams, SearchResponse,
};
use crate::services::{Inquiry, InquiryStore, LiveCatalog};
use std::sync::Arc;

/// Header carrying the internal scrape key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Multipart upload of the image search form
#[derive(MultipartForm)]
pub struct ImageUpload {
    pub image: Option<UploadedBytes>,
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub live: Option<Arc<LiveCatalog>>,
    pub inquiries: Option<Arc<InquiryStore>>,
    pub internal_api_key: Option<String>,
}

/// Configure all search-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/search", web::get().to(search_text))
        .route("/search/image", web::post().to(search_image))
        .route("/scrape/marketplace", web::get().to(scrape_marketplace))
        .route("/scrape/alibaba", web::get().to(scrape_marketplace))
        .route("/contact-supplier", web::post().to(contact_supplier));
}

fn error_response(status: actix_web::http::StatusCode, error: &str, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message: message.into(),
        status_code: status.as_u16(),
    })
}

fn is_truthy(flag: Option<&str>) -> bool {
    matches!(
        flag.map(|f| f.trim().to_ascii_lowercase()).as_deref(),
        Some("true") | Some("1") | Some("yes") | Some("on")
    )
}

fn into_response(outcome: SearchOutcome, query: Option<String>) -> SearchResponse {
    SearchResponse {
        success: true,
        products: outcome.listings,
        tokens_used: outcome.tokens_used,
        fallback_used: outcome.fallback_used,
        source: outcome.source,
        query,
        detected_labels: outcome.detected_labels,
        category_hint: outcome.category_hint,
    }
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let db_healthy = match &state.inquiries {
        Some(store) => store.health_check().await.unwrap_or(false),
        None => true,
    };

    let status = if db_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        live_source: state.pipeline.has_live_source(),
    })
}

/// Text search endpoint
///
/// GET /api/search?q=wireless+earbuds&gold=true&maxPrice=10&minRating=4
async fn search_text(
    state: web::Data<AppState>,
    params: web::Query<SearchParams>,
) -> impl Responder {
    let params = params.into_inner();

    let filter = FilterInput {
        gold_only: is_truthy(params.gold.as_deref()),
        max_price: params.max_price,
        min_rating: params.min_rating,
    };

    tracing::info!("Text search: {:?}", params.q);

    let input = SearchInput::Text {
        query: params.q.clone(),
        filter,
    };

    match state.pipeline.run(input).await {
        Ok(outcome) => {
            tracing::info!(
                "Returning {} listings from {} (fallback: {})",
                outcome.listings.len(),
                outcome.source,
                outcome.fallback_used
            );
            HttpResponse::Ok().json(into_response(outcome, Some(params.q)))
        }
        Err(PipelineError::InvalidFilter(e)) => {
            tracing::info!("Rejected search filter: {}", e);
            error_response(actix_web::http::StatusCode::BAD_REQUEST, "invalid_filter", e.to_string())
        }
    }
}

/// Image search endpoint
///
/// POST /api/search/image as multipart/form-data with the file in the `image` field
async fn search_image(
    state: web::Data<AppState>,
    MultipartForm(form): MultipartForm<ImageUpload>,
) -> impl Responder {
    let Some(body) = form.image.map(|field| field.data).filter(|data| !data.is_empty()) else {
        return error_response(
            actix_web::http::StatusCode::BAD_REQUEST,
            "no_image",
            "Form field 'image' must contain an image file",
        );
    };

    tracing::info!("Image search: {} bytes", body.len());

    match state.pipeline.run(SearchInput::Image { bytes: body.to_vec() }).await {
        Ok(outcome) => HttpResponse::Ok().json(into_response(outcome, None)),
        Err(PipelineError::InvalidFilter(e)) => {
            error_response(actix_web::http::StatusCode::BAD_REQUEST, "invalid_filter", e.to_string())
        }
    }
}

/// Internal scrape endpoint
///
/// GET /api/scrape/marketplace?keyword=earbuds
///
/// Requires the `x-api-key` header to match the configured internal key.
async fn scrape_marketplace(
    state: web::Data<AppState>,
    params: web::Query<ScrapeParams>,
    req: HttpRequest,
) -> impl Responder {
    let Some(expected) = state.internal_api_key.as_deref() else {
        return error_response(
            actix_web::http::StatusCode::SERVICE_UNAVAILABLE,
            "scrape_disabled",
            "No internal API key is configured",
        );
    };

    let provided = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    if provided != Some(expected) {
        tracing::warn!("Rejected scrape request from {:?}", req.peer_addr());
        return error_response(actix_web::http::StatusCode::UNAUTHORIZED, "unauthorized", "Invalid API key");
    }

    let Some(live) = state.live.as_ref() else {
        return error_response(
            actix_web::http::StatusCode::SERVICE_UNAVAILABLE,
            "scrape_disabled",
            "Live marketplace source is not enabled",
        );
    };

    match live.search(&params.keyword).await {
        Ok(products) => HttpResponse::Ok().json(ScrapeResponse { products }),
        Err(e) => {
            tracing::warn!("Scrape failed for {:?}: {}", params.keyword, e);
            error_response(actix_web::http::StatusCode::BAD_GATEWAY, e.kind().as_str(), e.to_string())
        }
    }
}

/// Record a buyer inquiry
///
/// POST /api/contact-supplier
async fn contact_supplier(
    state: web::Data<AppState>,
    req: web::Json<ContactSupplierRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for contact request: {:?}", errors);
        return error_response(actix_web::http::StatusCode::BAD_REQUEST, "Validation failed", errors.to_string());
    }

    let Some(store) = state.inquiries.as_ref() else {
        return error_response(
            actix_web::http::StatusCode::SERVICE_UNAVAILABLE,
            "inquiries_disabled",
            "No database is configured for inquiries",
        );
    };

    let inquiry = Inquiry::from(&req.into_inner());

    match store.record(&inquiry).await {
        Ok(id) => HttpResponse::Ok().json(ContactSupplierResponse {
            success: true,
            message: "Inquiry sent to supplier".to_string(),
            inquiry_id: id.to_string(),
        }),
        Err(e) => {
            tracing::error!("Failed to record inquiry: {}", e);
            error_response(
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to record inquiry",
                e.to_string(),
            )
        }
    }
}
