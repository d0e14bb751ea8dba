use actix_cors::Cors;
use actix_multipart::{form::MultipartFormConfig, MultipartError};
use actix_web::{web, App, HttpServer, HttpResponse, middleware, error, http::StatusCode};
use sourcepro_search::config::Settings;
use sourcepro_search::core::{Pipeline, Ranker};
use sourcepro_search::routes::{self, AppState};
use sourcepro_search::services::{
    HttpTransport, InquiryStore, ListingCache, LiveCatalog, LocalCatalog, VisionClient,
};
use std::sync::Arc;
use tracing::{info, warn, error};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle multipart upload errors
pub fn handle_multipart_error(err: MultipartError, req: &actix_web::HttpRequest) -> actix_web::Error {
    info!("Multipart error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_upload".to_string(),
        message: format!("Invalid upload: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

/// Largest accepted image upload
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

fn config_error(e: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        config_error(e)
    })?;

    // Initialize logging; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if settings.logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }

    info!("Starting SourcePro search service...");

    // Local catalog snapshot
    let local = match &settings.catalog.seed_path {
        Some(path) => LocalCatalog::from_path(path).map_err(|e| {
            error!("Failed to load catalog from {}: {}", path, e);
            config_error(e)
        })?,
        None => LocalCatalog::sample(),
    };

    info!("Local catalog loaded ({} listings)", local.len());

    let mut pipeline = Pipeline::new(
        local,
        Ranker::new(settings.scoring_weights()),
        settings.pipeline_config(),
    );

    // Live marketplace source (optional)
    let live = if settings.marketplace.enabled {
        let live_config = settings.marketplace.to_live_config();
        live_config.selectors.validate().map_err(config_error)?;

        let transport = HttpTransport::new(&live_config).map_err(config_error)?;
        let cache = ListingCache::new(settings.cache.max_entries, settings.cache.ttl_secs);
        let live = Arc::new(LiveCatalog::new(Arc::new(transport), live_config).with_cache(cache));

        info!(
            "Live marketplace source enabled ({}, {} sessions)",
            settings.marketplace.base_url, settings.marketplace.max_sessions
        );
        pipeline = pipeline.with_live_source(live.clone());
        Some(live)
    } else {
        info!("Live marketplace source disabled, serving the local catalog only");
        None
    };

    // Image classifier (optional)
    match settings.vision.api_key.clone() {
        Some(api_key) if !api_key.is_empty() => {
            let client = VisionClient::new(settings.vision.endpoint.clone(), api_key, settings.vision.max_labels)
                .map_err(config_error)?;
            pipeline = pipeline.with_classifier(Arc::new(client));
            info!("Image classifier initialized");
        }
        _ => warn!("No vision API key configured, image searches will browse the local catalog"),
    }

    // Inquiry store (optional)
    let inquiries = match &settings.database.url {
        Some(url) => {
            let max_conn = settings.database.max_connections.unwrap_or(10);
            let min_conn = settings.database.min_connections.unwrap_or(1);
            match InquiryStore::new(url, max_conn, min_conn).await {
                Ok(store) => {
                    info!("PostgreSQL inquiry store initialized (max: {} connections)", max_conn);
                    Some(Arc::new(store))
                }
                Err(e) => {
                    warn!("Failed to connect to PostgreSQL ({}), inquiries disabled", e);
                    None
                }
            }
        }
        None => None,
    };

    // Build application state
    let app_state = AppState {
        pipeline: Arc::new(pipeline),
        live,
        inquiries,
        internal_api_key: settings.security.internal_api_key.clone().filter(|k| !k.is_empty()),
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .app_data(
                MultipartFormConfig::default()
                    .total_limit(MAX_UPLOAD_BYTES)
                    .memory_limit(MAX_UPLOAD_BYTES)
                    .error_handler(handle_multipart_error),
            )
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
