use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::core::PipelineConfig;
use crate::models::ScoringWeights;
use crate::services::{LiveCatalogConfig, SelectorMap};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub marketplace: MarketplaceSettings,
    #[serde(default)]
    pub vision: VisionSettings,
    #[serde(default)]
    pub catalog: CatalogSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub security: SecuritySettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 3001 }

#[derive(Debug, Clone, Deserialize)]
pub struct MarketplaceSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_marketplace_url")]
    pub base_url: String,
    #[serde(default = "default_search_path")]
    pub search_path: String,
    #[serde(default = "default_query_param")]
    pub query_param: String,
    pub user_agent: Option<String>,
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_page_loads")]
    pub max_page_loads: usize,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    #[serde(default)]
    pub selectors: SelectorSettings,
}

impl Default for MarketplaceSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_marketplace_url(),
            search_path: default_search_path(),
            query_param: default_query_param(),
            user_agent: None,
            fetch_timeout_ms: default_fetch_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            max_page_loads: default_max_page_loads(),
            max_results: default_max_results(),
            max_sessions: default_max_sessions(),
            selectors: SelectorSettings::default(),
        }
    }
}

fn default_marketplace_url() -> String { "https://www.alibaba.com".to_string() }
fn default_search_path() -> String { "/trade/search".to_string() }
fn default_query_param() -> String { "SearchText".to_string() }
fn default_fetch_timeout_ms() -> u64 { 5000 }
fn default_poll_interval_ms() -> u64 { 500 }
fn default_max_page_loads() -> usize { 2 }
fn default_max_results() -> usize { 5 }
fn default_max_sessions() -> usize { 4 }

/// Per-field selector overrides; unset fields keep the built-in mapping
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectorSettings {
    pub item: Option<String>,
    pub title: Option<String>,
    pub price: Option<String>,
    pub supplier: Option<String>,
    pub moq: Option<String>,
    pub rating: Option<String>,
    pub reviews: Option<String>,
    pub region: Option<String>,
    pub response_time: Option<String>,
    pub verified: Option<String>,
    pub image: Option<String>,
    pub link: Option<String>,
}

impl SelectorSettings {
    pub fn to_selector_map(&self) -> SelectorMap {
        let defaults = SelectorMap::default();
        let pick = |value: &Option<String>, fallback: String| value.clone().unwrap_or(fallback);

        SelectorMap {
            item: pick(&self.item, defaults.item),
            title: pick(&self.title, defaults.title),
            price: pick(&self.price, defaults.price),
            supplier: pick(&self.supplier, defaults.supplier),
            moq: pick(&self.moq, defaults.moq),
            rating: pick(&self.rating, defaults.rating),
            reviews: pick(&self.reviews, defaults.reviews),
            region: pick(&self.region, defaults.region),
            response_time: pick(&self.response_time, defaults.response_time),
            verified: pick(&self.verified, defaults.verified),
            image: pick(&self.image, defaults.image),
            link: pick(&self.link, defaults.link),
        }
    }
}

impl MarketplaceSettings {
    pub fn to_live_config(&self) -> LiveCatalogConfig {
        let defaults = LiveCatalogConfig::default();

        LiveCatalogConfig {
            base_url: self.base_url.clone(),
            search_path: self.search_path.clone(),
            query_param: self.query_param.clone(),
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
            fetch_timeout: Duration::from_millis(self.fetch_timeout_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_page_loads: self.max_page_loads,
            max_results: self.max_results,
            max_sessions: self.max_sessions,
            selectors: self.selectors.to_selector_map(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VisionSettings {
    #[serde(default = "default_vision_endpoint")]
    pub endpoint: String,
    pub api_key: Option<String>,
    #[serde(default = "default_max_labels")]
    pub max_labels: u32,
}

impl Default for VisionSettings {
    fn default() -> Self {
        Self {
            endpoint: default_vision_endpoint(),
            api_key: None,
            max_labels: default_max_labels(),
        }
    }
}

fn default_vision_endpoint() -> String { "https://vision.googleapis.com".to_string() }
fn default_max_labels() -> u32 { 10 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogSettings {
    /// JSON file with the local catalog snapshot
    pub seed_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
    #[serde(default = "default_cache_entries")]
    pub max_entries: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl(),
            max_entries: default_cache_entries(),
        }
    }
}

fn default_cache_ttl() -> u64 { 300 }
fn default_cache_entries() -> u64 { 1000 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            result_limit: default_result_limit(),
        }
    }
}

fn default_result_limit() -> usize { 50 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub weights: WeightsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_token_overlap_weight")]
    pub token_overlap: f64,
    #[serde(default = "default_price_fit_weight")]
    pub price_fit: f64,
    #[serde(default = "default_verified_weight")]
    pub verified: f64,
    #[serde(default = "default_rating_weight")]
    pub rating: f64,
    #[serde(default = "default_price_tolerance")]
    pub price_tolerance: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            token_overlap: default_token_overlap_weight(),
            price_fit: default_price_fit_weight(),
            verified: default_verified_weight(),
            rating: default_rating_weight(),
            price_tolerance: default_price_tolerance(),
        }
    }
}

impl From<&WeightsConfig> for ScoringWeights {
    fn from(w: &WeightsConfig) -> Self {
        ScoringWeights {
            token_overlap: w.token_overlap,
            price_fit: w.price_fit,
            verified: w.verified,
            rating: w.rating,
            price_tolerance: w.price_tolerance,
        }
    }
}

fn default_token_overlap_weight() -> f64 { 60.0 }
fn default_price_fit_weight() -> f64 { 20.0 }
fn default_verified_weight() -> f64 { 12.0 }
fn default_rating_weight() -> f64 { 8.0 }
fn default_price_tolerance() -> f64 { 0.5 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecuritySettings {
    /// Key required by the internal scrape endpoint
    pub internal_api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with SOURCEPRO__)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., SOURCEPRO__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("SOURCEPRO")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings = apply_legacy_env(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("SOURCEPRO")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            fetch_timeout: Duration::from_millis(self.marketplace.fetch_timeout_ms),
            result_limit: self.search.result_limit,
        }
    }

    pub fn scoring_weights(&self) -> ScoringWeights {
        ScoringWeights::from(&self.scoring.weights)
    }
}

/// Honour the conventional variable names used by existing deployments
/// (PORT, DATABASE_URL, INTERNAL_API_KEY, GOOGLE_VISION_API_KEY)
fn apply_legacy_env(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let overrides = [
        ("PORT", "server.port"),
        ("DATABASE_URL", "database.url"),
        ("INTERNAL_API_KEY", "security.internal_api_key"),
        ("GOOGLE_VISION_API_KEY", "vision.api_key"),
    ];

    let mut builder = Config::builder().add_source(settings);
    for (var, key) in overrides {
        if let Ok(value) = env::var(var) {
            if !value.is_empty() {
                builder = builder.set_override(key, value)?;
            }
        }
    }

    builder.build()
}
