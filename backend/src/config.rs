//! Configuration management for the GeoInsight service
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with GEOINSIGHT_ prefix

use std::time::Duration;

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// External data providers
    pub sources: SourcesConfig,

    /// Generative text service
    pub generation: GenerationConfig,

    /// Response cache
    pub cache: CacheConfig,

    /// Request-level pipeline settings
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourcesConfig {
    /// Per-call deadline for every data provider
    pub timeout_secs: u64,

    pub climate: ClimateConfig,
    pub fire: FireConfig,
    pub air_quality: AirQualityConfig,
    pub geocoder: GeocoderConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClimateConfig {
    pub enabled: bool,

    /// NASA POWER base URL
    pub base_url: String,

    /// Days of daily history requested
    pub history_days: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FireConfig {
    pub enabled: bool,

    /// NASA FIRMS base URL
    pub base_url: String,

    /// FIRMS MAP_KEY
    #[serde(default)]
    pub api_key: Option<String>,

    /// Satellite product queried
    pub product: String,

    /// Half-width of the bounding box in degrees
    pub bbox_degrees: f64,

    /// Days of detections counted (1-10)
    pub day_range: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AirQualityConfig {
    pub enabled: bool,

    /// OpenAQ base URL
    pub base_url: String,

    /// OpenAQ API key
    #[serde(default)]
    pub api_key: Option<String>,

    /// Station search radius in meters
    pub radius_m: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeocoderConfig {
    pub enabled: bool,

    /// Nominatim base URL
    pub base_url: String,

    /// User agent sent to the public geocoder
    pub user_agent: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    /// OpenAI-compatible endpoint; empty disables generation
    #[serde(default)]
    pub base_url: String,

    /// Bearer token for the endpoint
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model name sent with every request
    pub model: String,

    /// Per-attempt deadline for one generation task
    pub timeout_secs: u64,

    /// Extra attempts for retryable failures
    pub retries: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Entry lifetime in seconds
    pub ttl_secs: u64,

    /// Capacity before oldest-first eviction
    pub max_entries: usize,

    /// Decimal digits of latitude/longitude in cache keys
    pub coordinate_precision: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    /// Requests slower than this are logged
    pub soft_deadline_ms: u64,

    /// Snapshots older than this lose the freshness check
    pub max_data_age_hours: i64,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("GEOINSIGHT_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("sources.timeout_secs", 8)?
            .set_default("sources.climate.enabled", true)?
            .set_default("sources.climate.base_url", "https://power.larc.nasa.gov")?
            .set_default("sources.climate.history_days", 10)?
            .set_default("sources.fire.enabled", true)?
            .set_default("sources.fire.base_url", "https://firms.modaps.eosdis.nasa.gov")?
            .set_default("sources.fire.product", "VIIRS_SNPP_NRT")?
            .set_default("sources.fire.bbox_degrees", 0.5)?
            .set_default("sources.fire.day_range", 2)?
            .set_default("sources.air_quality.enabled", true)?
            .set_default("sources.air_quality.base_url", "https://api.openaq.org")?
            .set_default("sources.air_quality.radius_m", 25000)?
            .set_default("sources.geocoder.enabled", true)?
            .set_default("sources.geocoder.base_url", "https://nominatim.openstreetmap.org")?
            .set_default("sources.geocoder.user_agent", "geoinsight/0.1")?
            .set_default("generation.base_url", "")?
            .set_default("generation.model", "gpt-4o-mini")?
            .set_default("generation.timeout_secs", 20)?
            .set_default("generation.retries", 0)?
            .set_default("cache.ttl_secs", 300)?
            .set_default("cache.max_entries", 100)?
            .set_default("cache.coordinate_precision", 3)?
            .set_default("pipeline.soft_deadline_ms", 15000)?
            .set_default("pipeline.max_data_age_hours", 24)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (GEOINSIGHT_ prefix)
            .add_source(
                Environment::with_prefix("GEOINSIGHT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl SourcesConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn is_configured(&self) -> bool {
        !self.base_url.trim().is_empty()
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl PipelineConfig {
    pub fn soft_deadline(&self) -> Duration {
        Duration::from_millis(self.soft_deadline_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            max_entries: 100,
            coordinate_precision: 3,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            soft_deadline_ms: 15000,
            max_data_age_hours: 24,
        }
    }
}
