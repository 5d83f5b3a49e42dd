//! GeoInsight - Backend
//!
//! Answers "what is happening here, and what does it mean?" for any point on
//! Earth: environmental measurements are acquired from unreliable providers,
//! back-filled into a complete snapshot, and fanned out to concurrent insight
//! generators whose results are combined into one report.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod external;
pub mod handlers;
pub mod routes;
pub mod services;

pub use config::Config;
pub use error::{AppError, AppResult};

use external::GeocoderClient;
use services::{LocationDataService, ResponseCache};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub location_service: Arc<LocationDataService>,
    pub geocoder: Arc<GeocoderClient>,
}

impl AppState {
    /// Build the process-wide services from configuration
    pub fn from_config(config: Config) -> Self {
        let cache = Arc::new(ResponseCache::new(
            config.cache.ttl(),
            config.cache.max_entries,
        ));
        let location_service = LocationDataService::from_config(&config, cache);
        let geocoder = GeocoderClient::new(&config.sources.geocoder, config.sources.timeout());

        Self {
            config: Arc::new(config),
            location_service: Arc::new(location_service),
            geocoder: Arc::new(geocoder),
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "GeoInsight Environmental Intelligence API v1"
}
