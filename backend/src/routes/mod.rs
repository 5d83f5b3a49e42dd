//! Route definitions for the GeoInsight API

use axum::{routing::get, Router};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Snapshot and insights for one point
        .route("/location-data", get(handlers::get_location_data))
        // Geocoding passthrough for the search box
        .route("/geocode", get(handlers::geocode))
        .route("/geocode/reverse", get(handlers::reverse_geocode))
}
