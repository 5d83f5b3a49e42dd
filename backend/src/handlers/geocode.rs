//! HTTP handlers for forward and reverse geocoding

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use shared::{validate_location, Location};

use crate::error::{AppError, AppResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct GeocodeQuery {
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct ReverseGeocodeQuery {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Serialize)]
pub struct PlaceName {
    pub name: Option<String>,
}

/// Place name to location
pub async fn geocode(
    State(state): State<AppState>,
    Query(query): Query<GeocodeQuery>,
) -> AppResult<Json<Location>> {
    if query.q.trim().is_empty() {
        return Err(AppError::ValidationError("query must not be empty".to_string()));
    }

    state
        .geocoder
        .forward(&query.q)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Place {:?}", query.q.trim())))
}

/// Location to short place name
pub async fn reverse_geocode(
    State(state): State<AppState>,
    Query(query): Query<ReverseGeocodeQuery>,
) -> AppResult<Json<PlaceName>> {
    let location = Location::new(query.lat, query.lng);
    validate_location(&location)?;

    Ok(Json(PlaceName {
        name: state.geocoder.reverse(&location).await,
    }))
}
