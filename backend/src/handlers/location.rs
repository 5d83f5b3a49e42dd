//! HTTP handler for the location data endpoint

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use shared::{Location, Report};

use crate::error::AppResult;
use crate::AppState;

/// Query parameters for a location report
#[derive(Debug, Deserialize)]
pub struct LocationDataQuery {
    pub lat: f64,
    pub lng: f64,
    pub name: Option<String>,
}

impl LocationDataQuery {
    fn into_location(self) -> Location {
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        Location {
            lat: self.lat,
            lng: self.lng,
            name,
        }
    }
}

/// Environmental snapshot plus insights for one point
pub async fn get_location_data(
    State(state): State<AppState>,
    Query(query): Query<LocationDataQuery>,
) -> AppResult<Json<Report>> {
    let report = state
        .location_service
        .get_location_data(query.into_location())
        .await?;
    Ok(Json(report))
}
