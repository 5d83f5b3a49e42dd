//! HTTP API integration tests
//!
//! Tests the axum surface including:
//! - Property 16: Location Data Endpoint Returns Full Reports
//! - Property 17: Invalid Input Is a 400 With the Offending Field

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use common::{unavailable_sources, FakeGenerator};
use geoinsight_backend::external::{GeocoderClient, SourceClient};
use geoinsight_backend::services::{
    AcquisitionService, InsightOrchestrator, LocationDataService, OrchestratorSettings,
    PipelineSettings, ResponseCache,
};
use geoinsight_backend::{create_app, AppState, Config};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn app(geocoder_url: String) -> Router {
    let clients: Vec<Arc<dyn SourceClient>> = unavailable_sources()
        .into_iter()
        .map(|s| Arc::new(s) as Arc<dyn SourceClient>)
        .collect();

    let service = LocationDataService::new(
        AcquisitionService::new(clients, Duration::from_secs(2)),
        InsightOrchestrator::standard(Arc::new(FakeGenerator::new()), OrchestratorSettings::default()),
        Arc::new(ResponseCache::new(Duration::from_secs(300), 100)),
        PipelineSettings::default(),
    );

    let state = AppState {
        config: Arc::new(Config::load().expect("default configuration")),
        location_service: Arc::new(service),
        geocoder: Arc::new(GeocoderClient::with_base_url(geocoder_url, Duration::from_secs(2))),
    };
    create_app(state)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, body)
}

// ============================================================================
// Health
// ============================================================================

#[cfg(test)]
mod health_tests {
    use super::*;

    /// Test root banner and health payload
    #[tokio::test]
    async fn test_root_and_health() {
        let server = MockServer::start().await;

        let (status, body) = get(app(server.uri()), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.as_str().unwrap_or_default().contains("GeoInsight"));

        let (status, body) = get(app(server.uri()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["cache_entries"], 0);
        assert!(body["version"].is_string());
    }
}

// ============================================================================
// Location Data
// ============================================================================

#[cfg(test)]
mod location_data_tests {
    use super::*;

    /// Property 16: the endpoint returns every snapshot and insight field
    #[tokio::test]
    async fn test_location_data_report_shape() {
        let server = MockServer::start().await;
        let (status, body) = get(
            app(server.uri()),
            "/api/v1/location-data?lat=40.7128&lng=-74.0060&name=New%20York%2C%20USA",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["location"]["name"], "New York, USA");
        for section in ["airQuality", "soil", "fire", "water", "weather", "vegetation"] {
            assert!(body[section].is_object(), "missing {}", section);
        }
        assert_eq!(body["fire"]["fireRisk"], "low");
        assert_eq!(body["weather"]["forecast"].as_array().map(Vec::len), Some(5));
        assert_eq!(body["metadata"]["dataQuality"], "poor");
        assert_eq!(body["metadata"]["cacheable"], false);
        for field in [
            "futureTrend",
            "cropRecommendation",
            "riskAssessment",
            "explanation",
            "mitigation",
            "healthAdvisory",
        ] {
            assert!(!body["insights"][field].as_str().unwrap_or_default().is_empty());
        }
        assert!(body["lastUpdated"].is_string());
        assert!(!body["summary"].as_str().unwrap_or_default().is_empty());
    }

    /// Property 17: out-of-range latitude is rejected with the field name
    #[tokio::test]
    async fn test_invalid_latitude() {
        let server = MockServer::start().await;
        let (status, body) = get(app(server.uri()), "/api/v1/location-data?lat=95&lng=0").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            json!({
                "code": "INVALID_LOCATION",
                "message": "Latitude must be between -90 and 90",
                "field": "lat"
            })
        );
    }

    /// Test a blank name is treated as absent
    #[tokio::test]
    async fn test_blank_name_uses_coordinates() {
        let server = MockServer::start().await;
        let (status, body) =
            get(app(server.uri()), "/api/v1/location-data?lat=-33.87&lng=151.21&name=%20").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["location"]["name"], "33.87°S, 151.21°E");
    }
}

// ============================================================================
// Geocoding
// ============================================================================

#[cfg(test)]
mod geocode_tests {
    use super::*;

    /// Test an unknown place is a 404
    #[tokio::test]
    async fn test_geocode_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let (status, body) = get(app(server.uri()), "/api/v1/geocode?q=Atlantis").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    /// Test a found place is returned as a location
    #[tokio::test]
    async fn test_geocode_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "lat": "-1.2921", "lon": "36.8219", "name": "Nairobi" }
            ])))
            .mount(&server)
            .await;

        let (status, body) = get(app(server.uri()), "/api/v1/geocode?q=Nairobi").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Nairobi");
        assert_eq!(body["lat"], -1.2921);
    }

    /// Test reverse lookup failure is a null name, not an error
    #[tokio::test]
    async fn test_reverse_geocode_failure_is_null() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (status, body) =
            get(app(server.uri()), "/api/v1/geocode/reverse?lat=48.85&lng=2.35").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "name": null }));
    }
}
