//! Geocoding client
//!
//! Forward and reverse lookups against a Nominatim-compatible service. Both
//! lookups answer `None` on no match or on any error.

use std::time::Duration;

use reqwest::{header, Client};
use serde::Deserialize;
use shared::{validate_location, Location};

use super::send_with_deadline;
use crate::config::GeocoderConfig;

/// Nominatim client
#[derive(Clone)]
pub struct GeocoderClient {
    client: Client,
    base_url: String,
    user_agent: String,
    enabled: bool,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    address: Option<Address>,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Address {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    county: Option<String>,
    state: Option<String>,
    country: Option<String>,
}

impl Address {
    /// "City, Country" with coarser fallbacks for rural points
    fn short_name(&self) -> Option<String> {
        let place = self
            .city
            .as_ref()
            .or(self.town.as_ref())
            .or(self.village.as_ref())
            .or(self.county.as_ref())
            .or(self.state.as_ref());

        match (place, self.country.as_ref()) {
            (Some(place), Some(country)) => Some(format!("{}, {}", place, country)),
            (Some(place), None) => Some(place.clone()),
            (None, Some(country)) => Some(country.clone()),
            (None, None) => None,
        }
    }
}

impl GeocoderClient {
    /// Create a new GeocoderClient from configuration
    pub fn new(config: &GeocoderConfig, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
            enabled: config.enabled,
            timeout,
        }
    }

    /// Create an enabled GeocoderClient with custom base URL (for testing)
    pub fn with_base_url(base_url: String, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url,
            user_agent: "geoinsight-test".to_string(),
            enabled: true,
            timeout,
        }
    }

    /// Forward lookup: place name to location
    pub async fn forward(&self, query: &str) -> Option<Location> {
        let query = query.trim();
        if !self.enabled || query.is_empty() {
            return None;
        }

        let request = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .header(header::USER_AGENT, &self.user_agent);

        let hits: Vec<SearchHit> = match send_with_deadline(request, self.timeout).await {
            Ok(response) => match response.json().await {
                Ok(hits) => hits,
                Err(e) => {
                    tracing::warn!("Geocoder search returned malformed body: {}", e);
                    return None;
                }
            },
            Err(e) => {
                tracing::warn!("Geocoder search failed for {:?}: {}", query, e);
                return None;
            }
        };

        let hit = hits.into_iter().next()?;
        let lat = hit.lat.parse::<f64>().ok()?;
        let lng = hit.lon.parse::<f64>().ok()?;
        let name = hit
            .name
            .filter(|n| !n.is_empty())
            .or(hit.display_name)
            .unwrap_or_else(|| query.to_string());

        let location = Location::named(lat, lng, name.chars().take(200).collect::<String>());
        validate_location(&location).ok().map(|_| location)
    }

    /// Reverse lookup: location to a short place name
    pub async fn reverse(&self, location: &Location) -> Option<String> {
        if !self.enabled {
            return None;
        }

        let request = self
            .client
            .get(format!("{}/reverse", self.base_url))
            .query(&[
                ("lat", location.lat.to_string()),
                ("lon", location.lng.to_string()),
                ("format", "json".to_string()),
                ("zoom", "10".to_string()),
            ])
            .header(header::USER_AGENT, &self.user_agent);

        let data: ReverseResponse = match send_with_deadline(request, self.timeout).await {
            Ok(response) => response.json().await.ok()?,
            Err(e) => {
                tracing::debug!("Reverse geocoding failed: {}", e);
                return None;
            }
        };

        data.address
            .and_then(|a| a.short_name())
            .or(data.display_name)
            .filter(|n| !n.trim().is_empty())
    }
}
