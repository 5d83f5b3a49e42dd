//! Air-quality station client
//!
//! Reads the nearest station's latest measurements from the OpenAQ network.
//! PM2.5 is scaled into an aerosol index and CO is normalized to ppm.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use shared::{accept, Location, AEROSOL_INDEX, CO_PPM};

use super::{
    body_error, configured_key, send_with_deadline, PartialFields, SourceClient, SourceError,
    SourceKind, SourceReading, SourceResult,
};
use crate::config::AirQualityConfig;

/// µg/m³ of PM2.5 per aerosol index unit
const PM25_PER_AEROSOL_UNIT: f64 = 50.0;

/// µg/m³ of CO per ppm at 25°C
const CO_UG_M3_PER_PPM: f64 = 1145.0;

/// OpenAQ client
#[derive(Clone)]
pub struct AirQualityClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    enabled: bool,
    radius_m: u32,
}

/// OpenAQ latest response
#[derive(Debug, Deserialize)]
struct LatestResponse {
    #[serde(default)]
    results: Vec<StationLatest>,
}

#[derive(Debug, Deserialize)]
struct StationLatest {
    #[serde(default)]
    measurements: Vec<Measurement>,
}

#[derive(Debug, Deserialize)]
struct Measurement {
    parameter: String,
    value: f64,
    #[serde(default)]
    unit: Option<String>,
    #[serde(rename = "lastUpdated", default)]
    last_updated: Option<DateTime<Utc>>,
}

impl AirQualityClient {
    /// Create a new AirQualityClient from configuration
    pub fn new(config: &AirQualityConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            enabled: config.enabled,
            radius_m: config.radius_m.clamp(1000, 100_000),
        }
    }

    /// Create an enabled AirQualityClient with custom base URL (for testing)
    pub fn with_base_url(api_key: Option<String>, base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
            enabled: true,
            radius_m: 25_000,
        }
    }

    /// Convert the nearest station's measurements into a partial record
    fn convert_response(data: LatestResponse) -> SourceResult {
        let station = data
            .results
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::NoData("no station within radius".to_string()))?;

        let mut fields = PartialFields::default();
        let mut observed_at: Option<DateTime<Utc>> = None;

        for m in station.measurements {
            // Negative readings are the network's "no data" marker
            if m.value < 0.0 {
                continue;
            }
            let value = match m.parameter.to_ascii_lowercase().as_str() {
                "pm25" => {
                    fields.aerosol_index = accept(m.value / PM25_PER_AEROSOL_UNIT, &AEROSOL_INDEX);
                    fields.aerosol_index
                }
                "co" => {
                    let ppm = match m.unit.as_deref() {
                        Some("ppm") => m.value,
                        _ => m.value / CO_UG_M3_PER_PPM,
                    };
                    fields.co_ppm = accept(ppm, &CO_PPM);
                    fields.co_ppm
                }
                _ => None,
            };
            if value.is_some() {
                observed_at = observed_at.max(m.last_updated);
            }
        }

        if fields.aerosol_index.is_none() && fields.co_ppm.is_none() {
            return Err(SourceError::NoData(
                "station reports neither PM2.5 nor CO".to_string(),
            ));
        }
        Ok(SourceReading::new(SourceKind::AirQuality, fields).observed_at(observed_at))
    }
}

#[async_trait]
impl SourceClient for AirQualityClient {
    fn kind(&self) -> SourceKind {
        SourceKind::AirQuality
    }

    async fn fetch(&self, location: &Location, timeout: Duration) -> SourceResult {
        if !self.enabled {
            return Err(SourceError::Unconfigured("air-quality network disabled".to_string()));
        }
        let key = configured_key(&self.api_key)
            .ok_or_else(|| SourceError::Unconfigured("OpenAQ API key missing".to_string()))?;

        let url = format!(
            "{}/v2/latest?coordinates={},{}&radius={}&limit=1",
            self.base_url, location.lat, location.lng, self.radius_m
        );
        let request = self.client.get(&url).header("X-API-Key", key);

        let response = send_with_deadline(request, timeout).await?;
        let data: LatestResponse = response.json().await.map_err(|e| body_error(e, timeout))?;

        Self::convert_response(data)
    }
}
