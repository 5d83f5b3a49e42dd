//! External API integrations
//!
//! Every environmental data provider implements [`SourceClient`]: one bounded
//! outbound call mapped into a partial record or a typed failure. Failures are
//! returned as values and never escape as errors past this boundary.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{RequestBuilder, Response};
use serde::Serialize;
use shared::Location;
use thiserror::Error;

pub mod air_quality;
pub mod climate;
pub mod fire;
pub mod generative;
pub mod geocoder;

pub use air_quality::AirQualityClient;
pub use climate::ClimateClient;
pub use fire::FireClient;
pub use generative::{
    GenerationError, GenerationOutcome, GenerationRequest, OpenAiCompatibleGenerator,
    TextGenerator, UnconfiguredGenerator,
};
pub use geocoder::GeocoderClient;

/// Which provider a reading came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Climate,
    Fire,
    AirQuality,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Climate => write!(f, "climate"),
            SourceKind::Fire => write!(f, "fire"),
            SourceKind::AirQuality => write!(f, "air_quality"),
        }
    }
}

/// One day of archived temperature observations
#[derive(Debug, Clone, PartialEq)]
pub struct DailyObservation {
    pub date: NaiveDate,
    pub max_c: f64,
    pub min_c: f64,
}

/// Fields a provider managed to supply; anything absent is filled later
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialFields {
    pub aerosol_index: Option<f64>,
    pub co_ppm: Option<f64>,
    pub soil_moisture: Option<f64>,
    pub soil_temperature_c: Option<f64>,
    pub precipitation_mm: Option<f64>,
    pub current_temp_c: Option<f64>,
    /// Oldest first
    pub daily_history: Vec<DailyObservation>,
    pub active_fires: Option<u32>,
}

/// Successful provider response
#[derive(Debug, Clone, PartialEq)]
pub struct SourceReading {
    pub source: SourceKind,
    /// Provider-reported observation time, when it has one
    pub observed_at: Option<DateTime<Utc>>,
    pub fields: PartialFields,
}

impl SourceReading {
    pub fn new(source: SourceKind, fields: PartialFields) -> Self {
        Self {
            source,
            observed_at: None,
            fields,
        }
    }

    pub fn observed_at(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.observed_at = at;
        self
    }
}

/// Reasons a provider call produced no usable data
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SourceError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("no data: {0}")]
    NoData(String),

    #[error("source disabled or unconfigured: {0}")]
    Unconfigured(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Outcome of one provider call
pub type SourceResult = Result<SourceReading, SourceError>;

/// A stateless environmental data provider
#[async_trait]
pub trait SourceClient: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Issue one outbound call bounded by `timeout`
    async fn fetch(&self, location: &Location, timeout: Duration) -> SourceResult;
}

/// Send a request under a deadline, mapping transport and status failures
pub(crate) async fn send_with_deadline(
    request: RequestBuilder,
    timeout: Duration,
) -> Result<Response, SourceError> {
    let response = request.timeout(timeout).send().await.map_err(|e| {
        if e.is_timeout() {
            SourceError::Timeout(timeout)
        } else {
            SourceError::Transport(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(SourceError::Status {
            status,
            body: truncate(&body, 200),
        });
    }

    Ok(response)
}

/// Map a body-read failure, keeping timeouts distinguishable
pub(crate) fn body_error(e: reqwest::Error, timeout: Duration) -> SourceError {
    if e.is_timeout() {
        SourceError::Timeout(timeout)
    } else {
        SourceError::Malformed(e.to_string())
    }
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Non-empty API key, if any
pub(crate) fn configured_key(key: &Option<String>) -> Option<&str> {
    key.as_deref().map(str::trim).filter(|k| !k.is_empty())
}
