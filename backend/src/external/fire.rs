//! Active-fire detection client
//!
//! Counts satellite fire detections from the NASA FIRMS area API inside a
//! bounding box around the location.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use reqwest::Client;
use shared::{BoundingBox, Location};

use super::{
    body_error, configured_key, send_with_deadline, truncate, PartialFields, SourceClient,
    SourceError, SourceKind, SourceReading, SourceResult,
};
use crate::config::FireConfig;

/// NASA FIRMS client
#[derive(Clone)]
pub struct FireClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    enabled: bool,
    product: String,
    bbox_degrees: f64,
    day_range: u32,
}

impl FireClient {
    /// Create a new FireClient from configuration
    pub fn new(config: &FireConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            enabled: config.enabled,
            product: config.product.clone(),
            bbox_degrees: config.bbox_degrees.clamp(0.01, 5.0),
            day_range: config.day_range.clamp(1, 10),
        }
    }

    /// Create an enabled FireClient with custom base URL (for testing)
    pub fn with_base_url(api_key: Option<String>, base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
            enabled: true,
            product: "VIIRS_SNPP_NRT".to_string(),
            bbox_degrees: 0.5,
            day_range: 2,
        }
    }

    fn request_url(&self, key: &str, area: BoundingBox) -> String {
        format!(
            "{}/api/area/csv/{}/{}/{},{},{},{}/{}",
            self.base_url,
            key,
            self.product,
            area.west,
            area.south,
            area.east,
            area.north,
            self.day_range
        )
    }
}

/// Count detections in a FIRMS CSV body
///
/// FIRMS reports key and quota problems as plain text with a 200 status, so a
/// body without the expected header is malformed rather than "zero fires".
pub fn parse_detections(body: &str) -> SourceResult {
    let mut reader = csv::Reader::from_reader(body.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| SourceError::Malformed(e.to_string()))?
        .clone();
    let column = |name: &str| headers.iter().position(|h| h.trim() == name);

    if column("latitude").is_none() || column("longitude").is_none() {
        return Err(SourceError::Malformed(format!(
            "unexpected fire feed body: {}",
            truncate(body.trim(), 120)
        )));
    }
    let date_col = column("acq_date");
    let time_col = column("acq_time");

    let mut count: u32 = 0;
    let mut latest: Option<DateTime<Utc>> = None;

    for record in reader.records() {
        let record = record.map_err(|e| SourceError::Malformed(e.to_string()))?;
        count = count.saturating_add(1);

        let acquired = date_col
            .and_then(|i| record.get(i))
            .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
            .map(|date| {
                let time = time_col
                    .and_then(|i| record.get(i))
                    .and_then(|t| NaiveTime::parse_from_str(&format!("{:0>4}", t.trim()), "%H%M").ok())
                    .unwrap_or(NaiveTime::MIN);
                date.and_time(time).and_utc()
            });
        latest = latest.max(acquired);
    }

    let fields = PartialFields {
        active_fires: Some(count),
        ..Default::default()
    };
    Ok(SourceReading::new(SourceKind::Fire, fields).observed_at(latest))
}

#[async_trait]
impl SourceClient for FireClient {
    fn kind(&self) -> SourceKind {
        SourceKind::Fire
    }

    async fn fetch(&self, location: &Location, timeout: Duration) -> SourceResult {
        if !self.enabled {
            return Err(SourceError::Unconfigured("fire feed disabled".to_string()));
        }
        let key = configured_key(&self.api_key)
            .ok_or_else(|| SourceError::Unconfigured("FIRMS map key missing".to_string()))?;

        let url = self.request_url(key, BoundingBox::around(location, self.bbox_degrees));
        let response = send_with_deadline(self.client.get(&url), timeout).await?;
        let body = response.text().await.map_err(|e| body_error(e, timeout))?;

        parse_detections(&body)
    }
}
