//! Climate archive client
//!
//! Integrates with the NASA POWER daily point API for near-surface
//! temperature, precipitation and soil conditions. The archive lags real time
//! by a few days, so the most recent valid day is treated as "current".

use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use shared::{accept, Location, AIR_TEMPERATURE_C, PRECIPITATION_MM, SOIL_MOISTURE, SOIL_TEMPERATURE_C};

use super::{
    body_error, send_with_deadline, DailyObservation, PartialFields, SourceClient, SourceError,
    SourceKind, SourceReading, SourceResult,
};
use crate::config::ClimateConfig;

/// Provider value meaning "no data" when the payload omits its own
pub const DEFAULT_FILL_VALUE: f64 = -999.0;

const PARAMETERS: &str = "T2M,T2M_MAX,T2M_MIN,PRECTOTCORR,GWETTOP,TS";

/// NASA POWER client
#[derive(Clone)]
pub struct ClimateClient {
    client: Client,
    base_url: String,
    enabled: bool,
    history_days: i64,
}

/// NASA POWER daily point response
#[derive(Debug, Deserialize)]
struct PowerResponse {
    #[serde(default)]
    header: Option<PowerHeader>,
    properties: PowerProperties,
}

#[derive(Debug, Deserialize)]
struct PowerHeader {
    fill_value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PowerProperties {
    parameter: BTreeMap<String, BTreeMap<String, f64>>,
}

impl ClimateClient {
    /// Create a new ClimateClient from configuration
    pub fn new(config: &ClimateConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            enabled: config.enabled,
            history_days: config.history_days.clamp(1, 30),
        }
    }

    /// Create an enabled ClimateClient with custom base URL (for testing)
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            enabled: true,
            history_days: 10,
        }
    }

    fn request_url(&self, location: &Location, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{}/api/temporal/daily/point?parameters={}&community=AG&longitude={}&latitude={}&start={}&end={}&format=JSON",
            self.base_url,
            PARAMETERS,
            location.lng,
            location.lat,
            start.format("%Y%m%d"),
            end.format("%Y%m%d"),
        )
    }

    /// Convert a POWER response into a partial record
    fn convert_response(data: PowerResponse) -> SourceResult {
        let fill_value = data
            .header
            .and_then(|h| h.fill_value)
            .unwrap_or(DEFAULT_FILL_VALUE);
        let params = data.properties.parameter;

        let series = |name: &str, bounds: &RangeInclusive<f64>| -> BTreeMap<NaiveDate, f64> {
            params
                .get(name)
                .map(|values| {
                    values
                        .iter()
                        .filter(|(_, v)| !is_fill(**v, fill_value))
                        .filter_map(|(day, v)| {
                            let date = NaiveDate::parse_from_str(day, "%Y%m%d").ok()?;
                            Some((date, accept(*v, bounds)?))
                        })
                        .collect()
                })
                .unwrap_or_default()
        };

        let mean = series("T2M", &AIR_TEMPERATURE_C);
        let max = series("T2M_MAX", &AIR_TEMPERATURE_C);
        let min = series("T2M_MIN", &AIR_TEMPERATURE_C);
        let precipitation = series("PRECTOTCORR", &PRECIPITATION_MM);
        let soil_moisture = series("GWETTOP", &SOIL_MOISTURE);
        let soil_temperature = series("TS", &SOIL_TEMPERATURE_C);

        let latest = |s: &BTreeMap<NaiveDate, f64>| s.values().next_back().copied();

        let daily_history: Vec<DailyObservation> = max
            .iter()
            .filter_map(|(date, max_c)| {
                let min_c = *min.get(date)?;
                (min_c <= *max_c).then(|| DailyObservation {
                    date: *date,
                    max_c: *max_c,
                    min_c,
                })
            })
            .collect();

        let fields = PartialFields {
            current_temp_c: latest(&mean),
            precipitation_mm: latest(&precipitation),
            soil_moisture: latest(&soil_moisture),
            soil_temperature_c: latest(&soil_temperature),
            daily_history,
            ..Default::default()
        };

        let observed = [&mean, &precipitation, &soil_moisture, &soil_temperature]
            .iter()
            .filter_map(|s| s.keys().next_back().copied())
            .max();

        match observed {
            Some(date) => Ok(SourceReading::new(SourceKind::Climate, fields)
                .observed_at(date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()))),
            None => Err(SourceError::NoData(
                "climate archive returned only fill values".to_string(),
            )),
        }
    }
}

/// Fill values are matched exactly; anything at or below -990 is also a sentinel
fn is_fill(value: f64, fill_value: f64) -> bool {
    value == fill_value || value <= -990.0
}

#[async_trait]
impl SourceClient for ClimateClient {
    fn kind(&self) -> SourceKind {
        SourceKind::Climate
    }

    async fn fetch(&self, location: &Location, timeout: Duration) -> SourceResult {
        if !self.enabled {
            return Err(SourceError::Unconfigured("climate archive disabled".to_string()));
        }

        let end = Utc::now().date_naive() - ChronoDuration::days(1);
        let start = end - ChronoDuration::days(self.history_days - 1);
        let url = self.request_url(location, start, end);

        let response = send_with_deadline(self.client.get(&url), timeout).await?;
        let data: PowerResponse = response.json().await.map_err(|e| body_error(e, timeout))?;

        Self::convert_response(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: serde_json::Value) -> PowerResponse {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_fill_values_are_absent() {
        let data = response(serde_json::json!({
            "header": { "fill_value": -999.0 },
            "properties": { "parameter": {
                "T2M": { "20240101": 12.5, "20240102": -999.0 },
                "GWETTOP": { "20240101": -999.0, "20240102": -999.0 },
                "PRECTOTCORR": { "20240101": 0.0, "20240102": 3.25 }
            }}
        }));

        let reading = ClimateClient::convert_response(data).unwrap();
        assert_eq!(reading.fields.current_temp_c, Some(12.5));
        assert_eq!(reading.fields.soil_moisture, None);
        assert_eq!(reading.fields.precipitation_mm, Some(3.25));
        assert_eq!(
            reading.observed_at.unwrap().date_naive(),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
    }

    #[test]
    fn test_history_requires_ordered_pairs() {
        let data = response(serde_json::json!({
            "properties": { "parameter": {
                "T2M": { "20240101": 10.0 },
                "T2M_MAX": { "20240101": 15.0, "20240102": 4.0 },
                "T2M_MIN": { "20240101": 5.0, "20240102": 9.0 }
            }}
        }));

        let reading = ClimateClient::convert_response(data).unwrap();
        assert_eq!(reading.fields.daily_history.len(), 1);
        assert_eq!(reading.fields.daily_history[0].max_c, 15.0);
    }

    #[test]
    fn test_all_fill_is_no_data() {
        let data = response(serde_json::json!({
            "properties": { "parameter": { "T2M": { "20240101": -999.0 } } }
        }));

        assert!(matches!(
            ClimateClient::convert_response(data),
            Err(SourceError::NoData(_))
        ));
    }
}
