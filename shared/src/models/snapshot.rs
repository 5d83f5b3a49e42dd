//! Environmental snapshot models
//!
//! A snapshot is the complete, bounds-checked record for one location at one
//! point in time. Every numeric field is present once it leaves synthesis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Complete environmental record handed from acquisition to the insight stage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentalSnapshot {
    pub air_quality: AirQuality,
    pub soil: Soil,
    pub fire: Fire,
    pub water: Water,
    pub weather: Weather,
    pub vegetation: Vegetation,
    pub last_updated: DateTime<Utc>,
    /// Where each sub-record came from
    pub sources: DataSources,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AirQuality {
    pub aerosol_index: f64,
    /// Carbon monoxide in ppm
    pub co: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Soil {
    /// Volumetric fraction, 0-1
    pub moisture: f64,
    pub temperature: f64,
    pub ph: f64,
    /// mg/kg
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Fire {
    pub active_fires: u32,
    pub fire_risk: FireRisk,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Water {
    pub surface_water_fraction: f64,
    pub precipitation_mm: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Weather {
    pub current_temp_c: f64,
    /// Exactly [`FORECAST_DAYS`](crate::FORECAST_DAYS) entries, nearest day first
    pub forecast: Vec<ForecastDay>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ForecastDay {
    /// Short weekday label, e.g. "Mon"
    pub day: String,
    pub temp_c: f64,
    pub max_c: f64,
    pub min_c: f64,
    pub condition: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Vegetation {
    pub ndvi: f64,
}

/// Fire risk tier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum FireRisk {
    Unknown,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl FireRisk {
    pub fn as_str(&self) -> &'static str {
        match self {
            FireRisk::Unknown => "unknown",
            FireRisk::Low => "low",
            FireRisk::Medium => "medium",
            FireRisk::High => "high",
            FireRisk::VeryHigh => "very-high",
        }
    }
}

impl std::fmt::Display for FireRisk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a sub-record was obtained
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Every provider-backed field came from a provider
    Measured,
    /// Some fields measured, the rest filled or derived
    Partial,
    /// Nothing measured; heuristic placeholders only
    Synthesized,
}

impl Provenance {
    pub fn is_synthesized(&self) -> bool {
        matches!(self, Provenance::Synthesized)
    }

    /// Provenance of a record given how many of its driving fields were measured
    pub fn from_counts(measured: usize, total: usize) -> Self {
        match measured {
            0 => Provenance::Synthesized,
            n if n >= total => Provenance::Measured,
            _ => Provenance::Partial,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataSources {
    pub air_quality: Provenance,
    pub soil: Provenance,
    pub fire: Provenance,
    pub water: Provenance,
    pub weather: Provenance,
    pub vegetation: Provenance,
}

impl DataSources {
    pub fn all(provenance: Provenance) -> Self {
        Self {
            air_quality: provenance,
            soil: provenance,
            fire: provenance,
            water: provenance,
            weather: provenance,
            vegetation: provenance,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Provenance)> {
        [
            ("airQuality", self.air_quality),
            ("soil", self.soil),
            ("fire", self.fire),
            ("water", self.water),
            ("weather", self.weather),
            ("vegetation", self.vegetation),
        ]
        .into_iter()
    }
}
