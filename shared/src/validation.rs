//! Validation utilities for the GeoInsight platform
//!
//! Declared bounds for every snapshot field, the location precondition, and
//! the fixed tiering rules shared by synthesis and scoring.

use std::ops::RangeInclusive;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;
use validator::Validate;

use crate::models::{EnvironmentalSnapshot, FireRisk, Weather};
use crate::types::Location;

// ============================================================================
// Declared Bounds
// ============================================================================

pub const SOIL_MOISTURE: RangeInclusive<f64> = 0.0..=1.0;
pub const SOIL_TEMPERATURE_C: RangeInclusive<f64> = -50.0..=60.0;
pub const SOIL_PH: RangeInclusive<f64> = 0.0..=14.0;
pub const NUTRIENT_MG_KG: RangeInclusive<f64> = 0.0..=f64::MAX;
pub const AEROSOL_INDEX: RangeInclusive<f64> = 0.0..=f64::MAX;
pub const CO_PPM: RangeInclusive<f64> = 0.0..=f64::MAX;
pub const SURFACE_WATER_FRACTION: RangeInclusive<f64> = 0.0..=1.0;
pub const PRECIPITATION_MM: RangeInclusive<f64> = 0.0..=f64::MAX;
pub const AIR_TEMPERATURE_C: RangeInclusive<f64> = -60.0..=60.0;
pub const NDVI: RangeInclusive<f64> = -1.0..=1.0;

/// Number of days in every forecast
pub const FORECAST_DAYS: usize = 5;

/// Decimal digits kept on every synthesized numeric field
pub const FIELD_PRECISION: u32 = 2;

/// Accept a provider value only if it is finite and inside its bounds
pub fn accept(value: f64, bounds: &RangeInclusive<f64>) -> Option<f64> {
    (value.is_finite() && bounds.contains(&value)).then_some(value)
}

/// Clamp into bounds; non-finite input collapses to the lower bound
pub fn clamp_to(value: f64, bounds: &RangeInclusive<f64>) -> f64 {
    if !value.is_finite() {
        return *bounds.start();
    }
    value.clamp(*bounds.start(), *bounds.end())
}

/// Round to `dp` decimal digits, half away from zero
pub fn round_to(value: f64, dp: u32) -> f64 {
    Decimal::from_f64_retain(value)
        .map(|d| d.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}

/// Clamp then round to the field precision
pub fn bounded(value: f64, bounds: &RangeInclusive<f64>) -> f64 {
    clamp_to(round_to(clamp_to(value, bounds), FIELD_PRECISION), bounds)
}

// ============================================================================
// Location
// ============================================================================

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LocationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}

impl LocationError {
    pub fn field(&self) -> &str {
        match self {
            LocationError::InvalidField { field, .. } => field,
        }
    }
}

/// Reject out-of-range or non-finite coordinates and oversize names
pub fn validate_location(location: &Location) -> Result<(), LocationError> {
    if !location.lat.is_finite() {
        return Err(LocationError::InvalidField {
            field: "lat".to_string(),
            message: "Latitude must be a finite number".to_string(),
        });
    }
    if !location.lng.is_finite() {
        return Err(LocationError::InvalidField {
            field: "lng".to_string(),
            message: "Longitude must be a finite number".to_string(),
        });
    }

    location.validate().map_err(|errors| {
        let (field, message) = errors
            .field_errors()
            .into_iter()
            .next()
            .map(|(field, errs)| {
                let message = match field {
                    "lat" => "Latitude must be between -90 and 90".to_string(),
                    "lng" => "Longitude must be between -180 and 180".to_string(),
                    "name" => "Name must be between 1 and 200 characters".to_string(),
                    _ => errs
                        .first()
                        .map(|e| e.code.to_string())
                        .unwrap_or_else(|| "invalid".to_string()),
                };
                (field.to_string(), message)
            })
            .unwrap_or_else(|| ("location".to_string(), "Invalid location".to_string()));
        LocationError::InvalidField { field, message }
    })
}

// ============================================================================
// Tiering
// ============================================================================

/// Fire risk tier from the active-fire count
pub fn fire_risk_for_count(active_fires: u32) -> FireRisk {
    match active_fires {
        0 => FireRisk::Low,
        1..=5 => FireRisk::Medium,
        6..=10 => FireRisk::High,
        _ => FireRisk::VeryHigh,
    }
}

/// Category of an aerosol index reading
pub fn aerosol_category(aerosol_index: f64) -> &'static str {
    match aerosol_index {
        a if a < 0.5 => "clean",
        a if a < 1.0 => "moderate",
        a if a < 2.0 => "hazy",
        _ => "heavily polluted",
    }
}

/// Category of a vegetation index reading
pub fn vegetation_category(ndvi: f64) -> &'static str {
    match ndvi {
        v if v < 0.1 => "barren",
        v if v < 0.3 => "sparse vegetation",
        v if v < 0.6 => "moderate vegetation",
        _ => "dense vegetation",
    }
}

/// Category of a soil moisture fraction
pub fn moisture_category(moisture: f64) -> &'static str {
    match moisture {
        m if m < 0.2 => "dry",
        m if m < 0.4 => "moderate",
        m if m < 0.7 => "moist",
        _ => "saturated",
    }
}

// ============================================================================
// Snapshot Audit
// ============================================================================

/// Forecast has the full day count and each day satisfies min <= temp <= max
pub fn forecast_is_consistent(weather: &Weather) -> bool {
    weather.forecast.len() == FORECAST_DAYS
        && weather.forecast.iter().all(|day| {
            day.min_c <= day.temp_c
                && day.temp_c <= day.max_c
                && AIR_TEMPERATURE_C.contains(&day.min_c)
                && AIR_TEMPERATURE_C.contains(&day.max_c)
                && !day.day.is_empty()
                && !day.condition.is_empty()
        })
}

/// Names of every field outside its declared bounds
pub fn snapshot_violations(snapshot: &EnvironmentalSnapshot) -> Vec<&'static str> {
    let checks: [(&'static str, f64, &RangeInclusive<f64>); 12] = [
        ("airQuality.aerosolIndex", snapshot.air_quality.aerosol_index, &AEROSOL_INDEX),
        ("airQuality.co", snapshot.air_quality.co, &CO_PPM),
        ("soil.moisture", snapshot.soil.moisture, &SOIL_MOISTURE),
        ("soil.temperature", snapshot.soil.temperature, &SOIL_TEMPERATURE_C),
        ("soil.ph", snapshot.soil.ph, &SOIL_PH),
        ("soil.nitrogen", snapshot.soil.nitrogen, &NUTRIENT_MG_KG),
        ("soil.phosphorus", snapshot.soil.phosphorus, &NUTRIENT_MG_KG),
        ("soil.potassium", snapshot.soil.potassium, &NUTRIENT_MG_KG),
        ("water.surfaceWaterFraction", snapshot.water.surface_water_fraction, &SURFACE_WATER_FRACTION),
        ("water.precipitationMm", snapshot.water.precipitation_mm, &PRECIPITATION_MM),
        ("weather.currentTempC", snapshot.weather.current_temp_c, &AIR_TEMPERATURE_C),
        ("vegetation.ndvi", snapshot.vegetation.ndvi, &NDVI),
    ];

    let mut violations: Vec<&'static str> = checks
        .iter()
        .filter(|(_, value, bounds)| accept(*value, bounds).is_none())
        .map(|(name, _, _)| *name)
        .collect();

    if !forecast_is_consistent(&snapshot.weather) {
        violations.push("weather.forecast");
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Location Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_location_valid() {
        assert!(validate_location(&Location::new(40.7128, -74.0060)).is_ok());
        assert!(validate_location(&Location::new(90.0, 180.0)).is_ok());
        assert!(validate_location(&Location::new(-90.0, -180.0)).is_ok());
        assert!(validate_location(&Location::named(0.0, 0.0, "Null Island")).is_ok());
    }

    #[test]
    fn test_validate_location_out_of_range() {
        let err = validate_location(&Location::new(90.01, 0.0)).unwrap_err();
        assert_eq!(err.field(), "lat");

        let err = validate_location(&Location::new(0.0, -180.5)).unwrap_err();
        assert_eq!(err.field(), "lng");
    }

    #[test]
    fn test_validate_location_non_finite() {
        assert_eq!(
            validate_location(&Location::new(f64::NAN, 0.0)).unwrap_err().field(),
            "lat"
        );
        assert_eq!(
            validate_location(&Location::new(0.0, f64::INFINITY)).unwrap_err().field(),
            "lng"
        );
    }

    #[test]
    fn test_validate_location_empty_name() {
        let err = validate_location(&Location::named(1.0, 1.0, "")).unwrap_err();
        assert_eq!(err.field(), "name");
    }

    // ========================================================================
    // Tiering Tests
    // ========================================================================

    #[test]
    fn test_fire_risk_thresholds() {
        assert_eq!(fire_risk_for_count(0), FireRisk::Low);
        assert_eq!(fire_risk_for_count(1), FireRisk::Medium);
        assert_eq!(fire_risk_for_count(5), FireRisk::Medium);
        assert_eq!(fire_risk_for_count(6), FireRisk::High);
        assert_eq!(fire_risk_for_count(10), FireRisk::High);
        assert_eq!(fire_risk_for_count(11), FireRisk::VeryHigh);
        assert_eq!(fire_risk_for_count(u32::MAX), FireRisk::VeryHigh);
    }

    #[test]
    fn test_categories() {
        assert_eq!(aerosol_category(0.2), "clean");
        assert_eq!(aerosol_category(2.5), "heavily polluted");
        assert_eq!(vegetation_category(-0.2), "barren");
        assert_eq!(vegetation_category(0.75), "dense vegetation");
        assert_eq!(moisture_category(0.05), "dry");
        assert_eq!(moisture_category(0.9), "saturated");
    }

    // ========================================================================
    // Numeric Helper Tests
    // ========================================================================

    #[test]
    fn test_accept_rejects_sentinels_and_out_of_range() {
        assert_eq!(accept(0.35, &SOIL_MOISTURE), Some(0.35));
        assert_eq!(accept(-999.0, &SOIL_MOISTURE), None);
        assert_eq!(accept(f64::NAN, &NDVI), None);
        assert_eq!(accept(1.5, &NDVI), None);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(-0.125, 2), -0.13);
        assert_eq!(round_to(59.999, 2), 60.0);
    }

    #[test]
    fn test_bounded_stays_inside() {
        assert_eq!(bounded(1.004, &SOIL_MOISTURE), 1.0);
        assert_eq!(bounded(-3.0, &SOIL_MOISTURE), 0.0);
        assert_eq!(bounded(f64::NAN, &NDVI), -1.0);
        assert_eq!(bounded(60.004, &AIR_TEMPERATURE_C), 60.0);
    }

    #[test]
    fn test_rounding_keeps_values_beyond_decimal_range() {
        assert_eq!(round_to(1e29, 2), 1e29);
        assert_eq!(bounded(1e29, &AEROSOL_INDEX), 1e29);
        assert_eq!(bounded(2.5e30, &PRECIPITATION_MM), 2.5e30);
    }
}
