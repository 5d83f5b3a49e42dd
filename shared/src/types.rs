//! Common types used across the platform

use serde::{Deserialize, Serialize};
use validator::Validate;

/// A point on Earth supplied by the caller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct Location {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
}

impl Location {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            name: None,
        }
    }

    pub fn named(lat: f64, lng: f64, name: impl Into<String>) -> Self {
        Self {
            lat,
            lng,
            name: Some(name.into()),
        }
    }

    /// Copy of this location carrying the given display name
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            lat: self.lat,
            lng: self.lng,
            name: Some(name.into()),
        }
    }

    /// Coordinate label such as `40.71°N, 74.01°W`
    pub fn coordinate_label(&self) -> String {
        let ns = if self.lat >= 0.0 { 'N' } else { 'S' };
        let ew = if self.lng >= 0.0 { 'E' } else { 'W' };
        format!(
            "{:.2}°{}, {:.2}°{}",
            self.lat.abs(),
            ns,
            self.lng.abs(),
            ew
        )
    }

    /// Display name, falling back to the coordinate label
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.coordinate_label())
    }
}

/// Axis-aligned bounding box in degrees
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    /// Box of `half_width` degrees around a location, clipped to valid coordinates
    pub fn around(location: &Location, half_width: f64) -> Self {
        Self {
            west: (location.lng - half_width).max(-180.0),
            south: (location.lat - half_width).max(-90.0),
            east: (location.lng + half_width).min(180.0),
            north: (location.lat + half_width).min(90.0),
        }
    }
}
