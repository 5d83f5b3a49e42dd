//! HTTP handlers for the GeoInsight API

pub mod geocode;
pub mod health;
pub mod location;

pub use geocode::*;
pub use health::*;
pub use location::*;
