//! Shared types and models for the GeoInsight platform
//!
//! This crate contains the data model passed between the acquisition and
//! insight stages, plus the pure validation and tiering rules both stages
//! rely on. It performs no I/O.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
