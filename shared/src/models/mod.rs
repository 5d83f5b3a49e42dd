//! Domain models for the GeoInsight platform

mod report;
mod snapshot;

pub use report::*;
pub use snapshot::*;
