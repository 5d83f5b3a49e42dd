//! Pipeline services for the GeoInsight platform

pub mod acquisition;
pub mod cache;
pub mod insights;
pub mod location;
pub mod orchestrator;
pub mod quality;
pub mod synthesis;

pub use acquisition::AcquisitionService;
pub use cache::{CacheKey, ResponseCache};
pub use insights::{InsightGenerator, TaskInput};
pub use location::{LocationDataService, PipelineSettings};
pub use orchestrator::{InsightOrchestrator, OrchestratorSettings};
pub use quality::{DataQualityScorer, QualityCheck};
pub use synthesis::DataSynthesizer;
