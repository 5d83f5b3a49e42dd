//! Location data service
//!
//! The single entry point the presentation layer calls. Validates the
//! location, acquires and synthesizes a snapshot, grades it, and either
//! serves a cached report or orchestrates a fresh one.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use shared::{snapshot_violations, validate_location, Location, Report};
use tokio::time::Instant;

use super::acquisition::AcquisitionService;
use super::cache::{CacheKey, ResponseCache};
use super::insights;
use super::orchestrator::{InsightOrchestrator, OrchestratorSettings};
use super::quality::DataQualityScorer;
use super::synthesis::DataSynthesizer;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::external::{GeocoderClient, OpenAiCompatibleGenerator, TextGenerator, UnconfiguredGenerator};

/// Request-level knobs
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Requests slower than this are logged, never aborted
    pub soft_deadline: Duration,
    pub coordinate_precision: u32,
    pub max_data_age_hours: i64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            soft_deadline: Duration::from_secs(15),
            coordinate_precision: 3,
            max_data_age_hours: 24,
        }
    }
}

pub struct LocationDataService {
    acquisition: AcquisitionService,
    geocoder: Option<GeocoderClient>,
    synthesizer: DataSynthesizer,
    scorer: DataQualityScorer,
    cache: Arc<ResponseCache>,
    orchestrator: InsightOrchestrator,
    settings: PipelineSettings,
}

impl LocationDataService {
    pub fn new(
        acquisition: AcquisitionService,
        orchestrator: InsightOrchestrator,
        cache: Arc<ResponseCache>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            acquisition,
            geocoder: None,
            synthesizer: DataSynthesizer::new(),
            scorer: DataQualityScorer::new(settings.max_data_age_hours),
            cache,
            orchestrator,
            settings,
        }
    }

    /// Resolve missing display names through a reverse geocoder
    pub fn with_geocoder(mut self, geocoder: GeocoderClient) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    /// Wire real providers and the configured generation backend
    pub fn from_config(config: &Config, cache: Arc<ResponseCache>) -> Self {
        let backend: Arc<dyn TextGenerator> = if config.generation.is_configured() {
            Arc::new(OpenAiCompatibleGenerator::new(&config.generation))
        } else {
            tracing::warn!("No generation endpoint configured, insights will use fallback text");
            Arc::new(UnconfiguredGenerator)
        };

        let settings = PipelineSettings {
            soft_deadline: config.pipeline.soft_deadline(),
            coordinate_precision: config.cache.coordinate_precision,
            max_data_age_hours: config.pipeline.max_data_age_hours,
        };

        Self::new(
            AcquisitionService::from_config(&config.sources),
            InsightOrchestrator::standard(backend, OrchestratorSettings::from(&config.generation)),
            cache,
            settings,
        )
        .with_geocoder(GeocoderClient::new(
            &config.sources.geocoder,
            config.sources.timeout(),
        ))
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Build the report for a location; only invalid input or a broken snapshot fail
    pub async fn get_location_data(&self, location: Location) -> AppResult<Report> {
        let started = Instant::now();
        let result = self.assemble(&location, started).await;

        let elapsed = started.elapsed();
        if elapsed > self.settings.soft_deadline {
            let label = match &result {
                Ok(report) => report.location.display_name(),
                Err(_) => location.display_name(),
            };
            tracing::warn!(
                "Request for {} took {:?}, over the {:?} soft deadline",
                label,
                elapsed,
                self.settings.soft_deadline
            );
        }

        result
    }

    async fn assemble(&self, location: &Location, started: Instant) -> AppResult<Report> {
        validate_location(location)?;

        let (results, location) = tokio::join!(
            self.acquisition.acquire(location),
            self.resolve_name(location)
        );

        let now = Utc::now();
        let snapshot = self.synthesizer.synthesize(&location, &results, now);

        let violations = snapshot_violations(&snapshot);
        if !violations.is_empty() {
            return Err(AppError::AcquisitionFailed(format!(
                "snapshot out of bounds: {}",
                violations.join(", ")
            )));
        }

        let grade = self.scorer.score(&snapshot, now);
        let all_failed = AcquisitionService::all_failed(&results);
        let key = CacheKey::new(&location, snapshot.last_updated, self.settings.coordinate_precision);

        if !all_failed {
            if let Some(mut report) = self.cache.get(&key).await {
                tracing::debug!("Cache hit for {}", key);
                if report.location.name != location.name {
                    report.summary = insights::summary(&report.snapshot, &location);
                    report.location = location;
                }
                return Ok(report);
            }
            tracing::debug!("Cache miss for {}", key);
        }

        let report = if all_failed {
            tracing::warn!(
                "All {} sources failed for {}, returning offline report",
                results.len(),
                location.display_name()
            );
            self.orchestrator.offline_report(&snapshot, &location, grade, started)
        } else {
            self.orchestrator
                .orchestrate(&snapshot, &location, grade, started)
                .await
        };

        if report.metadata.cacheable && self.cache.put(key.clone(), report.clone()).await {
            tracing::debug!("Cached report for {}", key);
        }

        Ok(report)
    }

    async fn resolve_name(&self, location: &Location) -> Location {
        if location.name.is_some() {
            return location.clone();
        }

        let resolved = match &self.geocoder {
            Some(geocoder) => geocoder.reverse(location).await,
            None => None,
        };
        location.with_name(resolved.unwrap_or_else(|| location.coordinate_label()))
    }
}
