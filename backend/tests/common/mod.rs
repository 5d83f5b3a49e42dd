//! Fixtures shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use geoinsight_backend::external::{
    GenerationError, GenerationOutcome, GenerationRequest, PartialFields, SourceClient,
    SourceError, SourceKind, SourceReading, SourceResult, TextGenerator,
};
use shared::{
    AirQuality, DataSources, EnvironmentalSnapshot, Fire, FireRisk, ForecastDay, InsightTask,
    Insights, Location, Provenance, QualityGrade, Report, ReportMetadata, Soil, Vegetation, Water,
    Weather,
};
use tracing_subscriber::fmt::writer::MakeWriter;
use uuid::Uuid;

pub fn nyc() -> Location {
    Location::named(40.7128, -74.0060, "New York, USA")
}

pub fn snapshot(last_updated: DateTime<Utc>) -> EnvironmentalSnapshot {
    let forecast = ["Mon", "Tue", "Wed", "Thu", "Fri"]
        .iter()
        .map(|day| ForecastDay {
            day: day.to_string(),
            temp_c: 22.0,
            max_c: 26.0,
            min_c: 18.0,
            condition: "Sunny".to_string(),
        })
        .collect();

    EnvironmentalSnapshot {
        air_quality: AirQuality {
            aerosol_index: 0.4,
            co: 0.6,
        },
        soil: Soil {
            moisture: 0.35,
            temperature: 19.5,
            ph: 6.5,
            nitrogen: 30.0,
            phosphorus: 20.0,
            potassium: 150.0,
        },
        fire: Fire {
            active_fires: 0,
            fire_risk: FireRisk::Low,
        },
        water: Water {
            surface_water_fraction: 0.2,
            precipitation_mm: 3.0,
        },
        weather: Weather {
            current_temp_c: 22.0,
            forecast,
        },
        vegetation: Vegetation { ndvi: 0.45 },
        last_updated,
        sources: DataSources::all(Provenance::Partial),
    }
}

/// A report as the orchestrator would assemble it
pub fn report(location: &Location, grade: QualityGrade, cacheable: bool) -> Report {
    Report {
        location: location.clone(),
        snapshot: snapshot(Utc::now()),
        summary: "summary".to_string(),
        insights: Insights::from_fn(|task| format!("Generated {}", task)),
        metadata: ReportMetadata {
            report_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            latency_ms: 12,
            data_quality: grade,
            cacheable,
            degraded_tasks: Vec::new(),
            trace: Vec::new(),
        },
    }
}

// ============================================================================
// Fake Source Clients
// ============================================================================

/// Source client answering with a fixed result after an optional delay
pub struct FakeSource {
    kind: SourceKind,
    result: SourceResult,
    delay: Duration,
    calls: AtomicU32,
}

impl FakeSource {
    pub fn ok(kind: SourceKind, fields: PartialFields, observed_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            result: Ok(SourceReading::new(kind, fields).observed_at(Some(observed_at))),
            delay: Duration::ZERO,
            calls: AtomicU32::new(0),
        }
    }

    pub fn failing(kind: SourceKind, error: SourceError) -> Self {
        Self {
            kind,
            result: Err(error),
            delay: Duration::ZERO,
            calls: AtomicU32::new(0),
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceClient for FakeSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self, _location: &Location, _timeout: Duration) -> SourceResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.result.clone()
    }
}

/// Climate, fire and air-quality readings that together grade excellent
pub fn healthy_sources(observed_at: DateTime<Utc>) -> Vec<FakeSource> {
    vec![
        FakeSource::ok(
            SourceKind::Climate,
            PartialFields {
                current_temp_c: Some(18.5),
                precipitation_mm: Some(2.4),
                soil_moisture: Some(0.42),
                soil_temperature_c: Some(16.0),
                ..Default::default()
            },
            observed_at,
        ),
        FakeSource::ok(
            SourceKind::Fire,
            PartialFields {
                active_fires: Some(0),
                ..Default::default()
            },
            observed_at,
        ),
        FakeSource::ok(
            SourceKind::AirQuality,
            PartialFields {
                aerosol_index: Some(0.3),
                co_ppm: Some(0.4),
                ..Default::default()
            },
            observed_at,
        ),
    ]
}

pub fn unavailable_sources() -> Vec<FakeSource> {
    vec![
        FakeSource::failing(SourceKind::Climate, SourceError::Timeout(Duration::from_secs(8))),
        FakeSource::failing(
            SourceKind::Fire,
            SourceError::Unconfigured("FIRMS map key missing".to_string()),
        ),
        FakeSource::failing(
            SourceKind::AirQuality,
            SourceError::Status {
                status: 503,
                body: "unavailable".to_string(),
            },
        ),
    ]
}

// ============================================================================
// Fake Text Generator
// ============================================================================

/// Per-task behavior of the fake generator
#[derive(Clone)]
pub enum Behavior {
    Succeed,
    Fail(GenerationError),
    Delay(Duration),
    /// Fail this many times with a retryable error, then succeed
    Flaky(u32),
}

/// Text backend keyed by task with a call counter
pub struct FakeGenerator {
    behaviors: HashMap<&'static str, Behavior>,
    calls: AtomicU32,
    flaky_calls: AtomicU32,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self {
            behaviors: HashMap::new(),
            calls: AtomicU32::new(0),
            flaky_calls: AtomicU32::new(0),
        }
    }

    pub fn with(mut self, task: InsightTask, behavior: Behavior) -> Self {
        self.behaviors.insert(task.as_str(), behavior);
        self
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn generated_text(task: InsightTask) -> String {
    format!("Generated insight for {}", task)
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    fn id(&self) -> &str {
        "fake"
    }

    async fn generate(&self, request: &GenerationRequest) -> GenerationOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let task = InsightTask::ALL
            .into_iter()
            .find(|t| request.template_id.starts_with(t.as_str()))
            .ok_or_else(|| GenerationError::SchemaMismatch("unknown template".to_string()))?;

        match self.behaviors.get(task.as_str()).cloned().unwrap_or(Behavior::Succeed) {
            Behavior::Succeed => Ok(generated_text(task)),
            Behavior::Fail(error) => Err(error),
            Behavior::Delay(delay) => {
                tokio::time::sleep(delay).await;
                Ok(generated_text(task))
            }
            Behavior::Flaky(failures) => {
                if self.flaky_calls.fetch_add(1, Ordering::SeqCst) < failures {
                    Err(GenerationError::Provider {
                        status: Some(503),
                        message: "overloaded".to_string(),
                    })
                } else {
                    Ok(generated_text(task))
                }
            }
        }
    }
}

// ============================================================================
// Log Capture
// ============================================================================

/// Collects formatted log lines so tests can assert on emitted events
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Install as the thread-local subscriber for warnings and above
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
