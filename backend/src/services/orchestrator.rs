//! Insight orchestrator
//!
//! Fans the snapshot out to every registered generator at once and waits for
//! all of them to settle. A failed task never aborts the others; it is
//! replaced by its fallback sentence and recorded in the report metadata.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use shared::{
    EnvironmentalSnapshot, InsightTask, Insights, Location, QualityGrade, Report, ReportMetadata,
    TaskStatus, TaskTrace,
};
use tokio::time::Instant;
use uuid::Uuid;

use super::insights::{self, InsightGenerator};
use crate::config::GenerationConfig;
use crate::external::{GenerationError, GenerationOutcome, TextGenerator};

/// Per-task deadline and retry budget
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub task_timeout: Duration,
    /// Extra attempts after a retryable failure
    pub retries: u32,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            task_timeout: Duration::from_secs(20),
            retries: 0,
        }
    }
}

impl From<&GenerationConfig> for OrchestratorSettings {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            task_timeout: config.timeout(),
            retries: config.retries,
        }
    }
}

/// Settled result of one task
#[derive(Debug)]
struct TaskRun {
    task: InsightTask,
    outcome: GenerationOutcome,
    attempts: u32,
    elapsed: Duration,
}

/// Fan-out/fan-in controller configured by its set of generators
#[derive(Debug, Clone)]
pub struct InsightOrchestrator {
    generators: Vec<InsightGenerator>,
    settings: OrchestratorSettings,
}

impl InsightOrchestrator {
    pub fn new(generators: Vec<InsightGenerator>, settings: OrchestratorSettings) -> Self {
        Self {
            generators,
            settings,
        }
    }

    /// One generator per insight task, all sharing `backend`
    pub fn standard(backend: Arc<dyn TextGenerator>, settings: OrchestratorSettings) -> Self {
        let generators = InsightTask::ALL
            .iter()
            .map(|task| InsightGenerator::new(*task, Arc::clone(&backend)))
            .collect();
        Self::new(generators, settings)
    }

    /// Run every registered task and assemble the report
    pub async fn orchestrate(
        &self,
        snapshot: &EnvironmentalSnapshot,
        location: &Location,
        grade: QualityGrade,
        started: Instant,
    ) -> Report {
        let runs = join_all(self.generators.iter().map(|generator| {
            let input = insights::project(generator.task(), snapshot, location);
            async move { self.run_task(generator, input).await }
        }))
        .await;

        let mut runs: HashMap<InsightTask, TaskRun> =
            runs.into_iter().map(|run| (run.task, run)).collect();

        let mut trace = Vec::with_capacity(InsightTask::ALL.len());
        let mut degraded = Vec::new();

        let insights = Insights::from_fn(|task| {
            let Some(run) = runs.remove(&task) else {
                tracing::warn!("No generator registered for {}, using fallback", task);
                degraded.push(task);
                trace.push(TaskTrace {
                    task,
                    status: TaskStatus::Fallback,
                    attempts: 0,
                    elapsed_ms: 0,
                    error: Some("no generator registered".to_string()),
                });
                return insights::fallback_text(task);
            };

            let elapsed_ms = run.elapsed.as_millis() as u64;
            match run.outcome {
                Ok(text) => {
                    trace.push(TaskTrace {
                        task,
                        status: TaskStatus::Generated,
                        attempts: run.attempts,
                        elapsed_ms,
                        error: None,
                    });
                    text
                }
                Err(e) => {
                    tracing::warn!(
                        "Insight task {} degraded after {} attempt(s): {}",
                        task,
                        run.attempts,
                        e
                    );
                    degraded.push(task);
                    trace.push(TaskTrace {
                        task,
                        status: TaskStatus::Fallback,
                        attempts: run.attempts,
                        elapsed_ms,
                        error: Some(e.to_string()),
                    });
                    insights::fallback_text(task)
                }
            }
        });

        let cacheable = grade != QualityGrade::Poor;
        build_report(snapshot, location, insights, grade, cacheable, degraded, trace, started)
    }

    /// Report for a request where no source responded; issues no generation calls
    pub fn offline_report(
        &self,
        snapshot: &EnvironmentalSnapshot,
        location: &Location,
        grade: QualityGrade,
        started: Instant,
    ) -> Report {
        let insights = Insights::from_fn(insights::offline_text);
        let trace = InsightTask::ALL
            .iter()
            .map(|task| TaskTrace {
                task: *task,
                status: TaskStatus::Offline,
                attempts: 0,
                elapsed_ms: 0,
                error: None,
            })
            .collect();

        build_report(
            snapshot,
            location,
            insights,
            grade,
            false,
            InsightTask::ALL.to_vec(),
            trace,
            started,
        )
    }

    /// Attempt a task until it succeeds, fails permanently, or exhausts retries
    async fn run_task(&self, generator: &InsightGenerator, input: insights::TaskInput) -> TaskRun {
        let started = Instant::now();
        let mut attempts = 0;

        let outcome = loop {
            attempts += 1;
            let result = match tokio::time::timeout(self.settings.task_timeout, generator.generate(&input)).await {
                Ok(Ok(text)) if text.trim().is_empty() => {
                    Err(GenerationError::SchemaMismatch("empty text".to_string()))
                }
                Ok(result) => result,
                Err(_) => Err(GenerationError::Timeout(self.settings.task_timeout)),
            };

            match result {
                Err(e) if e.is_retryable() && attempts <= self.settings.retries => {
                    tracing::debug!("Retrying {} after attempt {}: {}", generator.task(), attempts, e);
                }
                other => break other,
            }
        };

        TaskRun {
            task: generator.task(),
            outcome,
            attempts,
            elapsed: started.elapsed(),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn build_report(
    snapshot: &EnvironmentalSnapshot,
    location: &Location,
    insights: Insights,
    grade: QualityGrade,
    cacheable: bool,
    degraded_tasks: Vec<InsightTask>,
    trace: Vec<TaskTrace>,
    started: Instant,
) -> Report {
    Report {
        location: location.clone(),
        snapshot: snapshot.clone(),
        summary: insights::summary(snapshot, location),
        insights,
        metadata: ReportMetadata {
            report_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            latency_ms: started.elapsed().as_millis() as u64,
            data_quality: grade,
            cacheable,
            degraded_tasks,
            trace,
        },
    }
}
