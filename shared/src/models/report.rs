//! Report models returned to the presentation layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::EnvironmentalSnapshot;
use crate::types::Location;

/// Coarse data quality grade
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum QualityGrade {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl std::fmt::Display for QualityGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualityGrade::Excellent => write!(f, "excellent"),
            QualityGrade::Good => write!(f, "good"),
            QualityGrade::Fair => write!(f, "fair"),
            QualityGrade::Poor => write!(f, "poor"),
        }
    }
}

/// Grade a fraction of passing checks
pub fn classify_quality(pass_ratio: f64) -> QualityGrade {
    match pass_ratio {
        r if r >= 0.9 => QualityGrade::Excellent,
        r if r >= 0.7 => QualityGrade::Good,
        r if r >= 0.5 => QualityGrade::Fair,
        _ => QualityGrade::Poor,
    }
}

/// The generated narrative fields of a report
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InsightTask {
    FutureTrend,
    CropRecommendation,
    RiskAssessment,
    Explanation,
    Mitigation,
    HealthAdvisory,
}

impl InsightTask {
    pub const ALL: [InsightTask; 6] = [
        InsightTask::FutureTrend,
        InsightTask::CropRecommendation,
        InsightTask::RiskAssessment,
        InsightTask::Explanation,
        InsightTask::Mitigation,
        InsightTask::HealthAdvisory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InsightTask::FutureTrend => "future_trend",
            InsightTask::CropRecommendation => "crop_recommendation",
            InsightTask::RiskAssessment => "risk_assessment",
            InsightTask::Explanation => "explanation",
            InsightTask::Mitigation => "mitigation",
            InsightTask::HealthAdvisory => "health_advisory",
        }
    }

    /// Human label used in fallback sentences
    pub fn label(&self) -> &'static str {
        match self {
            InsightTask::FutureTrend => "Future trend prediction",
            InsightTask::CropRecommendation => "Crop recommendation",
            InsightTask::RiskAssessment => "Risk assessment",
            InsightTask::Explanation => "Plain-language explanation",
            InsightTask::Mitigation => "Mitigation guidance",
            InsightTask::HealthAdvisory => "Health advisory",
        }
    }
}

impl std::fmt::Display for InsightTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Six generated text fields
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub future_trend: String,
    pub crop_recommendation: String,
    pub risk_assessment: String,
    pub explanation: String,
    pub mitigation: String,
    pub health_advisory: String,
}

impl Insights {
    pub fn get(&self, task: InsightTask) -> &str {
        match task {
            InsightTask::FutureTrend => &self.future_trend,
            InsightTask::CropRecommendation => &self.crop_recommendation,
            InsightTask::RiskAssessment => &self.risk_assessment,
            InsightTask::Explanation => &self.explanation,
            InsightTask::Mitigation => &self.mitigation,
            InsightTask::HealthAdvisory => &self.health_advisory,
        }
    }

    /// Build from a per-task lookup; every task must resolve to text
    pub fn from_fn(mut text_for: impl FnMut(InsightTask) -> String) -> Self {
        Self {
            future_trend: text_for(InsightTask::FutureTrend),
            crop_recommendation: text_for(InsightTask::CropRecommendation),
            risk_assessment: text_for(InsightTask::RiskAssessment),
            explanation: text_for(InsightTask::Explanation),
            mitigation: text_for(InsightTask::Mitigation),
            health_advisory: text_for(InsightTask::HealthAdvisory),
        }
    }
}

/// How a task's text was produced
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Generated,
    Fallback,
    Offline,
}

/// Per-task outcome trace
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskTrace {
    pub task: InsightTask,
    pub status: TaskStatus,
    pub attempts: u32,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub report_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub latency_ms: u64,
    pub data_quality: QualityGrade,
    pub cacheable: bool,
    pub degraded_tasks: Vec<InsightTask>,
    pub trace: Vec<TaskTrace>,
}

/// Everything the presentation layer renders for one location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub location: Location,
    #[serde(flatten)]
    pub snapshot: EnvironmentalSnapshot,
    /// Deterministic narrative computed from the snapshot alone
    pub summary: String,
    pub insights: Insights,
    pub metadata: ReportMetadata,
}

impl Report {
    pub fn is_degraded(&self) -> bool {
        !self.metadata.degraded_tasks.is_empty()
    }
}
