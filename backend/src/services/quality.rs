//! Data quality scoring
//!
//! Pure grading of a snapshot against a fixed battery of checks. The grade is
//! derived from the snapshot it was computed on and is never stored apart
//! from it.

use chrono::{DateTime, Duration, Utc};
use shared::{
    classify_quality, forecast_is_consistent, snapshot_violations, EnvironmentalSnapshot,
    FireRisk, QualityGrade,
};

/// Result of one validity check
#[derive(Debug, Clone, PartialEq)]
pub struct QualityCheck {
    pub name: &'static str,
    pub passed: bool,
}

/// Grades snapshots by the fraction of checks they pass
#[derive(Debug, Clone)]
pub struct DataQualityScorer {
    max_age: Duration,
}

impl Default for DataQualityScorer {
    fn default() -> Self {
        Self::new(24)
    }
}

impl DataQualityScorer {
    pub fn new(max_age_hours: i64) -> Self {
        Self {
            max_age: Duration::hours(max_age_hours.max(1)),
        }
    }

    /// Run the full battery
    pub fn checks(&self, snapshot: &EnvironmentalSnapshot, now: DateTime<Utc>) -> Vec<QualityCheck> {
        let mut checks = vec![
            QualityCheck {
                name: "within_bounds",
                passed: snapshot_violations(snapshot).is_empty(),
            },
            QualityCheck {
                name: "fire_risk_known",
                passed: snapshot.fire.fire_risk != FireRisk::Unknown,
            },
            QualityCheck {
                name: "fresh",
                passed: self.is_fresh(snapshot, now),
            },
            QualityCheck {
                name: "forecast_complete",
                passed: forecast_is_consistent(&snapshot.weather),
            },
        ];

        checks.extend(snapshot.sources.iter().map(|(name, provenance)| QualityCheck {
            name: measured_check_name(name),
            passed: !provenance.is_synthesized(),
        }));
        checks
    }

    /// Grade a snapshot; stale data never grades above `good`
    pub fn score(&self, snapshot: &EnvironmentalSnapshot, now: DateTime<Utc>) -> QualityGrade {
        let checks = self.checks(snapshot, now);
        let passed = checks.iter().filter(|c| c.passed).count();
        let grade = classify_quality(passed as f64 / checks.len() as f64);

        if !self.is_fresh(snapshot, now) {
            return grade.min(QualityGrade::Good);
        }
        grade
    }

    fn is_fresh(&self, snapshot: &EnvironmentalSnapshot, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(snapshot.last_updated) <= self.max_age
    }
}

fn measured_check_name(record: &str) -> &'static str {
    match record {
        "airQuality" => "air_quality_measured",
        "soil" => "soil_measured",
        "fire" => "fire_measured",
        "water" => "water_measured",
        "weather" => "weather_measured",
        _ => "vegetation_measured",
    }
}
