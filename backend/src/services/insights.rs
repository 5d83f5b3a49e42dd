//! Insight generators
//!
//! Each task sees a narrow projection of the snapshot, rendered into compact
//! one-line descriptions and interpolated verbatim into a fixed instruction
//! template. Generators make exactly one backend call per invocation; retry
//! and fallback belong to the orchestrator.

use std::collections::BTreeMap;
use std::sync::Arc;

use shared::{
    aerosol_category, moisture_category, vegetation_category, AirQuality,
    EnvironmentalSnapshot, Fire, InsightTask, Location, Soil, Vegetation, Water, Weather,
};

use crate::external::{GenerationOutcome, GenerationRequest, TextGenerator};

// ============================================================================
// Task Inputs
// ============================================================================

/// Named, pre-formatted fields handed to one generation task
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskInput {
    fields: BTreeMap<&'static str, String>,
}

impl TaskInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.fields.insert(key, value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.clone())))
                .collect(),
        )
    }
}

/// Project the snapshot into the input a task expects
pub fn project(task: InsightTask, snapshot: &EnvironmentalSnapshot, location: &Location) -> TaskInput {
    let input = TaskInput::new().with("location", location.display_name());

    match task {
        InsightTask::FutureTrend => input
            .with("weather", weather_line(&snapshot.weather))
            .with("forecast", forecast_line(&snapshot.weather))
            .with("water", water_line(&snapshot.water))
            .with("vegetation", vegetation_line(&snapshot.vegetation)),
        InsightTask::CropRecommendation => input
            .with("soil", soil_line(&snapshot.soil))
            .with("water", water_line(&snapshot.water))
            .with("weather", weather_line(&snapshot.weather))
            .with("vegetation", vegetation_line(&snapshot.vegetation)),
        InsightTask::RiskAssessment => input
            .with("fire", fire_line(&snapshot.fire))
            .with("air", air_line(&snapshot.air_quality))
            .with("weather", weather_line(&snapshot.weather))
            .with("water", water_line(&snapshot.water)),
        InsightTask::Explanation => input
            .with("air", air_line(&snapshot.air_quality))
            .with("soil", soil_line(&snapshot.soil))
            .with("fire", fire_line(&snapshot.fire))
            .with("water", water_line(&snapshot.water))
            .with("weather", weather_line(&snapshot.weather))
            .with("vegetation", vegetation_line(&snapshot.vegetation)),
        InsightTask::Mitigation => input
            .with("fire", fire_line(&snapshot.fire))
            .with("air", air_line(&snapshot.air_quality))
            .with("soil", soil_line(&snapshot.soil))
            .with("vegetation", vegetation_line(&snapshot.vegetation)),
        InsightTask::HealthAdvisory => input
            .with("air", air_line(&snapshot.air_quality))
            .with("weather", weather_line(&snapshot.weather))
            .with("fire", fire_line(&snapshot.fire)),
    }
}

// ============================================================================
// Projection Helpers
// ============================================================================

pub fn soil_line(soil: &Soil) -> String {
    format!(
        "moisture {:.2} ({}), {:.1}°C, pH {:.1}, N {:.0} / P {:.0} / K {:.0} mg/kg",
        soil.moisture,
        moisture_category(soil.moisture),
        soil.temperature,
        soil.ph,
        soil.nitrogen,
        soil.phosphorus,
        soil.potassium
    )
}

pub fn air_line(air: &AirQuality) -> String {
    format!(
        "{} air, aerosol index {:.2}, CO {:.2} ppm",
        aerosol_category(air.aerosol_index),
        air.aerosol_index,
        air.co
    )
}

pub fn fire_line(fire: &Fire) -> String {
    let noun = if fire.active_fires == 1 { "fire" } else { "fires" };
    format!("{} active {} nearby, {} fire risk", fire.active_fires, noun, fire.fire_risk)
}

pub fn water_line(water: &Water) -> String {
    format!(
        "surface water {:.0}%, recent precipitation {:.1} mm",
        water.surface_water_fraction * 100.0,
        water.precipitation_mm
    )
}

pub fn weather_line(weather: &Weather) -> String {
    format!("currently {:.1}°C", weather.current_temp_c)
}

pub fn forecast_line(weather: &Weather) -> String {
    weather
        .forecast
        .iter()
        .map(|d| format!("{} {:.0}°C ({:.0}-{:.0}, {})", d.day, d.temp_c, d.min_c, d.max_c, d.condition))
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn vegetation_line(vegetation: &Vegetation) -> String {
    format!("NDVI {:.2} ({})", vegetation.ndvi, vegetation_category(vegetation.ndvi))
}

// ============================================================================
// Templates
// ============================================================================

/// Stable identifier sent with every request for a task
pub fn template_id(task: InsightTask) -> &'static str {
    match task {
        InsightTask::FutureTrend => "future_trend.v1",
        InsightTask::CropRecommendation => "crop_recommendation.v1",
        InsightTask::RiskAssessment => "risk_assessment.v1",
        InsightTask::Explanation => "explanation.v1",
        InsightTask::Mitigation => "mitigation.v1",
        InsightTask::HealthAdvisory => "health_advisory.v1",
    }
}

pub fn instruction_template(task: InsightTask) -> &'static str {
    match task {
        InsightTask::FutureTrend => {
            "Predict how conditions in {location} are likely to develop over the coming week. \
             Current weather: {weather}. Forecast: {forecast}. Water: {water}. Vegetation: {vegetation}."
        }
        InsightTask::CropRecommendation => {
            "Recommend two or three crops suited to {location}. \
             Soil: {soil}. Water: {water}. Weather: {weather}. Vegetation: {vegetation}."
        }
        InsightTask::RiskAssessment => {
            "Assess the main environmental risks for {location} and rate them low, medium or high. \
             Fire: {fire}. Air: {air}. Weather: {weather}. Water: {water}."
        }
        InsightTask::Explanation => {
            "Explain in plain language what these readings mean for someone living in {location}. \
             Air: {air}. Soil: {soil}. Fire: {fire}. Water: {water}. Weather: {weather}. Vegetation: {vegetation}."
        }
        InsightTask::Mitigation => {
            "Suggest practical steps to reduce environmental harm around {location}. \
             Fire: {fire}. Air: {air}. Soil: {soil}. Vegetation: {vegetation}."
        }
        InsightTask::HealthAdvisory => {
            "Write a short public health advisory for {location}. \
             Air: {air}. Weather: {weather}. Fire: {fire}."
        }
    }
}

/// Replace every `{key}` with the matching input field; unknown keys are left in place
pub fn interpolate(template: &str, input: &TaskInput) -> String {
    let mut out = String::with_capacity(template.len() + 128);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let key = &after[..close];
                match input.get(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Substitute for a task whose generation failed
pub fn fallback_text(task: InsightTask) -> String {
    format!(
        "{} is temporarily unavailable. Please check the measurements above or try again shortly.",
        task.label()
    )
}

/// Substitute used when no data source could be reached at all
pub fn offline_text(task: InsightTask) -> String {
    format!(
        "System offline: {} could not be produced because no environmental data sources responded.",
        task.label()
    )
}

// ============================================================================
// Generator
// ============================================================================

/// One insight task bound to a text backend
#[derive(Clone)]
pub struct InsightGenerator {
    task: InsightTask,
    backend: Arc<dyn TextGenerator>,
}

impl InsightGenerator {
    pub fn new(task: InsightTask, backend: Arc<dyn TextGenerator>) -> Self {
        Self { task, backend }
    }

    pub fn task(&self) -> InsightTask {
        self.task
    }

    pub fn request(&self, input: &TaskInput) -> GenerationRequest {
        GenerationRequest {
            template_id: template_id(self.task),
            prompt: interpolate(instruction_template(self.task), input),
            input: input.to_json(),
        }
    }

    /// Single backend call, no retry
    pub async fn generate(&self, input: &TaskInput) -> GenerationOutcome {
        let request = self.request(input);
        tracing::debug!(
            "Generating {} via {} ({})",
            self.task,
            self.backend.id(),
            request.template_id
        );
        self.backend.generate(&request).await
    }
}

impl std::fmt::Debug for InsightGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InsightGenerator")
            .field("task", &self.task)
            .field("backend", &self.backend.id())
            .finish()
    }
}

// ============================================================================
// Summary
// ============================================================================

/// Narrative computed from the snapshot alone, never from generated text
pub fn summary(snapshot: &EnvironmentalSnapshot, location: &Location) -> String {
    let outlook = snapshot
        .weather
        .forecast
        .first()
        .map(|d| format!(" with {} expected {}", d.condition.to_lowercase(), d.day))
        .unwrap_or_default();

    format!(
        "{}: {:.1}°C{}. Air is {} (aerosol index {:.2}). Soil is {} (moisture {:.2}) and \
         vegetation is {} (NDVI {:.2}). Fire risk is {} with {} active detections.",
        location.display_name(),
        snapshot.weather.current_temp_c,
        outlook,
        aerosol_category(snapshot.air_quality.aerosol_index),
        snapshot.air_quality.aerosol_index,
        moisture_category(snapshot.soil.moisture),
        snapshot.soil.moisture,
        vegetation_category(snapshot.vegetation.ndvi),
        snapshot.vegetation.ndvi,
        snapshot.fire.fire_risk,
        snapshot.fire.active_fires
    )
}
