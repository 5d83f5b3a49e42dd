//! Data synthesizer
//!
//! Merges whatever provider readings succeeded into one complete snapshot.
//! Valid provider values win; every other field gets a heuristic placeholder
//! whose shape follows its drivers (moisture tracks rainfall, vegetation
//! tracks moisture and heat) so the snapshot stays internally consistent even
//! when nothing was measured. Synthesis never fails.

use chrono::{DateTime, Datelike, Days, Utc};
use rand::Rng;
use shared::{
    accept, bounded, fire_risk_for_count, round_to, AirQuality, DataSources,
    EnvironmentalSnapshot, Fire, ForecastDay, Location, Provenance, Soil, Vegetation, Water,
    Weather, AEROSOL_INDEX, AIR_TEMPERATURE_C, CO_PPM, FIELD_PRECISION, FORECAST_DAYS, NDVI,
    NUTRIENT_MG_KG, PRECIPITATION_MM, SOIL_MOISTURE, SOIL_PH, SOIL_TEMPERATURE_C,
    SURFACE_WATER_FRACTION,
};

use crate::external::{DailyObservation, SourceResult};

/// Above this air temperature vegetation is assumed heat-stressed
pub const HEAT_THRESHOLD_C: f64 = 35.0;

/// Provider values merged across readings, first valid value wins
#[derive(Debug, Default)]
struct Merged {
    aerosol_index: Option<f64>,
    co_ppm: Option<f64>,
    soil_moisture: Option<f64>,
    soil_temperature_c: Option<f64>,
    precipitation_mm: Option<f64>,
    current_temp_c: Option<f64>,
    daily_history: Vec<DailyObservation>,
    active_fires: Option<u32>,
    observed_at: Option<DateTime<Utc>>,
}

impl Merged {
    fn from_results(results: &[SourceResult]) -> Self {
        let mut merged = Merged::default();

        for reading in results.iter().filter_map(|r| r.as_ref().ok()) {
            let f = &reading.fields;
            merged.aerosol_index = merged
                .aerosol_index
                .or_else(|| f.aerosol_index.and_then(|v| accept(v, &AEROSOL_INDEX)));
            merged.co_ppm = merged.co_ppm.or_else(|| f.co_ppm.and_then(|v| accept(v, &CO_PPM)));
            merged.soil_moisture = merged
                .soil_moisture
                .or_else(|| f.soil_moisture.and_then(|v| accept(v, &SOIL_MOISTURE)));
            merged.soil_temperature_c = merged
                .soil_temperature_c
                .or_else(|| f.soil_temperature_c.and_then(|v| accept(v, &SOIL_TEMPERATURE_C)));
            merged.precipitation_mm = merged
                .precipitation_mm
                .or_else(|| f.precipitation_mm.and_then(|v| accept(v, &PRECIPITATION_MM)));
            merged.current_temp_c = merged
                .current_temp_c
                .or_else(|| f.current_temp_c.and_then(|v| accept(v, &AIR_TEMPERATURE_C)));
            merged.active_fires = merged.active_fires.or(f.active_fires);

            if merged.daily_history.is_empty() {
                merged.daily_history = f
                    .daily_history
                    .iter()
                    .filter(|d| {
                        accept(d.max_c, &AIR_TEMPERATURE_C).is_some()
                            && accept(d.min_c, &AIR_TEMPERATURE_C).is_some()
                            && d.min_c <= d.max_c
                    })
                    .cloned()
                    .collect();
            }

            merged.observed_at = merged.observed_at.max(reading.observed_at);
        }
        merged
    }
}

/// Stateless snapshot builder
#[derive(Debug, Default, Clone)]
pub struct DataSynthesizer;

impl DataSynthesizer {
    pub fn new() -> Self {
        Self
    }

    /// Build a complete snapshot using the thread-local generator
    pub fn synthesize(
        &self,
        location: &Location,
        results: &[SourceResult],
        now: DateTime<Utc>,
    ) -> EnvironmentalSnapshot {
        let mut rng = rand::thread_rng();
        self.synthesize_with(location, results, now, &mut rng)
    }

    /// Build a complete snapshot drawing placeholders from `rng`
    pub fn synthesize_with<R: Rng + ?Sized>(
        &self,
        location: &Location,
        results: &[SourceResult],
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> EnvironmentalSnapshot {
        let m = Merged::from_results(results);

        // Weather: latitude-shaped baseline when unmeasured
        let current_temp_c = bounded(
            m.current_temp_c
                .unwrap_or_else(|| 28.0 - 0.45 * location.lat.abs() + rng.gen_range(-3.0..3.0)),
            &AIR_TEMPERATURE_C,
        );

        let precipitation_mm = bounded(
            m.precipitation_mm.unwrap_or_else(|| rng.gen_range(0.0..12.0)),
            &PRECIPITATION_MM,
        );

        // Soil moisture correlates with recent rainfall
        let moisture = bounded(
            m.soil_moisture.unwrap_or_else(|| {
                (0.1 + precipitation_mm.min(20.0) / 20.0 * 0.6 + rng.gen_range(-0.05..0.05))
                    .clamp(0.05, 0.95)
            }),
            &SOIL_MOISTURE,
        );

        let soil = Soil {
            moisture,
            temperature: bounded(
                m.soil_temperature_c
                    .unwrap_or_else(|| current_temp_c - rng.gen_range(0.0..3.0)),
                &SOIL_TEMPERATURE_C,
            ),
            ph: bounded(rng.gen_range(5.5..7.5), &SOIL_PH),
            nitrogen: bounded(rng.gen_range(15.0..45.0) * (0.6 + moisture * 0.8), &NUTRIENT_MG_KG),
            phosphorus: bounded(rng.gen_range(10.0..35.0), &NUTRIENT_MG_KG),
            potassium: bounded(rng.gen_range(100.0..250.0), &NUTRIENT_MG_KG),
        };

        let vegetation = Vegetation {
            ndvi: vegetation_index(moisture, current_temp_c, rng.gen_range(-0.03..0.03)),
        };

        let water = Water {
            surface_water_fraction: bounded(
                0.05 + moisture * 0.3 + precipitation_mm.min(50.0) / 50.0 * 0.2,
                &SURFACE_WATER_FRACTION,
            ),
            precipitation_mm,
        };

        let air_quality = AirQuality {
            aerosol_index: bounded(
                m.aerosol_index.unwrap_or_else(|| rng.gen_range(0.1..1.2)),
                &AEROSOL_INDEX,
            ),
            co: bounded(m.co_ppm.unwrap_or_else(|| rng.gen_range(0.1..1.5)), &CO_PPM),
        };

        // No detections known means no fire evidence, not unknown risk
        let active_fires = m.active_fires.unwrap_or(0);
        let fire = Fire {
            active_fires,
            fire_risk: fire_risk_for_count(active_fires),
        };

        let weather = Weather {
            current_temp_c,
            forecast: build_forecast(
                now,
                current_temp_c,
                &m.daily_history,
                precipitation_mm,
                moisture,
                rng,
            ),
        };

        let measured = |present: bool| usize::from(present);
        let sources = DataSources {
            air_quality: Provenance::from_counts(
                measured(m.aerosol_index.is_some()) + measured(m.co_ppm.is_some()),
                2,
            ),
            // pH and nutrients have no provider, so soil is never fully measured
            soil: Provenance::from_counts(
                measured(m.soil_moisture.is_some()) + measured(m.soil_temperature_c.is_some()),
                6,
            ),
            fire: Provenance::from_counts(measured(m.active_fires.is_some()), 1),
            water: Provenance::from_counts(measured(m.precipitation_mm.is_some()), 2),
            weather: Provenance::from_counts(
                measured(m.current_temp_c.is_some()) + measured(!m.daily_history.is_empty()),
                2,
            ),
            vegetation: Provenance::from_counts(measured(m.soil_moisture.is_some()), 2),
        };

        EnvironmentalSnapshot {
            air_quality,
            soil,
            fire,
            water,
            weather,
            vegetation,
            last_updated: m.observed_at.map(|at| at.min(now)).unwrap_or(now),
            sources,
        }
    }
}

/// Vegetation index from soil moisture, reduced under heat stress
pub fn vegetation_index(moisture: f64, air_temp_c: f64, jitter: f64) -> f64 {
    let heat_penalty = if air_temp_c > HEAT_THRESHOLD_C { 0.15 } else { 0.0 };
    bounded(0.1 + 0.7 * moisture - heat_penalty + jitter, &NDVI)
}

/// Five-day outlook projected from recent history, or from the current
/// temperature when no history exists
fn build_forecast<R: Rng + ?Sized>(
    now: DateTime<Utc>,
    current_temp_c: f64,
    history: &[DailyObservation],
    precipitation_mm: f64,
    moisture: f64,
    rng: &mut R,
) -> Vec<ForecastDay> {
    let recent = &history[history.len().saturating_sub(5)..];

    let (base_max, base_min, trend) = match recent {
        [] => (
            current_temp_c + rng.gen_range(2.0..6.0),
            current_temp_c - rng.gen_range(2.0..6.0),
            rng.gen_range(-0.5..0.5),
        ),
        [only] => (only.max_c, only.min_c, 0.0),
        [first, .., last] => {
            let n = recent.len() as f64;
            let mean_max = recent.iter().map(|d| d.max_c).sum::<f64>() / n;
            let mean_min = recent.iter().map(|d| d.min_c).sum::<f64>() / n;
            let mid = |d: &DailyObservation| (d.max_c + d.min_c) / 2.0;
            let trend = ((mid(last) - mid(first)) / (n - 1.0)).clamp(-1.0, 1.0);
            (mean_max, mean_min, trend)
        }
    };

    let today = now.date_naive();
    (0..FORECAST_DAYS)
        .map(|i| {
            let ahead = (i + 1) as f64;
            let drift = trend * ahead + rng.gen_range(-1.0..1.0);
            let mut max_c = bounded(base_max + drift, &AIR_TEMPERATURE_C);
            let mut min_c = bounded(base_min + drift, &AIR_TEMPERATURE_C);
            if min_c > max_c {
                std::mem::swap(&mut min_c, &mut max_c);
            }
            let temp_c = round_to((max_c + min_c) / 2.0, FIELD_PRECISION).clamp(min_c, max_c);

            let day = today
                .checked_add_days(Days::new(i as u64 + 1))
                .map(|d| d.weekday().to_string())
                .unwrap_or_else(|| format!("Day {}", i + 1));

            ForecastDay {
                day,
                temp_c,
                max_c,
                min_c,
                condition: condition_for(max_c, precipitation_mm, moisture, rng).to_string(),
            }
        })
        .collect()
}

fn condition_for<R: Rng + ?Sized>(
    max_c: f64,
    precipitation_mm: f64,
    moisture: f64,
    rng: &mut R,
) -> &'static str {
    match () {
        _ if max_c <= 0.0 && precipitation_mm > 1.0 => "Snow",
        _ if max_c <= 0.0 => "Freezing",
        _ if precipitation_mm > 10.0 => "Rain",
        _ if precipitation_mm > 2.0 => "Showers",
        _ if max_c >= HEAT_THRESHOLD_C => "Hot",
        _ if moisture > 0.6 => "Cloudy",
        _ if rng.gen_bool(0.5) => "Sunny",
        _ => "Partly Cloudy",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::{PartialFields, SourceError, SourceKind, SourceReading};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shared::FireRisk;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-03T12:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_provider_values_win_and_are_rounded() {
        let results = vec![Ok(SourceReading::new(
            SourceKind::Climate,
            PartialFields {
                current_temp_c: Some(21.456),
                soil_moisture: Some(0.333),
                precipitation_mm: Some(4.0),
                ..Default::default()
            },
        ))];

        let mut rng = StdRng::seed_from_u64(7);
        let snapshot =
            DataSynthesizer::new().synthesize_with(&Location::new(10.0, 10.0), &results, now(), &mut rng);

        assert_eq!(snapshot.weather.current_temp_c, 21.46);
        assert_eq!(snapshot.soil.moisture, 0.33);
        assert_eq!(snapshot.water.precipitation_mm, 4.0);
        assert_eq!(snapshot.sources.weather, Provenance::Partial);
        assert_eq!(snapshot.sources.fire, Provenance::Synthesized);
    }

    #[test]
    fn test_out_of_range_provider_value_is_ignored() {
        let results = vec![Ok(SourceReading::new(
            SourceKind::Climate,
            PartialFields {
                soil_moisture: Some(-999.0),
                ..Default::default()
            },
        ))];

        let mut rng = StdRng::seed_from_u64(1);
        let snapshot =
            DataSynthesizer::new().synthesize_with(&Location::new(0.0, 0.0), &results, now(), &mut rng);

        assert!((0.05..=0.95).contains(&snapshot.soil.moisture));
        assert_eq!(snapshot.sources.soil, Provenance::Synthesized);
    }

    #[test]
    fn test_all_failed_gives_low_fire_risk_and_now() {
        let results = vec![
            Err(SourceError::Unconfigured("fire".into())),
            Err(SourceError::Timeout(std::time::Duration::from_secs(5))),
        ];
        let mut rng = StdRng::seed_from_u64(3);
        let snapshot =
            DataSynthesizer::new().synthesize_with(&Location::new(40.7, -74.0), &results, now(), &mut rng);

        assert_eq!(snapshot.fire.active_fires, 0);
        assert_eq!(snapshot.fire.fire_risk, FireRisk::Low);
        assert_eq!(snapshot.last_updated, now());
        assert_eq!(snapshot.sources, DataSources::all(Provenance::Synthesized));
    }

    #[test]
    fn test_forecast_labels_start_tomorrow() {
        let mut rng = StdRng::seed_from_u64(9);
        let snapshot =
            DataSynthesizer::new().synthesize_with(&Location::new(0.0, 0.0), &[], now(), &mut rng);

        // 2024-06-03 is a Monday
        let days: Vec<&str> = snapshot.weather.forecast.iter().map(|d| d.day.as_str()).collect();
        assert_eq!(days, vec!["Tue", "Wed", "Thu", "Fri", "Sat"]);
    }

    #[test]
    fn test_heat_reduces_vegetation_index() {
        assert!(vegetation_index(0.5, 40.0, 0.0) < vegetation_index(0.5, 20.0, 0.0));
        assert_eq!(vegetation_index(0.5, 20.0, 0.0), 0.45);
    }
}
