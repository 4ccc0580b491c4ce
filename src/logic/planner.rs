use super::rules::RulesEngine;
use crate::models::{Plan, PlannedEvent, PlantProfile, WeatherForecast};
use chrono::{DateTime, Duration, Utc};

const PLAN_VALIDITY_DAYS: i64 = 3;
const EVENT_REASON: &str = "generated from forecast";

/// Turns a weather forecast into a non-binding list of expected control events.
#[derive(Debug, Clone, Default)]
pub struct PlanGenerator {
    engine: RulesEngine,
}

impl PlanGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `None` when the forecast has no samples. Samples that trip no
    /// rule produce no event.
    pub fn generate(
        &self,
        greenhouse_code: &str,
        profile: &PlantProfile,
        forecast: &WeatherForecast,
        now: DateTime<Utc>,
    ) -> Option<Plan> {
        if forecast.is_empty() {
            return None;
        }

        let events = forecast
            .samples
            .iter()
            .filter_map(|sample| {
                let actions = self.engine.evaluate(profile, &sample.snapshot());
                if actions.is_empty() {
                    return None;
                }
                Some(PlannedEvent {
                    at: sample.timestamp.unwrap_or(now),
                    expected_temperature: sample.temperature,
                    expected_humidity: sample.humidity,
                    expected_wind_speed: sample.wind_speed,
                    expected_precipitation_mm: sample.precipitation_mm,
                    expected_soil_moisture: sample.soil_moisture_pct,
                    suggested_actions: actions,
                    reason: EVENT_REASON.to_string(),
                })
            })
            .collect();

        Some(Plan {
            id: None,
            greenhouse_code: greenhouse_code.to_string(),
            valid_from: now,
            valid_to: now + Duration::days(PLAN_VALIDITY_DAYS),
            active: true,
            events,
        })
    }
}
