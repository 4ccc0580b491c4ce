use super::actuator::Command;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A predicted control event derived from one forecast sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedEvent {
    pub at: DateTime<Utc>,
    pub expected_temperature: Option<f64>,
    pub expected_humidity: Option<f64>,
    pub expected_wind_speed: Option<f64>,
    pub expected_precipitation_mm: Option<f64>,
    pub expected_soil_moisture: Option<f64>,
    pub suggested_actions: Vec<Command>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: Option<i64>,
    pub greenhouse_code: String,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub active: bool,
    pub events: Vec<PlannedEvent>,
}

impl Plan {
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.active && at >= self.valid_from && at <= self.valid_to
    }

    /// Events not yet due at `at`, in forecast order.
    pub fn upcoming(&self, at: DateTime<Utc>) -> impl Iterator<Item = &PlannedEvent> {
        self.events.iter().filter(move |e| e.at >= at)
    }
}
