use super::actuator::Command;
use super::environmental::Metric;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    #[cfg(test)]
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Strictly below `min` or strictly above `max`.
    pub fn excludes(&self, value: f64) -> bool {
        value < self.min || value > self.max
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRule {
    pub metric: Metric,
    pub range: Range,
    pub action: Command,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantProfile {
    pub id: String,
    pub plant_code: String,
    #[serde(default)]
    pub plant_type: Option<String>,
    #[serde(default)]
    pub temperature_range: Option<Range>,
    #[serde(default)]
    pub humidity_range_pct: Option<Range>,
    #[serde(default)]
    pub soil_moisture_range_pct: Option<Range>,
    #[serde(default)]
    pub rules: Vec<ActionRule>,
}

impl PlantProfile {
    pub fn validate(&self) -> Result<(), String> {
        let ranges = [
            ("temperature_range", self.temperature_range),
            ("humidity_range_pct", self.humidity_range_pct),
            ("soil_moisture_range_pct", self.soil_moisture_range_pct),
        ];
        for (name, range) in ranges {
            if let Some(r) = range {
                if r.min > r.max {
                    return Err(format!("{}: min {} exceeds max {}", name, r.min, r.max));
                }
            }
        }
        if self.id.trim().is_empty() {
            return Err("profile id is empty".into());
        }
        Ok(())
    }
}

/// Builders for tests.
#[cfg(test)]
impl PlantProfile {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            plant_code: id.clone(),
            id,
            plant_type: None,
            temperature_range: None,
            humidity_range_pct: None,
            soil_moisture_range_pct: None,
            rules: Vec::new(),
        }
    }

    pub fn with_temperature(mut self, min: f64, max: f64) -> Self {
        self.temperature_range = Some(Range::new(min, max));
        self
    }

    pub fn with_humidity(mut self, min: f64, max: f64) -> Self {
        self.humidity_range_pct = Some(Range::new(min, max));
        self
    }

    pub fn with_soil_moisture(mut self, min: f64, max: f64) -> Self {
        self.soil_moisture_range_pct = Some(Range::new(min, max));
        self
    }

    pub fn with_rule(mut self, metric: Metric, min: f64, max: f64, action: Command) -> Self {
        self.rules.push(ActionRule {
            metric,
            range: Range::new(min, max),
            action,
        });
        self
    }
}
