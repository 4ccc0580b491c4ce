use super::environmental::{Metric, MetricSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// External weather at one instant, either observed or forecast.
/// Every field is optional; consumers substitute their own fallbacks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    pub timestamp: Option<DateTime<Utc>>,
    pub city: Option<String>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub precipitation_mm: Option<f64>,
    pub soil_moisture_pct: Option<f64>,
}

impl WeatherReading {
    /// Metrics a rule can be evaluated against. Soil moisture is an
    /// estimate for the simulator only and is left out.
    pub fn snapshot(&self) -> MetricSnapshot {
        let mut values = MetricSnapshot::new();
        let fields = [
            (Metric::Temperature, self.temperature),
            (Metric::HumidityPct, self.humidity),
            (Metric::WindSpeed, self.wind_speed),
            (Metric::PrecipitationMm, self.precipitation_mm),
        ];
        for (metric, value) in fields {
            if let Some(v) = value {
                values.insert(metric, v);
            }
        }
        values
    }
}

/// Ordered forecast samples for one location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherForecast {
    pub fetched_at: DateTime<Utc>,
    pub city: String,
    pub samples: Vec<WeatherReading>,
}

impl WeatherForecast {
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample(hours: i64, temp: f64) -> WeatherReading {
        WeatherReading {
            timestamp: Some(Utc::now() + Duration::hours(hours)),
            temperature: Some(temp),
            humidity: Some(60.0),
            ..Default::default()
        }
    }

    #[test]
    fn snapshot_skips_missing_fields() {
        let reading = WeatherReading {
            temperature: Some(25.0),
            precipitation_mm: Some(0.0),
            soil_moisture_pct: Some(40.0),
            ..Default::default()
        };
        let snapshot = reading.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get(&Metric::Temperature), Some(&25.0));
        assert_eq!(snapshot.get(&Metric::PrecipitationMm), Some(&0.0));
        assert!(!snapshot.contains_key(&Metric::SoilMoisturePct));
    }

    #[test]
    fn forecast_emptiness() {
        let mut forecast = WeatherForecast {
            fetched_at: Utc::now(),
            city: "Szeged".into(),
            samples: vec![sample(3, 22.0), sample(12, 31.5)],
        };
        assert!(!forecast.is_empty());
        forecast.samples.clear();
        assert!(forecast.is_empty());
    }
}
