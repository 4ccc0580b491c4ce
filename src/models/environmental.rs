use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Environmental quantity a sensor reports and a rule can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Metric {
    #[serde(alias = "temperature")]
    Temperature,
    #[serde(alias = "windSpeed")]
    WindSpeed,
    #[serde(alias = "precipitationMm")]
    PrecipitationMm,
    #[serde(alias = "humidityPct")]
    HumidityPct,
    #[serde(rename = "SOILMOISTURE_PCT", alias = "soilMoisturePct")]
    SoilMoisturePct,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Temperature => "Temperature",
            Metric::WindSpeed => "Wind Speed",
            Metric::PrecipitationMm => "Precipitation",
            Metric::HumidityPct => "Humidity",
            Metric::SoilMoisturePct => "Soil Moisture",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Unit {
    Celsius,
    Percent,
    MeterPerSecond,
    KilometerPerHour,
    Millimeter,
}

impl Unit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Celsius => "°C",
            Unit::Percent => "%",
            Unit::MeterPerSecond => "m/s",
            Unit::KilometerPerHour => "km/h",
            Unit::Millimeter => "mm",
        }
    }
}

/// Point-in-time metric values handed to the rule engine and controller.
pub type MetricSnapshot = BTreeMap<Metric, f64>;

/// Virtual sensor codes written back by the simulator.
pub const INT_TEMP: &str = "INT_TEMP";
pub const INT_HUMIDITY: &str = "INT_HUMIDITY";
pub const SOIL_MOIST: &str = "SOIL_MOIST";
pub const WIND_SPEED: &str = "WIND_SPEED";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRef {
    #[serde(default)]
    pub id: Option<String>,
    pub code: String,
    #[serde(rename = "type")]
    pub metric: Metric,
    pub unit: Unit,
    pub last_value: Option<f64>,
    pub last_seen: Option<DateTime<Utc>>,
}

impl SensorRef {
    pub fn reading(code: &str, metric: Metric, unit: Unit, value: f64, at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            code: code.to_string(),
            metric,
            unit,
            last_value: Some(value),
            last_seen: Some(at),
        }
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.code.trim().eq_ignore_ascii_case(code.trim())
    }
}

/// Collapses sensor readings into a snapshot. The first reading of each
/// metric wins, matching the order sensors are stored in.
pub fn snapshot_from_sensors(sensors: &[SensorRef]) -> MetricSnapshot {
    let mut values = MetricSnapshot::new();
    for sensor in sensors {
        if let Some(value) = sensor.last_value {
            values.entry(sensor.metric).or_insert(value);
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_accepts_screaming_and_camel_names() {
        let m: Metric = serde_json::from_str("\"SOILMOISTURE_PCT\"").unwrap();
        assert_eq!(m, Metric::SoilMoisturePct);
        let m: Metric = serde_json::from_str("\"humidityPct\"").unwrap();
        assert_eq!(m, Metric::HumidityPct);
        assert_eq!(
            serde_json::to_string(&Metric::WindSpeed).unwrap(),
            "\"WIND_SPEED\""
        );
    }

    #[test]
    fn sensor_code_match_ignores_case_and_whitespace() {
        let sensor = SensorRef::reading(INT_TEMP, Metric::Temperature, Unit::Celsius, 21.0, Utc::now());
        assert!(sensor.has_code("int_temp"));
        assert!(sensor.has_code(" INT_TEMP "));
        assert!(!sensor.has_code("INT_HUMIDITY"));
    }

    #[test]
    fn snapshot_keeps_first_reading_per_metric() {
        let now = Utc::now();
        let sensors = vec![
            SensorRef::reading("A", Metric::Temperature, Unit::Celsius, 21.0, now),
            SensorRef::reading("B", Metric::Temperature, Unit::Celsius, 25.0, now),
            SensorRef {
                last_value: None,
                ..SensorRef::reading("C", Metric::HumidityPct, Unit::Percent, 0.0, now)
            },
        ];

        let snapshot = snapshot_from_sensors(&sensors);
        assert_eq!(snapshot.get(&Metric::Temperature), Some(&21.0));
        assert!(!snapshot.contains_key(&Metric::HumidityPct));
    }

    #[test]
    fn unit_symbols() {
        assert_eq!(Unit::Celsius.symbol(), "°C");
        assert_eq!(Unit::Percent.symbol(), "%");
        assert_eq!(Unit::MeterPerSecond.symbol(), "m/s");
    }
}
