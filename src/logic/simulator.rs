//! Heuristic greenhouse climate model.
//!
//! Internal climate is derived from outside weather plus fixed actuator
//! deltas, then smoothed against the previously emitted readings so values
//! drift rather than jump. Soil moisture is integrated tick by tick from
//! irrigation, evaporation and plant uptake.

use super::calculations::{clamp, evaporation, initial_soil_moisture, plant_uptake, smooth};
use crate::config::SimulationConfig;
use crate::models::{
    DeviceState, Greenhouse, Metric, MetricSnapshot, PlantProfile, SensorRef, Unit,
    WeatherReading, INT_HUMIDITY, INT_TEMP, SOIL_MOIST, WIND_SPEED,
};
use chrono::{DateTime, Utc};

/// Last emitted virtual readings, `None` before the first tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PreviousReadings {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub soil_moisture: Option<f64>,
}

impl PreviousReadings {
    pub fn from_greenhouse(greenhouse: &Greenhouse) -> Self {
        Self {
            temperature: greenhouse.sensor_value(INT_TEMP),
            humidity: greenhouse.sensor_value(INT_HUMIDITY),
            wind_speed: greenhouse.sensor_value(WIND_SPEED),
            soil_moisture: greenhouse.sensor_value(SOIL_MOIST),
        }
    }
}

pub struct SimInput<'a> {
    pub weather: &'a WeatherReading,
    pub devices: &'a DeviceState,
    pub profile: Option<&'a PlantProfile>,
    pub previous: PreviousReadings,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimOutput {
    /// Smoothed
    pub temperature: f64,
    /// Smoothed
    pub humidity: f64,
    /// Smoothed
    pub wind_speed: f64,
    /// Not smoothed; bounded to [0, 100] and the profile's soil range.
    pub soil_moisture: f64,
}

impl SimOutput {
    pub fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot::from([
            (Metric::Temperature, self.temperature),
            (Metric::HumidityPct, self.humidity),
            (Metric::SoilMoisturePct, self.soil_moisture),
            (Metric::WindSpeed, self.wind_speed),
        ])
    }

    pub fn sensors(&self, at: DateTime<Utc>) -> [SensorRef; 4] {
        [
            SensorRef::reading(INT_TEMP, Metric::Temperature, Unit::Celsius, self.temperature, at),
            SensorRef::reading(INT_HUMIDITY, Metric::HumidityPct, Unit::Percent, self.humidity, at),
            SensorRef::reading(
                SOIL_MOIST,
                Metric::SoilMoisturePct,
                Unit::Percent,
                self.soil_moisture,
                at,
            ),
            SensorRef::reading(
                WIND_SPEED,
                Metric::WindSpeed,
                Unit::MeterPerSecond,
                self.wind_speed,
                at,
            ),
        ]
    }

    /// Replace the greenhouse's virtual sensor readings with these values.
    pub fn write_back(&self, greenhouse: &mut Greenhouse, at: DateTime<Utc>) {
        for sensor in self.sensors(at) {
            greenhouse.upsert_sensor(sensor);
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnvironmentSimulator {
    config: SimulationConfig,
}

impl EnvironmentSimulator {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    /// One simulation step. Pure; missing weather fields fall back to
    /// configured defaults so a step never fails.
    pub fn simulate(&self, input: &SimInput) -> SimOutput {
        let cfg = &self.config;
        let weather = input.weather;
        let devices = input.devices;

        let ext_temp = weather.temperature.unwrap_or(cfg.fallback_temperature);
        let ext_wind = weather.wind_speed.unwrap_or(cfg.fallback_wind);
        let ext_soil = weather
            .soil_moisture_pct
            .unwrap_or(cfg.fallback_soil_moisture);
        let ext_hum = weather.humidity.unwrap_or(cfg.fallback_humidity);

        let mut temperature = ext_temp;
        if devices.light_on {
            temperature += cfg.light_temp_delta;
        }
        if devices.vent_open {
            temperature -= cfg.vent_temp_delta;
        }
        if devices.shade_on {
            temperature -= cfg.shade_temp_delta;
        }

        let mut humidity = ext_hum;
        if devices.humidifier_on {
            humidity += cfg.humidifier_humidity_delta;
        }
        if devices.vent_open {
            humidity -= cfg.vent_humidity_delta;
        }
        humidity = clamp(humidity, 0.0, 100.0);

        let mut wind = ext_wind;
        if devices.vent_open {
            wind += cfg.vent_wind_delta;
        }
        wind = clamp(wind, 0.0, cfg.max_wind);

        let mut soil = input
            .previous
            .soil_moisture
            .unwrap_or_else(|| initial_soil_moisture(ext_temp, ext_hum, ext_soil));

        if devices.irrigation_on {
            soil += cfg.irrigation_soil_delta;
            humidity = clamp(humidity + cfg.irrigation_humidity_delta, 0.0, 100.0);
        } else {
            soil -= evaporation(temperature, humidity, wind);
        }

        let soil_range = input.profile.and_then(|p| p.soil_moisture_range_pct.as_ref());
        soil -= plant_uptake(temperature, soil, soil_range);
        soil = clamp(soil, 0.0, 100.0);
        if let Some(range) = soil_range {
            soil = range.clamp(soil);
        }

        let prev = input.previous;
        SimOutput {
            temperature: smooth(prev.temperature, temperature, cfg.temperature_alpha),
            humidity: smooth(prev.humidity, humidity, cfg.humidity_alpha),
            wind_speed: smooth(prev.wind_speed, wind, cfg.wind_alpha),
            soil_moisture: soil,
        }
    }

    /// Simulate from the greenhouse's own state and write the readings back.
    pub fn step(
        &self,
        greenhouse: &mut Greenhouse,
        profile: Option<&PlantProfile>,
        weather: &WeatherReading,
        now: DateTime<Utc>,
    ) -> SimOutput {
        let output = self.simulate(&SimInput {
            weather,
            devices: &greenhouse.devices,
            profile,
            previous: PreviousReadings::from_greenhouse(greenhouse),
        });
        output.write_back(greenhouse, now);

        tracing::debug!(
            greenhouse = %greenhouse.code,
            temperature = output.temperature,
            humidity = output.humidity,
            soil_moisture = output.soil_moisture,
            wind_speed = output.wind_speed,
            devices = %greenhouse.devices,
            "Simulated internal climate"
        );
        output
    }
}
