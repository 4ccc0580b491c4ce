use super::actuator::{ActuatorGroup, Command};
use super::environmental::{snapshot_from_sensors, MetricSnapshot, SensorRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

impl Location {
    pub fn city(city: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            lat: None,
            lon: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    pub irrigation_on: bool,
    pub vent_open: bool,
    pub shade_on: bool,
    pub light_on: bool,
    pub humidifier_on: bool,
    /// Last manual command per group; suppresses automatic control for a while.
    #[serde(default)]
    pub last_manual_action_at: BTreeMap<ActuatorGroup, DateTime<Utc>>,
}

impl DeviceState {
    pub fn is_on(&self, group: ActuatorGroup) -> bool {
        match group {
            ActuatorGroup::Irrigation => self.irrigation_on,
            ActuatorGroup::Vent => self.vent_open,
            ActuatorGroup::Shade => self.shade_on,
            ActuatorGroup::Light => self.light_on,
            ActuatorGroup::Humidifier => self.humidifier_on,
        }
    }

    /// Sets the group's state and reports whether it actually changed.
    pub fn set(&mut self, group: ActuatorGroup, on: bool) -> bool {
        let slot = match group {
            ActuatorGroup::Irrigation => &mut self.irrigation_on,
            ActuatorGroup::Vent => &mut self.vent_open,
            ActuatorGroup::Shade => &mut self.shade_on,
            ActuatorGroup::Light => &mut self.light_on,
            ActuatorGroup::Humidifier => &mut self.humidifier_on,
        };
        let changed = *slot != on;
        *slot = on;
        changed
    }
}

impl std::fmt::Display for DeviceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = ActuatorGroup::ALL
            .iter()
            .map(|g| Command::new(*g, self.is_on(*g)).token())
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}

/// Aggregate root; persisted as a whole so actuator state and
/// transition timestamps never diverge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Greenhouse {
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
    pub active: bool,
    pub location: Location,
    #[serde(default)]
    pub sensors: Vec<SensorRef>,
    #[serde(default)]
    pub devices: DeviceState,
    #[serde(default)]
    pub plant_profile_id: Option<String>,
    #[serde(default)]
    pub plan_id: Option<i64>,
    /// Last automatic transition per action token.
    #[serde(default)]
    pub last_action_at: BTreeMap<Command, DateTime<Utc>>,
}

impl Greenhouse {
    pub fn new(code: impl Into<String>, location: Location) -> Self {
        Self {
            code: code.into(),
            name: None,
            active: true,
            location,
            sensors: Vec::new(),
            devices: DeviceState::default(),
            plant_profile_id: None,
            plan_id: None,
            last_action_at: BTreeMap::new(),
        }
    }

    pub fn with_profile(mut self, profile_id: impl Into<String>) -> Self {
        self.plant_profile_id = Some(profile_id.into());
        self
    }

    pub fn sensor(&self, code: &str) -> Option<&SensorRef> {
        self.sensors.iter().find(|s| s.has_code(code))
    }

    pub fn sensor_value(&self, code: &str) -> Option<f64> {
        self.sensor(code).and_then(|s| s.last_value)
    }

    /// Replaces any reading with the same code, keeping its position and id.
    pub fn upsert_sensor(&mut self, mut sensor: SensorRef) {
        match self.sensors.iter_mut().find(|s| s.has_code(&sensor.code)) {
            Some(existing) => {
                if sensor.id.is_none() {
                    sensor.id = existing.id.clone();
                }
                sensor.code = existing.code.clone();
                *existing = sensor;
            }
            None => {
                sensor.code = sensor.code.trim().to_string();
                self.sensors.push(sensor);
            }
        }
    }

    pub fn live_snapshot(&self) -> MetricSnapshot {
        snapshot_from_sensors(&self.sensors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::environmental::{Metric, Unit, INT_TEMP};

    #[test]
    fn device_set_reports_change() {
        let mut devices = DeviceState::default();
        assert!(devices.set(ActuatorGroup::Shade, true));
        assert!(!devices.set(ActuatorGroup::Shade, true));
        assert!(devices.is_on(ActuatorGroup::Shade));
        assert!(devices.set(ActuatorGroup::Shade, false));
    }

    #[test]
    fn upsert_replaces_by_code() {
        let now = Utc::now();
        let mut gh = Greenhouse::new("GH1", Location::city("Szeged"));
        let mut first = SensorRef::reading(INT_TEMP, Metric::Temperature, Unit::Celsius, 20.0, now);
        first.id = Some("s-1".into());
        gh.upsert_sensor(first);
        gh.upsert_sensor(SensorRef::reading(
            "int_temp",
            Metric::Temperature,
            Unit::Celsius,
            22.5,
            now,
        ));

        assert_eq!(gh.sensors.len(), 1);
        assert_eq!(gh.sensors[0].code, INT_TEMP);
        assert_eq!(gh.sensors[0].id.as_deref(), Some("s-1"));
        assert_eq!(gh.sensor_value(INT_TEMP), Some(22.5));
    }

    #[test]
    fn aggregate_round_trips_through_json() {
        let mut gh = Greenhouse::new("GH1", Location::city("Szeged")).with_profile("tomato");
        gh.devices.last_manual_action_at.insert(ActuatorGroup::Vent, Utc::now());
        gh.last_action_at
            .insert(Command::new(ActuatorGroup::Irrigation, false), Utc::now());

        let json = serde_json::to_string(&gh).unwrap();
        assert!(json.contains("IRRIGATION_OFF"));
        let back: Greenhouse = serde_json::from_str(&json).unwrap();
        assert_eq!(back, gh);
    }

    #[test]
    fn device_state_display() {
        let mut devices = DeviceState::default();
        devices.set(ActuatorGroup::Vent, true);
        let shown = devices.to_string();
        assert!(shown.contains("VENT_OPEN"));
        assert!(shown.contains("IRRIGATION_OFF"));
    }
}
