//! Actuator state machine.
//!
//! Automatic transitions pass three suppressors in order: the manual override
//! window for the group, the cooldown of the specific action token, and the
//! group's hysteresis band. Rule actions tripped by a metric that does not
//! drive the group skip the band and only need to change the state. Manual
//! commands bypass all of it.

use super::calculations::hysteresis_margin;
use crate::config::ControlConfig;
use crate::models::{
    ActionLog, ActuatorGroup, Command, Greenhouse, Metric, MetricSnapshot, PlantProfile, Range,
    Trigger,
};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// Order in which the regulation pass visits actuator groups.
const REGULATION_ORDER: [ActuatorGroup; 5] = [
    ActuatorGroup::Irrigation,
    ActuatorGroup::Humidifier,
    ActuatorGroup::Light,
    ActuatorGroup::Shade,
    ActuatorGroup::Vent,
];

const DEFAULT_TEMPERATURE: Range = Range { min: -10.0, max: 40.0 };
const DEFAULT_HUMIDITY: Range = Range { min: 0.0, max: 100.0 };
const DEFAULT_SOIL_MOISTURE: Range = Range { min: 0.0, max: 100.0 };

/// Why an automatic transition was not attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppression {
    ManualOverride,
    Cooldown,
    Hysteresis,
    /// The actuator is already in the requested state.
    Unchanged,
}

/// Whether the built-in regulation of `group` reads `metric`.
fn drives(group: ActuatorGroup, metric: Metric) -> bool {
    match group {
        ActuatorGroup::Irrigation => metric == Metric::SoilMoisturePct,
        ActuatorGroup::Humidifier => metric == Metric::HumidityPct,
        ActuatorGroup::Light | ActuatorGroup::Shade => metric == Metric::Temperature,
        ActuatorGroup::Vent => matches!(metric, Metric::Temperature | Metric::HumidityPct),
    }
}

#[derive(Debug, Clone)]
pub struct ActuatorController {
    config: ControlConfig,
}

impl ActuatorController {
    pub fn new(config: ControlConfig) -> Self {
        Self { config }
    }

    /// On/off thresholds for groups that switch on when a metric runs low.
    fn low_band(&self, range: &Range) -> (f64, f64) {
        let margin = hysteresis_margin(range, self.config.margin_fraction, self.config.min_margin);
        ((range.min + margin).max(0.0), range.max)
    }

    /// Desired state for `group` given the snapshot, or `None` when the
    /// current state should hold. Missing driving metrics hold the state.
    pub fn decide(
        &self,
        group: ActuatorGroup,
        is_on: bool,
        profile: &PlantProfile,
        snapshot: &MetricSnapshot,
    ) -> Option<bool> {
        let temperature_range = profile.temperature_range.unwrap_or(DEFAULT_TEMPERATURE);
        let humidity_range = profile.humidity_range_pct.unwrap_or(DEFAULT_HUMIDITY);

        match group {
            ActuatorGroup::Irrigation | ActuatorGroup::Humidifier | ActuatorGroup::Light => {
                let (metric, range) = match group {
                    ActuatorGroup::Irrigation => (
                        Metric::SoilMoisturePct,
                        profile.soil_moisture_range_pct.unwrap_or(DEFAULT_SOIL_MOISTURE),
                    ),
                    ActuatorGroup::Humidifier => (Metric::HumidityPct, humidity_range),
                    _ => (Metric::Temperature, temperature_range),
                };
                let value = *snapshot.get(&metric)?;
                let (on_threshold, off_threshold) = self.low_band(&range);
                match is_on {
                    true if value >= off_threshold => Some(false),
                    false if value <= on_threshold => Some(true),
                    _ => None,
                }
            }
            ActuatorGroup::Shade => {
                let value = *snapshot.get(&Metric::Temperature)?;
                match is_on {
                    true if value <= temperature_range.min => Some(false),
                    false if value >= temperature_range.max + self.config.shade_offset => {
                        Some(true)
                    }
                    _ => None,
                }
            }
            ActuatorGroup::Vent => {
                let checks: Vec<bool> = [
                    (Metric::Temperature, temperature_range),
                    (Metric::HumidityPct, humidity_range),
                ]
                .iter()
                .filter_map(|(metric, range)| snapshot.get(metric).map(|v| range.excludes(*v)))
                .collect();
                if checks.is_empty() {
                    return None;
                }
                let any_out = checks.iter().any(|out| *out);
                match is_on {
                    true if !any_out => Some(false),
                    false if any_out => Some(true),
                    _ => None,
                }
            }
        }
    }

    fn in_manual_window(&self, greenhouse: &Greenhouse, group: ActuatorGroup, now: DateTime<Utc>) -> bool {
        greenhouse
            .devices
            .last_manual_action_at
            .get(&group)
            .is_some_and(|at| now.signed_duration_since(*at) < self.config.cooldown())
    }

    fn in_cooldown(&self, greenhouse: &Greenhouse, command: Command, now: DateTime<Utc>) -> bool {
        greenhouse
            .last_action_at
            .get(&command)
            .is_some_and(|at| now.signed_duration_since(*at) < self.config.cooldown())
    }

    /// Run the suppressors for a rule action tripped by `metric`.
    pub fn check(
        &self,
        greenhouse: &Greenhouse,
        profile: &PlantProfile,
        metric: Metric,
        command: Command,
        snapshot: &MetricSnapshot,
        now: DateTime<Utc>,
    ) -> Result<(), Suppression> {
        if self.in_manual_window(greenhouse, command.group, now) {
            return Err(Suppression::ManualOverride);
        }
        if self.in_cooldown(greenhouse, command, now) {
            return Err(Suppression::Cooldown);
        }
        let is_on = greenhouse.devices.is_on(command.group);
        if !drives(command.group, metric) {
            return match is_on == command.on {
                true => Err(Suppression::Unchanged),
                false => Ok(()),
            };
        }
        if self.decide(command.group, is_on, profile, snapshot) != Some(command.on) {
            return Err(Suppression::Hysteresis);
        }
        Ok(())
    }

    fn apply(
        &self,
        greenhouse: &mut Greenhouse,
        command: Command,
        trigger: Trigger,
        now: DateTime<Utc>,
    ) -> ActionLog {
        if greenhouse.devices.set(command.group, command.on) {
            greenhouse.last_action_at.insert(command, now);
            info!(greenhouse = %greenhouse.code, action = %command, reason = %trigger, "Actuator transition");
        }
        ActionLog::new(greenhouse.code.clone(), command, trigger, now)
    }

    /// Hysteresis regulation of every group from the profile's ranges.
    pub fn regulate(
        &self,
        greenhouse: &mut Greenhouse,
        profile: &PlantProfile,
        snapshot: &MetricSnapshot,
        now: DateTime<Utc>,
    ) -> Vec<ActionLog> {
        let mut logs = Vec::new();
        for group in REGULATION_ORDER {
            if self.in_manual_window(greenhouse, group, now) {
                debug!(greenhouse = %greenhouse.code, %group, "Manual override active, skipping");
                continue;
            }
            let is_on = greenhouse.devices.is_on(group);
            let Some(on) = self.decide(group, is_on, profile, snapshot) else {
                continue;
            };
            let command = Command::new(group, on);
            if self.in_cooldown(greenhouse, command, now) {
                debug!(greenhouse = %greenhouse.code, action = %command, "In cooldown, skipping");
                continue;
            }
            logs.push(self.apply(greenhouse, command, Trigger::ProfileRules, now));
        }
        logs
    }

    /// Apply rule engine output, each action paired with the metric that
    /// tripped it. At most one command per group is considered (the first).
    pub fn apply_rule_actions(
        &self,
        greenhouse: &mut Greenhouse,
        profile: &PlantProfile,
        commands: &[(Metric, Command)],
        snapshot: &MetricSnapshot,
        trigger: Trigger,
        now: DateTime<Utc>,
    ) -> Vec<ActionLog> {
        let mut seen = Vec::with_capacity(commands.len());
        let mut logs = Vec::new();
        for &(metric, command) in commands {
            if seen.contains(&command.group) {
                continue;
            }
            seen.push(command.group);

            match self.check(greenhouse, profile, metric, command, snapshot, now) {
                Ok(()) => logs.push(self.apply(greenhouse, command, trigger, now)),
                Err(why) => {
                    debug!(greenhouse = %greenhouse.code, action = %command, reason = %trigger, suppressed = ?why, "Rule action suppressed")
                }
            }
        }
        logs
    }

    /// Operator command. Always applied and always logged; opens the manual
    /// override window for the group. Does not touch `last_action_at`.
    pub fn manual(&self, greenhouse: &mut Greenhouse, command: Command, now: DateTime<Utc>) -> ActionLog {
        let changed = greenhouse.devices.set(command.group, command.on);
        greenhouse
            .devices
            .last_manual_action_at
            .insert(command.group, now);
        info!(greenhouse = %greenhouse.code, action = %command, changed, "Manual command");
        ActionLog::new(greenhouse.code.clone(), command, Trigger::Manual, now)
    }
}
