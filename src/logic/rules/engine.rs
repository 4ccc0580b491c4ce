use super::Rule;
use crate::models::{Command, Metric, MetricSnapshot, PlantProfile};

/// Evaluates a profile's ordered rules against a metric snapshot.
///
/// Pure: no I/O, no mutation. Duplicate actions from different rules are all
/// returned; the controller deduplicates per actuator group.
#[derive(Debug, Clone, Copy, Default)]
pub struct RulesEngine;

impl RulesEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(&self, profile: &PlantProfile, values: &MetricSnapshot) -> Vec<Command> {
        self.evaluate_rules(&profile.rules, values)
            .into_iter()
            .map(|(_, command)| command)
            .collect()
    }

    /// Like [`evaluate`](Self::evaluate), paired with the metric that tripped
    /// each action.
    pub fn triggered(&self, profile: &PlantProfile, values: &MetricSnapshot) -> Vec<(Metric, Command)> {
        self.evaluate_rules(&profile.rules, values)
    }

    pub fn evaluate_rules<R: Rule>(
        &self,
        rules: &[R],
        values: &MetricSnapshot,
    ) -> Vec<(Metric, Command)> {
        rules
            .iter()
            .filter_map(|rule| {
                let action = rule.evaluate(values);
                if action.is_none() && !values.contains_key(&rule.metric()) {
                    tracing::trace!(metric = %rule.metric(), "Rule skipped, metric not in snapshot");
                }
                action.map(|command| (rule.metric(), command))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActuatorGroup;

    fn profile() -> PlantProfile {
        PlantProfile::new("tomato")
            .with_rule(
                Metric::Temperature,
                15.0,
                30.0,
                Command::new(ActuatorGroup::Shade, true),
            )
            .with_rule(
                Metric::HumidityPct,
                50.0,
                80.0,
                Command::new(ActuatorGroup::Vent, true),
            )
            .with_rule(
                Metric::Temperature,
                10.0,
                30.0,
                Command::new(ActuatorGroup::Vent, true),
            )
    }

    fn snapshot(values: &[(Metric, f64)]) -> MetricSnapshot {
        values.iter().copied().collect()
    }

    #[test]
    fn test_violations_in_rule_order() {
        let engine = RulesEngine::new();
        let values = snapshot(&[(Metric::Temperature, 34.0), (Metric::HumidityPct, 90.0)]);

        let actions = engine.evaluate(&profile(), &values);
        assert_eq!(
            actions,
            vec![
                Command::new(ActuatorGroup::Shade, true),
                Command::new(ActuatorGroup::Vent, true),
                Command::new(ActuatorGroup::Vent, true),
            ]
        );
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let engine = RulesEngine::new();
        let values = snapshot(&[(Metric::Temperature, 30.0), (Metric::HumidityPct, 50.0)]);
        assert!(engine.evaluate(&profile(), &values).is_empty());
    }

    #[test]
    fn test_missing_metric_is_skipped() {
        let engine = RulesEngine::new();
        let values = snapshot(&[(Metric::HumidityPct, 20.0)]);
        assert_eq!(
            engine.evaluate(&profile(), &values),
            vec![Command::new(ActuatorGroup::Vent, true)]
        );
    }

    #[test]
    fn test_empty_rules() {
        let engine = RulesEngine::new();
        let values = snapshot(&[(Metric::Temperature, 100.0)]);
        assert!(engine.evaluate(&PlantProfile::new("bare"), &values).is_empty());
    }

    #[test]
    fn test_triggered_carries_metric() {
        let engine = RulesEngine::new();
        let values = snapshot(&[(Metric::Temperature, 34.0), (Metric::HumidityPct, 60.0)]);
        assert_eq!(
            engine.triggered(&profile(), &values),
            vec![
                (Metric::Temperature, Command::new(ActuatorGroup::Shade, true)),
                (Metric::Temperature, Command::new(ActuatorGroup::Vent, true)),
            ]
        );
    }

    #[test]
    fn test_idempotent() {
        let engine = RulesEngine::new();
        let profile = profile();
        let values = snapshot(&[(Metric::Temperature, 5.0), (Metric::HumidityPct, 60.0)]);

        let first = engine.evaluate(&profile, &values);
        let second = engine.evaluate(&profile, &values);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }
}
