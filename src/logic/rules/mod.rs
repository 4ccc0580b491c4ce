pub mod engine;

pub use engine::RulesEngine;

use crate::models::{ActionRule, Command, Metric, MetricSnapshot};

/// A threshold rule over a single metric
pub trait Rule: Send + Sync {
    /// Metric this rule reads from the snapshot
    fn metric(&self) -> Metric;

    /// Action to take if the metric is out of bounds, `None` when it is
    /// within bounds or absent from the snapshot.
    fn evaluate(&self, values: &MetricSnapshot) -> Option<Command>;
}

impl Rule for ActionRule {
    fn metric(&self) -> Metric {
        self.metric
    }

    fn evaluate(&self, values: &MetricSnapshot) -> Option<Command> {
        let value = values.get(&self.metric)?;
        self.range.excludes(*value).then_some(self.action)
    }
}
