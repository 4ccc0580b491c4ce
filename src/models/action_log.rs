use super::actuator::Command;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What triggered an actuator command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trigger {
    Manual,
    RuleEngine,
    WeatherCheck,
    ProfileRules,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Manual => "manual",
            Trigger::RuleEngine => "rule-engine",
            Trigger::WeatherCheck => "weather-check",
            Trigger::ProfileRules => "profile-rules",
        }
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Append-only audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLog {
    pub id: Option<i64>,
    pub greenhouse_code: String,
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub reason: String,
}

impl ActionLog {
    pub fn new(
        greenhouse_code: impl Into<String>,
        command: Command,
        trigger: Trigger,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            greenhouse_code: greenhouse_code.into(),
            timestamp: at,
            action: command.token(),
            reason: trigger.as_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::actuator::ActuatorGroup;

    #[test]
    fn log_entry_carries_token_and_reason() {
        let entry = ActionLog::new(
            "GH1",
            Command::new(ActuatorGroup::Shade, true),
            Trigger::ProfileRules,
            Utc::now(),
        );
        assert_eq!(entry.action, "SHADE_ON");
        assert_eq!(entry.reason, "profile-rules");
        assert!(entry.id.is_none());
    }

    #[test]
    fn trigger_display() {
        assert_eq!(Trigger::Manual.to_string(), "manual");
        assert_eq!(Trigger::RuleEngine.to_string(), "rule-engine");
        assert_eq!(Trigger::WeatherCheck.to_string(), "weather-check");
    }
}
