use crate::error::GreenhouseError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Independently controlled actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActuatorGroup {
    Irrigation,
    Vent,
    Shade,
    Light,
    Humidifier,
}

impl ActuatorGroup {
    pub const ALL: [ActuatorGroup; 5] = [
        ActuatorGroup::Irrigation,
        ActuatorGroup::Vent,
        ActuatorGroup::Shade,
        ActuatorGroup::Light,
        ActuatorGroup::Humidifier,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActuatorGroup::Irrigation => "IRRIGATION",
            ActuatorGroup::Vent => "VENT",
            ActuatorGroup::Shade => "SHADE",
            ActuatorGroup::Light => "LIGHT",
            ActuatorGroup::Humidifier => "HUMIDIFIER",
        }
    }

    /// Token suffixes for the (on, off) states. Vents open and close.
    fn state_words(&self) -> (&'static str, &'static str) {
        match self {
            ActuatorGroup::Vent => ("OPEN", "CLOSE"),
            _ => ("ON", "OFF"),
        }
    }
}

impl std::fmt::Display for ActuatorGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A desired actuator state, e.g. `IRRIGATION_ON` or `VENT_CLOSE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Command {
    pub group: ActuatorGroup,
    pub on: bool,
}

impl Command {
    pub fn new(group: ActuatorGroup, on: bool) -> Self {
        Self { group, on }
    }

    pub fn token(&self) -> String {
        let (on_word, off_word) = self.group.state_words();
        let word = if self.on { on_word } else { off_word };
        format!("{}_{}", self.group.as_str(), word)
    }
}

impl FromStr for Command {
    type Err = GreenhouseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase();
        ActuatorGroup::ALL
            .iter()
            .flat_map(|g| [Command::new(*g, true), Command::new(*g, false)])
            .find(|c| c.token() == normalized)
            .ok_or_else(|| GreenhouseError::InvalidCommand(format!("unknown action '{}'", s)))
    }
}

impl TryFrom<String> for Command {
    type Error = GreenhouseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Command> for String {
    fn from(command: Command) -> Self {
        command.token()
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_from_str_valid() {
        assert_eq!(
            "IRRIGATION_ON".parse::<Command>().unwrap(),
            Command::new(ActuatorGroup::Irrigation, true)
        );
        assert_eq!(
            " vent_close ".parse::<Command>().unwrap(),
            Command::new(ActuatorGroup::Vent, false)
        );
        assert_eq!(
            "Humidifier_Off".parse::<Command>().unwrap(),
            Command::new(ActuatorGroup::Humidifier, false)
        );
    }

    #[test]
    fn command_from_str_invalid() {
        assert!(matches!(
            "FOO_BAR".parse::<Command>(),
            Err(GreenhouseError::InvalidCommand(_))
        ));
        assert!("VENT_ON".parse::<Command>().is_err());
        assert!("IRRIGATION_OPEN".parse::<Command>().is_err());
        assert!("".parse::<Command>().is_err());
    }

    #[test]
    fn vent_uses_open_close_words() {
        assert_eq!(Command::new(ActuatorGroup::Vent, true).token(), "VENT_OPEN");
        assert_eq!(Command::new(ActuatorGroup::Vent, false).token(), "VENT_CLOSE");
        assert_eq!(Command::new(ActuatorGroup::Shade, true).token(), "SHADE_ON");
    }

    #[test]
    fn command_serializes_as_token() {
        let json = serde_json::to_string(&Command::new(ActuatorGroup::Light, false)).unwrap();
        assert_eq!(json, "\"LIGHT_OFF\"");
        let parsed: Command = serde_json::from_str("\"SHADE_ON\"").unwrap();
        assert_eq!(parsed, Command::new(ActuatorGroup::Shade, true));
        assert!(serde_json::from_str::<Command>("\"SHADE_OPEN\"").is_err());
    }
}
