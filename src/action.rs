//! The two controllable click actions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which pointer button the click loop emulates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    #[default]
    Left,
    Right,
}

impl Action {
    /// Both actions, in a stable order
    pub const ALL: [Action; 2] = [Action::Left, Action::Right];

    /// Index into per-action arrays
    pub(crate) fn index(self) -> usize {
        match self {
            Action::Left => 0,
            Action::Right => 1,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Left => write!(f, "left"),
            Action::Right => write!(f, "right"),
        }
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" | "l" => Ok(Action::Left),
            "right" | "r" => Ok(Action::Right),
            other => Err(format!("unknown action '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_action() {
        assert_eq!("Left".parse::<Action>(), Ok(Action::Left));
        assert_eq!(" right ".parse::<Action>(), Ok(Action::Right));
        assert!("middle".parse::<Action>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Action::Right).unwrap();
        assert_eq!(json, "\"right\"");
    }
}
