//! Agent state-machine and command-origin types.

use serde::{Deserialize, Serialize};

/// Where the control loop currently is.
///
/// `Idle` is the state at spawn and whenever guarding is switched off. The
/// three guarding states are re-derived every tick from the classifier
/// output and the protected target; there is no terminal state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardState {
    #[default]
    Idle,
    GuardingIdle,
    GuardingFollow,
    GuardingEngage,
}

impl std::fmt::Display for GuardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::GuardingIdle => "guarding-idle",
            Self::GuardingFollow => "guarding-follow",
            Self::GuardingEngage => "guarding-engage",
        };
        f.write_str(s)
    }
}

/// How the four armor slots are filled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmorStrategy {
    /// One slot after another, head to feet
    #[default]
    Sequential,
    /// All four slots at once; equip order is not guaranteed
    Concurrent,
}

/// Who issued a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "user", rename_all = "snake_case")]
pub enum CommandOrigin {
    /// Relayed by the local supervisor; always authorized
    Supervisor,
    /// Public in-game chat
    Chat(String),
    /// Private in-game message
    Whisper(String),
}

impl CommandOrigin {
    /// The in-game sender, if any.
    pub fn user(&self) -> Option<&str> {
        match self {
            Self::Supervisor => None,
            Self::Chat(user) | Self::Whisper(user) => Some(user),
        }
    }
}
