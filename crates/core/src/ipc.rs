//! Inter-process channel wire types.
//!
//! The supervisor and each agent exchange newline-delimited JSON objects:
//!
//! ```text
//! supervisor → agent   {"type":"command","command":["guard","Alice"]}
//! agent → supervisor   {"type":"message","text":"pong"}
//! ```

use serde::{Deserialize, Serialize};

use crate::error::IpcError;

/// Messages the supervisor sends to an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SupervisorMessage {
    Command { command: Vec<String> },
}

impl SupervisorMessage {
    pub fn command<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Command {
            command: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// The `stop` command broadcast on shutdown.
    pub fn stop() -> Self {
        Self::command(["stop"])
    }
}

/// Messages an agent sends to the supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentMessage {
    Message { text: String },
}

impl AgentMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Message { text: text.into() }
    }
}

/// Encode a message as one line (trailing newline included).
pub fn encode_line<T: Serialize>(message: &T) -> Result<String, IpcError> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}

/// Decode one line. Surrounding whitespace is ignored.
pub fn decode_line<T: for<'de> Deserialize<'de>>(line: &str) -> Result<T, IpcError> {
    Ok(serde_json::from_str(line.trim())?)
}
