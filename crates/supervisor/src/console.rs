//! Operator console: line commands typed at the supervisor's terminal.
//!
//! `@<agent> <command...>` relays a command to one agent. Everything else is
//! handled by the supervisor itself.

use tokio::io::{self, AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::warn;

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    Relay { agent: String, command: Vec<String> },
    Ping,
    Spawn(Option<u32>),
    List,
    Unknown(String),
}

impl OperatorCommand {
    /// Parse a console line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace();
        let first = tokens.next()?;

        if let Some(agent) = first.strip_prefix('@') {
            return Some(Self::Relay {
                agent: agent.to_string(),
                command: tokens.map(str::to_string).collect(),
            });
        }

        Some(match first {
            "ping" => Self::Ping,
            "spawn" => Self::Spawn(tokens.next().and_then(|n| n.parse().ok())),
            "list" => Self::List,
            other => Self::Unknown(other.to_string()),
        })
    }
}

/// Read lines from stdin until EOF.
pub fn stdin_lines() -> mpsc::Receiver<String> {
    read_lines(io::stdin())
}

/// Forward non-empty trimmed lines from `reader`. The receiver closes on EOF
/// or a read error.
pub fn read_lines<R>(reader: R) -> mpsc::Receiver<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(32);

    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim().to_string();
                    if line.is_empty() {
                        continue;
                    }
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Console read failed");
                    break;
                }
            }
        }
    });

    rx
}
