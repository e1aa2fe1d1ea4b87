//! Reply sinks, where command output goes.
//!
//! A command's response text is streamed to whoever issued it: the
//! supervisor over IPC, public chat, or a whisper back to the sender.

use std::sync::Arc;

use async_trait::async_trait;
use guardfleet_core::ipc::AgentMessage;
use guardfleet_core::world::World;
use tokio::sync::mpsc;
use tracing::warn;

/// Receives response text line by line.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn reply(&self, text: &str);
}

/// Replies travel to the supervisor as `message` IPC messages.
#[derive(Clone)]
pub struct SupervisorSink {
    outbox: mpsc::Sender<AgentMessage>,
}

impl SupervisorSink {
    pub fn new(outbox: mpsc::Sender<AgentMessage>) -> Self {
        Self { outbox }
    }
}

#[async_trait]
impl ReplySink for SupervisorSink {
    async fn reply(&self, text: &str) {
        if self.outbox.send(AgentMessage::text(text)).await.is_err() {
            warn!("Supervisor outbox closed, dropping reply: {text}");
        }
    }
}

/// Replies are said in public chat.
pub struct ChatSink {
    world: Arc<dyn World>,
}

impl ChatSink {
    pub fn new(world: Arc<dyn World>) -> Self {
        Self { world }
    }
}

#[async_trait]
impl ReplySink for ChatSink {
    async fn reply(&self, text: &str) {
        if let Err(e) = self.world.chat(text).await {
            warn!(error = %e, "Chat reply failed");
        }
    }
}

/// Replies are whispered back to one user.
pub struct WhisperSink {
    world: Arc<dyn World>,
    username: String,
}

impl WhisperSink {
    pub fn new(world: Arc<dyn World>, username: impl Into<String>) -> Self {
        Self {
            world,
            username: username.into(),
        }
    }
}

#[async_trait]
impl ReplySink for WhisperSink {
    async fn reply(&self, text: &str) {
        if let Err(e) = self.world.whisper(&self.username, text).await {
            warn!(error = %e, user = %self.username, "Whisper reply failed");
        }
    }
}

/// Collects replies in memory.
#[derive(Default)]
pub struct RecordingSink {
    lines: std::sync::Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ReplySink for RecordingSink {
    async fn reply(&self, text: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(text.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guardfleet_world::{SimWorld, WorldAction};

    #[tokio::test]
    async fn supervisor_sink_emits_message() {
        let (tx, mut rx) = mpsc::channel(4);
        SupervisorSink::new(tx).reply("pong").await;
        assert_eq!(rx.recv().await, Some(AgentMessage::text("pong")));
    }

    #[tokio::test]
    async fn whisper_sink_targets_sender() {
        let world = Arc::new(SimWorld::new("guard_0"));
        WhisperSink::new(world.clone(), "Alice").reply("pong").await;
        assert_eq!(
            world.actions(),
            vec![WorldAction::Whisper {
                username: "Alice".into(),
                text: "pong".into()
            }]
        );
    }
}
