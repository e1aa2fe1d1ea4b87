//! Error types for the Guardfleet domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Guardfleet operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- World errors ---
    #[error("World error: {0}")]
    World(#[from] WorldError),

    // --- Engagement errors ---
    #[error("Engagement error: {0}")]
    Engagement(#[from] EngagementError),

    // --- Agent runtime errors ---
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    // --- Supervisor errors ---
    #[error("Supervisor error: {0}")]
    Supervisor(#[from] SupervisorError),

    // --- Inter-process channel errors ---
    #[error("IPC error: {0}")]
    Ipc(#[from] IpcError),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures reported by a [`World`](crate::world::World) implementation.
#[derive(Debug, Clone, Error)]
pub enum WorldError {
    #[error("Not spawned yet")]
    NotSpawned,

    #[error("Item not in inventory: {0}")]
    MissingItem(String),

    #[error("Movement goal cancelled")]
    GoalCancelled,

    #[error("{action} failed: {reason}")]
    ActionFailed { action: String, reason: String },

    #[error("Connection lost: {0}")]
    Disconnected(String),
}

#[derive(Debug, Error)]
pub enum EngagementError {
    #[error("No route between {target} and the agent")]
    NoRoute { target: String },

    #[error(transparent)]
    World(#[from] WorldError),
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Disconnected from world: {0}")]
    Disconnected(String),

    #[error("Supervisor channel closed")]
    SupervisorGone,

    #[error(transparent)]
    World(#[from] WorldError),
}

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("Failed to launch agent {name}: {reason}")]
    LaunchFailed { name: String, reason: String },

    #[error("Couldn't find agent named \"{0}\".")]
    UnknownAgent(String),

    #[error("Agent {name} is not accepting commands")]
    AgentUnreachable { name: String },

    #[error("Agent {name} is not keeping up with commands")]
    AgentBusy { name: String },
}

#[derive(Debug, Error)]
pub enum IpcError {
    #[error("Malformed IPC line: {0}")]
    Malformed(#[from] serde_json::Error),
}
