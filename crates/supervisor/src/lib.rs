//! Fleet supervisor for Guardfleet.
//!
//! Launches guard agents as child processes or in-process tasks, relays
//! operator commands to them, keeps them alive and stops them on shutdown.

pub mod backoff;
pub mod console;
pub mod fleet;
pub mod launcher;
pub mod registry;

pub use backoff::{RestartPolicy, RestartTracker};
pub use console::{OperatorCommand, read_lines, stdin_lines};
pub use fleet::{FleetSettings, Supervisor};
pub use launcher::{
    AgentHandle, AgentLauncher, FleetEvent, ProcessLauncher, SandboxWorldFactory, TaskLauncher,
    WorldFactory,
};
pub use registry::SupervisorRegistry;
