//! The guard agent: decide what to fight, how to fight it, and how to stay
//! fed and armored while protecting a boss.
//!
//! An agent runs one cooperative loop:
//!
//! 1. **Receive** supervisor commands and world events
//! 2. **Apply** them to the agent's own state (rosters, target, flags)
//! 3. **Tick**: classify threats, engage or follow, once per world tick
//!
//! Everything the agent observes or does goes through the
//! [`World`](guardfleet_core::World) trait.

pub mod command;
pub mod engagement;
pub mod loop_runner;
pub mod maintenance;
pub mod reply;
pub mod stdio;
pub mod threat;

pub use command::{Command, is_authorized};
pub use engagement::{EngagementStrategist, EngagementTask, Modality, TravelModel};
pub use loop_runner::{GuardAgent, Stage};
pub use maintenance::{FeedOutcome, equip_armor, feed};
pub use reply::{ChatSink, RecordingSink, ReplySink, SupervisorSink, WhisperSink};
pub use stdio::{IpcBridge, bridge, stdio_bridge};
pub use threat::ThreatClassifier;
