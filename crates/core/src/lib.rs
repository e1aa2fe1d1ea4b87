//! # Guardfleet Core
//!
//! Domain types, traits, and error definitions for the Guardfleet guard-agent
//! runtime. This crate has **no runtime logic**; it defines the domain model
//! that the agent, world and supervisor crates implement against.
//!
//! ## Design Philosophy
//!
//! The game client is an external collaborator. Everything an agent can see
//! or do goes through the [`World`] trait defined here, so that:
//! - The decision engine can be tested against a scripted world
//! - A real protocol client can be dropped in without touching agent logic
//! - All crates depend inward on core

pub mod agent;
pub mod entity;
pub mod error;
pub mod event;
pub mod ipc;
pub mod roster;
pub mod world;

// Re-export key types at crate root for ergonomics
pub use agent::{ArmorStrategy, CommandOrigin, GuardState};
pub use entity::{Entity, EntityKind, Player, Vec3};
pub use error::{Error, Result};
pub use event::{EventBus, WorldEvent};
pub use ipc::{AgentMessage, SupervisorMessage};
pub use roster::{BossList, TargetList};
pub use world::{EquipSlot, FoodItem, Goal, PathSearch, PathSegment, PathStatus, World};
