//! World implementations for Guardfleet.
//!
//! The real game-protocol client lives outside this workspace. What ships
//! here is an in-memory world: deterministic, fully scriptable, and recording
//! every action an agent takes. It backs the test-suite and the agent
//! binary's offline sandbox.

pub mod sandbox;
pub mod sim;

pub use sandbox::sandbox_world;
pub use sim::{SimWorld, WorldAction};
