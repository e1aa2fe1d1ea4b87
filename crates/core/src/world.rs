//! The world abstraction over the game client.
//!
//! A World is one agent's connection to the shared environment: it perceives
//! entities, executes movement goals, mutates equipment, and delivers events.
//! The agent's decision engine only ever talks to the environment through
//! this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::entity::{Entity, Player, Vec3};
use crate::error::WorldError;
use crate::event::WorldEvent;

/// Full hunger bar. An agent at this level cannot eat.
pub const FOOD_MAX: u32 = 20;

/// Equipment slots an item can be moved into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipSlot {
    Hand,
    Head,
    Torso,
    Legs,
    Feet,
}

impl std::fmt::Display for EquipSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Hand => "hand",
            Self::Head => "head",
            Self::Torso => "torso",
            Self::Legs => "legs",
            Self::Feet => "feet",
        };
        f.write_str(s)
    }
}

/// A movement goal handed to the world's pathing service.
#[derive(Debug, Clone, PartialEq)]
pub enum Goal {
    /// Reach any point within `range` of `position`.
    Near { position: Vec3, range: f64 },

    /// Stay within `range` of a (possibly moving) entity.
    Follow { entity: Entity, range: f64 },
}

impl Goal {
    /// The point the goal is anchored to.
    pub fn anchor(&self) -> Vec3 {
        match self {
            Self::Near { position, .. } => *position,
            Self::Follow { entity, .. } => entity.position,
        }
    }

    pub fn range(&self) -> f64 {
        match self {
            Self::Near { range, .. } | Self::Follow { range, .. } => *range,
        }
    }
}

/// How the pathing service is allowed to move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementProfile {
    pub can_dig: bool,
    pub allow_sprinting: bool,
    pub allow_parkour: bool,
}

impl Default for MovementProfile {
    fn default() -> Self {
        Self {
            can_dig: true,
            allow_sprinting: true,
            allow_parkour: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathStatus {
    /// Search budget ran out; pull the next segment to continue.
    Partial,
    Success,
    NoPath,
}

/// One step of an incremental path search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathSegment {
    pub status: PathStatus,

    /// Accumulated cost of the path found so far.
    pub cost: f64,
}

/// Incremental path search, yielding segments until a terminal status.
pub type PathSearch = Box<dyn Iterator<Item = PathSegment> + Send>;

/// An entry of the world's food registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodItem {
    /// Item id, used for inventory lookups and equip calls
    pub name: String,

    /// Human-readable name used in reports
    pub display_name: String,
}

impl FoodItem {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
        }
    }
}

/// The core World trait.
///
/// Perception methods are synchronous snapshots; actions are async and
/// suspend until the world has carried them out.
#[async_trait]
pub trait World: Send + Sync {
    /// Name the agent is logged in as.
    fn username(&self) -> &str;

    /// The agent's own entity, `None` until spawned.
    fn self_entity(&self) -> Option<Entity>;

    /// Every perceivable entity except the agent itself, nearest first.
    fn entities(&self) -> Vec<Entity>;

    /// Look up an online player by username.
    fn player(&self, username: &str) -> Option<Player>;

    /// Start a path search from `from` towards `goal`.
    fn find_path(&self, profile: &MovementProfile, from: Vec3, goal: &Goal) -> PathSearch;

    /// Move until the goal is satisfied or cancelled.
    async fn move_to(&self, goal: Goal) -> Result<(), WorldError>;

    /// Drop the active movement goal, if any.
    fn cancel_goal(&self);

    async fn equip(&self, item: &str, slot: EquipSlot) -> Result<(), WorldError>;

    /// Eat or drink whatever is held in the hand.
    async fn consume_held(&self) -> Result<(), WorldError>;

    fn inventory_count(&self, item: &str) -> u32;

    /// Known food items, in registry order.
    fn food_registry(&self) -> Vec<FoodItem>;

    fn health(&self) -> f32;

    /// Hunger bar, `0..=FOOD_MAX`.
    fn food(&self) -> u32;

    /// Whether a bow and ammunition are available.
    fn can_shoot(&self) -> bool;

    async fn shoot(&self, target: &Entity) -> Result<(), WorldError>;

    /// Put the best melee weapon in hand.
    async fn equip_melee(&self) -> Result<(), WorldError>;

    async fn strike(&self, target: &Entity) -> Result<(), WorldError>;

    async fn chat(&self, text: &str) -> Result<(), WorldError>;

    async fn whisper(&self, username: &str, text: &str) -> Result<(), WorldError>;

    /// Suspend for `ticks` world ticks.
    async fn wait_ticks(&self, ticks: u32);

    /// One-time starting gear acquisition after spawn.
    async fn prepare_loadout(&self) -> Result<(), WorldError> {
        Ok(()) // No-op default
    }

    /// Subscribe to the world's event stream.
    fn subscribe(&self) -> broadcast::Receiver<WorldEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityKind;

    #[test]
    fn goal_anchor_follows_entity() {
        let zombie = Entity::new(7, "Zombie1", EntityKind::HostileMob, Vec3::new(1.0, 2.0, 3.0));
        let goal = Goal::Follow {
            entity: zombie,
            range: 6.0,
        };
        assert_eq!(goal.anchor(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(goal.range(), 6.0);
    }

    #[test]
    fn slot_display_matches_wire_names() {
        assert_eq!(EquipSlot::Torso.to_string(), "torso");
        let json = serde_json::to_string(&EquipSlot::Feet).unwrap();
        assert_eq!(json, "\"feet\"");
    }
}
