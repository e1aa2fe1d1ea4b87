//! Perceived entities and positions.

use serde::{Deserialize, Serialize};

/// A position in world space (blocks).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.x, self.y, self.z)
    }
}

/// Broad classification the world assigns to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Player,
    HostileMob,
    PassiveMob,
    Other,
}

/// A snapshot of one entity as perceived by an agent.
///
/// `name` is the player's username or the mob's display name; it is the key
/// used by the target and boss lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// World-assigned runtime id
    pub id: u32,

    pub name: String,

    pub kind: EntityKind,

    pub position: Vec3,
}

impl Entity {
    pub fn new(id: u32, name: impl Into<String>, kind: EntityKind, position: Vec3) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            position,
        }
    }

    pub fn is_hostile_mob(&self) -> bool {
        self.kind == EntityKind::HostileMob
    }

    pub fn distance_to(&self, position: &Vec3) -> f64 {
        self.position.distance_to(position)
    }
}

/// A player known to the server.
///
/// A player can be online without being in view, in which case `entity` is
/// `None` and no position is available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub username: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<Entity>,
}

impl Player {
    /// Live position, if the player is currently perceivable.
    pub fn position(&self) -> Option<Vec3> {
        self.entity.as_ref().map(|e| e.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_euclidean() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(3.0, 4.0, 0.0);
        assert!((a.distance_to(&b) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn player_out_of_view_has_no_position() {
        let player = Player {
            username: "Alice".into(),
            entity: None,
        };
        assert!(player.position().is_none());
    }

    #[test]
    fn entity_kind_serializes_snake_case() {
        let json = serde_json::to_string(&EntityKind::HostileMob).unwrap();
        assert_eq!(json, "\"hostile_mob\"");
    }
}
