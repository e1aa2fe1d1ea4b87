//! Offline sandbox scene for running a single agent without a server.

use guardfleet_core::entity::{Entity, EntityKind, Vec3};
use guardfleet_core::world::World;

use crate::sim::SimWorld;

/// Build a small scene: the agent at the origin, the first boss a few blocks
/// away, and one hostile mob wandering at the edge of the guard radius.
///
/// The agent is already placed in the world; callers that need a `Spawn`
/// event should publish it after subscribing.
pub fn sandbox_world(username: &str, bosses: &[String]) -> SimWorld {
    let world = SimWorld::new(username);
    world.spawn_at(Vec3::new(0.0, 64.0, 0.0));
    world.set_loadout(vec![
        ("iron_sword".into(), 1),
        ("bow".into(), 1),
        ("arrow".into(), 32),
        ("bread".into(), 5),
        ("cooked_beef".into(), 5),
        ("iron_helmet".into(), 1),
        ("leather_chestplate".into(), 1),
        ("iron_leggings".into(), 1),
        ("leather_boots".into(), 1),
    ]);

    if let Some(boss) = bosses.first() {
        world.add_entity(Entity::new(
            1,
            boss.clone(),
            EntityKind::Player,
            Vec3::new(6.0, 64.0, 0.0),
        ));
    }
    world.add_entity(Entity::new(
        2,
        "Zombie",
        EntityKind::HostileMob,
        Vec3::new(18.0, 64.0, 6.0),
    ));

    tracing::info!(agent = %world.username(), bosses = bosses.len(), "Sandbox world ready");
    world
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sandbox_places_first_boss() {
        let world = sandbox_world("guard_0", &["Alice".to_string(), "Bob".to_string()]);
        assert!(world.self_entity().is_some());
        assert!(world.player("Alice").and_then(|p| p.entity).is_some());
        assert!(world.player("Bob").is_none());
    }

    #[tokio::test]
    async fn loadout_is_granted_on_request() {
        let world = sandbox_world("guard_0", &[]);
        assert_eq!(world.inventory_count("bread"), 0);
        world.prepare_loadout().await.unwrap();
        assert_eq!(world.inventory_count("bread"), 5);
        assert!(world.can_shoot());
    }
}
