//! Self-maintenance: eating and wearing the best armor available.

use futures::future::join_all;
use guardfleet_core::agent::ArmorStrategy;
use guardfleet_core::error::WorldError;
use guardfleet_core::world::{EquipSlot, FOOD_MAX, World};
use tracing::{debug, info};

use crate::reply::ReplySink;

// Armor in order of preference, best first.
pub const HELMETS: [&str; 5] = [
    "netherite_helmet",
    "diamond_helmet",
    "iron_helmet",
    "golden_helmet",
    "leather_helmet",
];
pub const CHESTPLATES: [&str; 5] = [
    "netherite_chestplate",
    "diamond_chestplate",
    "iron_chestplate",
    "golden_chestplate",
    "leather_chestplate",
];
pub const LEGGINGS: [&str; 5] = [
    "netherite_leggings",
    "diamond_leggings",
    "iron_leggings",
    "golden_leggings",
    "leather_leggings",
];
pub const BOOTS: [&str; 5] = [
    "netherite_boots",
    "diamond_boots",
    "iron_boots",
    "golden_boots",
    "leather_boots",
];

/// Armor slots in equip order.
pub const ARMOR_SLOTS: [EquipSlot; 4] = [
    EquipSlot::Head,
    EquipSlot::Torso,
    EquipSlot::Legs,
    EquipSlot::Feet,
];

/// What a feeding attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedOutcome {
    TooFull,
    Ate { item: String },
    OutOfFood,
}

/// Whether the hunger bar is low enough to eat unprompted.
pub fn is_hungry(food: u32, hunger_limit: u32) -> bool {
    food <= hunger_limit
}

/// Eat at most one item, reporting progress to `sink`.
pub async fn feed(world: &dyn World, sink: &dyn ReplySink) -> Result<FeedOutcome, WorldError> {
    if world.food() >= FOOD_MAX {
        sink.reply("too full to eat").await;
        return Ok(FeedOutcome::TooFull);
    }

    for food in world.food_registry() {
        let amount = world.inventory_count(&food.name);
        if amount == 0 {
            continue;
        }

        sink.reply(&format!("found {amount} {}", food.display_name)).await;
        world.equip(&food.name, EquipSlot::Hand).await?;
        world.consume_held().await?;
        sink.reply(&format!("ate 1 {}", food.display_name)).await;
        info!(item = %food.name, food = world.food(), "Ate");

        return Ok(FeedOutcome::Ate { item: food.name });
    }

    sink.reply("out of food").await;
    Ok(FeedOutcome::OutOfFood)
}

/// Priority list for an armor slot. The hand has none.
pub fn armor_priority(slot: EquipSlot) -> &'static [&'static str] {
    match slot {
        EquipSlot::Head => &HELMETS,
        EquipSlot::Torso => &CHESTPLATES,
        EquipSlot::Legs => &LEGGINGS,
        EquipSlot::Feet => &BOOTS,
        EquipSlot::Hand => &[],
    }
}

/// Best piece in the inventory for `slot`.
pub fn best_armor(world: &dyn World, slot: EquipSlot) -> Option<&'static str> {
    armor_priority(slot)
        .iter()
        .copied()
        .find(|item| world.inventory_count(item) > 0)
}

async fn equip_slot(
    world: &dyn World,
    slot: EquipSlot,
) -> Result<Option<(EquipSlot, &'static str)>, WorldError> {
    let Some(item) = best_armor(world, slot) else {
        return Ok(None);
    };
    world.equip(item, slot).await?;
    debug!(%slot, item, "Equipped armor");
    Ok(Some((slot, item)))
}

/// Fill every armor slot with the best piece available.
///
/// Slots with nothing available are left as they are. Returns what was
/// equipped, in slot order.
pub async fn equip_armor(
    world: &dyn World,
    strategy: ArmorStrategy,
) -> Result<Vec<(EquipSlot, &'static str)>, WorldError> {
    let results = match strategy {
        ArmorStrategy::Sequential => {
            let mut results = Vec::with_capacity(ARMOR_SLOTS.len());
            for slot in ARMOR_SLOTS {
                results.push(equip_slot(world, slot).await);
            }
            results
        }
        ArmorStrategy::Concurrent => {
            join_all(ARMOR_SLOTS.map(|slot| equip_slot(world, slot))).await
        }
    };

    let mut equipped = Vec::new();
    for result in results {
        if let Some(pair) = result? {
            equipped.push(pair);
        }
    }
    Ok(equipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reply::RecordingSink;
    use guardfleet_world::{SimWorld, WorldAction};

    #[tokio::test]
    async fn full_agent_does_not_eat() {
        let world = SimWorld::new("guard_0");
        world.give("bread", 3);
        let sink = RecordingSink::new();

        let outcome = feed(&world, &sink).await.unwrap();
        assert_eq!(outcome, FeedOutcome::TooFull);
        assert_eq!(sink.lines(), vec!["too full to eat"]);
        assert!(world.actions().is_empty());
    }

    #[tokio::test]
    async fn eats_first_registry_item_only() {
        let world = SimWorld::new("guard_0");
        world.set_food(3);
        world.give("cooked_beef", 2);
        world.give("bread", 5);
        let sink = RecordingSink::new();

        // Registry order puts bread before cooked beef.
        let outcome = feed(&world, &sink).await.unwrap();
        assert_eq!(
            outcome,
            FeedOutcome::Ate {
                item: "bread".into()
            }
        );
        assert_eq!(sink.lines(), vec!["found 5 Bread", "ate 1 Bread"]);
        assert_eq!(world.inventory_count("bread"), 4);
        assert_eq!(world.inventory_count("cooked_beef"), 2);
        assert_eq!(
            world.actions(),
            vec![
                WorldAction::Equip {
                    item: "bread".into(),
                    slot: EquipSlot::Hand
                },
                WorldAction::Consume {
                    item: "bread".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn reports_out_of_food() {
        let world = SimWorld::new("guard_0");
        world.set_food(2);
        let sink = RecordingSink::new();

        assert_eq!(feed(&world, &sink).await.unwrap(), FeedOutcome::OutOfFood);
        assert_eq!(sink.lines(), vec!["out of food"]);
    }

    #[test]
    fn hunger_threshold_is_inclusive() {
        assert!(is_hungry(5, 5));
        assert!(!is_hungry(6, 5));
    }

    #[tokio::test]
    async fn higher_tier_helmet_wins() {
        let world = SimWorld::new("guard_0");
        world.give("leather_helmet", 1);
        world.give("iron_helmet", 1);

        let equipped = equip_armor(&world, ArmorStrategy::Sequential).await.unwrap();
        assert_eq!(equipped, vec![(EquipSlot::Head, "iron_helmet")]);
        assert_eq!(world.equipped(EquipSlot::Head).as_deref(), Some("iron_helmet"));
        assert!(world.equipped(EquipSlot::Torso).is_none());
    }

    #[tokio::test]
    async fn sequential_equips_head_to_feet() {
        let world = SimWorld::new("guard_0");
        world.give("golden_boots", 1);
        world.give("diamond_leggings", 1);
        world.give("leather_chestplate", 1);
        world.give("netherite_helmet", 1);

        equip_armor(&world, ArmorStrategy::Sequential).await.unwrap();
        let order: Vec<_> = world
            .actions()
            .into_iter()
            .filter_map(|a| match a {
                WorldAction::Equip { slot, .. } => Some(slot),
                _ => None,
            })
            .collect();
        assert_eq!(order, ARMOR_SLOTS.to_vec());
    }

    #[tokio::test]
    async fn concurrent_fills_same_slots() {
        let world = SimWorld::new("guard_0");
        world.give("iron_chestplate", 1);
        world.give("diamond_chestplate", 1);
        world.give("leather_boots", 1);

        let mut equipped = equip_armor(&world, ArmorStrategy::Concurrent).await.unwrap();
        equipped.sort_by_key(|(slot, _)| slot.to_string());
        assert_eq!(
            equipped,
            vec![
                (EquipSlot::Feet, "leather_boots"),
                (EquipSlot::Torso, "diamond_chestplate"),
            ]
        );
    }
}
