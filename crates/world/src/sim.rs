//! In-memory world for tests and offline runs.

use async_trait::async_trait;
use guardfleet_core::entity::{Entity, EntityKind, Player, Vec3};
use guardfleet_core::error::WorldError;
use guardfleet_core::event::{EventBus, WorldEvent};
use guardfleet_core::world::{
    EquipSlot, FOOD_MAX, FoodItem, Goal, MovementProfile, PathSearch, PathSegment, PathStatus,
    World,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::debug;

/// Server tick length.
const TICK: Duration = Duration::from_millis(50);

/// Hunger restored by one consumed item.
const FOOD_PER_ITEM: u32 = 4;

/// Swords in the order `equip_melee` prefers them.
const SWORDS: [&str; 6] = [
    "netherite_sword",
    "diamond_sword",
    "iron_sword",
    "stone_sword",
    "golden_sword",
    "wooden_sword",
];

/// Everything an agent asked the world to do, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldAction {
    Move(Goal),
    CancelGoal,
    Equip { item: String, slot: EquipSlot },
    Consume { item: String },
    Shoot { target: String },
    EquipMelee,
    Strike { target: String },
    Chat(String),
    Whisper { username: String, text: String },
    PrepareLoadout,
}

struct SimState {
    me: Option<Entity>,
    entities: Vec<Entity>,
    online: HashSet<String>,
    inventory: HashMap<String, u32>,
    food_registry: Vec<FoodItem>,
    health: f32,
    food: u32,
    unreachable: HashSet<String>,
    partial_segments: usize,
    held: Option<String>,
    equipped: HashMap<EquipSlot, String>,
    active_goal: Option<Goal>,
    loadout: Vec<(String, u32)>,
    actions: Vec<WorldAction>,
}

/// A scriptable world that keeps all state in memory.
///
/// Movement is instantaneous, paths are straight lines costing their length,
/// and every action is appended to an action log for inspection.
pub struct SimWorld {
    username: String,
    state: Mutex<SimState>,
    events: EventBus,
}

impl SimWorld {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            state: Mutex::new(SimState {
                me: None,
                entities: Vec::new(),
                online: HashSet::new(),
                inventory: HashMap::new(),
                food_registry: default_food_registry(),
                health: 20.0,
                food: FOOD_MAX,
                unreachable: HashSet::new(),
                partial_segments: 0,
                held: None,
                equipped: HashMap::new(),
                active_goal: None,
                loadout: Vec::new(),
                actions: Vec::new(),
            }),
            events: EventBus::default(),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, SimState> {
        // A poisoned lock only means a test panicked mid-update; keep going.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ── Scripting ────────────────────────────────────────────────────────

    /// Place the agent in the world. Does not publish `Spawn`.
    pub fn spawn_at(&self, position: Vec3) {
        let me = Entity::new(0, self.username.clone(), EntityKind::Player, position);
        self.state().me = Some(me);
    }

    /// Add (or replace, by name) a perceivable entity.
    pub fn add_entity(&self, entity: Entity) {
        let mut state = self.state();
        state.entities.retain(|e| e.name != entity.name);
        if entity.kind == EntityKind::Player {
            state.online.insert(entity.name.clone());
        }
        state.entities.push(entity);
    }

    /// Remove an entity from perception and publish `EntityGone`.
    pub fn remove_entity(&self, name: &str) -> Option<Entity> {
        let removed = {
            let mut state = self.state();
            let index = state.entities.iter().position(|e| e.name == name)?;
            state.entities.remove(index)
        };
        self.events.publish(WorldEvent::EntityGone {
            entity: removed.clone(),
        });
        Some(removed)
    }

    pub fn move_entity(&self, name: &str, position: Vec3) {
        if let Some(e) = self.state().entities.iter_mut().find(|e| e.name == name) {
            e.position = position;
        }
    }

    /// Mark a player as online but out of view.
    pub fn set_online(&self, username: impl Into<String>) {
        self.state().online.insert(username.into());
    }

    pub fn give(&self, item: impl Into<String>, count: u32) {
        *self.state().inventory.entry(item.into()).or_insert(0) += count;
    }

    pub fn set_food(&self, food: u32) {
        self.state().food = food.min(FOOD_MAX);
    }

    pub fn set_health(&self, health: f32) {
        self.state().health = health;
    }

    pub fn set_food_registry(&self, registry: Vec<FoodItem>) {
        self.state().food_registry = registry;
    }

    /// Paths that start at or lead to this entity find no route.
    pub fn mark_unreachable(&self, name: impl Into<String>) {
        self.state().unreachable.insert(name.into());
    }

    /// Emit this many `Partial` segments before each terminal segment.
    pub fn set_partial_segments(&self, count: usize) {
        self.state().partial_segments = count;
    }

    /// Items granted by `prepare_loadout`.
    pub fn set_loadout(&self, items: Vec<(String, u32)>) {
        self.state().loadout = items;
    }

    /// Publish an event to subscribers.
    pub fn emit(&self, event: WorldEvent) {
        self.events.publish(event);
    }

    // ── Inspection ───────────────────────────────────────────────────────

    pub fn actions(&self) -> Vec<WorldAction> {
        self.state().actions.clone()
    }

    pub fn clear_actions(&self) {
        self.state().actions.clear();
    }

    pub fn position(&self) -> Option<Vec3> {
        self.state().me.as_ref().map(|e| e.position)
    }

    pub fn equipped(&self, slot: EquipSlot) -> Option<String> {
        self.state().equipped.get(&slot).cloned()
    }

    pub fn active_goal(&self) -> Option<Goal> {
        self.state().active_goal.clone()
    }

    pub fn entity(&self, name: &str) -> Option<Entity> {
        self.state().entities.iter().find(|e| e.name == name).cloned()
    }

    fn record(&self, action: WorldAction) {
        debug!(agent = %self.username, ?action, "sim action");
        self.state().actions.push(action);
    }
}

fn default_food_registry() -> Vec<FoodItem> {
    [
        ("apple", "Apple"),
        ("bread", "Bread"),
        ("cooked_beef", "Steak"),
        ("cooked_chicken", "Cooked Chicken"),
        ("cooked_mutton", "Cooked Mutton"),
        ("golden_carrot", "Golden Carrot"),
        ("porkchop", "Raw Porkchop"),
    ]
    .into_iter()
    .map(|(name, display)| FoodItem::new(name, display))
    .collect()
}

/// Point on the segment `from → to` that sits `range` away from `to`.
fn approach(from: Vec3, to: Vec3, range: f64) -> Vec3 {
    let distance = from.distance_to(&to);
    if distance <= range {
        return from;
    }
    let t = (distance - range) / distance;
    Vec3::new(
        from.x + (to.x - from.x) * t,
        from.y + (to.y - from.y) * t,
        from.z + (to.z - from.z) * t,
    )
}

#[async_trait]
impl World for SimWorld {
    fn username(&self) -> &str {
        &self.username
    }

    fn self_entity(&self) -> Option<Entity> {
        self.state().me.clone()
    }

    fn entities(&self) -> Vec<Entity> {
        let state = self.state();
        let mut entities = state.entities.clone();
        if let Some(me) = &state.me {
            entities.sort_by(|a, b| {
                a.distance_to(&me.position)
                    .partial_cmp(&b.distance_to(&me.position))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
        entities
    }

    fn player(&self, username: &str) -> Option<Player> {
        let state = self.state();
        let entity = state
            .entities
            .iter()
            .find(|e| e.kind == EntityKind::Player && e.name == username)
            .cloned();
        if entity.is_none() && !state.online.contains(username) {
            return None;
        }
        Some(Player {
            username: username.to_string(),
            entity,
        })
    }

    fn find_path(&self, _profile: &MovementProfile, from: Vec3, goal: &Goal) -> PathSearch {
        let state = self.state();
        let blocked = state.unreachable.iter().any(|name| {
            let at_start = state
                .entities
                .iter()
                .any(|e| &e.name == name && e.position == from);
            let is_goal = matches!(goal, Goal::Follow { entity, .. } if &entity.name == name);
            at_start || is_goal
        });

        let total = (from.distance_to(&goal.anchor()) - goal.range()).max(0.0);
        let partials = state.partial_segments;
        let mut segments: Vec<PathSegment> = (1..=partials)
            .map(|i| PathSegment {
                status: PathStatus::Partial,
                cost: total * i as f64 / (partials + 1) as f64,
            })
            .collect();
        segments.push(if blocked {
            PathSegment {
                status: PathStatus::NoPath,
                cost: 0.0,
            }
        } else {
            PathSegment {
                status: PathStatus::Success,
                cost: total,
            }
        });
        Box::new(segments.into_iter())
    }

    async fn move_to(&self, goal: Goal) -> Result<(), WorldError> {
        self.record(WorldAction::Move(goal.clone()));
        {
            let mut state = self.state();
            let Some(me) = state.me.as_mut() else {
                return Err(WorldError::NotSpawned);
            };
            me.position = approach(me.position, goal.anchor(), goal.range());
            state.active_goal = Some(goal);
        }
        tokio::task::yield_now().await;

        let mut state = self.state();
        if state.active_goal.take().is_none() {
            return Err(WorldError::GoalCancelled);
        }
        Ok(())
    }

    fn cancel_goal(&self) {
        let mut state = self.state();
        state.active_goal = None;
        state.actions.push(WorldAction::CancelGoal);
    }

    async fn equip(&self, item: &str, slot: EquipSlot) -> Result<(), WorldError> {
        self.record(WorldAction::Equip {
            item: item.to_string(),
            slot,
        });
        let mut state = self.state();
        if state.inventory.get(item).copied().unwrap_or(0) == 0 {
            return Err(WorldError::MissingItem(item.to_string()));
        }
        if slot == EquipSlot::Hand {
            state.held = Some(item.to_string());
        }
        state.equipped.insert(slot, item.to_string());
        Ok(())
    }

    async fn consume_held(&self) -> Result<(), WorldError> {
        let mut state = self.state();
        let Some(item) = state.held.clone() else {
            return Err(WorldError::ActionFailed {
                action: "consume".into(),
                reason: "nothing in hand".into(),
            });
        };
        let count = state.inventory.entry(item.clone()).or_insert(0);
        if *count == 0 {
            return Err(WorldError::MissingItem(item));
        }
        *count -= 1;
        if *count == 0 {
            state.held = None;
        }
        state.food = (state.food + FOOD_PER_ITEM).min(FOOD_MAX);
        state.actions.push(WorldAction::Consume { item });
        Ok(())
    }

    fn inventory_count(&self, item: &str) -> u32 {
        self.state().inventory.get(item).copied().unwrap_or(0)
    }

    fn food_registry(&self) -> Vec<FoodItem> {
        self.state().food_registry.clone()
    }

    fn health(&self) -> f32 {
        self.state().health
    }

    fn food(&self) -> u32 {
        self.state().food
    }

    fn can_shoot(&self) -> bool {
        self.inventory_count("bow") > 0 && self.inventory_count("arrow") > 0
    }

    async fn shoot(&self, target: &Entity) -> Result<(), WorldError> {
        if !self.can_shoot() {
            return Err(WorldError::MissingItem("arrow".into()));
        }
        if let Some(arrows) = self.state().inventory.get_mut("arrow") {
            *arrows -= 1;
        }
        self.record(WorldAction::Shoot {
            target: target.name.clone(),
        });
        Ok(())
    }

    async fn equip_melee(&self) -> Result<(), WorldError> {
        self.record(WorldAction::EquipMelee);
        let mut state = self.state();
        let best = SWORDS
            .iter()
            .find(|s| state.inventory.get(**s).copied().unwrap_or(0) > 0)
            .map(|s| s.to_string());
        if let Some(sword) = best {
            state.equipped.insert(EquipSlot::Hand, sword.clone());
            state.held = Some(sword);
        }
        Ok(())
    }

    async fn strike(&self, target: &Entity) -> Result<(), WorldError> {
        self.record(WorldAction::Strike {
            target: target.name.clone(),
        });
        Ok(())
    }

    async fn chat(&self, text: &str) -> Result<(), WorldError> {
        self.record(WorldAction::Chat(text.to_string()));
        Ok(())
    }

    async fn whisper(&self, username: &str, text: &str) -> Result<(), WorldError> {
        self.record(WorldAction::Whisper {
            username: username.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn wait_ticks(&self, ticks: u32) {
        tokio::time::sleep(TICK * ticks).await;
    }

    async fn prepare_loadout(&self) -> Result<(), WorldError> {
        self.record(WorldAction::PrepareLoadout);
        let loadout = self.state().loadout.clone();
        for (item, count) in loadout {
            self.give(item, count);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<WorldEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zombie(x: f64) -> Entity {
        Entity::new(2, "Zombie1", EntityKind::HostileMob, Vec3::new(x, 0.0, 0.0))
    }

    #[test]
    fn entities_are_nearest_first() {
        let world = SimWorld::new("guard_0");
        world.spawn_at(Vec3::default());
        world.add_entity(Entity::new(1, "Far", EntityKind::PassiveMob, Vec3::new(30.0, 0.0, 0.0)));
        world.add_entity(Entity::new(3, "Near", EntityKind::PassiveMob, Vec3::new(2.0, 0.0, 0.0)));

        let names: Vec<_> = world.entities().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["Near", "Far"]);
    }

    #[test]
    fn straight_line_path_costs_distance_minus_range() {
        let world = SimWorld::new("guard_0");
        world.set_partial_segments(2);
        let goal = Goal::Near {
            position: Vec3::default(),
            range: 4.0,
        };
        let segments: Vec<_> = world
            .find_path(&MovementProfile::default(), Vec3::new(14.0, 0.0, 0.0), &goal)
            .collect();

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].status, PathStatus::Partial);
        assert_eq!(segments[2].status, PathStatus::Success);
        assert!((segments[2].cost - 10.0).abs() < 1e-9);
    }

    #[test]
    fn unreachable_entity_has_no_path() {
        let world = SimWorld::new("guard_0");
        world.add_entity(zombie(20.0));
        world.mark_unreachable("Zombie1");
        let goal = Goal::Near {
            position: Vec3::default(),
            range: 4.0,
        };
        let last = world
            .find_path(&MovementProfile::default(), Vec3::new(20.0, 0.0, 0.0), &goal)
            .last()
            .unwrap();
        assert_eq!(last.status, PathStatus::NoPath);
    }

    #[tokio::test]
    async fn move_to_stops_at_goal_range() {
        let world = SimWorld::new("guard_0");
        world.spawn_at(Vec3::default());
        world
            .move_to(Goal::Follow {
                entity: zombie(10.0),
                range: 6.0,
            })
            .await
            .unwrap();

        let pos = world.position().unwrap();
        assert!((pos.x - 4.0).abs() < 1e-9);
        assert!(world.active_goal().is_none());
    }

    #[tokio::test]
    async fn consume_requires_held_item() {
        let world = SimWorld::new("guard_0");
        assert!(world.consume_held().await.is_err());

        world.give("bread", 1);
        world.set_food(10);
        world.equip("bread", EquipSlot::Hand).await.unwrap();
        world.consume_held().await.unwrap();
        assert_eq!(world.inventory_count("bread"), 0);
        assert_eq!(world.food(), 14);
    }

    #[test]
    fn offline_player_resolves_without_entity() {
        let world = SimWorld::new("guard_0");
        world.set_online("Alice");
        let alice = world.player("Alice").unwrap();
        assert!(alice.entity.is_none());
        assert!(world.player("Bob").is_none());
    }

    #[tokio::test]
    async fn removing_entity_publishes_gone() {
        let world = SimWorld::new("guard_0");
        let mut rx = world.subscribe();
        world.add_entity(zombie(3.0));
        world.remove_entity("Zombie1");

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, WorldEvent::EntityGone { entity } if entity.name == "Zombie1"));
    }
}
