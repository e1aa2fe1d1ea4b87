//! World events: everything the environment tells an agent.
//!
//! Events are published by a [`World`](crate::world::World) implementation
//! and consumed in one place by the agent runtime, which applies them to the
//! agent's state machine.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::entity::Entity;

/// All events a world can deliver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorldEvent {
    /// The agent entered the world
    Spawn,

    /// Health or hunger changed
    Health { health: f32, food: u32 },

    /// Some entity took damage
    EntityHurt { entity: Entity },

    /// An entity left perception range or died
    EntityGone { entity: Entity },

    /// Someone picked up an item
    PlayerCollect { collector: Entity },

    /// Public chat line
    Chat { username: String, message: String },

    /// Private message to this agent
    Whisper { username: String, message: String },

    /// Server removed the agent
    Kicked { reason: String },

    /// Transport closed
    Disconnect { reason: String },
}

/// A broadcast-based event bus for world events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<WorldEvent>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: WorldEvent) {
        // No subscribers is not an error
        let _ = self.sender.send(event);
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<WorldEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityKind, Vec3};

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(WorldEvent::EntityGone {
            entity: Entity::new(3, "Zombie1", EntityKind::HostileMob, Vec3::default()),
        });

        let event = rx.recv().await.unwrap();
        match event {
            WorldEvent::EntityGone { entity } => assert_eq!(entity.name, "Zombie1"),
            _ => panic!("Expected EntityGone event"),
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(WorldEvent::Kicked {
            reason: "no subscribers".into(),
        });
    }

    #[test]
    fn events_serialize_with_tag() {
        let json = serde_json::to_string(&WorldEvent::Health {
            health: 20.0,
            food: 4,
        })
        .unwrap();
        assert!(json.contains("\"event\":\"health\""));
    }
}
