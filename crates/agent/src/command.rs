//! Agent command processor.
//!
//! Commands arrive as token lists from the supervisor, public chat, or a
//! whisper. Chat and whisper senders must be on the boss list; anything else
//! is dropped without a reply.

use guardfleet_core::agent::{ArmorStrategy, CommandOrigin};
use guardfleet_core::roster::BossList;
use guardfleet_core::world::World;
use tracing::{debug, info, warn};

use crate::loop_runner::GuardAgent;
use crate::maintenance;
use crate::reply::ReplySink;

/// A parsed agent command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Continue,
    Eat,
    Guard(String),
    Ping,
    Status,
    Stop,
    EquipArmor(ArmorStrategy),
    Unknown,
}

impl Command {
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Self {
        let mut tokens = tokens.iter().map(AsRef::as_ref);
        match tokens.next() {
            Some("continue") => Self::Continue,
            Some("eat") => Self::Eat,
            Some("guard") => Self::Guard(tokens.next().unwrap_or_default().to_string()),
            Some("ping") => Self::Ping,
            Some("status") => Self::Status,
            Some("stop") => Self::Stop,
            Some("equiparmor") => match tokens.next() {
                Some("fast") => Self::EquipArmor(ArmorStrategy::Concurrent),
                _ => Self::EquipArmor(ArmorStrategy::Sequential),
            },
            _ => Self::Unknown,
        }
    }
}

/// Whether `origin` may command this agent.
pub fn is_authorized(origin: &CommandOrigin, bosses: &BossList) -> bool {
    match origin.user() {
        None => true,
        Some(user) => bosses.contains(user),
    }
}

impl GuardAgent {
    /// Run one command, replying through `sink`.
    ///
    /// Returns `false` when the command was dropped for lack of
    /// authorization.
    pub async fn run_command<S: AsRef<str>>(
        &mut self,
        tokens: &[S],
        origin: &CommandOrigin,
        sink: &dyn ReplySink,
    ) -> bool {
        if !is_authorized(origin, &self.bosses) {
            debug!(agent = %self.name, ?origin, "Ignoring command from unauthorized sender");
            return false;
        }

        let command = Command::parse(tokens);
        info!(agent = %self.name, ?command, ?origin, "Running command");

        match command {
            Command::Continue => self.guarding = true,
            Command::Eat => {
                if let Err(e) = maintenance::feed(self.world.as_ref(), sink).await {
                    warn!(agent = %self.name, error = %e, "Eating failed");
                }
            }
            Command::Guard(username) => match self.world.player(&username) {
                Some(player) => {
                    info!(agent = %self.name, target = %player.username, "Now guarding");
                    self.protected = Some(player.username);
                }
                None => sink.reply(&format!("Player \"{username}\" does not exist.")).await,
            },
            Command::Ping => sink.reply("pong").await,
            Command::Status => {
                let status = format!("❤{} 🥕{}", self.world.health(), self.world.food());
                sink.reply(&status).await;
            }
            Command::Stop => {
                sink.reply("Stopping.").await;
                self.world.cancel_goal();
                self.guarding = false;
            }
            Command::EquipArmor(strategy) => {
                match maintenance::equip_armor(self.world.as_ref(), strategy).await {
                    Ok(equipped) if equipped.is_empty() => sink.reply("no armor to equip").await,
                    Ok(equipped) => {
                        let items: Vec<_> = equipped.iter().map(|(_, item)| *item).collect();
                        sink.reply(&format!("equipped {}", items.join(", "))).await;
                    }
                    Err(e) => {
                        warn!(agent = %self.name, error = %e, "Equipping armor failed");
                        sink.reply(&e.to_string()).await;
                    }
                }
            }
            Command::Unknown => sink.reply("Unknown command.").await,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reply::RecordingSink;
    use guardfleet_config::AgentSettings;
    use guardfleet_core::entity::{Entity, EntityKind, Vec3};
    use guardfleet_core::roster::TargetList;
    use guardfleet_world::{SimWorld, WorldAction};
    use std::sync::Arc;

    fn agent() -> (Arc<SimWorld>, GuardAgent) {
        let world = Arc::new(SimWorld::new("guard_0"));
        world.spawn_at(Vec3::default());
        let agent = GuardAgent::new(
            world.clone(),
            BossList::new(["Alice"]),
            TargetList::new(),
            AgentSettings::default(),
        );
        (world, agent)
    }

    #[test]
    fn parses_command_tokens() {
        assert_eq!(Command::parse(&["guard", "Alice"]), Command::Guard("Alice".into()));
        assert_eq!(
            Command::parse(&["equiparmor", "fast"]),
            Command::EquipArmor(ArmorStrategy::Concurrent)
        );
        assert_eq!(
            Command::parse(&["equiparmor"]),
            Command::EquipArmor(ArmorStrategy::Sequential)
        );
        assert_eq!(Command::parse::<&str>(&[]), Command::Unknown);
        assert_eq!(Command::parse(&["dance"]), Command::Unknown);
    }

    #[tokio::test]
    async fn ping_and_unknown_replies() {
        let (_world, mut agent) = agent();
        let sink = RecordingSink::new();
        agent.run_command(&["ping"], &CommandOrigin::Supervisor, &sink).await;
        agent.run_command(&["fly"], &CommandOrigin::Supervisor, &sink).await;
        assert_eq!(sink.lines(), vec!["pong", "Unknown command."]);
    }

    #[tokio::test]
    async fn status_reports_health_and_food() {
        let (world, mut agent) = agent();
        world.set_health(17.5);
        world.set_food(12);
        let sink = RecordingSink::new();
        agent.run_command(&["status"], &CommandOrigin::Supervisor, &sink).await;
        assert_eq!(sink.lines(), vec!["❤17.5 🥕12"]);
    }

    #[tokio::test]
    async fn chat_stop_from_stranger_is_ignored() {
        let (world, mut agent) = agent();
        let sink = RecordingSink::new();

        let ran = agent
            .run_command(&["stop"], &CommandOrigin::Chat("Mallory".into()), &sink)
            .await;
        assert!(!ran);
        assert!(agent.is_guarding());
        assert!(sink.lines().is_empty());
        assert!(world.actions().is_empty());
    }

    #[tokio::test]
    async fn chat_stop_from_boss_clears_goal() {
        let (world, mut agent) = agent();
        let sink = RecordingSink::new();

        agent
            .run_command(&["stop"], &CommandOrigin::Chat("Alice".into()), &sink)
            .await;
        assert!(!agent.is_guarding());
        assert_eq!(sink.lines(), vec!["Stopping."]);
        assert_eq!(world.actions(), vec![WorldAction::CancelGoal]);

        agent.run_command(&["continue"], &CommandOrigin::Supervisor, &sink).await;
        assert!(agent.is_guarding());
    }

    #[tokio::test]
    async fn guard_unknown_player_keeps_target() {
        let (world, mut agent) = agent();
        world.add_entity(Entity::new(1, "Alice", EntityKind::Player, Vec3::new(3.0, 0.0, 0.0)));
        let sink = RecordingSink::new();

        agent.run_command(&["guard", "Alice"], &CommandOrigin::Supervisor, &sink).await;
        assert_eq!(agent.protected(), Some("Alice"));

        agent.run_command(&["guard", "Ghost"], &CommandOrigin::Supervisor, &sink).await;
        assert_eq!(sink.lines(), vec!["Player \"Ghost\" does not exist."]);
        assert_eq!(agent.protected(), Some("Alice"));
    }

    #[tokio::test]
    async fn equiparmor_summarises_pieces() {
        let (world, mut agent) = agent();
        world.give("diamond_helmet", 1);
        world.give("leather_boots", 1);
        let sink = RecordingSink::new();

        agent.run_command(&["equiparmor"], &CommandOrigin::Supervisor, &sink).await;
        assert_eq!(sink.lines(), vec!["equipped diamond_helmet, leather_boots"]);
    }
}
