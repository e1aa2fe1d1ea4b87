//! The guard agent runtime.

use std::sync::Arc;

use guardfleet_config::AgentSettings;
use guardfleet_core::agent::{CommandOrigin, GuardState};
use guardfleet_core::error::{AgentError, EngagementError, WorldError};
use guardfleet_core::event::WorldEvent;
use guardfleet_core::ipc::{AgentMessage, SupervisorMessage};
use guardfleet_core::roster::{BossList, TargetList};
use guardfleet_core::world::{Goal, World};
use rand::Rng;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engagement::EngagementStrategist;
use crate::maintenance;
use crate::reply::{ChatSink, ReplySink, SupervisorSink, WhisperSink};
use crate::threat::ThreatClassifier;

/// Where the agent is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Connected, not yet in the world
    AwaitingSpawn,
    /// Looking for a boss; `wait` ticks remain until the next look
    Searching { wait: u32 },
    /// Running the guard state machine
    Protecting,
}

/// One guard agent: its rosters, its protected target and its state machine.
///
/// The agent owns all of its mutable state. Commands and events are applied
/// between ticks by [`GuardAgent::run`].
pub struct GuardAgent {
    pub(crate) world: Arc<dyn World>,
    pub(crate) name: String,
    pub(crate) guarding: bool,
    pub(crate) protected: Option<String>,
    pub(crate) targets: TargetList,
    pub(crate) bosses: BossList,
    state: GuardState,
    stage: Stage,
    classifier: ThreatClassifier,
    strategist: EngagementStrategist,
    settings: AgentSettings,
}

impl GuardAgent {
    pub fn new(
        world: Arc<dyn World>,
        bosses: BossList,
        targets: TargetList,
        settings: AgentSettings,
    ) -> Self {
        Self {
            name: world.username().to_string(),
            world,
            guarding: true,
            protected: None,
            targets,
            bosses,
            state: GuardState::default(),
            stage: Stage::AwaitingSpawn,
            classifier: ThreatClassifier::from_settings(&settings),
            strategist: EngagementStrategist::from_settings(&settings),
            settings,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn is_guarding(&self) -> bool {
        self.guarding
    }

    pub fn protected(&self) -> Option<&str> {
        self.protected.as_deref()
    }

    pub fn targets(&self) -> &TargetList {
        &self.targets
    }

    /// One-time setup after entering the world.
    pub async fn bootstrap(&mut self) {
        if self.stage != Stage::AwaitingSpawn {
            debug!(agent = %self.name, "Already bootstrapped, ignoring spawn");
            return;
        }
        info!(agent = %self.name, "Spawned");

        if let Err(e) = self.world.prepare_loadout().await {
            warn!(agent = %self.name, error = %e, "Loadout hook failed");
        }
        if let Err(e) = self.world.chat(&self.settings.greeting).await {
            warn!(agent = %self.name, error = %e, "Greeting failed");
        }

        info!(agent = %self.name, "Searching for a boss");
        self.stage = Stage::Searching { wait: 0 };
    }

    /// Advance the agent by one world tick.
    pub async fn tick(&mut self) -> GuardState {
        match self.stage {
            Stage::AwaitingSpawn => {}
            Stage::Searching { wait } if wait > 0 => {
                self.stage = Stage::Searching { wait: wait - 1 };
            }
            Stage::Searching { .. } => self.search().await,
            Stage::Protecting => self.guard().await,
        }
        self.state
    }

    async fn search(&mut self) {
        if self.protected.is_none() {
            let boss = self
                .world
                .entities()
                .into_iter()
                .find(|e| self.bosses.contains(&e.name));
            if let Some(boss) = boss {
                info!(agent = %self.name, boss = %boss.name, "Boss found");
                self.protected = Some(boss.name);
            }
        }

        if self.protected.is_some() {
            info!(agent = %self.name, "Entering protection loop");
            self.stage = Stage::Protecting;
            return;
        }

        if self.guarding {
            if let Some(me) = self.world.self_entity() {
                let threat = self.classifier.find_threat(
                    me.position,
                    None,
                    &self.world.entities(),
                    &self.targets,
                );
                if let Some(threat) = threat {
                    info!(agent = %self.name, threat = %threat.name, "Threat found while searching");
                    self.engage(&threat).await;
                }
            }
        }

        self.stage = Stage::Searching {
            wait: self.settings.search_interval_ticks.saturating_sub(1),
        };
    }

    async fn guard(&mut self) {
        if !self.guarding {
            self.state = GuardState::Idle;
            return;
        }
        let Some(me) = self.world.self_entity() else {
            self.state = GuardState::Idle;
            return;
        };

        let protected = self
            .protected
            .as_deref()
            .and_then(|name| self.world.player(name))
            .and_then(|player| player.entity);
        let entities = self.world.entities();

        let threat = self.classifier.find_threat(
            me.position,
            protected.as_ref().map(|e| e.position),
            &entities,
            &self.targets,
        );
        if let Some(threat) = threat {
            self.state = GuardState::GuardingEngage;
            self.engage(&threat).await;
            return;
        }

        let Some(entity) = protected else {
            self.state = GuardState::GuardingIdle;
            return;
        };

        self.state = GuardState::GuardingFollow;
        let range = rand::rng().random_range(self.settings.follow_min..=self.settings.follow_max);
        let goal = Goal::Follow {
            entity,
            range: f64::from(range),
        };
        match self.world.move_to(goal).await {
            Ok(()) => {}
            Err(WorldError::GoalCancelled) => debug!(agent = %self.name, "Follow cancelled"),
            Err(e) => warn!(agent = %self.name, error = %e, "Follow failed"),
        }
    }

    async fn engage(&mut self, threat: &guardfleet_core::entity::Entity) {
        match self.strategist.attack(self.world.as_ref(), threat).await {
            Ok(task) => debug!(
                agent = %self.name,
                target = %threat.name,
                modality = ?task.modality,
                "Attacked"
            ),
            Err(EngagementError::NoRoute { target }) => {
                info!(agent = %self.name, %target, "No route to threat, skipping");
            }
            Err(EngagementError::World(WorldError::GoalCancelled)) => {
                debug!(agent = %self.name, "Engagement cancelled");
            }
            Err(e) => warn!(agent = %self.name, error = %e, "Engagement failed"),
        }
    }

    /// Apply one world event. `supervisor` receives the agent's own reports.
    pub async fn handle_event(
        &mut self,
        event: WorldEvent,
        supervisor: &dyn ReplySink,
    ) -> Result<(), AgentError> {
        match event {
            WorldEvent::Spawn => self.bootstrap().await,
            WorldEvent::Health { food, .. } => {
                if maintenance::is_hungry(food, self.settings.hunger_limit) {
                    supervisor.reply(&format!("hunger has reached {food}!")).await;
                    if let Err(e) = maintenance::feed(self.world.as_ref(), supervisor).await {
                        warn!(agent = %self.name, error = %e, "Eating failed");
                    }
                }
            }
            WorldEvent::EntityHurt { entity } => {
                let is_self = entity.name == self.name;
                let is_protected = self.protected.as_deref() == Some(entity.name.as_str());
                if !is_self && !is_protected {
                    return Ok(());
                }

                supervisor.reply(&format!("{} was hurt!", entity.name)).await;
                let mut spared = vec![entity.name.as_str(), self.name.as_str()];
                spared.extend(self.protected.as_deref());
                let attacker = self.classifier.find_attacker(
                    entity.position,
                    &self.world.entities(),
                    &self.bosses,
                    &spared,
                );
                if let Some(attacker) = attacker {
                    if self.targets.add(attacker.name.clone()) {
                        info!(agent = %self.name, attacker = %attacker.name, "Added to targets");
                    }
                }
            }
            WorldEvent::EntityGone { entity } => {
                if self.targets.remove(&entity.name) {
                    debug!(agent = %self.name, target = %entity.name, "Target gone");
                }
            }
            WorldEvent::PlayerCollect { collector } => {
                if collector.name == self.name {
                    let strategy = self.settings.armor_strategy;
                    if let Err(e) = maintenance::equip_armor(self.world.as_ref(), strategy).await {
                        warn!(agent = %self.name, error = %e, "Equipping armor failed");
                    }
                }
            }
            WorldEvent::Chat { username, message } => {
                if username != self.name {
                    let sink = ChatSink::new(self.world.clone());
                    let tokens: Vec<&str> = message.split_whitespace().collect();
                    self.run_command(&tokens, &CommandOrigin::Chat(username), &sink)
                        .await;
                }
            }
            WorldEvent::Whisper { username, message } => {
                let sink = WhisperSink::new(self.world.clone(), username.clone());
                let tokens: Vec<&str> = message.split_whitespace().collect();
                self.run_command(&tokens, &CommandOrigin::Whisper(username), &sink)
                    .await;
            }
            WorldEvent::Kicked { reason } => warn!(agent = %self.name, %reason, "Kicked"),
            WorldEvent::Disconnect { reason } => {
                warn!(agent = %self.name, %reason, "Disconnected");
                return Err(AgentError::Disconnected(reason));
            }
        }
        Ok(())
    }

    /// Drive the agent until the world disconnects or the supervisor goes
    /// away.
    ///
    /// Supervisor commands, world events and ticks are served from one
    /// `select!`; a tick that has started always runs to completion.
    pub async fn run(
        mut self,
        mut inbox: mpsc::Receiver<SupervisorMessage>,
        outbox: mpsc::Sender<AgentMessage>,
    ) -> Result<(), AgentError> {
        let world = self.world.clone();
        let supervisor = SupervisorSink::new(outbox);
        let mut events = world.subscribe();

        if world.self_entity().is_some() {
            self.bootstrap().await;
        }

        loop {
            tokio::select! {
                message = inbox.recv() => match message {
                    Some(SupervisorMessage::Command { command }) => {
                        self.run_command(command.as_slice(), &CommandOrigin::Supervisor, &supervisor)
                            .await;
                    }
                    None => {
                        info!(agent = %self.name, "Supervisor channel closed");
                        return Err(AgentError::SupervisorGone);
                    }
                },
                event = events.recv() => match event {
                    Ok(event) => self.handle_event(event, &supervisor).await?,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(agent = %self.name, skipped, "World events lagged");
                    }
                    Err(RecvError::Closed) => {
                        return Err(AgentError::Disconnected("event stream closed".into()));
                    }
                },
                _ = world.wait_ticks(1) => {
                    self.tick().await;
                }
            }
        }
    }
}
