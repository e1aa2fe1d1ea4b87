//! The fleet supervisor actor.
//!
//! A single task owns the registry and selects over agent notifications,
//! operator console lines, the liveness monitor and the shutdown signal.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use guardfleet_config::FleetConfig;
use guardfleet_core::error::SupervisorError;
use guardfleet_core::ipc::SupervisorMessage;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::backoff::{RestartPolicy, RestartTracker};
use crate::console::OperatorCommand;
use crate::launcher::{AgentLauncher, FleetEvent};
use crate::registry::SupervisorRegistry;

const EVENT_CAPACITY: usize = 256;

/// Time given to agents to act on `stop` before they are terminated.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct FleetSettings {
    pub auto_spawn: u32,
    pub spawn_delay: Duration,
    pub monitor_interval: Duration,
    pub name_prefix: String,
    pub restart: RestartPolicy,
}

impl Default for FleetSettings {
    fn default() -> Self {
        Self::from_config(&FleetConfig::default())
    }
}

impl FleetSettings {
    pub fn from_config(config: &FleetConfig) -> Self {
        Self {
            auto_spawn: config.auto_spawn,
            spawn_delay: Duration::from_millis(config.spawn_delay_ms),
            monitor_interval: Duration::from_secs(config.monitor_interval_secs),
            name_prefix: config.name_prefix.clone(),
            restart: RestartPolicy::from_config(&config.restart),
        }
    }
}

pub struct Supervisor {
    launcher: Arc<dyn AgentLauncher>,
    registry: SupervisorRegistry,
    trackers: HashMap<String, RestartTracker>,
    settings: FleetSettings,
    next_id: u32,
    events_tx: mpsc::Sender<FleetEvent>,
    events_rx: mpsc::Receiver<FleetEvent>,
}

impl Supervisor {
    pub fn new(launcher: Arc<dyn AgentLauncher>, settings: FleetSettings) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CAPACITY);
        Self {
            launcher,
            registry: SupervisorRegistry::new(),
            trackers: HashMap::new(),
            settings,
            next_id: 0,
            events_tx,
            events_rx,
        }
    }

    pub fn registry(&self) -> &SupervisorRegistry {
        &self.registry
    }

    /// Launch and register one agent.
    ///
    /// A failed launch is logged and retried after a backoff delay.
    pub async fn spawn_agent(&mut self, name: &str) -> Result<(), SupervisorError> {
        match self.launcher.launch(name, self.events_tx.clone()).await {
            Ok(handle) => {
                self.trackers
                    .entry(name.to_string())
                    .or_insert_with(|| RestartTracker::new(Instant::now()))
                    .started(Instant::now());
                if let Some(old) = self.registry.register(handle) {
                    warn!(agent = %name, instance = %old.instance, "Replaced running instance");
                    old.kill();
                }
                Ok(())
            }
            Err(e) => {
                error!(agent = %name, error = %e, "Failed to spawn agent");
                let policy = self.settings.restart;
                let delay = self
                    .tracker(name)
                    .next_delay(&policy, Instant::now())
                    .max(policy.base_delay);
                self.schedule_spawn(name.to_string(), delay);
                Err(e)
            }
        }
    }

    /// Spawn `count` new agents with fresh names, `spawn_delay` apart.
    pub fn spawn_agents(&mut self, count: u32) -> Vec<String> {
        let mut names = Vec::with_capacity(count as usize);
        for i in 0..count {
            let name = format!("{}{}", self.settings.name_prefix, self.next_id);
            self.next_id += 1;
            self.schedule_spawn(name.clone(), self.settings.spawn_delay * i);
            names.push(name);
        }
        names
    }

    fn schedule_spawn(&self, agent: String, delay: Duration) {
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(FleetEvent::SpawnRequested { agent }).await;
        });
    }

    fn tracker(&mut self, name: &str) -> &mut RestartTracker {
        self.trackers
            .entry(name.to_string())
            .or_insert_with(|| RestartTracker::new(Instant::now()))
    }

    /// Bring `name` back after its instance went away.
    async fn respawn(&mut self, name: &str) {
        let policy = self.settings.restart;
        let delay = self.tracker(name).next_delay(&policy, Instant::now());
        if delay.is_zero() {
            info!(agent = %name, "Respawning agent");
            let _ = self.spawn_agent(name).await;
        } else {
            info!(agent = %name, delay_ms = delay.as_millis() as u64, "Respawning agent after backoff");
            self.schedule_spawn(name.to_string(), delay);
        }
    }

    /// Wait for the next agent notification.
    pub async fn next_event(&mut self) -> Option<FleetEvent> {
        self.events_rx.recv().await
    }

    pub async fn handle_event(&mut self, event: FleetEvent) {
        match event {
            FleetEvent::Message { agent, text } => info!(agent = %agent, "{text}"),
            FleetEvent::Error { agent, error } => warn!(agent = %agent, %error, "Agent error"),
            FleetEvent::Exited {
                agent,
                instance,
                reason,
            } => {
                if self.registry.deregister(&agent, instance).is_none() {
                    debug!(agent = %agent, %instance, "Ignoring exit of a replaced instance");
                    return;
                }
                warn!(agent = %agent, %reason, "Agent exited");
                self.respawn(&agent).await;
            }
            FleetEvent::SpawnRequested { agent } => {
                if self.registry.contains(&agent) {
                    debug!(agent = %agent, "Already running, skipping spawn");
                    return;
                }
                let _ = self.spawn_agent(&agent).await;
            }
        }
    }

    /// Replace every agent that has died or stopped taking commands.
    pub async fn monitor(&mut self) {
        for name in self.registry.unhealthy() {
            if let Some(handle) = self.registry.remove(&name) {
                warn!(agent = %name, instance = %handle.instance, "Agent is not active, restarting");
                handle.kill();
            }
            self.respawn(&name).await;
        }
    }

    /// Handle one operator console line. Returns text for the operator.
    pub async fn relay(&mut self, line: &str) -> Option<String> {
        match OperatorCommand::parse(line)? {
            OperatorCommand::Relay { agent, command } => {
                let sent = match self.registry.get(&agent) {
                    Some(handle) => handle.send(SupervisorMessage::Command { command }),
                    None => Err(SupervisorError::UnknownAgent(agent)),
                };
                sent.err().map(|e| e.to_string())
            }
            OperatorCommand::Ping => Some("pong".into()),
            OperatorCommand::Spawn(Some(count)) => {
                let names = self.spawn_agents(count);
                Some(format!("Spawning {}", names.join(", ")))
            }
            OperatorCommand::Spawn(None) => Some("Usage: spawn <count>".into()),
            OperatorCommand::List => {
                if self.registry.is_empty() {
                    return Some("No agents running.".into());
                }
                let agents: Vec<String> = self
                    .registry
                    .handles()
                    .map(|h| format!("{} (up {}s)", h.name, h.uptime().num_seconds()))
                    .collect();
                Some(format!("{} agent(s): {}", agents.len(), agents.join(", ")))
            }
            OperatorCommand::Unknown(token) => Some(format!("Unknown command: {token}")),
        }
    }

    /// Tell every agent to stop, then terminate them.
    pub async fn shutdown(&mut self) {
        info!(agents = self.registry.len(), "Shutting down gracefully");
        for handle in self.registry.handles() {
            if let Err(e) = handle.send(SupervisorMessage::stop()) {
                debug!(agent = %handle.name, error = %e, "Stop not delivered");
            }
        }
        tokio::time::sleep(SHUTDOWN_GRACE).await;
        for name in self.registry.names() {
            if let Some(handle) = self.registry.remove(&name) {
                handle.kill();
            }
        }
    }

    /// Run the fleet until `shutdown` resolves or the console closes.
    pub async fn run<F>(mut self, mut console: mpsc::Receiver<String>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let names = self.spawn_agents(self.settings.auto_spawn);
        info!(count = names.len(), "Spawning initial agents");

        let mut monitor = tokio::time::interval(self.settings.monitor_interval);
        monitor.set_missed_tick_behavior(MissedTickBehavior::Delay);
        monitor.tick().await;

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
                Some(event) = self.events_rx.recv() => self.handle_event(event).await,
                line = console.recv() => match line {
                    Some(line) => {
                        if let Some(output) = self.relay(&line).await {
                            info!("{output}");
                        }
                    }
                    None => {
                        info!("Console closed");
                        break;
                    }
                },
                _ = monitor.tick() => self.monitor().await,
            }
        }

        self.shutdown().await;
    }
}
