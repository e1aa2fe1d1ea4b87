//! Agent launchers.
//!
//! A launcher starts one isolated agent and hands back an [`AgentHandle`]:
//! a command pipe plus a watcher task that reports the agent's messages,
//! errors and exit on the supervisor's [`FleetEvent`] channel.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use guardfleet_agent::GuardAgent;
use guardfleet_config::AgentSettings;
use guardfleet_core::error::{AgentError, SupervisorError};
use guardfleet_core::ipc::{AgentMessage, SupervisorMessage, decode_line, encode_line};
use guardfleet_core::roster::{BossList, TargetList};
use guardfleet_core::world::World;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

const COMMAND_CAPACITY: usize = 32;

/// Notifications flowing from agents to the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FleetEvent {
    /// The agent sent a text message
    Message { agent: String, text: String },
    /// The agent's transport reported a problem
    Error { agent: String, error: String },
    /// An agent instance ended
    Exited {
        agent: String,
        instance: Uuid,
        reason: String,
    },
    /// A delayed respawn is due
    SpawnRequested { agent: String },
}

/// Supervisor-side view of one running agent instance.
pub struct AgentHandle {
    pub name: String,
    pub instance: Uuid,
    pub started_at: DateTime<Utc>,
    commands: mpsc::Sender<SupervisorMessage>,
    watcher: JoinHandle<()>,
}

impl AgentHandle {
    pub fn new(
        name: impl Into<String>,
        instance: Uuid,
        commands: mpsc::Sender<SupervisorMessage>,
        watcher: JoinHandle<()>,
    ) -> Self {
        Self {
            name: name.into(),
            instance,
            started_at: Utc::now(),
            commands,
            watcher,
        }
    }

    /// Queue a command for the agent without waiting for room.
    pub fn send(&self, message: SupervisorMessage) -> Result<(), SupervisorError> {
        self.commands.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => SupervisorError::AgentBusy {
                name: self.name.clone(),
            },
            TrySendError::Closed(_) => SupervisorError::AgentUnreachable {
                name: self.name.clone(),
            },
        })
    }

    /// Running, still accepting commands and draining its queue.
    pub fn is_alive(&self) -> bool {
        !self.watcher.is_finished() && !self.commands.is_closed() && self.commands.capacity() > 0
    }

    /// Time since this instance was launched.
    pub fn uptime(&self) -> TimeDelta {
        Utc::now() - self.started_at
    }

    /// Stop the instance without an exit notification.
    pub fn kill(&self) {
        self.watcher.abort();
    }
}

impl Drop for AgentHandle {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}

/// Starts agents.
#[async_trait]
pub trait AgentLauncher: Send + Sync {
    async fn launch(
        &self,
        name: &str,
        events: mpsc::Sender<FleetEvent>,
    ) -> Result<AgentHandle, SupervisorError>;
}

// ── Child processes ─────────────────────────────────────────────────────

/// Runs each agent as a child process speaking line-delimited JSON on
/// stdin/stdout. The child's stderr is inherited so its logs interleave with
/// the supervisor's.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: PathBuf,
    host: String,
    port: u16,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<PathBuf>, host: impl Into<String>, port: u16) -> Self {
        Self {
            program: program.into(),
            host: host.into(),
            port,
        }
    }

    /// Re-execute the running binary.
    pub fn current_exe(host: impl Into<String>, port: u16) -> Result<Self, SupervisorError> {
        let program = std::env::current_exe().map_err(|e| SupervisorError::LaunchFailed {
            name: "<self>".into(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(program, host, port))
    }

    fn command(&self, name: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("agent")
            .arg("--name")
            .arg(name)
            .arg("--host")
            .arg(&self.host)
            .arg("--port")
            .arg(self.port.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl AgentLauncher for ProcessLauncher {
    async fn launch(
        &self,
        name: &str,
        events: mpsc::Sender<FleetEvent>,
    ) -> Result<AgentHandle, SupervisorError> {
        let launch_failed = |reason: String| SupervisorError::LaunchFailed {
            name: name.to_string(),
            reason,
        };

        let mut child = self
            .command(name)
            .spawn()
            .map_err(|e| launch_failed(e.to_string()))?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| launch_failed("stdin not captured".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| launch_failed("stdout not captured".into()))?;

        let instance = Uuid::new_v4();
        info!(agent = %name, pid = ?child.id(), %instance, "Launched agent process");

        let (commands, mut command_rx) = mpsc::channel::<SupervisorMessage>(COMMAND_CAPACITY);

        // supervisor -> agent
        let agent = name.to_string();
        let error_events = events.clone();
        tokio::spawn(async move {
            while let Some(message) = command_rx.recv().await {
                let line = match encode_line(&message) {
                    Ok(line) => line,
                    Err(e) => {
                        warn!(agent = %agent, error = %e, "Encoding command failed");
                        continue;
                    }
                };
                if let Err(e) = stdin.write_all(line.as_bytes()).await {
                    let _ = error_events
                        .send(FleetEvent::Error {
                            agent: agent.clone(),
                            error: e.to_string(),
                        })
                        .await;
                    break;
                }
                let _ = stdin.flush().await;
            }
        });

        // agent -> supervisor
        let agent = name.to_string();
        let message_events = events.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line.trim().is_empty() {
                    continue;
                }
                let event = match decode_line::<AgentMessage>(&line) {
                    Ok(AgentMessage::Message { text }) => FleetEvent::Message {
                        agent: agent.clone(),
                        text,
                    },
                    Err(e) => FleetEvent::Error {
                        agent: agent.clone(),
                        error: format!("{e}: {line}"),
                    },
                };
                if message_events.send(event).await.is_err() {
                    break;
                }
            }
        });

        let agent = name.to_string();
        let watcher = tokio::spawn(async move {
            let reason = match child.wait().await {
                Ok(status) => status.to_string(),
                Err(e) => e.to_string(),
            };
            let _ = events
                .send(FleetEvent::Exited {
                    agent,
                    instance,
                    reason,
                })
                .await;
        });

        Ok(AgentHandle::new(name, instance, commands, watcher))
    }
}

// ── In-process tasks ────────────────────────────────────────────────────

/// Produces a world connection for a named agent.
pub trait WorldFactory: Send + Sync {
    fn create(&self, name: &str) -> Arc<dyn World>;
}

impl<F> WorldFactory for F
where
    F: Fn(&str) -> Arc<dyn World> + Send + Sync,
{
    fn create(&self, name: &str) -> Arc<dyn World> {
        self(name)
    }
}

/// Builds offline sandbox scenes around the first boss.
#[derive(Debug, Clone, Default)]
pub struct SandboxWorldFactory {
    bosses: Vec<String>,
}

impl SandboxWorldFactory {
    pub fn new(bosses: Vec<String>) -> Self {
        Self { bosses }
    }
}

impl WorldFactory for SandboxWorldFactory {
    fn create(&self, name: &str) -> Arc<dyn World> {
        Arc::new(guardfleet_world::sandbox_world(name, &self.bosses))
    }
}

/// Runs each agent as a tokio task inside the supervisor process.
pub struct TaskLauncher {
    factory: Arc<dyn WorldFactory>,
    bosses: BossList,
    targets: TargetList,
    settings: AgentSettings,
}

impl TaskLauncher {
    pub fn new(
        factory: Arc<dyn WorldFactory>,
        bosses: BossList,
        targets: TargetList,
        settings: AgentSettings,
    ) -> Self {
        Self {
            factory,
            bosses,
            targets,
            settings,
        }
    }
}

#[async_trait]
impl AgentLauncher for TaskLauncher {
    async fn launch(
        &self,
        name: &str,
        events: mpsc::Sender<FleetEvent>,
    ) -> Result<AgentHandle, SupervisorError> {
        let world = self.factory.create(name);
        let agent = GuardAgent::new(
            world,
            self.bosses.clone(),
            self.targets.clone(),
            self.settings.clone(),
        );

        let instance = Uuid::new_v4();
        let (commands, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (outbox, mut outbox_rx) = mpsc::channel::<AgentMessage>(COMMAND_CAPACITY);

        let agent_name = name.to_string();
        let message_events = events.clone();
        tokio::spawn(async move {
            while let Some(AgentMessage::Message { text }) = outbox_rx.recv().await {
                let event = FleetEvent::Message {
                    agent: agent_name.clone(),
                    text,
                };
                if message_events.send(event).await.is_err() {
                    break;
                }
            }
        });

        let agent_name = name.to_string();
        let watcher = tokio::spawn(async move {
            let reason = match agent.run(command_rx, outbox).await {
                Ok(()) => "finished".to_string(),
                Err(AgentError::SupervisorGone) => return,
                Err(e) => e.to_string(),
            };
            debug!(agent = %agent_name, %reason, "Agent task ended");
            let _ = events
                .send(FleetEvent::Exited {
                    agent: agent_name,
                    instance,
                    reason,
                })
                .await;
        });

        info!(agent = %name, %instance, "Launched agent task");
        Ok(AgentHandle::new(name, instance, commands, watcher))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guardfleet_core::event::WorldEvent;
    use guardfleet_world::SimWorld;
    use std::sync::Mutex;

    #[tokio::test(start_paused = true)]
    async fn task_agent_relays_messages_and_exit() {
        let worlds: Arc<Mutex<Vec<Arc<SimWorld>>>> = Arc::default();
        let created = worlds.clone();
        let factory = move |name: &str| -> Arc<dyn World> {
            let world = Arc::new(SimWorld::new(name));
            if let Ok(mut w) = created.lock() {
                w.push(world.clone());
            }
            world
        };
        let launcher = TaskLauncher::new(
            Arc::new(factory),
            BossList::default(),
            TargetList::new(),
            AgentSettings::default(),
        );
        let (tx, mut rx) = mpsc::channel(16);

        let handle = launcher.launch("guard_0", tx).await.unwrap();
        assert!(handle.is_alive());

        handle.send(SupervisorMessage::command(["ping"])).unwrap();
        assert_eq!(
            rx.recv().await,
            Some(FleetEvent::Message {
                agent: "guard_0".into(),
                text: "pong".into()
            })
        );

        let world = worlds.lock().unwrap()[0].clone();
        world.emit(WorldEvent::Disconnect {
            reason: "server closed".into(),
        });
        match rx.recv().await {
            Some(FleetEvent::Exited {
                agent, instance, ..
            }) => {
                assert_eq!(agent, "guard_0");
                assert_eq!(instance, handle.instance);
            }
            other => panic!("expected exit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn killed_handle_is_not_alive() {
        let launcher = TaskLauncher::new(
            Arc::new(SandboxWorldFactory::new(vec!["Alice".into()])),
            BossList::new(["Alice"]),
            TargetList::new(),
            AgentSettings::default(),
        );
        let (tx, _rx) = mpsc::channel(16);
        let handle = launcher.launch("guard_1", tx).await.unwrap();
        handle.kill();
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(!handle.is_alive());
    }

    #[tokio::test]
    async fn full_command_queue_fails_fast_and_marks_agent_unhealthy() {
        let (tx, _stalled_rx) = mpsc::channel(1);
        let watcher = tokio::spawn(std::future::pending::<()>());
        let handle = AgentHandle::new("guard_2", Uuid::new_v4(), tx, watcher);

        handle.send(SupervisorMessage::command(["ping"])).unwrap();
        assert!(!handle.is_alive());
        assert!(matches!(
            handle.send(SupervisorMessage::command(["ping"])),
            Err(SupervisorError::AgentBusy { name }) if name == "guard_2"
        ));
    }

    #[tokio::test]
    async fn closed_command_queue_is_unreachable() {
        let (tx, rx) = mpsc::channel(1);
        let watcher = tokio::spawn(std::future::pending::<()>());
        let handle = AgentHandle::new("guard_4", Uuid::new_v4(), tx, watcher);
        drop(rx);

        assert!(matches!(
            handle.send(SupervisorMessage::stop()),
            Err(SupervisorError::AgentUnreachable { .. })
        ));
    }

    #[test]
    fn process_command_line() {
        let launcher = ProcessLauncher::new("/usr/bin/guardfleet", "10.0.0.2", 25566);
        let cmd = launcher.command("guard_3");
        let args: Vec<_> = cmd
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec!["agent", "--name", "guard_3", "--host", "10.0.0.2", "--port", "25566"]
        );
    }
}
