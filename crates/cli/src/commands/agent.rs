//! `guardfleet agent`: one guard agent speaking IPC over stdio.

use std::sync::Arc;

use guardfleet_agent::{GuardAgent, stdio_bridge};
use guardfleet_config::{AppConfig, ConfigError, ListsConfig, load_identity_list};
use guardfleet_core::error::AgentError;
use guardfleet_core::roster::{BossList, TargetList};
use guardfleet_world::sandbox_world;
use tracing::{info, warn};

pub async fn run(
    name: String,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let (boss_names, bosses, targets) = load_rosters(&config.lists)?;

    // The protocol client is not part of this workspace; agents run against
    // the offline sandbox scene.
    warn!(
        agent = %name,
        server = %format!("{}:{}", config.server.host, config.server.port),
        "No game client linked, running in the offline sandbox"
    );
    let world = Arc::new(sandbox_world(&name, &boss_names));

    let bridge = stdio_bridge();
    let agent = GuardAgent::new(world, bosses, targets, config.agent.clone());

    match agent.run(bridge.inbox, bridge.outbox).await {
        Ok(()) | Err(AgentError::SupervisorGone) => {
            info!(agent = %name, "Agent stopped");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Read each identity list once. The raw boss names also seed the sandbox.
fn load_rosters(lists: &ListsConfig) -> Result<(Vec<String>, BossList, TargetList), ConfigError> {
    let boss_names = load_identity_list(&lists.bosses)?;
    let bosses = BossList::new(boss_names.clone());
    let targets = lists.load_targets()?;
    Ok((boss_names, bosses, targets))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rosters_come_from_one_read_of_each_list() {
        let dir = tempfile::tempdir().unwrap();
        let lists = ListsConfig {
            bosses: dir.path().join("boss-list.txt"),
            targets: dir.path().join("target-list.txt"),
        };
        std::fs::write(&lists.bosses, "Alice\n Bob\n").unwrap();

        let (names, bosses, targets) = load_rosters(&lists).unwrap();
        assert_eq!(names, vec!["Alice", "Bob"]);
        assert!(bosses.contains("Alice"));
        assert!(bosses.contains("Bob"));
        assert!(targets.is_empty());
    }
}
