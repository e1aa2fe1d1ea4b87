//! Registry of running agents, keyed by name.

use std::collections::BTreeMap;

use tracing::info;
use uuid::Uuid;

use crate::launcher::AgentHandle;

/// Running agents. At most one instance per name.
#[derive(Default)]
pub struct SupervisorRegistry {
    agents: BTreeMap<String, AgentHandle>,
}

impl SupervisorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent, returning the instance it replaced.
    pub fn register(&mut self, handle: AgentHandle) -> Option<AgentHandle> {
        info!(agent = %handle.name, instance = %handle.instance, "Registered agent");
        self.agents.insert(handle.name.clone(), handle)
    }

    pub fn get(&self, name: &str) -> Option<&AgentHandle> {
        self.agents.get(name)
    }

    /// Remove `name`, but only if it is still the given instance.
    pub fn deregister(&mut self, name: &str, instance: Uuid) -> Option<AgentHandle> {
        if self.agents.get(name)?.instance != instance {
            return None;
        }
        self.agents.remove(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<AgentHandle> {
        self.agents.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.agents.keys().cloned().collect()
    }

    /// Names of registered agents that are dead or no longer take commands.
    pub fn unhealthy(&self) -> Vec<String> {
        self.agents
            .values()
            .filter(|h| !h.is_alive())
            .map(|h| h.name.clone())
            .collect()
    }

    pub fn handles(&self) -> impl Iterator<Item = &AgentHandle> {
        self.agents.values()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn handle(name: &str) -> (AgentHandle, mpsc::Receiver<guardfleet_core::ipc::SupervisorMessage>) {
        let (tx, rx) = mpsc::channel(1);
        let watcher = tokio::spawn(std::future::pending::<()>());
        (AgentHandle::new(name, Uuid::new_v4(), tx, watcher), rx)
    }

    #[tokio::test]
    async fn stale_instance_does_not_deregister() {
        let mut registry = SupervisorRegistry::new();
        let (old, _old_rx) = handle("guard_0");
        let old_instance = old.instance;
        registry.register(old);

        let (new, _new_rx) = handle("guard_0");
        let new_instance = new.instance;
        assert!(registry.register(new).is_some());

        assert!(registry.deregister("guard_0", old_instance).is_none());
        assert!(registry.contains("guard_0"));
        assert!(registry.deregister("guard_0", new_instance).is_some());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn closed_command_pipe_is_unhealthy() {
        let mut registry = SupervisorRegistry::new();
        let (alive, _alive_rx) = handle("guard_0");
        let (hung, hung_rx) = handle("guard_1");
        registry.register(alive);
        registry.register(hung);

        drop(hung_rx);
        assert_eq!(registry.unhealthy(), vec!["guard_1".to_string()]);
        assert_eq!(registry.names(), vec!["guard_0", "guard_1"]);
    }
}
