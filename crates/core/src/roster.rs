//! Agent-owned identity lists.
//!
//! - [`BossList`]: who may command the agent and who it may auto-guard.
//!   Fixed at startup.
//! - [`TargetList`]: names known to be hostile. Grows on damage events and
//!   shrinks when entities leave perception.

use std::collections::HashSet;

/// Immutable set of authorized identities.
#[derive(Debug, Clone, Default)]
pub struct BossList {
    names: HashSet<String>,
}

impl BossList {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names
                .into_iter()
                .map(Into::into)
                .filter(|n: &String| !n.is_empty())
                .collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Ordered, duplicate-free set of hostile identities.
#[derive(Debug, Clone, Default)]
pub struct TargetList {
    names: Vec<String>,
}

impl TargetList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a pre-loaded list, dropping blanks and duplicates.
    pub fn seeded<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = Self::new();
        for name in names {
            list.add(name);
        }
        list
    }

    /// Add a name. Returns `false` if it was already present.
    pub fn add(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if name.is_empty() || self.contains(&name) {
            return false;
        }
        self.names.push(name);
        true
    }

    /// Remove a name. Removing an absent name is a no-op returning `false`.
    pub fn remove(&mut self, name: &str) -> bool {
        match self.names.iter().position(|n| n == name) {
            Some(index) => {
                self.names.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
