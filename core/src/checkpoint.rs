//! Checkpoints - Named Return Points Within a Path
//!
//! A checkpoint remembers the path length at the moment it was registered.
//! Returning to it truncates the path back to that length.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named, indexed return point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub name: String,
    /// Path length when the checkpoint was registered.
    pub index: usize,
    /// Type name of the value a value-bearing checkpoint expects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    /// Routes correlated broadcast envelopes to this checkpoint's handler.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl Checkpoint {
    pub fn new(name: impl Into<String>, index: usize) -> Self {
        Checkpoint {
            name: name.into(),
            index,
            value_type: None,
            correlation_id: None,
        }
    }

    pub fn expects_value(&self) -> bool {
        self.correlation_id.is_some()
    }
}

/// Checkpoints registered on a single node, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckpointRegistry {
    entries: BTreeMap<String, Checkpoint>,
}

impl CheckpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` at `index`. First registration wins; returns `false`
    /// when the name was already present.
    pub fn add(&mut self, name: &str, index: usize) -> bool {
        if self.entries.contains_key(name) {
            return false;
        }
        self.entries
            .insert(name.to_string(), Checkpoint::new(name, index));
        true
    }

    /// Attach a value binding without moving the checkpoint.
    pub fn bind_value(
        &mut self,
        name: &str,
        value_type: impl Into<String>,
        correlation_id: impl Into<String>,
    ) -> bool {
        match self.entries.get_mut(name) {
            Some(checkpoint) => {
                checkpoint.value_type = Some(value_type.into());
                checkpoint.correlation_id = Some(correlation_id.into());
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Checkpoint> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Checkpoint> {
        self.entries.remove(name)
    }

    pub fn find_by_correlation(&self, correlation_id: &str) -> Option<&Checkpoint> {
        self.entries
            .values()
            .find(|c| c.correlation_id.as_deref() == Some(correlation_id))
    }

    /// Drop every checkpoint pointing past `path_len`.
    ///
    /// Returns the names that were removed.
    pub fn collect_garbage(&mut self, path_len: usize) -> Vec<String> {
        let stale: Vec<String> = self
            .entries
            .values()
            .filter(|c| c.index > path_len)
            .map(|c| c.name.clone())
            .collect();
        for name in &stale {
            self.entries.remove(name);
        }
        stale
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Checkpoint> {
        self.entries.values()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Insert a fully formed checkpoint, replacing any with the same name.
    pub fn insert(&mut self, checkpoint: Checkpoint) {
        self.entries.insert(checkpoint.name.clone(), checkpoint);
    }
}

impl FromIterator<Checkpoint> for CheckpointRegistry {
    fn from_iter<I: IntoIterator<Item = Checkpoint>>(iter: I) -> Self {
        let mut registry = CheckpointRegistry::new();
        for checkpoint in iter {
            registry.insert(checkpoint);
        }
        registry
    }
}
