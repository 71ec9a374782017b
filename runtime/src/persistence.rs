//! Persistence collaborator: byte storage keyed by node name.

use crate::navigator::Navigator;
use crate::snapshot;
use async_trait::async_trait;
use navstack_core::{Destination, LogCategory, LogLevel, NavigationError, NodeId};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn load(&self, name: &str) -> Result<Option<Vec<u8>>, NavigationError>;
    async fn save(&self, name: &str, bytes: Vec<u8>) -> Result<(), NavigationError>;
}

/// In-process store, mostly for tests and demos.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.entries.lock().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self, name: &str) -> Result<Option<Vec<u8>>, NavigationError> {
        Ok(self.get(name))
    }

    async fn save(&self, name: &str, bytes: Vec<u8>) -> Result<(), NavigationError> {
        self.entries.lock().insert(name.to_string(), bytes);
        Ok(())
    }
}

impl<D> Navigator<D>
where
    D: Destination + Serialize + DeserializeOwned,
{
    /// Save `node` under its name.
    ///
    /// `Ok(false)` when no restoration key is configured or the node has no
    /// name. An encode failure leaves the stored snapshot untouched.
    pub async fn persist<S>(&self, store: &S, node: NodeId) -> Result<bool, NavigationError>
    where
        S: SnapshotStore + ?Sized,
    {
        let Some((key, name)) = self.persistence_target(node) else {
            return Ok(false);
        };
        let bytes = snapshot::encode(&self.tree, node, &key).inspect_err(|e| {
            self.tree
                .log(LogCategory::Lifecycle, LogLevel::Error, Some(node), e.to_string())
        })?;
        store.save(&name, bytes).await?;
        Ok(true)
    }

    /// Load the snapshot stored under `node`'s name and apply it.
    ///
    /// A missing, corrupt or mismatched snapshot leaves the node as it is
    /// and returns `Ok(false)`.
    pub async fn restore<S>(&mut self, store: &S, node: NodeId) -> Result<bool, NavigationError>
    where
        S: SnapshotStore + ?Sized,
    {
        let Some((key, name)) = self.persistence_target(node) else {
            return Ok(false);
        };
        let Some(bytes) = store.load(&name).await? else {
            return Ok(false);
        };
        match snapshot::try_decode::<D>(&bytes, &key) {
            Ok(state) => {
                let applied = state.apply(&mut self.tree, node);
                self.reconcile_subscribers();
                Ok(applied)
            }
            Err(e) => {
                self.tree
                    .log(LogCategory::Lifecycle, LogLevel::Warning, Some(node), e.to_string());
                Ok(false)
            }
        }
    }

    fn persistence_target(&self, node: NodeId) -> Option<(String, String)> {
        let key = self.config().restoration_key.clone()?;
        let name = self.tree.get(node)?.name.clone()?;
        Some((key, name))
    }
}
