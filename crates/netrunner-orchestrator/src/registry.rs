use std::collections::HashMap;
use std::sync::Arc;

use netrunner_common::protocol::error::{NetrunnerError, Result};
use tokio::sync::RwLock;

use crate::node::NodeRecord;

/// Name-keyed set of the network's node records.
///
/// Lookups and listings take the read lock; insert and remove are atomic
/// with respect to each other, so a name is never held by two records.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: RwLock<HashMap<String, Arc<NodeRecord>>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record under its name.
    ///
    /// # Errors
    /// `DuplicateName` if the name is taken; the registry is unchanged.
    pub async fn insert(&self, record: Arc<NodeRecord>) -> Result<()> {
        let mut nodes = self.nodes.write().await;
        if nodes.contains_key(record.name()) {
            return Err(NetrunnerError::DuplicateName(record.name().to_string()));
        }
        nodes.insert(record.name().to_string(), record);
        Ok(())
    }

    /// Detaches and returns the record named `name`.
    pub async fn remove(&self, name: &str) -> Result<Arc<NodeRecord>> {
        self.nodes
            .write()
            .await
            .remove(name)
            .ok_or_else(|| NetrunnerError::NotFound(name.to_string()))
    }

    /// Detaches `record` only if it is still the one registered under its
    /// name.
    pub async fn remove_if_same(&self, record: &Arc<NodeRecord>) -> bool {
        let mut nodes = self.nodes.write().await;
        match nodes.get(record.name()) {
            Some(current) if Arc::ptr_eq(current, record) => {
                nodes.remove(record.name());
                true
            }
            _ => false,
        }
    }

    pub async fn get(&self, name: &str) -> Option<Arc<NodeRecord>> {
        self.nodes.read().await.get(name).cloned()
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.nodes.read().await.contains_key(name)
    }

    /// Registered names, sorted.
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.nodes.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// All records, sorted by name.
    pub async fn snapshot(&self) -> Vec<Arc<NodeRecord>> {
        let mut records: Vec<Arc<NodeRecord>> =
            self.nodes.read().await.values().cloned().collect();
        records.sort_by(|a, b| a.name().cmp(b.name()));
        records
    }

    /// Beacon records, sorted by name.
    pub async fn beacons(&self) -> Vec<Arc<NodeRecord>> {
        let mut beacons: Vec<Arc<NodeRecord>> = self
            .nodes
            .read()
            .await
            .values()
            .filter(|r| r.is_beacon())
            .cloned()
            .collect();
        beacons.sort_by(|a, b| a.name().cmp(b.name()));
        beacons
    }

    /// Empties the registry and returns what it held.
    pub async fn drain(&self) -> Vec<Arc<NodeRecord>> {
        self.nodes.write().await.drain().map(|(_, r)| r).collect()
    }

    pub async fn len(&self) -> usize {
        self.nodes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.nodes.read().await.is_empty()
    }
}
