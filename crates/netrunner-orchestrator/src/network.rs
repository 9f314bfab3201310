use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use netrunner_common::config::NodeConfig;
use netrunner_common::process::BootstrapPeer;
use netrunner_common::protocol::error::{NetrunnerError, Result};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::health_checker::HealthChecker;
use crate::materialize::Materializer;
use crate::node::{NodeInfo, NodeRecord, NodeState};
use crate::registry::NodeRegistry;

/// A running local network.
///
/// The network owns every node record and process handle. Callers get names,
/// [`NodeInfo`] snapshots and shared API handles. Network id and genesis are
/// fixed at creation.
pub struct Network {
    name: String,
    network_id: u32,
    log_level: String,
    registry: NodeRegistry,
    materializer: Materializer,
    health: HealthChecker,
    closed: AtomicBool,
}

impl Network {
    pub(crate) fn new(
        name: String,
        network_id: u32,
        log_level: String,
        materializer: Materializer,
        health: HealthChecker,
        registry: NodeRegistry,
    ) -> Self {
        Self {
            name,
            network_id,
            log_level,
            registry,
            materializer,
            health,
            closed: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn network_id(&self) -> u32 {
        self.network_id
    }

    pub fn genesis(&self) -> &[u8] {
        self.materializer.genesis()
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Whether [`Network::stop`] has been called.
    pub fn is_stopped(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_stopped() {
            return Err(NetrunnerError::NetworkStopped);
        }
        Ok(())
    }

    /// Adds and starts one node while the rest of the network keeps running.
    ///
    /// The node bootstraps from the current beacons. Its identity is generated
    /// fresh if the config carries none, even when the name was used before.
    ///
    /// # Errors
    /// - `InvalidConfig` for a bad config
    /// - `DuplicateName` if a live node has the same name
    /// - `Launch` if the process cannot be created or started; the node is
    ///   not left in the registry
    /// - `NetworkStopped` after [`Network::stop`]
    pub async fn add_node(&self, config: NodeConfig) -> Result<NodeInfo> {
        config.validate()?;
        self.ensure_open()?;
        if self.registry.contains(&config.name).await {
            return Err(NetrunnerError::DuplicateName(config.name));
        }

        let bootstrap: Vec<BootstrapPeer> = self
            .registry
            .beacons()
            .await
            .iter()
            .filter(|r| !r.state().is_terminal())
            .map(|r| r.bootstrap_peer())
            .collect();
        let prepared = self.materializer.prepare(&config, &bootstrap)?;
        let record = Arc::new(self.materializer.instantiate(prepared)?);
        self.registry.insert(record.clone()).await?;

        // a stop that drained before our insert would never see this record
        if self.is_stopped() {
            if self.registry.remove_if_same(&record).await {
                if let Err(e) = record.shutdown().await {
                    warn!("Cleanup of node {} after stop failed: {}", record.name(), e);
                }
            }
            return Err(NetrunnerError::NetworkStopped);
        }

        if let Err(e) = record.launch().await {
            warn!("Node {} failed to start: {}", record.name(), e);
            self.registry.remove_if_same(&record).await;
            if let Err(stop_err) = record.shutdown().await {
                warn!("Cleanup of node {} failed: {}", record.name(), stop_err);
            }
            return Err(e);
        }

        info!("Added node {} ({})", record.name(), record.node_id());
        Ok(record.info())
    }

    /// Detaches a node and stops its process.
    ///
    /// Stop errors are logged, not returned: the node is gone from the
    /// network either way and its name is free again.
    pub async fn remove_node(&self, name: &str) -> Result<()> {
        let record = self.registry.remove(name).await?;
        if let Err(e) = record.shutdown().await {
            warn!("Error stopping removed node {}: {}", name, e);
        }
        info!("Removed node {}", name);
        Ok(())
    }

    /// Stops every node concurrently and empties the network.
    ///
    /// Always succeeds. Calling it again is a no-op.
    pub async fn stop(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            // still drain: an add racing the first stop may have inserted late
            self.stop_records(self.registry.drain().await).await;
            return Ok(());
        }

        let records = self.registry.drain().await;
        info!("Stopping network {} ({} node(s))", self.name, records.len());
        let failures = self.stop_records(records).await;
        if failures > 0 {
            warn!("Network {} stopped with {} stop error(s)", self.name, failures);
        } else {
            info!("Network {} stopped", self.name);
        }
        Ok(())
    }

    async fn stop_records(&self, records: Vec<Arc<NodeRecord>>) -> usize {
        let results = join_all(records.iter().map(|r| r.shutdown())).await;
        let mut failures = 0;
        for (record, result) in records.iter().zip(results) {
            if let Err(e) = result {
                warn!("Error stopping node {}: {}", record.name(), e);
                failures += 1;
            }
        }
        failures
    }

    /// Names of all nodes, sorted.
    pub async fn node_names(&self) -> Vec<String> {
        self.registry.names().await
    }

    /// Snapshot of one node.
    pub async fn node(&self, name: &str) -> Result<NodeInfo> {
        self.registry
            .get(name)
            .await
            .map(|r| r.info())
            .ok_or_else(|| NetrunnerError::NotFound(name.to_string()))
    }

    /// Snapshots of all nodes, sorted by name.
    pub async fn nodes(&self) -> Vec<NodeInfo> {
        self.registry.snapshot().await.iter().map(|r| r.info()).collect()
    }

    pub async fn node_count(&self) -> usize {
        self.registry.len().await
    }

    /// Waits until every current node reports healthy.
    ///
    /// Nodes added after the call starts are not waited for. See
    /// [`HealthChecker::await_all_healthy`].
    pub async fn await_healthy(&self, timeout: Duration, cancel: &CancellationToken) -> Result<()> {
        let records = self.registry.snapshot().await;
        info!(
            "Waiting up to {}ms for {} node(s) to become healthy",
            timeout.as_millis(),
            records.len()
        );
        self.health.await_all_healthy(records, timeout, cancel).await
    }

    /// Waits until the named node reports healthy.
    pub async fn await_node_healthy(
        &self,
        name: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let record = self
            .registry
            .get(name)
            .await
            .ok_or_else(|| NetrunnerError::NotFound(name.to_string()))?;
        self.health.await_node_healthy(&record, timeout, cancel).await
    }

    /// JSON summary of the network and its nodes.
    pub async fn info(&self) -> serde_json::Value {
        let records = self.registry.snapshot().await;
        let count = |state: NodeState| records.iter().filter(|r| r.state() == state).count();

        let nodes: Vec<serde_json::Value> = records
            .iter()
            .map(|r| {
                let info = r.info();
                json!({
                    "name": info.name,
                    "node_id": info.node_id.to_string(),
                    "is_beacon": info.is_beacon,
                    "state": info.state,
                    "api_endpoint": info.api_endpoint,
                    "staking_addr": info.staking_addr.to_string(),
                    "last_error": info.last_error,
                })
            })
            .collect();

        json!({
            "name": self.name,
            "network_id": self.network_id,
            "log_level": self.log_level,
            "stopped": self.is_stopped(),
            "total_nodes": records.len(),
            "healthy_nodes": count(NodeState::Healthy),
            "failed_nodes": count(NodeState::Failed),
            "nodes": nodes,
        })
    }
}

impl std::fmt::Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("name", &self.name)
            .field("network_id", &self.network_id)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}
