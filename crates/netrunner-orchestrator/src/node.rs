use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use netrunner_common::api::NodeApi;
use netrunner_common::config::NodeConfig;
use netrunner_common::identity::NodeId;
use netrunner_common::process::{BootstrapPeer, LaunchContext, NodeProcess};
use netrunner_common::protocol::error::{NetrunnerError, Result};
use serde::Serialize;
use tracing::{debug, warn};

/// Lifecycle state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Configured, not yet started
    Pending,
    /// Process launch issued
    Starting,
    /// Process started, health unknown
    Running,
    /// A health poll has passed at least once
    Healthy,
    /// Process exited or was stopped on request
    Stopped,
    /// Launch failed, process died, or health never arrived in time
    Failed,
}

impl NodeState {
    /// Terminal states are never left.
    pub fn is_terminal(self) -> bool {
        matches!(self, NodeState::Stopped | NodeState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeState::Pending => "pending",
            NodeState::Starting => "starting",
            NodeState::Running => "running",
            NodeState::Healthy => "healthy",
            NodeState::Stopped => "stopped",
            NodeState::Failed => "failed",
        }
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable part of a record.
#[derive(Debug, Clone)]
struct NodeStatus {
    state: NodeState,
    last_health_check: Option<Instant>,
    last_error: Option<String>,
}

/// The orchestrator's bookkeeping for one fleet member.
///
/// A record exclusively owns its process handle. `launch` and `shutdown` run
/// under the record's operation lock, so a stop racing a start always waits
/// for the start to finish and then stops what it started.
pub struct NodeRecord {
    config: NodeConfig,
    launch: LaunchContext,
    process: Arc<dyn NodeProcess>,
    api: Arc<dyn NodeApi>,
    status: RwLock<NodeStatus>,
    op_lock: tokio::sync::Mutex<()>,
}

impl NodeRecord {
    /// Creates a record in [`NodeState::Pending`].
    ///
    /// `config` must already carry its staking identity.
    pub fn new(
        config: NodeConfig,
        launch: LaunchContext,
        process: Arc<dyn NodeProcess>,
        api: Arc<dyn NodeApi>,
    ) -> Self {
        Self {
            config,
            launch,
            process,
            api,
            status: RwLock::new(NodeStatus {
                state: NodeState::Pending,
                last_health_check: None,
                last_error: None,
            }),
            op_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn is_beacon(&self) -> bool {
        self.config.is_beacon
    }

    pub fn node_id(&self) -> NodeId {
        self.launch.node_id
    }

    pub fn launch_context(&self) -> &LaunchContext {
        &self.launch
    }

    pub fn api(&self) -> &Arc<dyn NodeApi> {
        &self.api
    }

    pub fn process(&self) -> &Arc<dyn NodeProcess> {
        &self.process
    }

    pub fn api_endpoint(&self) -> String {
        self.launch.api_endpoint()
    }

    pub fn staking_addr(&self) -> SocketAddr {
        self.launch.staking_addr()
    }

    /// How peers reach this node when bootstrapping.
    pub fn bootstrap_peer(&self) -> BootstrapPeer {
        BootstrapPeer {
            node_id: self.node_id(),
            staking_addr: self.staking_addr(),
        }
    }

    pub fn state(&self) -> NodeState {
        self.status().state
    }

    pub fn last_error(&self) -> Option<String> {
        self.status().last_error.clone()
    }

    pub fn last_health_check(&self) -> Option<Instant> {
        self.status().last_health_check
    }

    fn status(&self) -> RwLockReadGuard<'_, NodeStatus> {
        self.status.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn status_mut(&self) -> RwLockWriteGuard<'_, NodeStatus> {
        self.status.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Moves to `next` unless the record is already terminal.
    ///
    /// Returns whether the transition was applied.
    pub fn transition(&self, next: NodeState) -> bool {
        let mut status = self.status_mut();
        if status.state.is_terminal() {
            return false;
        }
        debug!("Node {}: {} -> {}", self.name(), status.state, next);
        status.state = next;
        true
    }

    /// Marks the record failed and remembers why.
    pub fn record_failure(&self, reason: impl Into<String>) {
        let reason = reason.into();
        let mut status = self.status_mut();
        if !status.state.is_terminal() {
            status.state = NodeState::Failed;
        }
        status.last_error = Some(reason);
    }

    /// Records the outcome of one health poll.
    ///
    /// A passing poll promotes `Running` to `Healthy`. A failing poll never
    /// demotes.
    pub fn record_health_check(&self, healthy: bool) {
        let mut status = self.status_mut();
        status.last_health_check = Some(Instant::now());
        if healthy && status.state == NodeState::Running {
            status.state = NodeState::Healthy;
        }
    }

    /// Starts the process. Only valid from `Pending`.
    ///
    /// # Errors
    /// `Launch` if the record was already started or stopped, or if the
    /// process fails to start. In the latter case the record is `Failed`.
    pub async fn launch(&self) -> Result<()> {
        let _guard = self.op_lock.lock().await;

        {
            let mut status = self.status_mut();
            if status.state != NodeState::Pending {
                return Err(NetrunnerError::launch(
                    self.name(),
                    format!("node is {}", status.state),
                ));
            }
            status.state = NodeState::Starting;
        }

        match self.process.start().await {
            Ok(()) => {
                self.transition(NodeState::Running);
                Ok(())
            }
            Err(e) => {
                self.record_failure(e.to_string());
                Err(match e {
                    launch @ NetrunnerError::Launch { .. } => launch,
                    other => NetrunnerError::launch(self.name(), other),
                })
            }
        }
    }

    /// Stops the process and moves the record to `Stopped` (a `Failed`
    /// record stays `Failed`).
    ///
    /// The state changes even when stopping fails: a record being shut down
    /// is on its way out of the registry either way.
    pub async fn shutdown(&self) -> Result<()> {
        let _guard = self.op_lock.lock().await;

        if self.state() == NodeState::Stopped {
            return Ok(());
        }

        let result = self.process.stop().await;
        self.transition(NodeState::Stopped);

        if let Err(e) = &result {
            warn!("Error stopping node {}: {}", self.name(), e);
            self.status_mut().last_error = Some(e.to_string());
        }
        result.map_err(|e| match e {
            stop @ NetrunnerError::Stop { .. } => stop,
            other => NetrunnerError::stop(self.name(), other),
        })
    }

    /// Read-only snapshot for callers.
    pub fn info(&self) -> NodeInfo {
        let status = self.status().clone();
        NodeInfo {
            name: self.config.name.clone(),
            node_id: self.node_id(),
            is_beacon: self.config.is_beacon,
            state: status.state,
            api_endpoint: self.api_endpoint(),
            staking_addr: self.staking_addr(),
            last_error: status.last_error,
            config: self.config.clone(),
            api: self.api.clone(),
        }
    }
}

impl fmt::Debug for NodeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRecord")
            .field("name", &self.config.name)
            .field("node_id", &self.node_id())
            .field("is_beacon", &self.config.is_beacon)
            .field("state", &self.state())
            .finish()
    }
}

/// Point-in-time view of a node handed to callers.
#[derive(Clone)]
pub struct NodeInfo {
    pub name: String,
    pub node_id: NodeId,
    pub is_beacon: bool,
    pub state: NodeState,
    pub api_endpoint: String,
    pub staking_addr: SocketAddr,
    pub last_error: Option<String>,
    /// Copy of the resolved config, identity included
    pub config: NodeConfig,
    /// Shared API handle for querying the node directly
    pub api: Arc<dyn NodeApi>,
}

impl fmt::Debug for NodeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeInfo")
            .field("name", &self.name)
            .field("node_id", &self.node_id)
            .field("is_beacon", &self.is_beacon)
            .field("state", &self.state)
            .field("api_endpoint", &self.api_endpoint)
            .field("staking_addr", &self.staking_addr)
            .field("last_error", &self.last_error)
            .finish()
    }
}
