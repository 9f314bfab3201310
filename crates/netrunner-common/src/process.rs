//! Node process contract.
//!
//! The orchestrator never touches OS processes directly. It asks a
//! [`NodeProcessFactory`] for a [`NodeProcess`] per node and drives it through
//! `start`/`stop`/`is_alive`. Creating a handle must not spawn anything: the
//! process only comes to life on [`NodeProcess::start`].

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::NodeConfig;
use crate::identity::NodeId;
use crate::protocol::error::Result;

/// A beacon a joining node bootstraps from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapPeer {
    pub node_id: NodeId,
    pub staking_addr: SocketAddr,
}

/// Everything besides the [`NodeConfig`] a backend needs to launch a node.
#[derive(Debug, Clone)]
pub struct LaunchContext {
    /// Name of the network the node belongs to
    pub network: String,
    pub network_id: u32,
    /// Genesis bytes, shared by every node of the network
    pub genesis: Arc<[u8]>,
    pub log_level: String,
    pub node_id: NodeId,
    pub api_port: u16,
    pub staking_port: u16,
    /// Beacons to bootstrap from (empty for beacons and zero-beacon networks)
    pub bootstrap: Vec<BootstrapPeer>,
    /// Command-line arguments: orchestrator flags followed by the node's own
    /// extra arguments
    pub args: Vec<String>,
}

impl LaunchContext {
    /// HTTP endpoint of the node API.
    pub fn api_endpoint(&self) -> String {
        format!("http://{}:{}", Ipv4Addr::LOCALHOST, self.api_port)
    }

    /// Address the node accepts peer connections on.
    pub fn staking_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, self.staking_port))
    }
}

/// Handle on one node process.
///
/// Implementations use interior mutability: the orchestrator shares the
/// handle between its lifecycle operations and the health pollers.
#[async_trait]
pub trait NodeProcess: Send + Sync {
    /// Launches the process.
    async fn start(&self) -> Result<()>;

    /// Stops the process and waits for it to exit.
    async fn stop(&self) -> Result<()>;

    /// Whether the process is currently running.
    fn is_alive(&self) -> bool;
}

/// Builds [`NodeProcess`] handles.
pub trait NodeProcessFactory: Send + Sync {
    fn new_process(
        &self,
        config: &NodeConfig,
        launch: &LaunchContext,
    ) -> Result<Arc<dyn NodeProcess>>;
}

impl<F> NodeProcessFactory for F
where
    F: Fn(&NodeConfig, &LaunchContext) -> Result<Arc<dyn NodeProcess>> + Send + Sync,
{
    fn new_process(
        &self,
        config: &NodeConfig,
        launch: &LaunchContext,
    ) -> Result<Arc<dyn NodeProcess>> {
        self(config, launch)
    }
}
