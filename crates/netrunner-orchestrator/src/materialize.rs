//! Per-node identity, port and argument resolution.

use std::collections::HashSet;
use std::net::{Ipv4Addr, TcpListener};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use netrunner_common::api::NodeApiFactory;
use netrunner_common::config::NodeConfig;
use netrunner_common::identity::{generate_staking_identity, NodeId};
use netrunner_common::process::{BootstrapPeer, LaunchContext, NodeProcess, NodeProcessFactory};
use netrunner_common::protocol::error::{NetrunnerError, Result};
use tracing::debug;

use crate::node::NodeRecord;

/// Attempts at finding a port not already handed out by this allocator.
const PORT_ATTEMPTS: usize = 64;

/// Hands out free loopback ports, never the same port twice per allocator.
#[derive(Debug, Default)]
pub struct PortAllocator {
    used: Mutex<HashSet<u16>>,
}

impl PortAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the OS for a free loopback port.
    pub fn allocate(&self) -> Result<u16> {
        for _ in 0..PORT_ATTEMPTS {
            let port = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))?.local_addr()?.port();
            let mut used = self.used.lock().unwrap_or_else(|p| p.into_inner());
            if used.insert(port) {
                return Ok(port);
            }
        }
        Err(NetrunnerError::Io(std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            "no free loopback port",
        )))
    }

    /// Allocates an (api, staking) port pair.
    pub fn allocate_pair(&self) -> Result<(u16, u16)> {
        Ok((self.allocate()?, self.allocate()?))
    }
}

/// A node whose identity, ports and arguments are resolved but whose process
/// handle has not been built yet.
#[derive(Debug, Clone)]
pub struct PreparedNode {
    pub config: NodeConfig,
    pub launch: LaunchContext,
}

impl PreparedNode {
    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn bootstrap_peer(&self) -> BootstrapPeer {
        BootstrapPeer {
            node_id: self.launch.node_id,
            staking_addr: self.launch.staking_addr(),
        }
    }
}

/// Turns [`NodeConfig`]s into [`NodeRecord`]s for one network.
pub struct Materializer {
    network: String,
    network_id: u32,
    genesis: Arc<[u8]>,
    log_level: String,
    ports: PortAllocator,
    process_factory: Arc<dyn NodeProcessFactory>,
    api_factory: Arc<dyn NodeApiFactory>,
}

impl Materializer {
    pub fn new(
        network: impl Into<String>,
        network_id: u32,
        genesis: Arc<[u8]>,
        log_level: impl Into<String>,
        process_factory: Arc<dyn NodeProcessFactory>,
        api_factory: Arc<dyn NodeApiFactory>,
    ) -> Self {
        Self {
            network: network.into(),
            network_id,
            genesis,
            log_level: log_level.into(),
            ports: PortAllocator::new(),
            process_factory,
            api_factory,
        }
    }

    pub fn genesis(&self) -> &Arc<[u8]> {
        &self.genesis
    }

    /// Resolves identity, ports and the command line for `config`.
    ///
    /// A missing staking identity is generated fresh on every call. Nothing
    /// outside this materializer is touched.
    pub fn prepare(&self, config: &NodeConfig, bootstrap: &[BootstrapPeer]) -> Result<PreparedNode> {
        let mut config = config.clone();
        let staking = match config.staking.take() {
            Some(staking) => staking,
            None => {
                debug!("Generating staking identity for node {}", config.name);
                generate_staking_identity()?
            }
        };
        let node_id = NodeId::from_cert(&staking.cert_pem);
        config.staking = Some(staking);

        let (api_port, staking_port) = self.ports.allocate_pair()?;
        let args = self.node_args(&config, api_port, staking_port, bootstrap);

        Ok(PreparedNode {
            launch: LaunchContext {
                network: self.network.clone(),
                network_id: self.network_id,
                genesis: self.genesis.clone(),
                log_level: self.log_level.clone(),
                node_id,
                api_port,
                staking_port,
                bootstrap: bootstrap.to_vec(),
                args,
            },
            config,
        })
    }

    /// Orchestrator flags first, then the node's own extra arguments.
    fn node_args(
        &self,
        config: &NodeConfig,
        api_port: u16,
        staking_port: u16,
        bootstrap: &[BootstrapPeer],
    ) -> Vec<String> {
        let mut args = vec![
            format!("--network-id={}", self.network_id),
            format!("--http-port={}", api_port),
            format!("--staking-port={}", staking_port),
            format!("--log-level={}", self.log_level),
        ];
        if !bootstrap.is_empty() {
            let ips: Vec<String> = bootstrap.iter().map(|p| p.staking_addr.to_string()).collect();
            let ids: Vec<String> = bootstrap.iter().map(|p| p.node_id.to_string()).collect();
            args.push(format!("--bootstrap-ips={}", ips.join(",")));
            args.push(format!("--bootstrap-ids={}", ids.join(",")));
        }
        args.extend(config.extra_args.iter().cloned());
        args
    }

    /// Builds the process and API handles for a prepared node.
    ///
    /// # Errors
    /// `Launch` if the process factory rejects the node.
    pub fn instantiate(&self, prepared: PreparedNode) -> Result<NodeRecord> {
        let process = self
            .process_factory
            .new_process(&prepared.config, &prepared.launch)
            .map_err(|e| match e {
                launch @ NetrunnerError::Launch { .. } => launch,
                other => NetrunnerError::launch(prepared.name(), other),
            })?;
        let api = self.api_factory.new_api(&prepared.launch.api_endpoint());
        Ok(NodeRecord::new(prepared.config, prepared.launch, process, api))
    }

    /// Builds an already-`Failed` record for a node whose process handle
    /// could not be created, so it still shows up in the registry.
    pub fn failed(&self, prepared: PreparedNode, reason: impl Into<String>) -> NodeRecord {
        let api = self.api_factory.new_api(&prepared.launch.api_endpoint());
        let record = NodeRecord::new(prepared.config, prepared.launch, Arc::new(Unlaunched), api);
        record.record_failure(reason);
        record
    }
}

/// Process stand-in for records that never got a real handle.
struct Unlaunched;

#[async_trait]
impl NodeProcess for Unlaunched {
    async fn start(&self) -> Result<()> {
        Err(NetrunnerError::Launch {
            name: String::new(),
            reason: "node has no process handle".to_string(),
        })
    }

    async fn stop(&self) -> Result<()> {
        Ok(())
    }

    fn is_alive(&self) -> bool {
        false
    }
}
