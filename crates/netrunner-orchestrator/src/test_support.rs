//! In-memory process and API doubles for unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use netrunner_common::api::NodeApi;
use netrunner_common::config::{NodeConfig, StakingIdentity};
use netrunner_common::identity::NodeId;
use netrunner_common::process::{LaunchContext, NodeProcess};
use netrunner_common::protocol::error::{NetrunnerError, Result};

use crate::node::NodeRecord;

#[derive(Default)]
pub struct MockProcess {
    alive: AtomicBool,
    fail_start: bool,
    fail_stop: bool,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
}

impl MockProcess {
    pub fn failing_start() -> Self {
        Self {
            fail_start: true,
            ..Default::default()
        }
    }

    pub fn failing_stop() -> Self {
        Self {
            fail_stop: true,
            ..Default::default()
        }
    }

    /// Simulates the process exiting on its own.
    pub fn crash(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NodeProcess for MockProcess {
    async fn start(&self) -> Result<()> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_start {
            return Err(NetrunnerError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "binary not found",
            )));
        }
        self.alive.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.alive.store(false, Ordering::SeqCst);
        if self.fail_stop {
            return Err(NetrunnerError::Transport("stop refused".to_string()));
        }
        Ok(())
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

pub struct MockApi {
    endpoint: String,
    healthy: AtomicBool,
    fail: AtomicBool,
    polls: AtomicUsize,
}

impl MockApi {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            healthy: AtomicBool::new(false),
            fail: AtomicBool::new(false),
            polls: AtomicUsize::new(0),
        }
    }

    pub fn healthy(endpoint: &str) -> Self {
        let api = Self::new(endpoint);
        api.set_healthy(true);
        api
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Makes every query fail as if the node refused connections.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.fail.store(unreachable, Ordering::SeqCst);
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NodeApi for MockApi {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn health(&self) -> Result<bool> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(NetrunnerError::Transport("connection refused".to_string()));
        }
        Ok(self.healthy.load(Ordering::SeqCst))
    }

    async fn node_id(&self) -> Result<String> {
        Ok("NodeID-mock".to_string())
    }
}

pub fn launch_context(cert: &[u8]) -> LaunchContext {
    LaunchContext {
        network: "test".to_string(),
        network_id: 1337,
        genesis: Arc::from(&b"{}"[..]),
        log_level: "INFO".to_string(),
        node_id: NodeId::from_cert(cert),
        api_port: 9650,
        staking_port: 9651,
        bootstrap: Vec::new(),
        args: Vec::new(),
    }
}

fn staked(name: &str, beacon: bool) -> NodeConfig {
    NodeConfig::new(name)
        .beacon(beacon)
        .with_staking(StakingIdentity {
            cert_pem: format!("CERT-{}", name).into_bytes(),
            key_pem: b"KEY".to_vec(),
        })
}

pub fn mock_record(
    name: &str,
    beacon: bool,
    process: Arc<MockProcess>,
    api: Arc<MockApi>,
) -> NodeRecord {
    let config = staked(name, beacon);
    let launch = launch_context(format!("CERT-{}", name).as_bytes());
    NodeRecord::new(config, launch, process, api)
}

pub fn record_with(name: &str, beacon: bool, process: Arc<MockProcess>) -> NodeRecord {
    let api = Arc::new(MockApi::new("http://127.0.0.1:9650"));
    mock_record(name, beacon, process, api)
}

pub fn record(name: &str, beacon: bool) -> (NodeRecord, Arc<MockProcess>) {
    let process = Arc::new(MockProcess::default());
    (record_with(name, beacon, process.clone()), process)
}
