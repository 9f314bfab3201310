//! Instrumented process and API doubles shared by the orchestrator tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use netrunner_common::api::{NodeApi, NodeApiFactory};
use netrunner_common::config::NodeConfig;
use netrunner_common::process::{LaunchContext, NodeProcess, NodeProcessFactory};
use netrunner_common::protocol::error::{NetrunnerError, Result};
use netrunner_orchestrator::{HealthCheckConfig, Orchestrator, OrchestratorConfig};

// ============================================================================
// Event Log
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Created { name: String, beacon: bool },
    Started(String),
    Stopped(String),
}

/// Ordered log of everything the fake backend was asked to do.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<Event>>,
}

impl EventLog {
    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Created { name, .. } => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn stopped(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Stopped(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    /// Index of the first event matching `pred`.
    pub fn position(&self, pred: impl Fn(&Event) -> bool) -> Option<usize> {
        self.events().iter().position(pred)
    }

    /// Index of the last event matching `pred`.
    pub fn last_position(&self, pred: impl Fn(&Event) -> bool) -> Option<usize> {
        self.events().iter().rposition(pred)
    }
}

// ============================================================================
// Fake Process Backend
// ============================================================================

pub struct FakeProcess {
    name: String,
    log: Arc<EventLog>,
    fail_start: bool,
    fail_stop: bool,
    start_delay: Duration,
    alive: AtomicBool,
}

impl FakeProcess {
    /// Simulates the process dying on its own.
    pub fn crash(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl NodeProcess for FakeProcess {
    async fn start(&self) -> Result<()> {
        if !self.start_delay.is_zero() {
            tokio::time::sleep(self.start_delay).await;
        }
        if self.fail_start {
            return Err(NetrunnerError::launch(&self.name, "exec format error"));
        }
        self.log.push(Event::Started(self.name.clone()));
        self.alive.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.log.push(Event::Stopped(self.name.clone()));
        self.alive.store(false, Ordering::SeqCst);
        if self.fail_stop {
            return Err(NetrunnerError::stop(&self.name, "no such process"));
        }
        Ok(())
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

/// Factory that records every call and can be told to fail chosen nodes.
#[derive(Default)]
pub struct FakeFactory {
    pub log: Arc<EventLog>,
    configs: Mutex<Vec<(NodeConfig, LaunchContext)>>,
    processes: Mutex<HashMap<String, Arc<FakeProcess>>>,
    fail_create: Mutex<HashSet<String>>,
    fail_start: Mutex<HashSet<String>>,
    fail_stop: Mutex<HashSet<String>>,
    start_delay: Mutex<Duration>,
}

impl FakeFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_create(&self, name: &str) {
        self.fail_create.lock().unwrap().insert(name.to_string());
    }

    pub fn fail_start(&self, name: &str) {
        self.fail_start.lock().unwrap().insert(name.to_string());
    }

    pub fn fail_stop(&self, name: &str) {
        self.fail_stop.lock().unwrap().insert(name.to_string());
    }

    pub fn set_start_delay(&self, delay: Duration) {
        *self.start_delay.lock().unwrap() = delay;
    }

    /// Every (config, launch context) pair the factory was called with.
    pub fn calls(&self) -> Vec<(NodeConfig, LaunchContext)> {
        self.configs.lock().unwrap().clone()
    }

    /// The latest process created for `name`.
    pub fn process(&self, name: &str) -> Arc<FakeProcess> {
        self.processes.lock().unwrap()[name].clone()
    }
}

impl NodeProcessFactory for FakeFactory {
    fn new_process(
        &self,
        config: &NodeConfig,
        launch: &LaunchContext,
    ) -> Result<Arc<dyn NodeProcess>> {
        self.log.push(Event::Created {
            name: config.name.clone(),
            beacon: config.is_beacon,
        });
        self.configs
            .lock()
            .unwrap()
            .push((config.clone(), launch.clone()));

        if self.fail_create.lock().unwrap().contains(&config.name) {
            return Err(NetrunnerError::InvalidConfig(format!(
                "no binary for {}",
                config.name
            )));
        }

        let process = Arc::new(FakeProcess {
            name: config.name.clone(),
            log: self.log.clone(),
            fail_start: self.fail_start.lock().unwrap().contains(&config.name),
            fail_stop: self.fail_stop.lock().unwrap().contains(&config.name),
            start_delay: *self.start_delay.lock().unwrap(),
            alive: AtomicBool::new(false),
        });
        self.processes
            .lock()
            .unwrap()
            .insert(config.name.clone(), process.clone());
        Ok(process)
    }
}

// ============================================================================
// Fake Node API
// ============================================================================

/// Shared health switchboard for every API handle built by [`FakeApis`].
#[derive(Default)]
pub struct FakeApis {
    healthy_by_default: AtomicBool,
    overrides: Mutex<HashMap<String, bool>>,
    polls: Mutex<HashMap<String, usize>>,
}

impl FakeApis {
    pub fn new(healthy_by_default: bool) -> Arc<Self> {
        let apis = Self::default();
        apis.healthy_by_default
            .store(healthy_by_default, Ordering::SeqCst);
        Arc::new(apis)
    }

    pub fn set_healthy(&self, endpoint: &str, healthy: bool) {
        self.overrides
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), healthy);
    }

    pub fn set_all_healthy(&self, healthy: bool) {
        self.overrides.lock().unwrap().clear();
        self.healthy_by_default.store(healthy, Ordering::SeqCst);
    }

    pub fn polls(&self, endpoint: &str) -> usize {
        self.polls
            .lock()
            .unwrap()
            .get(endpoint)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_polls(&self) -> usize {
        self.polls.lock().unwrap().values().sum()
    }
}

pub struct FakeApi {
    endpoint: String,
    apis: Arc<FakeApis>,
    queries: AtomicUsize,
}

#[async_trait]
impl NodeApi for FakeApi {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn health(&self) -> Result<bool> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        *self
            .apis
            .polls
            .lock()
            .unwrap()
            .entry(self.endpoint.clone())
            .or_default() += 1;
        let overrides = self.apis.overrides.lock().unwrap();
        Ok(overrides
            .get(&self.endpoint)
            .copied()
            .unwrap_or_else(|| self.apis.healthy_by_default.load(Ordering::SeqCst)))
    }

    async fn node_id(&self) -> Result<String> {
        Ok(format!("node at {}", self.endpoint))
    }
}

/// Wrapper so the switchboard can be handed out as a factory while tests
/// keep their own handle on it.
pub struct FakeApiFactory(pub Arc<FakeApis>);

impl NodeApiFactory for FakeApiFactory {
    fn new_api(&self, endpoint: &str) -> Arc<dyn NodeApi> {
        Arc::new(FakeApi {
            endpoint: endpoint.to_string(),
            apis: self.0.clone(),
            queries: AtomicUsize::new(0),
        })
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn fast_health() -> HealthCheckConfig {
    HealthCheckConfig {
        interval: Duration::from_millis(10),
        request_timeout: Duration::from_millis(100),
    }
}

pub fn orchestrator(factory: &Arc<FakeFactory>, apis: &Arc<FakeApis>) -> Orchestrator {
    Orchestrator::with_config(
        factory.clone(),
        Arc::new(FakeApiFactory(apis.clone())),
        OrchestratorConfig {
            health: fast_health(),
        },
    )
}

pub fn genesis() -> Vec<u8> {
    br#"{"networkID":1337,"allocations":[]}"#.to_vec()
}
