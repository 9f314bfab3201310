use std::sync::Arc;

use netrunner_common::api::NodeApiFactory;
use netrunner_common::config::NetworkConfig;
use netrunner_common::process::NodeProcessFactory;
use netrunner_common::protocol::error::Result;
use tracing::info;

use crate::health_checker::{HealthCheckConfig, HealthChecker};
use crate::materialize::Materializer;
use crate::network::Network;
use crate::registry::NodeRegistry;
use crate::sequencer;

/// Orchestrator configuration.
#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
    pub health: HealthCheckConfig,
}

/// Creates networks from a [`NetworkConfig`].
///
/// The orchestrator only holds the two factories and its config. Every
/// [`Network`] it creates is independent of the others, so one orchestrator
/// can back any number of networks.
///
/// # Example
/// ```no_run
/// # use std::sync::Arc;
/// # use std::time::Duration;
/// # use netrunner_common::{NetworkConfig, NodeConfig};
/// # use netrunner_orchestrator::Orchestrator;
/// # use tokio_util::sync::CancellationToken;
/// # async fn run(
/// #     processes: Arc<dyn netrunner_common::NodeProcessFactory>,
/// #     apis: Arc<dyn netrunner_common::NodeApiFactory>,
/// # ) -> Result<(), Box<dyn std::error::Error>> {
/// let orchestrator = Orchestrator::new(processes, apis);
/// let network = orchestrator
///     .create(NetworkConfig {
///         network_id: 1337,
///         genesis: br#"{"networkID":1337}"#.to_vec(),
///         node_configs: vec![NodeConfig::new("node1").beacon(true)],
///         ..Default::default()
///     })
///     .await?;
/// network
///     .await_healthy(Duration::from_secs(30), &CancellationToken::new())
///     .await?;
/// network.stop().await?;
/// # Ok(())
/// # }
/// ```
pub struct Orchestrator {
    process_factory: Arc<dyn NodeProcessFactory>,
    api_factory: Arc<dyn NodeApiFactory>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        process_factory: Arc<dyn NodeProcessFactory>,
        api_factory: Arc<dyn NodeApiFactory>,
    ) -> Self {
        Self::with_config(process_factory, api_factory, OrchestratorConfig::default())
    }

    pub fn with_config(
        process_factory: Arc<dyn NodeProcessFactory>,
        api_factory: Arc<dyn NodeApiFactory>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            process_factory,
            api_factory,
            config,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Validates `config`, starts its nodes beacons first and returns the
    /// network.
    ///
    /// # Errors
    /// - `InvalidConfig` before anything is started
    /// - `Identity` if a staking identity cannot be generated
    /// - the first beacon `Launch` error; started beacons are stopped again
    ///
    /// Non-beacon launch failures do not fail creation. Those nodes are in
    /// the network in state `Failed`.
    pub async fn create(&self, config: NetworkConfig) -> Result<Network> {
        config.validate()?;

        let name = if config.name.is_empty() {
            format!("network-{}", config.network_id)
        } else {
            config.name.clone()
        };
        info!(
            "Creating network {} ({} node(s), {} beacon(s))",
            name,
            config.node_configs.len(),
            config.beacon_count()
        );

        let materializer = Materializer::new(
            name.clone(),
            config.network_id,
            Arc::from(config.genesis.as_slice()),
            config.log_level.clone(),
            self.process_factory.clone(),
            self.api_factory.clone(),
        );

        let records = sequencer::start_nodes(&materializer, &config.node_configs).await?;
        let registry = NodeRegistry::new();
        for record in records {
            registry.insert(record).await?;
        }

        info!("Network {} created with {} node(s)", name, registry.len().await);
        Ok(Network::new(
            name,
            config.network_id,
            config.log_level,
            materializer,
            HealthChecker::new(self.config.health.clone()),
            registry,
        ))
    }
}
