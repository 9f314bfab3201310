//! Network and node configuration.
//!
//! [`NetworkConfig`] is the immutable input to network creation and
//! [`NodeConfig`] describes a single fleet member. Both are plain data: the
//! orchestrator validates them with [`NetworkConfig::validate`] /
//! [`NodeConfig::validate`] before any process is started.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::error::{NetrunnerError, Result};

/// Default log-level directive handed to node processes.
pub const DEFAULT_LOG_LEVEL: &str = "INFO";

/// Staking certificate/key pair identifying a node to its peers.
///
/// Both halves are PEM-encoded bytes. The key is never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingIdentity {
    pub cert_pem: Vec<u8>,
    pub key_pem: Vec<u8>,
}

impl fmt::Debug for StakingIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StakingIdentity")
            .field("cert_pem", &format!("<{} bytes>", self.cert_pem.len()))
            .field("key_pem", &"<redacted>")
            .finish()
    }
}

/// Per-node configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Logical name, unique within one network
    pub name: String,
    /// Whether other nodes bootstrap from this node
    #[serde(default)]
    pub is_beacon: bool,
    /// Backend-specific payload (binary path, runtime options). Opaque to the
    /// orchestrator.
    #[serde(default)]
    pub impl_specific: Value,
    /// Pre-existing staking identity. Generated when absent.
    #[serde(default)]
    pub staking: Option<StakingIdentity>,
    /// Node config-file contents, passed through byte for byte
    #[serde(default)]
    pub config_file: Option<Vec<u8>>,
    /// Extra arguments appended to the node's command line
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl NodeConfig {
    /// Creates a node config with only a name set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_beacon: false,
            impl_specific: Value::Null,
            staking: None,
            config_file: None,
            extra_args: Vec::new(),
        }
    }

    pub fn beacon(mut self, is_beacon: bool) -> Self {
        self.is_beacon = is_beacon;
        self
    }

    pub fn with_impl_specific(mut self, impl_specific: Value) -> Self {
        self.impl_specific = impl_specific;
        self
    }

    pub fn with_staking(mut self, staking: StakingIdentity) -> Self {
        self.staking = Some(staking);
        self
    }

    pub fn with_config_file(mut self, config_file: impl Into<Vec<u8>>) -> Self {
        self.config_file = Some(config_file.into());
        self
    }

    pub fn with_extra_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Checks the node-local invariants.
    ///
    /// The name must be non-empty and usable as a single path component,
    /// since backends derive per-node directories from it.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(NetrunnerError::InvalidConfig(
                "node name must not be empty".to_string(),
            ));
        }
        if !is_path_component(&self.name) {
            return Err(NetrunnerError::InvalidConfig(format!(
                "node name '{}' must not contain path separators",
                self.name
            )));
        }
        if let Some(staking) = &self.staking {
            if staking.cert_pem.is_empty() || staking.key_pem.is_empty() {
                return Err(NetrunnerError::InvalidConfig(format!(
                    "node '{}' has an incomplete staking identity",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

fn is_path_component(name: &str) -> bool {
    name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// Network-wide configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Numeric network identity
    #[serde(default)]
    pub network_id: u32,
    /// Genesis document, opaque to the orchestrator
    #[serde(default)]
    pub genesis: Vec<u8>,
    /// Nodes to start, in declaration order
    #[serde(default)]
    pub node_configs: Vec<NodeConfig>,
    /// Log-level directive passed to every node
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Human-readable network name
    #[serde(default)]
    pub name: String,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            network_id: 0,
            genesis: Vec::new(),
            node_configs: Vec::new(),
            log_level: default_log_level(),
            name: String::new(),
        }
    }
}

impl NetworkConfig {
    /// Validates the whole network config.
    ///
    /// # Errors
    /// - `InvalidConfig` if nodes are configured without a genesis
    /// - `InvalidConfig` if the network name is not a single path component
    /// - `InvalidConfig` if any node is invalid or two nodes share a name
    pub fn validate(&self) -> Result<()> {
        if !self.name.is_empty() && !is_path_component(&self.name) {
            return Err(NetrunnerError::InvalidConfig(format!(
                "network name '{}' must not contain path separators",
                self.name
            )));
        }
        if !self.node_configs.is_empty() && self.genesis.is_empty() {
            return Err(NetrunnerError::InvalidConfig(
                "genesis must be set when nodes are configured".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(self.node_configs.len());
        for node in &self.node_configs {
            node.validate()?;
            if !seen.insert(node.name.as_str()) {
                return Err(NetrunnerError::InvalidConfig(format!(
                    "duplicate node name '{}'",
                    node.name
                )));
            }
        }
        Ok(())
    }

    /// Number of beacon nodes in the config.
    pub fn beacon_count(&self) -> usize {
        self.node_configs.iter().filter(|n| n.is_beacon).count()
    }
}
