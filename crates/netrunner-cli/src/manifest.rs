//! JSON network manifests.
//!
//! A manifest points at files on disk instead of embedding them:
//!
//! ```json
//! {
//!   "name": "local",
//!   "network_id": 1337,
//!   "genesis": "genesis.json",
//!   "log_level": "INFO",
//!   "nodes": [
//!     { "name": "node1", "is_beacon": true, "binary_path": "./bin/node" },
//!     {
//!       "name": "node2",
//!       "binary_path": "./bin/node",
//!       "staking_cert": "staking/node2.crt",
//!       "staking_key": "staking/node2.key",
//!       "config_file": "node2.json",
//!       "extra_args": ["--api-admin-enabled=true"]
//!     }
//!   ]
//! }
//! ```
//!
//! Relative paths are resolved against the manifest's directory. A bare
//! binary name such as `"avalanchego"` is left alone so it is looked up on
//! `PATH`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use netrunner_common::config::{NetworkConfig, NodeConfig, StakingIdentity};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Network section of a manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkManifest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub network_id: u32,
    /// Path of the genesis file
    #[serde(default)]
    pub genesis: Option<PathBuf>,
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub nodes: Vec<NodeManifest>,
}

/// One node entry of a manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeManifest {
    pub name: String,
    #[serde(default)]
    pub is_beacon: bool,
    pub binary_path: PathBuf,
    #[serde(default)]
    pub staking_cert: Option<PathBuf>,
    #[serde(default)]
    pub staking_key: Option<PathBuf>,
    #[serde(default)]
    pub config_file: Option<PathBuf>,
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl NetworkManifest {
    /// Parses a manifest from JSON text.
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| anyhow::anyhow!("Invalid manifest: {}", e))
    }

    /// Reads and parses the manifest at `path`.
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read manifest {}: {}", path.display(), e))?;
        Self::parse(&text)
    }

    /// Loads every referenced file and builds the network config.
    ///
    /// `base_dir` anchors relative paths. The result is validated before it
    /// is returned.
    pub fn into_network_config(self, base_dir: &Path) -> Result<NetworkConfig> {
        let genesis = match &self.genesis {
            Some(path) => read_file(&resolve(base_dir, path), "genesis")?,
            None => Vec::new(),
        };

        let node_configs = self
            .nodes
            .into_iter()
            .map(|node| node.into_node_config(base_dir))
            .collect::<Result<Vec<_>>>()?;

        let mut config = NetworkConfig {
            network_id: self.network_id,
            genesis,
            node_configs,
            name: self.name,
            ..Default::default()
        };
        if let Some(level) = self.log_level {
            config.log_level = level;
        }

        config.validate()?;
        Ok(config)
    }
}

impl NodeManifest {
    fn into_node_config(self, base_dir: &Path) -> Result<NodeConfig> {
        let binary_path = resolve_binary(base_dir, &self.binary_path);
        let mut config = NodeConfig::new(self.name.clone())
            .beacon(self.is_beacon)
            .with_impl_specific(json!({ "binary_path": binary_path }))
            .with_extra_args(self.extra_args);

        match (&self.staking_cert, &self.staking_key) {
            (Some(cert), Some(key)) => {
                config = config.with_staking(StakingIdentity {
                    cert_pem: read_file(&resolve(base_dir, cert), "staking certificate")?,
                    key_pem: read_file(&resolve(base_dir, key), "staking key")?,
                });
            }
            (None, None) => {}
            _ => {
                return Err(anyhow::anyhow!(
                    "Node '{}' must set both staking_cert and staking_key, or neither",
                    self.name
                ))
            }
        }

        if let Some(path) = &self.config_file {
            config = config.with_config_file(read_file(&resolve(base_dir, path), "config file")?);
        }
        Ok(config)
    }
}

/// Reads the manifest at `path` and builds its network config.
pub fn load_network_config(path: &Path) -> Result<NetworkConfig> {
    let manifest = NetworkManifest::read(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    manifest.into_network_config(base_dir)
}

fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn resolve_binary(base_dir: &Path, path: &Path) -> PathBuf {
    // bare names go through PATH
    if path.components().count() == 1 && !path.is_absolute() {
        path.to_path_buf()
    } else {
        resolve(base_dir, path)
    }
}

fn read_file(path: &Path, what: &str) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| anyhow::anyhow!("Failed to read {} {}: {}", what, path.display(), e))
}
