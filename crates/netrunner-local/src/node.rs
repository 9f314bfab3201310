//! On-disk layout of a local node.
//!
//! ```text
//! <data_root>/<node name>/
//!     genesis.json
//!     config.json            (only when a config-file payload is set)
//!     staking/staker.crt
//!     staking/staker.key
//!     db/
//!     logs/
//! ```

use std::path::{Path, PathBuf};

use netrunner_common::config::NodeConfig;
use netrunner_common::process::LaunchContext;
use netrunner_common::protocol::error::{NetrunnerError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Backend payload carried in `NodeConfig::impl_specific`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalNodeConfig {
    /// Path of the node binary to execute
    pub binary_path: PathBuf,
}

impl LocalNodeConfig {
    /// Parses the payload of `config`.
    ///
    /// # Errors
    /// `InvalidConfig` if the payload is not an object with a non-empty
    /// `binary_path`.
    pub fn from_node_config(config: &NodeConfig) -> Result<Self> {
        if config.impl_specific == Value::Null {
            return Err(NetrunnerError::InvalidConfig(format!(
                "node '{}' has no local backend config",
                config.name
            )));
        }
        let parsed: LocalNodeConfig = serde_json::from_value(config.impl_specific.clone())
            .map_err(|e| {
                NetrunnerError::InvalidConfig(format!(
                    "node '{}' has an invalid local backend config: {}",
                    config.name, e
                ))
            })?;
        if parsed.binary_path.as_os_str().is_empty() {
            return Err(NetrunnerError::InvalidConfig(format!(
                "node '{}' has an empty binary path",
                config.name
            )));
        }
        Ok(parsed)
    }
}

/// Paths of the files written for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeFiles {
    pub dir: PathBuf,
    pub genesis: PathBuf,
    pub config_file: Option<PathBuf>,
    pub staking_cert: PathBuf,
    pub staking_key: PathBuf,
    pub db_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl NodeFiles {
    /// Computes the layout under `dir` without touching the filesystem.
    pub fn layout(dir: &Path, has_config_file: bool) -> Self {
        Self {
            dir: dir.to_path_buf(),
            genesis: dir.join("genesis.json"),
            config_file: has_config_file.then(|| dir.join("config.json")),
            staking_cert: dir.join("staking").join("staker.crt"),
            staking_key: dir.join("staking").join("staker.key"),
            db_dir: dir.join("db"),
            log_dir: dir.join("logs"),
        }
    }

    /// Writes the node's files into a freshly emptied `dir`.
    ///
    /// Anything left over from an earlier node of the same name is removed
    /// first, so stale identity or database files never leak into a re-added
    /// node.
    pub async fn write(dir: &Path, config: &NodeConfig, launch: &LaunchContext) -> Result<Self> {
        let staking = config.staking.as_ref().ok_or_else(|| {
            NetrunnerError::InvalidConfig(format!("node '{}' has no staking identity", config.name))
        })?;
        let files = Self::layout(dir, config.config_file.is_some());

        if tokio::fs::try_exists(dir).await? {
            tokio::fs::remove_dir_all(dir).await?;
        }
        tokio::fs::create_dir_all(dir.join("staking")).await?;
        tokio::fs::create_dir_all(&files.db_dir).await?;
        tokio::fs::create_dir_all(&files.log_dir).await?;

        tokio::fs::write(&files.genesis, &launch.genesis[..]).await?;
        tokio::fs::write(&files.staking_cert, &staking.cert_pem).await?;
        tokio::fs::write(&files.staking_key, &staking.key_pem).await?;
        if let (Some(path), Some(contents)) = (&files.config_file, &config.config_file) {
            tokio::fs::write(path, contents).await?;
        }

        Ok(files)
    }

    /// Command line for the node binary: file flags first, then the
    /// orchestrator's arguments so later flags can override earlier ones.
    pub fn command_args(&self, launch: &LaunchContext) -> Vec<String> {
        let mut args = vec![
            format!("--genesis={}", self.genesis.display()),
            format!("--staking-tls-cert-file={}", self.staking_cert.display()),
            format!("--staking-tls-key-file={}", self.staking_key.display()),
            format!("--db-dir={}", self.db_dir.display()),
            format!("--log-dir={}", self.log_dir.display()),
        ];
        if let Some(config_file) = &self.config_file {
            args.push(format!("--config-file={}", config_file.display()));
        }
        args.extend(launch.args.iter().cloned());
        args
    }
}
