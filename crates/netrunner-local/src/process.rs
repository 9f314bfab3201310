use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use netrunner_common::config::NodeConfig;
use netrunner_common::process::{LaunchContext, NodeProcess, NodeProcessFactory};
use netrunner_common::protocol::error::{NetrunnerError, Result};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::node::{LocalNodeConfig, NodeFiles};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // a poisoned lock only means another thread panicked mid-update; the
    // guarded value itself is still consistent
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Node directories held by live processes of one factory.
#[derive(Debug, Default)]
struct DirClaims(Mutex<HashSet<PathBuf>>);

impl DirClaims {
    fn claim(self: &Arc<Self>, dir: &Path) -> Option<DirClaim> {
        if !lock(&self.0).insert(dir.to_path_buf()) {
            return None;
        }
        Some(DirClaim {
            dir: dir.to_path_buf(),
            claims: self.clone(),
        })
    }
}

/// Exclusive use of one node directory, released on drop.
struct DirClaim {
    dir: PathBuf,
    claims: Arc<DirClaims>,
}

impl Drop for DirClaim {
    fn drop(&mut self) {
        lock(&self.claims.0).remove(&self.dir);
    }
}

/// A node binary running as a child process of this host.
///
/// The handle is created inert; nothing touches the filesystem or spawns
/// until [`NodeProcess::start`]. The child is killed when the handle is
/// dropped.
pub struct LocalNodeProcess {
    name: String,
    binary_path: PathBuf,
    node_dir: PathBuf,
    config: NodeConfig,
    launch: LaunchContext,
    child: Mutex<Option<Child>>,
    claim: Mutex<Option<DirClaim>>,
}

impl LocalNodeProcess {
    pub fn new(
        config: &NodeConfig,
        launch: &LaunchContext,
        data_root: &Path,
    ) -> Result<Self> {
        let local = LocalNodeConfig::from_node_config(config)?;
        Ok(Self {
            name: config.name.clone(),
            binary_path: local.binary_path,
            node_dir: data_root.join(&launch.network).join(&config.name),
            config: config.clone(),
            launch: launch.clone(),
            child: Mutex::new(None),
            claim: Mutex::new(None),
        })
    }

    /// Directory holding this node's files: `<data_root>/<network>/<node>`.
    pub fn node_dir(&self) -> &Path {
        &self.node_dir
    }

    fn child(&self) -> MutexGuard<'_, Option<Child>> {
        lock(&self.child)
    }

    fn release_dir(&self) {
        lock(&self.claim).take();
    }
}

#[async_trait]
impl NodeProcess for LocalNodeProcess {
    async fn start(&self) -> Result<()> {
        if self.child().is_some() {
            return Ok(());
        }

        let files = NodeFiles::write(&self.node_dir, &self.config, &self.launch)
            .await
            .map_err(|e| NetrunnerError::launch(&self.name, e))?;
        let args = files.command_args(&self.launch);

        let stdout = std::fs::File::create(files.log_dir.join("stdout.log"))
            .map_err(|e| NetrunnerError::launch(&self.name, e))?;
        let stderr = std::fs::File::create(files.log_dir.join("stderr.log"))
            .map_err(|e| NetrunnerError::launch(&self.name, e))?;

        let mut cmd = Command::new(&self.binary_path);
        cmd.args(&args)
            .current_dir(&self.node_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true);

        debug!("Spawning {} {:?}", self.binary_path.display(), args);
        let child = cmd.spawn().map_err(|e| {
            NetrunnerError::launch(
                &self.name,
                format!("spawn {} failed: {}", self.binary_path.display(), e),
            )
        })?;

        info!(
            "Node {} started (pid {:?}, api {})",
            self.name,
            child.id(),
            self.launch.api_endpoint()
        );
        *self.child() = Some(child);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let child = self.child().take();
        let Some(mut child) = child else {
            self.release_dir();
            return Ok(());
        };

        match child.try_wait() {
            Ok(Some(status)) => {
                debug!("Node {} already exited with {}", self.name, status);
                self.release_dir();
                return Ok(());
            }
            Ok(None) => {}
            Err(e) => warn!("Failed to query node {} status: {}", self.name, e),
        }

        child
            .kill()
            .await
            .map_err(|e| NetrunnerError::stop(&self.name, e))?;
        self.release_dir();
        info!("Node {} stopped", self.name);
        Ok(())
    }

    fn is_alive(&self) -> bool {
        match self.child().as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }
}

/// Production [`NodeProcessFactory`]: one [`LocalNodeProcess`] per node under
/// a shared data root.
///
/// Nodes are laid out per network, so networks with distinct names never
/// share files. A node directory still held by a process that has not been
/// stopped is never handed out again; clones of a factory share that record.
#[derive(Debug, Clone)]
pub struct LocalProcessFactory {
    data_root: PathBuf,
    claims: Arc<DirClaims>,
}

impl LocalProcessFactory {
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
            claims: Arc::new(DirClaims::default()),
        }
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }
}

impl NodeProcessFactory for LocalProcessFactory {
    fn new_process(
        &self,
        config: &NodeConfig,
        launch: &LaunchContext,
    ) -> Result<Arc<dyn NodeProcess>> {
        let process = LocalNodeProcess::new(config, launch, &self.data_root)
            .map_err(|e| NetrunnerError::launch(&config.name, e))?;
        let claim = self.claims.claim(&process.node_dir).ok_or_else(|| {
            NetrunnerError::launch(
                &config.name,
                format!("data directory {} is in use", process.node_dir.display()),
            )
        })?;
        *lock(&process.claim) = Some(claim);
        Ok(Arc::new(process))
    }
}
