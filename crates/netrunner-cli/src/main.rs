//! # netrunner CLI Entry Point
//!
//! Starts and inspects local multi-node networks.
//!
//! ## Usage
//!
//! ```bash
//! # Start a network and keep it running until ctrl-c
//! netrunner start network.json
//!
//! # Keep node data in a fixed directory and wait longer for readiness
//! netrunner start network.json --data-dir /tmp/net --health-timeout 120
//!
//! # Check a manifest without starting anything
//! netrunner validate network.json
//!
//! # Generate a staking certificate and key
//! netrunner gen-staking -o staking/node1
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use argh::FromArgs;
use netrunner_cli::manifest;
use netrunner_client::{ClientConfig, NodeApiClientFactory};
use netrunner_common::{generate_staking_identity, NetrunnerError, NodeId};
use netrunner_local::LocalProcessFactory;
use netrunner_orchestrator::{Orchestrator, OrchestratorConfig};
use tokio_util::sync::CancellationToken;

/// Environment variable consulted when `--data-dir` is not given.
const DATA_DIR_ENV: &str = "NETRUNNER_DATA_DIR";

#[derive(FromArgs)]
/// local multi-node network orchestrator
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Start(StartArgs),
    Validate(ValidateArgs),
    GenStaking(GenStakingArgs),
}

/// Arguments for starting a network.
///
/// Every node gets its own directory, `<data-dir>/<network>/<node>`, holding
/// its genesis, staking files, database and logs.
#[derive(FromArgs)]
#[argh(subcommand, name = "start")]
/// start a network from a manifest
struct StartArgs {
    /// path of the JSON network manifest
    #[argh(positional)]
    manifest: String,

    /// directory holding per-node data
    ///
    /// Falls back to the NETRUNNER_DATA_DIR environment variable, then to a
    /// temporary directory removed on exit.
    #[argh(option, short = 'd', long = "data-dir")]
    data_dir: Option<String>,

    /// log filter for this process, overridden by RUST_LOG
    #[argh(option, long = "log-level", default = "\"info\".into()")]
    log_level: String,

    /// seconds to wait for every node to report healthy
    #[argh(option, long = "health-timeout", default = "60")]
    health_timeout_secs: u64,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "validate")]
/// check a manifest without starting anything
struct ValidateArgs {
    /// path of the JSON network manifest
    #[argh(positional)]
    manifest: String,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "gen-staking")]
/// write a new staking certificate and key
struct GenStakingArgs {
    /// output directory for staker.crt and staker.key
    #[argh(option, short = 'o', long = "out", default = "\".\".into()")]
    out: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    let default_level = match &cli.command {
        Commands::Start(args) => args.log_level.clone(),
        _ => "info".to_string(),
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    // stdout carries command output
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Start(args) => run_start(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::GenStaking(args) => run_gen_staking(args),
    }
}

/// Picks the data root: flag, then environment, then a scratch directory.
///
/// The returned guard owns the scratch directory, if one was created.
fn resolve_data_dir(flag: Option<String>) -> Result<(PathBuf, Option<tempfile::TempDir>)> {
    if let Some(dir) = flag.or_else(|| std::env::var(DATA_DIR_ENV).ok()) {
        return Ok((PathBuf::from(dir), None));
    }
    let scratch = tempfile::Builder::new()
        .prefix("netrunner-")
        .tempdir()
        .map_err(|e| anyhow::anyhow!("Failed to create data directory: {}", e))?;
    Ok((scratch.path().to_path_buf(), Some(scratch)))
}

async fn run_start(args: StartArgs) -> Result<()> {
    let config = manifest::load_network_config(Path::new(&args.manifest))?;
    let (data_root, _scratch) = resolve_data_dir(args.data_dir)?;
    tracing::info!("Node data under {}", data_root.display());

    let orchestrator = Orchestrator::with_config(
        Arc::new(LocalProcessFactory::new(&data_root)),
        Arc::new(NodeApiClientFactory::new(ClientConfig::default())),
        OrchestratorConfig::default(),
    );
    let network = orchestrator.create(config).await?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, shutting down");
        }
        interrupt.cancel();
    });

    let timeout = Duration::from_secs(args.health_timeout_secs);
    match network.await_healthy(timeout, &cancel).await {
        Ok(()) => tracing::info!("Network '{}' is healthy", network.name()),
        Err(NetrunnerError::Cancelled) => {
            network.stop().await?;
            return Ok(());
        }
        Err(e) => {
            tracing::error!("Network '{}' did not become healthy: {}", network.name(), e);
            network.stop().await?;
            return Err(e.into());
        }
    }

    println!("{}", serde_json::to_string_pretty(&network.info().await)?);

    cancel.cancelled().await;
    network.stop().await?;
    tracing::info!("Network '{}' stopped", network.name());
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<()> {
    let config = manifest::load_network_config(Path::new(&args.manifest))?;
    println!(
        "{}: {} nodes ({} beacons), network id {}",
        args.manifest,
        config.node_configs.len(),
        config.beacon_count(),
        config.network_id
    );
    Ok(())
}

fn run_gen_staking(args: GenStakingArgs) -> Result<()> {
    let out = PathBuf::from(&args.out);
    std::fs::create_dir_all(&out)
        .map_err(|e| anyhow::anyhow!("Failed to create {}: {}", out.display(), e))?;

    let identity = generate_staking_identity()?;
    std::fs::write(out.join("staker.crt"), &identity.cert_pem)?;
    std::fs::write(out.join("staker.key"), &identity.key_pem)?;

    println!("{}", NodeId::from_cert(&identity.cert_pem));
    Ok(())
}
