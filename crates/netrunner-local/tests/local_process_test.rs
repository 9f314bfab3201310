//! LocalNodeProcess tests using shell scripts as stand-in node binaries.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use netrunner_common::config::{NodeConfig, StakingIdentity};
use netrunner_common::identity::NodeId;
use netrunner_common::process::{LaunchContext, NodeProcessFactory};
use netrunner_common::protocol::error::NetrunnerError;
use netrunner_local::LocalProcessFactory;
use serde_json::json;

// ============================================================================
// Test Helpers
// ============================================================================

/// Writes an executable shell script and returns its path.
fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

fn node_config(name: &str, binary: &Path) -> NodeConfig {
    NodeConfig::new(name)
        .with_impl_specific(json!({"binary_path": binary}))
        .with_staking(StakingIdentity {
            cert_pem: b"CERT".to_vec(),
            key_pem: b"KEY".to_vec(),
        })
}

fn launch(args: Vec<String>) -> LaunchContext {
    launch_in("local", args)
}

fn launch_in(network: &str, args: Vec<String>) -> LaunchContext {
    LaunchContext {
        network: network.to_string(),
        network_id: 1337,
        genesis: Arc::from(&b"{}"[..]),
        log_level: "INFO".to_string(),
        node_id: NodeId::from_cert(b"CERT"),
        api_port: 19650,
        staking_port: 19651,
        bootstrap: Vec::new(),
        args,
    }
}

async fn wait_until_dead(process: &dyn netrunner_common::NodeProcess) -> bool {
    for _ in 0..50 {
        if !process.is_alive() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_start_and_stop_long_running_node() {
    let dir = tempfile::tempdir().unwrap();
    let binary = write_script(dir.path(), "node.sh", "exec sleep 30");
    let factory = LocalProcessFactory::new(dir.path().join("data"));

    let process = factory
        .new_process(&node_config("bob", &binary), &launch(vec![]))
        .unwrap();
    assert!(!process.is_alive());

    process.start().await.unwrap();
    assert!(process.is_alive());

    process.stop().await.unwrap();
    assert!(!process.is_alive());

    // stopping twice is fine
    process.stop().await.unwrap();
}

#[tokio::test]
async fn test_node_receives_arguments_and_files() {
    let dir = tempfile::tempdir().unwrap();
    let binary = write_script(dir.path(), "node.sh", "echo \"$@\" > args.txt\nexec sleep 30");
    let factory = LocalProcessFactory::new(dir.path().join("data"));

    let config = node_config("alice", &binary).with_config_file(&b"{\"a\":1}"[..]);
    let process = factory
        .new_process(&config, &launch(vec!["--network-id=1337".to_string()]))
        .unwrap();
    process.start().await.unwrap();

    let node_dir = dir.path().join("data").join("local").join("alice");
    let mut args = String::new();
    for _ in 0..50 {
        if let Ok(contents) = std::fs::read_to_string(node_dir.join("args.txt")) {
            if !contents.is_empty() {
                args = contents;
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    process.stop().await.unwrap();

    assert!(args.contains("--network-id=1337"));
    assert!(args.contains("--config-file="));
    assert!(args.contains("--staking-tls-cert-file="));
    assert_eq!(std::fs::read(node_dir.join("config.json")).unwrap(), b"{\"a\":1}");
    assert_eq!(std::fs::read(node_dir.join("staking").join("staker.key")).unwrap(), b"KEY");
}

#[tokio::test]
async fn test_exited_node_is_not_alive() {
    let dir = tempfile::tempdir().unwrap();
    let binary = write_script(dir.path(), "node.sh", "exit 3");
    let factory = LocalProcessFactory::new(dir.path().join("data"));

    let process = factory
        .new_process(&node_config("carol", &binary), &launch(vec![]))
        .unwrap();
    process.start().await.unwrap();

    assert!(wait_until_dead(process.as_ref()).await);
    process.stop().await.unwrap();
}

#[tokio::test]
async fn test_missing_binary_fails_to_launch() {
    let dir = tempfile::tempdir().unwrap();
    let factory = LocalProcessFactory::new(dir.path().join("data"));

    let process = factory
        .new_process(
            &node_config("dave", &dir.path().join("does-not-exist")),
            &launch(vec![]),
        )
        .unwrap();

    let err = process.start().await.unwrap_err();
    assert!(matches!(err, NetrunnerError::Launch { ref name, .. } if name == "dave"));
    assert!(!process.is_alive());
}

#[test]
fn test_factory_rejects_missing_binary_path() {
    let factory = LocalProcessFactory::new("/tmp/netrunner-unused");
    let config = NodeConfig::new("erin");
    let result = factory.new_process(&config, &launch(vec![]));
    assert!(matches!(result, Err(NetrunnerError::Launch { .. })));
}

#[tokio::test]
async fn test_same_node_name_in_two_networks_keeps_separate_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let binary = write_script(dir.path(), "node.sh", "exec sleep 30");
    let factory = LocalProcessFactory::new(dir.path().join("data"));

    let key_a = StakingIdentity {
        cert_pem: b"CERT-A".to_vec(),
        key_pem: b"KEY-A".to_vec(),
    };
    let key_b = StakingIdentity {
        cert_pem: b"CERT-B".to_vec(),
        key_pem: b"KEY-B".to_vec(),
    };
    let a = factory
        .new_process(
            &node_config("node1", &binary).with_staking(key_a),
            &launch_in("alpha", vec![]),
        )
        .unwrap();
    a.start().await.unwrap();
    let b = factory
        .new_process(
            &node_config("node1", &binary).with_staking(key_b),
            &launch_in("beta", vec![]),
        )
        .unwrap();
    b.start().await.unwrap();

    let data = dir.path().join("data");
    let key_file = |network: &str| data.join(network).join("node1").join("staking").join("staker.key");
    assert_eq!(std::fs::read(key_file("alpha")).unwrap(), b"KEY-A");
    assert_eq!(std::fs::read(key_file("beta")).unwrap(), b"KEY-B");

    a.stop().await.unwrap();
    b.stop().await.unwrap();
}

#[tokio::test]
async fn test_live_node_dir_is_not_handed_out_twice() {
    let dir = tempfile::tempdir().unwrap();
    let binary = write_script(dir.path(), "node.sh", "exec sleep 30");
    let factory = LocalProcessFactory::new(dir.path().join("data"));
    let config = node_config("frank", &binary);

    let first = factory.new_process(&config, &launch(vec![])).unwrap();
    first.start().await.unwrap();

    // a clone shares the record of claimed directories
    let result = factory.clone().new_process(&config, &launch(vec![]));
    assert!(matches!(result, Err(NetrunnerError::Launch { ref name, .. }) if name == "frank"));
    assert!(first.is_alive());

    // stopping frees the directory
    first.stop().await.unwrap();
    let second = factory.new_process(&config, &launch(vec![])).unwrap();
    second.start().await.unwrap();
    second.stop().await.unwrap();
}

#[test]
fn test_dropped_handle_frees_its_dir() {
    let factory = LocalProcessFactory::new("/tmp/netrunner-unused");
    let config = node_config("grace", Path::new("/bin/true"));

    let handle = factory.new_process(&config, &launch(vec![])).unwrap();
    assert!(factory.new_process(&config, &launch(vec![])).is_err());
    drop(handle);
    assert!(factory.new_process(&config, &launch(vec![])).is_ok());
}
