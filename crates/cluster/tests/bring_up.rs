//! Bring-up failure policy: a cluster that cannot fully start is not a
//! valid fixture and must fail fatally within the startup timeout.

#![cfg(unix)]

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use axum::{routing::post, Json, Router};
use ledgerlab_cluster::{
    ClusterConfig, ClusterError, ClusterManager, ClusterTopology, Node, NodeRole, ProcessHandle,
};
use ledgerlab_types::{AccountId, CryptoHash, SignerKey};
use serde_json::{json, Value};
use tempfile::TempDir;

#[tokio::test]
async fn unresponsive_boot_node_fails_bring_up() -> Result<()> {
    let root = TempDir::new()?;
    // A stub that runs but never serves RPC.
    let stub = root.path().join("stub-node.sh");
    std::fs::write(&stub, "#!/bin/sh\ntrap 'exit 0' TERM\nwhile :; do sleep 1; done\n")?;
    std::fs::set_permissions(&stub, std::fs::Permissions::from_mode(0o755))?;

    let config = ClusterConfig::new(&stub, root.path().join("cluster"))
        .with_startup_timeout(Duration::from_millis(500))
        .with_poll_interval(Duration::from_millis(100))
        .with_kill_grace(Duration::from_secs(2));
    let manager = ClusterManager::new(config);

    let err = manager
        .bring_up(ClusterTopology::new(2, 0, 1))
        .await
        .unwrap_err();
    assert!(
        matches!(err, ClusterError::StartupTimeout { index: 0, .. }),
        "got {err:?}"
    );
    Ok(())
}

#[tokio::test]
async fn missing_binary_fails_spawn() -> Result<()> {
    let root = TempDir::new()?;
    let config = ClusterConfig::new(root.path().join("no-such-binary"), root.path().join("c"));
    let manager = ClusterManager::new(config);

    let err = manager
        .bring_up(ClusterTopology::new(1, 0, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, ClusterError::Process(_)), "got {err:?}");
    Ok(())
}

/// Answers every request as a responsive node's status endpoint.
async fn spawn_status_mock() -> SocketAddr {
    async fn handler(_body: Json<Value>) -> Json<Value> {
        Json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {
                "chain_id": "mocknet",
                "sync_info": {
                    "latest_block_hash": CryptoHash([1u8; 32]).to_string(),
                    "latest_block_height": 1,
                }
            }
        }))
    }
    let app = Router::new().route("/", post(handler));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// An address nothing listens on.
fn closed_port_addr() -> Result<String> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr.to_string())
}

fn write_stub(dir: &Path) -> Result<PathBuf> {
    let path = dir.join("stub-node.sh");
    std::fs::write(&path, "#!/bin/sh\ntrap 'exit 0' TERM\nwhile :; do sleep 1; done\n")?;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

fn stub_backed_node(index: usize, stub: &Path, root: &Path, rpc_addr: String) -> Result<Node> {
    let node_dir = root.join(format!("node{index}"));
    std::fs::create_dir_all(node_dir.join("data"))?;
    let process = ProcessHandle::new(index, stub, node_dir, rpc_addr, "127.0.0.1:0")
        .with_kill_grace(Duration::from_secs(2));
    Ok(Node::new(
        index,
        NodeRole::Validator,
        BTreeSet::new(),
        SignerKey::for_account(AccountId::test(index)),
        process,
    ))
}

#[tokio::test]
async fn mid_pack_startup_failure_stops_the_sequence() -> Result<()> {
    // Node 1's RPC never comes up. Start ordering must attribute the
    // timeout to node 1 and never spawn node 2, so a broken bring-up
    // does not leave processes running behind the failure point.
    let root = TempDir::new()?;
    let stub = write_stub(root.path())?;

    let mut nodes = vec![
        stub_backed_node(0, &stub, root.path(), spawn_status_mock().await.to_string())?,
        stub_backed_node(1, &stub, root.path(), closed_port_addr()?)?,
        stub_backed_node(2, &stub, root.path(), spawn_status_mock().await.to_string())?,
    ];

    let config = ClusterConfig::new(&stub, root.path())
        .with_startup_timeout(Duration::from_millis(500))
        .with_poll_interval(Duration::from_millis(100));
    let manager = ClusterManager::new(config);

    let err = manager.start_all(&mut nodes).await.unwrap_err();
    assert!(
        matches!(err, ClusterError::StartupTimeout { index: 1, .. }),
        "got {err:?}"
    );

    // Nodes 0 and 1 were spawned (their log files exist); node 2 never was.
    assert!(root.path().join("node0/stdout.log").is_file());
    assert!(root.path().join("node1/stdout.log").is_file());
    assert!(!root.path().join("node2/stdout.log").exists());
    Ok(())
}

#[tokio::test]
async fn empty_topology_is_rejected() -> Result<()> {
    let root = TempDir::new()?;
    let manager = ClusterManager::new(ClusterConfig::new("/usr/bin/false", root.path()));

    let err = manager
        .bring_up(ClusterTopology::new(0, 0, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, ClusterError::EmptyTopology));
    Ok(())
}
