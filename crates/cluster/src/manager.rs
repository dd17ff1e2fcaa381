//! Cluster bring-up: fixture materialization and start ordering.

use crate::{
    pick_free_tcp_port, ClusterError, ClusterTopology, Node, NodeRole, ProcessHandle,
};
use ledgerlab_types::{AccountId, ShardId, SignerKey};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Static cluster-wide settings: where the node binary lives, where
/// fixtures are materialized, and how patient bring-up is.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Path to the ledger node executable.
    pub binary: PathBuf,
    /// Root under which per-node directories are created.
    pub root_dir: PathBuf,
    /// Per-node budget for the RPC endpoint to become responsive.
    pub startup_timeout: Duration,
    /// Interval between responsiveness probes.
    pub poll_interval: Duration,
    /// Grace period between SIGTERM and SIGKILL.
    pub kill_grace: Duration,
}

impl ClusterConfig {
    pub fn new(binary: impl Into<PathBuf>, root_dir: impl Into<PathBuf>) -> Self {
        ClusterConfig {
            binary: binary.into(),
            root_dir: root_dir.into(),
            startup_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(500),
            kill_grace: Duration::from_secs(5),
        }
    }

    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }
}

/// Builds and starts a cluster of [`Node`]s from a topology description.
pub struct ClusterManager {
    config: ClusterConfig,
}

impl ClusterManager {
    pub fn new(config: ClusterConfig) -> Self {
        ClusterManager { config }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Materialize node directories and return not-yet-started nodes.
    ///
    /// Exposed separately from [`bring_up`](Self::bring_up) so scenarios
    /// can run the genesis populator over the directories before any
    /// process starts.
    pub fn init_nodes(&self, topology: &ClusterTopology) -> Result<Vec<Node>, ClusterError> {
        let mut nodes = Vec::with_capacity(topology.total_nodes());
        for index in 0..topology.total_nodes() {
            nodes.push(self.init_node(topology, index)?);
        }
        Ok(nodes)
    }

    /// Bring up the full cluster described by `topology`.
    ///
    /// Node 0 is the boot node and starts with no join target; every
    /// other node starts strictly after it, joining through its p2p
    /// address. Any node that fails to reach a responsive RPC state
    /// within the startup timeout fails bring-up fatally.
    pub async fn bring_up(&self, topology: ClusterTopology) -> Result<Vec<Node>, ClusterError> {
        let mut nodes = self.init_nodes(&topology)?;
        self.start_all(&mut nodes).await?;
        Ok(nodes)
    }

    /// Start already-initialized nodes in boot-node-first order.
    ///
    /// Each node is brought to a responsive RPC state before the next
    /// one starts, so a startup failure is attributable to exactly one
    /// node and later nodes are never spawned into a broken cluster.
    pub async fn start_all(&self, nodes: &mut [Node]) -> Result<(), ClusterError> {
        let boot_addr = {
            let boot = nodes.first_mut().ok_or(ClusterError::EmptyTopology)?;
            boot.start(None)?;
            boot.p2p_addr().to_string()
        };
        nodes[0]
            .wait_until_responsive(self.config.startup_timeout, self.config.poll_interval)
            .await?;
        info!(boot = %boot_addr, "boot node responsive");

        for node in nodes.iter_mut().skip(1) {
            node.start(Some(&boot_addr))?;
            node.wait_until_responsive(self.config.startup_timeout, self.config.poll_interval)
                .await?;
        }

        info!(nodes = nodes.len(), "cluster responsive");
        Ok(())
    }

    fn init_node(&self, topology: &ClusterTopology, index: usize) -> Result<Node, ClusterError> {
        let node_dir = self.config.root_dir.join(format!("node{index}"));
        std::fs::create_dir_all(node_dir.join(crate::process::DATA_SUBDIR))?;

        let role = if index < topology.validator_count {
            NodeRole::Validator
        } else {
            NodeRole::Observer
        };
        let signer = SignerKey::for_account(AccountId::test(index));

        write_genesis(&node_dir, topology)?;
        let tracked_shards = write_config(&node_dir, topology, index)?;
        write_node_key(&node_dir, &signer)?;

        let rpc_addr = format!("127.0.0.1:{}", pick_free_tcp_port()?);
        let p2p_addr = format!("127.0.0.1:{}", pick_free_tcp_port()?);

        info!(node = index, dir = %node_dir.display(), ?role, "node fixture materialized");

        let process = ProcessHandle::new(index, &self.config.binary, &node_dir, rpc_addr, p2p_addr)
            .with_kill_grace(self.config.kill_grace);
        Ok(Node::new(index, role, tracked_shards, signer, process))
    }
}

/// Write `genesis.json`: defaults, then global overrides in order.
fn write_genesis(node_dir: &Path, topology: &ClusterTopology) -> std::io::Result<()> {
    let mut genesis = Map::new();
    genesis.insert("chain_id".into(), json!("localnet"));
    genesis.insert("shard_count".into(), json!(topology.shard_count));
    genesis.insert("epoch_length".into(), json!(60));
    genesis.insert(
        "validators".into(),
        json!((0..topology.validator_count)
            .map(|i| AccountId::test(i).to_string())
            .collect::<Vec<_>>()),
    );
    for (key, value) in topology.genesis_overrides() {
        genesis.insert(key.clone(), value.clone());
    }
    write_json(node_dir.join("genesis.json"), &Value::Object(genesis))
}

/// Write `config.json`: defaults, then per-node overrides. Genesis
/// overrides are chain-level and stay out of the client config.
fn write_config(
    node_dir: &Path,
    topology: &ClusterTopology,
    index: usize,
) -> std::io::Result<BTreeSet<ShardId>> {
    let mut config = Map::new();
    config.insert("node_index".into(), json!(index));
    config.insert(
        "tracked_shards".into(),
        json!((0..topology.shard_count).collect::<Vec<_>>()),
    );
    for (key, value) in topology.node_overrides(index) {
        config.insert(key.clone(), value.clone());
    }

    let tracked_shards = config
        .get("tracked_shards")
        .and_then(Value::as_array)
        .map(|shards| {
            shards
                .iter()
                .filter_map(Value::as_u64)
                .map(ShardId)
                .collect()
        })
        .unwrap_or_default();

    write_json(node_dir.join("config.json"), &Value::Object(config))?;
    Ok(tracked_shards)
}

fn write_node_key(node_dir: &Path, signer: &SignerKey) -> std::io::Result<()> {
    let key = json!({
        "account_id": signer.account_id().to_string(),
        "public_key": signer.public_key(),
    });
    write_json(node_dir.join("node_key.json"), &key)
}

fn write_json(path: PathBuf, value: &Value) -> std::io::Result<()> {
    let body = serde_json::to_vec_pretty(value)?;
    std::fs::write(path, body)
}
