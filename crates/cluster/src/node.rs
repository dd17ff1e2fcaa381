//! One participant in the test cluster.

use crate::{ClusterError, ProcessError, ProcessHandle};
use ledgerlab_client::RpcClient;
use ledgerlab_types::{ShardId, SignerKey};
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Role of a cluster participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// Produces blocks.
    Validator,
    /// Tracks chain state without producing.
    Observer,
}

/// A node process composed with its RPC client and role metadata.
///
/// Index and role are immutable for the node's lifetime; the process
/// may be killed, reset and restarted while the `Node` persists.
#[derive(Debug)]
pub struct Node {
    index: usize,
    role: NodeRole,
    tracked_shards: BTreeSet<ShardId>,
    signer: SignerKey,
    process: ProcessHandle,
    rpc: RpcClient,
}

impl Node {
    pub fn new(
        index: usize,
        role: NodeRole,
        tracked_shards: BTreeSet<ShardId>,
        signer: SignerKey,
        process: ProcessHandle,
    ) -> Self {
        let rpc = RpcClient::new(process.rpc_addr());
        Node {
            index,
            role,
            tracked_shards,
            signer,
            process,
            rpc,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    pub fn tracked_shards(&self) -> &BTreeSet<ShardId> {
        &self.tracked_shards
    }

    pub fn signer(&self) -> &SignerKey {
        &self.signer
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    /// The p2p address other nodes use to join through this one.
    pub fn p2p_addr(&self) -> &str {
        self.process.p2p_addr()
    }

    /// The node's working directory (genesis, config, chain state).
    pub fn node_dir(&self) -> &std::path::Path {
        self.process.node_dir()
    }

    /// Start the node process, optionally joining through a boot node.
    pub fn start(&mut self, join_target: Option<&str>) -> Result<(), ProcessError> {
        self.process.start(join_target)
    }

    /// Terminate the node process (graceful, then forced).
    pub async fn kill(&mut self) -> Result<(), ProcessError> {
        self.process.kill().await
    }

    /// Discard persisted chain state. Fails while the process runs.
    pub async fn reset_data(&mut self) -> Result<(), ProcessError> {
        self.process.reset_data().await
    }

    pub fn is_alive(&mut self) -> bool {
        self.process.is_alive()
    }

    /// Poll the RPC endpoint until it answers a status query, failing
    /// with a startup timeout after `timeout`.
    pub async fn wait_until_responsive(
        &self,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<(), ClusterError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.rpc.is_responsive().await {
                debug!(node = self.index, "rpc responsive");
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ClusterError::StartupTimeout {
                    index: self.index,
                    timeout_secs: timeout.as_secs(),
                });
            }
            sleep(poll_interval).await;
        }
    }
}
