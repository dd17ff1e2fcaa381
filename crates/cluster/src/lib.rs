//! Cluster lifecycle management for the ledgerlab harness.
//!
//! A cluster is a set of independently-running ledger node processes,
//! each owning a working directory with its genesis, config and chain
//! state. This crate covers:
//!
//! - [`ProcessHandle`]: explicit NotStarted → Running → Stopped state
//!   machine over one external node process
//! - [`Node`]: a process handle composed with an RPC client and static
//!   role metadata
//! - [`ClusterTopology`] / [`ClusterManager`]: fixture materialization
//!   and boot-node-first bring-up ordering
//! - [`GenesisPopulator`]: wrapper for the external state-population
//!   tool used by large state-sync scenarios
//!
//! Each node's process and directory are exclusively owned by its
//! [`Node`]; the harness drives at most one lifecycle action at a time.

mod error;
mod manager;
mod node;
mod populate;
mod process;
mod topology;

pub use error::{ClusterError, ProcessError};
pub use manager::{ClusterConfig, ClusterManager};
pub use node::{Node, NodeRole};
pub use populate::GenesisPopulator;
pub use process::ProcessHandle;
pub use topology::ClusterTopology;

use std::net::TcpListener;

/// Reserve an ephemeral localhost TCP port.
///
/// The port is released before the node process binds it; collisions
/// are possible but not observed in practice for short-lived fixtures.
pub(crate) fn pick_free_tcp_port() -> std::io::Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(port)
}
