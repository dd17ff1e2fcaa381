//! Error types for process and cluster lifecycle.

use std::path::PathBuf;
use std::process::ExitStatus;

/// Failures of one node process's lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to spawn node process from {binary}: {source}")]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Precondition violation: the process is already running.
    #[error("node {index} is already running")]
    AlreadyRunning { index: usize },

    /// Precondition violation: resetting persisted state while the
    /// process is running. Indicates a harness bug, never retried.
    #[error("refusing to reset data of node {index} while its process is running")]
    ResetWhileRunning { index: usize },

    #[error("failed to signal node process: {0}")]
    Signal(std::io::Error),

    #[error("i/o error on node directory {dir}: {source}")]
    Io {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of cluster bring-up and fixture preparation.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("failed to materialize node fixture: {0}")]
    Fixture(#[from] std::io::Error),

    /// A topology with zero nodes is not a valid test fixture.
    #[error("topology describes an empty cluster")]
    EmptyTopology,

    /// A node failed to reach a responsive RPC state in time. A cluster
    /// that cannot fully start is not a valid test fixture.
    #[error("node {index} did not become responsive within {timeout_secs}s")]
    StartupTimeout { index: usize, timeout_secs: u64 },

    #[error("genesis populator exited with {status} for {dir}")]
    PopulateFailed { status: ExitStatus, dir: PathBuf },
}
