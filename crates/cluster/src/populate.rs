//! Wrapper for the external genesis/state-population tool.

use crate::{ClusterError, Node};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::info;

/// Invokes the external state-population tool over node directories.
///
/// Large state-sync scenarios generate a big account set before any
/// node starts, so the resynced node has a non-trivial state to fetch.
/// The tool itself is an opaque external command.
#[derive(Debug, Clone)]
pub struct GenesisPopulator {
    binary: PathBuf,
    additional_accounts: u64,
}

impl GenesisPopulator {
    pub fn new(binary: impl Into<PathBuf>, additional_accounts: u64) -> Self {
        GenesisPopulator {
            binary: binary.into(),
            additional_accounts,
        }
    }

    /// Populate every node directory. Must run before the nodes start.
    pub async fn populate(&self, nodes: &[Node]) -> Result<(), ClusterError> {
        for node in nodes {
            let dir = node.node_dir().to_path_buf();
            info!(
                dir = %dir.display(),
                accounts = self.additional_accounts,
                "populating genesis state"
            );

            let status = Command::new(&self.binary)
                .arg("--home")
                .arg(&dir)
                .arg("--additional-accounts")
                .arg(self.additional_accounts.to_string())
                .stdin(Stdio::null())
                .status()
                .await?;

            if !status.success() {
                return Err(ClusterError::PopulateFailed { status, dir });
            }
        }
        Ok(())
    }
}
