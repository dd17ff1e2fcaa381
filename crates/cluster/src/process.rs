//! Lifecycle wrapper for one external node process.

use crate::ProcessError;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{info, warn};

/// Name of the chain-state subdirectory inside a node directory.
///
/// `reset_data` removes only this subdirectory, leaving genesis, config
/// and keys intact so a resync test does not regenerate the fixture.
pub const DATA_SUBDIR: &str = "data";

/// How long `kill` waits for a graceful exit before force-killing.
const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug)]
enum ProcessState {
    NotStarted,
    Running(Child),
    Stopped,
}

/// One external node process, modelled as an explicit state machine.
///
/// Operations are only valid in specific states; invalid transitions
/// fail with a [`ProcessError`] precondition violation rather than
/// undefined behavior.
#[derive(Debug)]
pub struct ProcessHandle {
    index: usize,
    binary: PathBuf,
    node_dir: PathBuf,
    rpc_addr: String,
    p2p_addr: String,
    kill_grace: Duration,
    state: ProcessState,
}

impl ProcessHandle {
    pub fn new(
        index: usize,
        binary: impl Into<PathBuf>,
        node_dir: impl Into<PathBuf>,
        rpc_addr: impl Into<String>,
        p2p_addr: impl Into<String>,
    ) -> Self {
        ProcessHandle {
            index,
            binary: binary.into(),
            node_dir: node_dir.into(),
            rpc_addr: rpc_addr.into(),
            p2p_addr: p2p_addr.into(),
            kill_grace: DEFAULT_KILL_GRACE,
            state: ProcessState::NotStarted,
        }
    }

    /// Override the grace period between SIGTERM and SIGKILL.
    pub fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }

    pub fn node_dir(&self) -> &Path {
        &self.node_dir
    }

    /// RPC listen address (`host:port`) conveyed to the process.
    pub fn rpc_addr(&self) -> &str {
        &self.rpc_addr
    }

    /// Peer-to-peer listen address used as a join target by others.
    pub fn p2p_addr(&self) -> &str {
        &self.p2p_addr
    }

    /// Launch the node process in its working directory.
    ///
    /// `join_target` is the boot node's p2p address; when given, the
    /// process bootstraps its network connection through that peer.
    pub fn start(&mut self, join_target: Option<&str>) -> Result<(), ProcessError> {
        if matches!(self.state, ProcessState::Running(_)) {
            return Err(ProcessError::AlreadyRunning { index: self.index });
        }

        let stdout = log_file(&self.node_dir, "stdout.log")?;
        let stderr = log_file(&self.node_dir, "stderr.log")?;

        let mut command = Command::new(&self.binary);
        command
            .kill_on_drop(true)
            .arg("run")
            .arg("--home")
            .arg(&self.node_dir)
            .arg("--node-index")
            .arg(self.index.to_string())
            .env("LEDGER_NODE_RPC_ADDR", &self.rpc_addr)
            .env("LEDGER_NODE_P2P_ADDR", &self.p2p_addr)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));

        if let Some(boot) = join_target {
            command.arg("--boot-node").arg(boot);
        }

        let child = command.spawn().map_err(|source| ProcessError::Spawn {
            binary: self.binary.clone(),
            source,
        })?;

        info!(
            node = self.index,
            pid = child.id(),
            rpc = %self.rpc_addr,
            boot = join_target.unwrap_or("-"),
            "node process started"
        );
        self.state = ProcessState::Running(child);
        Ok(())
    }

    /// Terminate the process: SIGTERM, then SIGKILL after the grace
    /// period. Blocks until the process has exited so no orphans leak
    /// across test runs. A no-op when the process is not running.
    pub async fn kill(&mut self) -> Result<(), ProcessError> {
        let mut child = match std::mem::replace(&mut self.state, ProcessState::Stopped) {
            ProcessState::Running(child) => child,
            other => {
                self.state = other;
                return Ok(());
            }
        };

        if let Some(pid) = child.id() {
            send_sigterm(pid).map_err(ProcessError::Signal)?;
        }

        match timeout(self.kill_grace, child.wait()).await {
            Ok(status) => {
                let status = status.map_err(ProcessError::Signal)?;
                info!(node = self.index, %status, "node process exited");
            }
            Err(_) => {
                warn!(node = self.index, "grace period exceeded, force-killing");
                child.kill().await.map_err(ProcessError::Signal)?;
            }
        }
        Ok(())
    }

    /// Discard the node's persisted chain state, simulating a node that
    /// must resynchronize from a completely empty local state.
    ///
    /// Only valid while the process is not running; calling this on a
    /// running process is a fatal precondition violation.
    pub async fn reset_data(&mut self) -> Result<(), ProcessError> {
        if matches!(self.state, ProcessState::Running(_)) {
            return Err(ProcessError::ResetWhileRunning { index: self.index });
        }

        let data_dir = self.node_dir.join(DATA_SUBDIR);
        match tokio::fs::remove_dir_all(&data_dir).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(ProcessError::Io {
                    dir: data_dir,
                    source,
                })
            }
        }
        tokio::fs::create_dir_all(&data_dir)
            .await
            .map_err(|source| ProcessError::Io {
                dir: data_dir.clone(),
                source,
            })?;

        info!(node = self.index, dir = %data_dir.display(), "chain state reset");
        Ok(())
    }

    /// Whether the underlying process is currently running.
    pub fn is_alive(&mut self) -> bool {
        match &mut self.state {
            ProcessState::Running(child) => match child.try_wait() {
                Ok(None) => true,
                // Exited (or unobservable): treat as stopped.
                _ => {
                    self.state = ProcessState::Stopped;
                    false
                }
            },
            _ => false,
        }
    }
}

fn log_file(node_dir: &Path, name: &str) -> Result<File, ProcessError> {
    File::options()
        .create(true)
        .append(true)
        .open(node_dir.join(name))
        .map_err(|source| ProcessError::Io {
            dir: node_dir.to_path_buf(),
            source,
        })
}

fn send_sigterm(pid: u32) -> std::io::Result<()> {
    let result = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}
