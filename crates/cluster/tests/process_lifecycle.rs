//! Process lifecycle tests against a stub node executable.
//!
//! The stub is a shell script that ignores its arguments and sleeps, so
//! the state machine can be driven without a real ledger node binary.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use ledgerlab_cluster::{ProcessError, ProcessHandle};
use tempfile::TempDir;

/// Write an executable stub that traps SIGTERM and exits cleanly.
fn write_stub(dir: &Path) -> Result<PathBuf> {
    let path = dir.join("stub-node.sh");
    std::fs::write(&path, "#!/bin/sh\ntrap 'exit 0' TERM\nwhile :; do sleep 1; done\n")?;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

/// Write a stub that ignores SIGTERM, forcing the SIGKILL path.
fn write_stubborn_stub(dir: &Path) -> Result<PathBuf> {
    let path = dir.join("stubborn-node.sh");
    std::fs::write(&path, "#!/bin/sh\ntrap '' TERM\nwhile :; do sleep 1; done\n")?;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

fn handle(binary: &Path, node_dir: &Path) -> ProcessHandle {
    ProcessHandle::new(0, binary, node_dir, "127.0.0.1:0", "127.0.0.1:0")
        .with_kill_grace(Duration::from_secs(2))
}

#[tokio::test]
async fn start_kill_cycle() -> Result<()> {
    let dir = TempDir::new()?;
    std::fs::create_dir_all(dir.path().join("data"))?;
    let stub = write_stub(dir.path())?;
    let mut process = handle(&stub, dir.path());

    assert!(!process.is_alive());
    process.start(None)?;
    assert!(process.is_alive());

    process.kill().await?;
    assert!(!process.is_alive());

    // Kill on a stopped process is a no-op, mirroring unconditional
    // teardown in scenarios.
    process.kill().await?;
    Ok(())
}

#[tokio::test]
async fn force_kill_after_grace() -> Result<()> {
    let dir = TempDir::new()?;
    std::fs::create_dir_all(dir.path().join("data"))?;
    let stub = write_stubborn_stub(dir.path())?;
    let mut process = ProcessHandle::new(0, &stub, dir.path(), "127.0.0.1:0", "127.0.0.1:0")
        .with_kill_grace(Duration::from_millis(300));

    process.start(None)?;
    assert!(process.is_alive());

    // SIGTERM is ignored; kill must still return with the process dead.
    process.kill().await?;
    assert!(!process.is_alive());
    Ok(())
}

#[tokio::test]
async fn reset_data_requires_stopped_process() -> Result<()> {
    let dir = TempDir::new()?;
    let data = dir.path().join("data");
    std::fs::create_dir_all(&data)?;
    std::fs::write(data.join("chain.db"), b"state")?;
    let stub = write_stub(dir.path())?;
    let mut process = handle(&stub, dir.path());

    process.start(None)?;
    let err = process.reset_data().await.unwrap_err();
    assert!(matches!(err, ProcessError::ResetWhileRunning { index: 0 }));
    // The precondition violation must not have touched the state.
    assert!(data.join("chain.db").is_file());

    process.kill().await?;
    process.reset_data().await?;
    assert!(data.is_dir());
    assert!(!data.join("chain.db").exists());
    Ok(())
}

#[tokio::test]
async fn restart_after_kill() -> Result<()> {
    let dir = TempDir::new()?;
    std::fs::create_dir_all(dir.path().join("data"))?;
    let stub = write_stub(dir.path())?;
    let mut process = handle(&stub, dir.path());

    process.start(None)?;
    process.kill().await?;
    process.reset_data().await?;
    process.start(Some("127.0.0.1:4567"))?;
    assert!(process.is_alive());

    // Starting a running process is a precondition violation.
    let err = process.start(None).unwrap_err();
    assert!(matches!(err, ProcessError::AlreadyRunning { index: 0 }));

    process.kill().await?;
    Ok(())
}
