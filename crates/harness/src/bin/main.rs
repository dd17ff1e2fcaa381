//! Ledgerlab CLI
//!
//! Runs a built-in scenario against a freshly brought-up local cluster.
//!
//! # Example
//!
//! ```bash
//! # Cross-validate receipt views over a 4-validator cluster
//! ledgerlab tx-status --binary ./ledger-node --root-dir /tmp/lab
//!
//! # Kill, wipe and resync a validator, requiring 0.5 blocks/s liveness
//! ledgerlab validator-resync --binary ./ledger-node --root-dir /tmp/lab \
//!     --bps-threshold 0.5 --populate-binary ./genesis-populator \
//!     --populate-accounts 200000
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use ledgerlab_cluster::{ClusterConfig, ClusterManager, GenesisPopulator};
use ledgerlab_harness::{
    scenarios, BpsThreshold, Scenario, ScenarioRunner,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScenarioKind {
    /// Submit one transaction per action kind and cross-validate the
    /// receipt views.
    TxStatus,
    /// Kill a validator, wipe its state and verify it resyncs.
    ValidatorResync,
}

/// Ledgerlab
///
/// Brings up a local ledger cluster and drives one scenario against it.
#[derive(Parser, Debug)]
#[command(name = "ledgerlab")]
#[command(version, about, long_about = None)]
struct Args {
    /// Scenario to run
    #[arg(value_enum)]
    scenario: ScenarioKind,

    /// Path to the ledger node executable
    #[arg(long)]
    binary: PathBuf,

    /// Directory under which per-node fixtures are materialized
    #[arg(long)]
    root_dir: PathBuf,

    /// Path to the external state-population tool
    #[arg(long)]
    populate_binary: Option<PathBuf>,

    /// Accounts the population tool adds per node directory
    #[arg(long, default_value = "200000")]
    populate_accounts: u64,

    /// Per-node budget in seconds for the RPC endpoint to come up
    #[arg(long, default_value = "60")]
    startup_timeout_secs: u64,

    /// Minimum blocks per second during liveness-checked waits.
    /// Negative disables the check.
    #[arg(long, default_value = "-1", allow_hyphen_values = true)]
    bps_threshold: f64,

    /// Interval between status polls in milliseconds
    #[arg(long, default_value = "500")]
    poll_interval_ms: u64,
}

impl Args {
    fn scenario(&self) -> Scenario {
        match self.scenario {
            ScenarioKind::TxStatus => scenarios::tx_status(),
            ScenarioKind::ValidatorResync => {
                scenarios::validator_resync(scenarios::ValidatorResyncConfig {
                    bps_threshold: BpsThreshold::from_cli(self.bps_threshold),
                    ..Default::default()
                })
            }
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,ledgerlab=info")),
        )
        .init();

    let args = Args::parse();
    let scenario = args.scenario();

    info!(
        scenario = %scenario.name,
        binary = %args.binary.display(),
        root_dir = %args.root_dir.display(),
        "starting scenario"
    );

    let config = ClusterConfig::new(&args.binary, &args.root_dir)
        .with_startup_timeout(Duration::from_secs(args.startup_timeout_secs))
        .with_poll_interval(Duration::from_millis(args.poll_interval_ms));

    let mut runner = ScenarioRunner::new(ClusterManager::new(config))
        .with_poll_interval(Duration::from_millis(args.poll_interval_ms));
    if let Some(populate_binary) = &args.populate_binary {
        runner = runner
            .with_populator(GenesisPopulator::new(populate_binary, args.populate_accounts));
    }

    match runner.run(&scenario).await {
        Ok(()) => {
            info!(scenario = %scenario.name, "scenario passed");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(scenario = %scenario.name, %err, "scenario failed");
            ExitCode::FAILURE
        }
    }
}
