//! Scenario definition and the runner driving it against a live cluster.

use std::collections::HashMap;
use std::time::Duration;

use ledgerlab_client::{RpcError, DEFAULT_CALL_TIMEOUT};
use ledgerlab_cluster::{
    ClusterError, ClusterManager, ClusterTopology, GenesisPopulator, Node, ProcessError,
};
use ledgerlab_types::{AccountId, CryptoHash, SignedTransaction, SignerKey};
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use crate::monitor::{HeightSample, ThroughputMonitor, MONITOR_WINDOW};
use crate::receipts::{MismatchError, TxStatusValidator};

/// Minimum block-production rate a wait step demands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BpsThreshold {
    /// Liveness is not checked; only the target height matters.
    Disabled,
    /// The observed rate must stay at or above this many blocks per second.
    AtLeast(f64),
}

impl BpsThreshold {
    /// Map a command-line value to a threshold. Negative disables the
    /// check, matching the CLI convention of `-1` for "no minimum".
    pub fn from_cli(value: f64) -> Self {
        if value < 0.0 {
            BpsThreshold::Disabled
        } else {
            BpsThreshold::AtLeast(value)
        }
    }
}

/// A transaction described by account indices, resolved into a signed
/// envelope once a fresh block hash is known.
#[derive(Debug, Clone)]
pub enum TxTemplate {
    Payment {
        signer: usize,
        receiver: usize,
        amount: u128,
        nonce: u64,
    },
    DeployContract {
        signer: usize,
        code: Vec<u8>,
        nonce: u64,
    },
    FunctionCall {
        signer: usize,
        receiver: usize,
        method: String,
        args: Vec<u8>,
        gas: u64,
        deposit: u128,
        nonce: u64,
    },
}

impl TxTemplate {
    /// Sign the template against `block_hash`.
    pub fn resolve(&self, block_hash: CryptoHash) -> SignedTransaction {
        match self {
            TxTemplate::Payment {
                signer,
                receiver,
                amount,
                nonce,
            } => SignedTransaction::payment(
                &SignerKey::for_account(AccountId::test(*signer)),
                AccountId::test(*receiver),
                *amount,
                *nonce,
                block_hash,
            ),
            TxTemplate::DeployContract {
                signer,
                code,
                nonce,
            } => SignedTransaction::deploy_contract(
                &SignerKey::for_account(AccountId::test(*signer)),
                code.clone(),
                *nonce,
                block_hash,
            ),
            TxTemplate::FunctionCall {
                signer,
                receiver,
                method,
                args,
                gas,
                deposit,
                nonce,
            } => SignedTransaction::function_call(
                &SignerKey::for_account(AccountId::test(*signer)),
                AccountId::test(*receiver),
                method.clone(),
                args.clone(),
                *gas,
                *deposit,
                *nonce,
                block_hash,
            ),
        }
    }
}

/// One step of a scenario, executed strictly in order.
#[derive(Debug, Clone)]
pub enum Step {
    /// Submit a transaction through `node`, then cross-validate its
    /// receipt views.
    SubmitTx { node: usize, tx: TxTemplate },
    /// Poll `node` until it reports at least `target`, enforcing the
    /// liveness threshold along the way.
    WaitForHeight {
        node: usize,
        target: u64,
        threshold: BpsThreshold,
    },
    /// Terminate the node process.
    KillNode { node: usize },
    /// Wipe the node's persisted chain state. The node must be stopped.
    ResetData { node: usize },
    /// Start (or restart) the node, joining through the boot node.
    StartNode { node: usize },
}

/// A named sequence of steps over a fixed topology.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub topology: ClusterTopology,
    pub steps: Vec<Step>,
    /// Budget for the whole run, bring-up included.
    pub global_timeout: Duration,
}

/// Lifecycle of a scenario run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioState {
    Bootstrapping,
    Running,
    Succeeded,
    Failed,
}

/// Why a scenario run failed.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("cluster bring-up failed: {0}")]
    Bootstrap(#[from] ClusterError),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Mismatch(#[from] MismatchError),

    #[error("step references node {index} but the cluster has {total} nodes")]
    UnknownNode { index: usize, total: usize },

    #[error(
        "node {node} produced {observed:.2} blocks/s, required at least {required:.2}"
    )]
    LivenessDegradation {
        node: usize,
        observed: f64,
        required: f64,
    },

    #[error("scenario {scenario} exceeded its {timeout_secs}s budget")]
    DeadlineExceeded {
        scenario: String,
        timeout_secs: u64,
    },

    #[error("node {node} height went backwards: {previous} -> {observed}")]
    HeightRegression {
        node: usize,
        previous: u64,
        observed: u64,
    },
}

/// Drives one scenario to completion over a cluster it brings up itself.
pub struct ScenarioRunner {
    manager: ClusterManager,
    populator: Option<GenesisPopulator>,
    poll_interval: Duration,
    status_timeout: Duration,
    monitor_window: Duration,
    tx_timeout: Duration,
    state: ScenarioState,
    nodes: Vec<Node>,
    /// Highest height seen per node, for regression detection. Cleared
    /// by a data reset, which legitimately rewinds the node.
    watermarks: HashMap<usize, u64>,
}

impl ScenarioRunner {
    pub fn new(manager: ClusterManager) -> Self {
        ScenarioRunner {
            manager,
            populator: None,
            poll_interval: Duration::from_millis(500),
            status_timeout: DEFAULT_CALL_TIMEOUT,
            monitor_window: MONITOR_WINDOW,
            tx_timeout: Duration::from_secs(60),
            state: ScenarioState::Bootstrapping,
            nodes: Vec::new(),
            watermarks: HashMap::new(),
        }
    }

    pub fn with_populator(mut self, populator: GenesisPopulator) -> Self {
        self.populator = Some(populator);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_tx_timeout(mut self, timeout: Duration) -> Self {
        self.tx_timeout = timeout;
        self
    }

    /// Override the per-request timeout of status polls.
    pub fn with_status_timeout(mut self, timeout: Duration) -> Self {
        self.status_timeout = timeout;
        self
    }

    /// Override the trailing window of the liveness rate estimator.
    pub fn with_monitor_window(mut self, window: Duration) -> Self {
        self.monitor_window = window;
        self
    }

    pub fn state(&self) -> ScenarioState {
        self.state
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Run the scenario start to finish. The first failing step aborts
    /// the run and leaves the runner in the failed state.
    pub async fn run(&mut self, scenario: &Scenario) -> Result<(), ScenarioError> {
        let deadline = Instant::now() + scenario.global_timeout;

        self.state = ScenarioState::Bootstrapping;
        if let Err(err) = self.bootstrap(scenario).await {
            self.state = ScenarioState::Failed;
            return Err(err);
        }

        self.drive_steps(scenario, deadline).await
    }

    /// Run the scenario's steps over an already-running cluster,
    /// skipping bring-up. The caller owns initialization and start
    /// ordering; milestone checks and watermarks behave as in
    /// [`run`](Self::run).
    pub async fn run_attached(
        &mut self,
        scenario: &Scenario,
        nodes: Vec<Node>,
    ) -> Result<(), ScenarioError> {
        let deadline = Instant::now() + scenario.global_timeout;
        self.nodes = nodes;
        self.watermarks.clear();
        self.drive_steps(scenario, deadline).await
    }

    async fn drive_steps(
        &mut self,
        scenario: &Scenario,
        deadline: Instant,
    ) -> Result<(), ScenarioError> {
        self.state = ScenarioState::Running;
        for (position, step) in scenario.steps.iter().enumerate() {
            info!(scenario = %scenario.name, step = position, ?step, "executing step");
            if let Err(err) = self.execute(scenario, step, deadline).await {
                warn!(scenario = %scenario.name, step = position, %err, "step failed");
                self.state = ScenarioState::Failed;
                return Err(err);
            }
        }

        self.state = ScenarioState::Succeeded;
        info!(scenario = %scenario.name, "scenario succeeded");
        Ok(())
    }

    async fn bootstrap(&mut self, scenario: &Scenario) -> Result<(), ScenarioError> {
        let mut nodes = self.manager.init_nodes(&scenario.topology)?;
        if let Some(populator) = &self.populator {
            populator.populate(&nodes).await?;
        }
        self.manager.start_all(&mut nodes).await?;
        self.nodes = nodes;
        self.watermarks.clear();
        Ok(())
    }

    async fn execute(
        &mut self,
        scenario: &Scenario,
        step: &Step,
        deadline: Instant,
    ) -> Result<(), ScenarioError> {
        match step {
            Step::SubmitTx { node, tx } => self.submit_tx(*node, tx).await,
            Step::WaitForHeight {
                node,
                target,
                threshold,
            } => {
                self.wait_for_height(scenario, *node, *target, *threshold, deadline)
                    .await
            }
            Step::KillNode { node } => {
                let node = self.node_mut(*node)?;
                node.kill().await?;
                Ok(())
            }
            Step::ResetData { node } => {
                let index = *node;
                self.node_mut(index)?.reset_data().await?;
                // The node legitimately restarts from genesis now.
                self.watermarks.remove(&index);
                Ok(())
            }
            Step::StartNode { node } => self.start_node(*node).await,
        }
    }

    /// Submit a transaction through `index` and cross-validate the
    /// receipt views the node reports for it.
    async fn submit_tx(&mut self, index: usize, template: &TxTemplate) -> Result<(), ScenarioError> {
        let rpc = self.node(index)?.rpc().clone();

        let block_hash = rpc.status().await?.sync_info.latest_block_hash;
        let tx = template.resolve(block_hash);
        info!(
            node = index,
            signer = %tx.signer_id,
            receiver = %tx.receiver_id,
            nonce = tx.nonce,
            "submitting transaction"
        );

        let outcome = rpc.send_tx_and_wait(&tx, self.tx_timeout).await?;
        let status = rpc
            .tx_status(&outcome.transaction.hash, &tx.signer_id)
            .await?;
        TxStatusValidator::validate(&outcome, &status)?;
        info!(node = index, tx = %outcome.transaction.hash, "receipt views agree");
        Ok(())
    }

    /// Poll until `index` reports at least `target`, enforcing the
    /// liveness threshold and the height watermark along the way.
    /// Request timeouts are logged and retried; node-reported errors
    /// fail the step.
    async fn wait_for_height(
        &mut self,
        scenario: &Scenario,
        index: usize,
        target: u64,
        threshold: BpsThreshold,
        deadline: Instant,
    ) -> Result<(), ScenarioError> {
        let rpc = self.node(index)?.rpc().clone();
        let mut monitor = ThroughputMonitor::new(self.monitor_window);

        loop {
            if Instant::now() >= deadline {
                return Err(ScenarioError::DeadlineExceeded {
                    scenario: scenario.name.clone(),
                    timeout_secs: scenario.global_timeout.as_secs(),
                });
            }

            match rpc.status_with_timeout(self.status_timeout).await {
                Ok(status) => {
                    let height = status.sync_info.latest_block_height;
                    if let Some(&previous) = self.watermarks.get(&index) {
                        if height < previous {
                            return Err(ScenarioError::HeightRegression {
                                node: index,
                                previous,
                                observed: height,
                            });
                        }
                    }
                    self.watermarks.insert(index, height);
                    monitor.observe(HeightSample {
                        timestamp: std::time::Instant::now(),
                        height,
                    });
                    check_liveness(index, threshold, &monitor)?;

                    if height >= target {
                        info!(node = index, height, target, "target height reached");
                        return Ok(());
                    }
                }
                Err(RpcError::Timeout) => {
                    warn!(node = index, "status poll timed out, retrying");
                    // A hung endpoint still consumes wall-clock time.
                    // Re-observe the last known height so the rate
                    // decays and a defined threshold fires instead of
                    // idling until the global deadline.
                    if let Some(&height) = self.watermarks.get(&index) {
                        monitor.observe(HeightSample {
                            timestamp: std::time::Instant::now(),
                            height,
                        });
                        check_liveness(index, threshold, &monitor)?;
                    }
                }
                Err(err) => return Err(err.into()),
            }

            sleep(self.poll_interval).await;
        }
    }

    /// Start (or restart) a node. Every node other than the boot node
    /// joins through node 0's p2p address.
    async fn start_node(&mut self, index: usize) -> Result<(), ScenarioError> {
        let join = if index == 0 {
            None
        } else {
            Some(self.node(0)?.p2p_addr().to_string())
        };

        let config = self.manager.config().clone();
        let node = self.node_mut(index)?;
        node.start(join.as_deref())?;
        node.wait_until_responsive(config.startup_timeout, config.poll_interval)
            .await?;
        Ok(())
    }

    fn node(&self, index: usize) -> Result<&Node, ScenarioError> {
        let total = self.nodes.len();
        self.nodes
            .get(index)
            .ok_or(ScenarioError::UnknownNode { index, total })
    }

    fn node_mut(&mut self, index: usize) -> Result<&mut Node, ScenarioError> {
        let total = self.nodes.len();
        self.nodes
            .get_mut(index)
            .ok_or(ScenarioError::UnknownNode { index, total })
    }
}

fn check_liveness(
    index: usize,
    threshold: BpsThreshold,
    monitor: &ThroughputMonitor,
) -> Result<(), ScenarioError> {
    if let (BpsThreshold::AtLeast(required), Some(observed)) = (threshold, monitor.current_rate()) {
        if observed < required {
            return Err(ScenarioError::LivenessDegradation {
                node: index,
                observed,
                required,
            });
        }
    }
    Ok(())
}
