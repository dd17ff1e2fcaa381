//! Validator catch-up after a mid-epoch kill and state wipe.

use std::time::Duration;

use ledgerlab_cluster::ClusterTopology;
use serde_json::json;

use crate::scenario::{BpsThreshold, Scenario, Step};

/// Height milestones and liveness requirement for the resync run.
#[derive(Debug, Clone, Copy)]
pub struct ValidatorResyncConfig {
    /// Height after which the target validator is killed and wiped.
    pub intermediate_height: u64,
    /// Height the resynced validator itself must report back.
    pub small_height: u64,
    /// Height the healthy cluster must reach while the resync runs.
    pub large_height: u64,
    /// Minimum rate the healthy cluster must sustain during the resync.
    pub bps_threshold: BpsThreshold,
}

impl Default for ValidatorResyncConfig {
    fn default() -> Self {
        ValidatorResyncConfig {
            intermediate_height: 310,
            small_height: 610,
            large_height: 660,
            bps_threshold: BpsThreshold::AtLeast(0.5),
        }
    }
}

/// Kills one validator mid-run, wipes its chain state and verifies it
/// resyncs from the network while the rest of the cluster keeps
/// producing at an acceptable rate.
///
/// Three validators plus one observer. Kickout thresholds are zeroed so
/// the wiped validator keeps its seat while it is away; the validators
/// track only shard 0 so the resync actually has to fetch state rather
/// than replaying everything locally. Progress is observed through
/// node 1, which is never disturbed.
pub fn validator_resync(config: ValidatorResyncConfig) -> Scenario {
    let mut topology = ClusterTopology::new(3, 1, 1)
        .with_genesis_override("min_gas_price", json!(0))
        .with_genesis_override("max_inflation_rate", json!([0, 1]))
        .with_genesis_override("epoch_length", json!(300))
        .with_genesis_override("block_producer_kickout_threshold", json!(0))
        .with_genesis_override("chunk_producer_kickout_threshold", json!(0));
    for node in 1..=3 {
        topology = topology.with_node_override(node, "tracked_shards", json!([0]));
    }

    Scenario {
        name: "validator_resync".to_owned(),
        topology,
        steps: vec![
            Step::WaitForHeight {
                node: 1,
                target: config.intermediate_height,
                threshold: BpsThreshold::Disabled,
            },
            Step::KillNode { node: 2 },
            Step::ResetData { node: 2 },
            Step::StartNode { node: 2 },
            Step::WaitForHeight {
                node: 1,
                target: config.large_height,
                threshold: config.bps_threshold,
            },
            Step::WaitForHeight {
                node: 2,
                target: config.small_height,
                threshold: BpsThreshold::Disabled,
            },
        ],
        global_timeout: Duration::from_secs(3600),
    }
}
