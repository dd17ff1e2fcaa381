//! Transaction status cross-validation over a small validator cluster.

use std::time::Duration;

use ledgerlab_cluster::ClusterTopology;
use serde_json::json;

use crate::scenario::{Scenario, Step, TxTemplate};

/// Deterministic stand-in contract code.
///
/// The receipt cross-check only needs a deploy action that the node
/// accepts; the code body itself is never executed by the harness.
fn synthetic_contract_code() -> Vec<u8> {
    (0u32..64).flat_map(|i| i.to_le_bytes()).collect()
}

/// Little-endian key/value argument block for the test contract.
fn write_key_value_args(key: u64, value: u64) -> Vec<u8> {
    let mut args = Vec::with_capacity(16);
    args.extend_from_slice(&key.to_le_bytes());
    args.extend_from_slice(&value.to_le_bytes());
    args
}

/// Submits one transaction of each action kind and cross-validates the
/// receipt views the node reports.
///
/// Four validators over one shard, with long epochs and a generous
/// transaction validity window so no epoch boundary or expiry interferes
/// with the checks. The deploy and the self-call are local transactions
/// and exercise the self-receipt discount.
pub fn tx_status() -> Scenario {
    let topology = ClusterTopology::new(4, 0, 1)
        .with_genesis_override("epoch_length", json!(1000))
        .with_genesis_override("block_producer_kickout_threshold", json!(80))
        .with_genesis_override("transaction_validity_period", json!(10000));

    Scenario {
        name: "tx_status".to_owned(),
        topology,
        steps: vec![
            Step::SubmitTx {
                node: 0,
                tx: TxTemplate::Payment {
                    signer: 0,
                    receiver: 1,
                    amount: 100,
                    nonce: 1,
                },
            },
            Step::SubmitTx {
                node: 0,
                tx: TxTemplate::DeployContract {
                    signer: 0,
                    code: synthetic_contract_code(),
                    nonce: 2,
                },
            },
            Step::SubmitTx {
                node: 0,
                tx: TxTemplate::FunctionCall {
                    signer: 0,
                    receiver: 0,
                    method: "write_key_value".to_owned(),
                    args: write_key_value_args(42, 24),
                    gas: 300_000_000_000_000,
                    deposit: 0,
                    nonce: 3,
                },
            },
        ],
        global_timeout: Duration::from_secs(600),
    }
}
