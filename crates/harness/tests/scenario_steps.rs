//! Transaction steps and run lifecycle against a coherent mock node.
//!
//! The mock remembers the last submitted transaction and answers the
//! follow-up status query consistently with it: the self-receipt of a
//! local transaction appears among the execution outcomes but never in
//! the receipt list, matching how a real node reports local execution.

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{extract::State, routing::post, Json, Router};
use base64::prelude::*;
use ledgerlab_client::JsonRpcRequest;
use ledgerlab_cluster::{
    ClusterConfig, ClusterManager, ClusterTopology, Node, NodeRole, ProcessHandle,
};
use ledgerlab_harness::{
    scenarios, Scenario, ScenarioError, ScenarioRunner, ScenarioState, Step, TxTemplate,
};
use ledgerlab_types::{AccountId, CryptoHash, SignedTransaction, SignerKey};
use serde_json::{json, Value};
use tempfile::TempDir;

struct Submitted {
    tx_hash: CryptoHash,
    signer: AccountId,
    receiver: AccountId,
    nonce: u64,
    self_receipt: CryptoHash,
    is_local: bool,
}

#[derive(Clone)]
struct MockLedger {
    last: Arc<Mutex<Option<Submitted>>>,
    /// When set, the status query lists a receipt that was never
    /// produced, so the two views must be reported as diverging.
    corrupt_receipt_list: bool,
}

impl MockLedger {
    fn new(corrupt_receipt_list: bool) -> Self {
        MockLedger {
            last: Arc::new(Mutex::new(None)),
            corrupt_receipt_list,
        }
    }
}

fn reply(id: &Value, result: Value) -> Json<Value> {
    Json(json!({ "jsonrpc": "2.0", "id": id, "result": result }))
}

fn transaction_json(sub: &Submitted) -> Value {
    json!({
        "hash": sub.tx_hash.to_string(),
        "signer_id": sub.signer,
        "receiver_id": sub.receiver,
        "nonce": sub.nonce,
    })
}

fn outcome_json(sub: &Submitted) -> Value {
    json!({
        "id": sub.tx_hash.to_string(),
        "outcome": { "receipt_ids": [sub.self_receipt.to_string()] }
    })
}

async fn rpc_handler(
    State(ledger): State<MockLedger>,
    Json(req): Json<JsonRpcRequest>,
) -> Json<Value> {
    match req.method.as_str() {
        "status" => reply(&req.id, json!({
            "chain_id": "mocknet",
            "sync_info": {
                "latest_block_hash": CryptoHash([1u8; 32]).to_string(),
                "latest_block_height": 100,
            }
        })),
        "broadcast_tx_commit" => {
            let encoded = req.params[0].as_str().unwrap();
            let tx: SignedTransaction =
                serde_json::from_slice(&BASE64_STANDARD.decode(encoded).unwrap()).unwrap();

            let sub = Submitted {
                tx_hash: CryptoHash([tx.nonce as u8; 32]),
                signer: tx.signer_id.clone(),
                receiver: tx.receiver_id.clone(),
                nonce: tx.nonce,
                self_receipt: CryptoHash([tx.nonce as u8 + 100; 32]),
                is_local: tx.is_local(),
            };
            let body = json!({
                "transaction": transaction_json(&sub),
                "transaction_outcome": outcome_json(&sub),
                "receipts_outcome": [
                    { "id": sub.self_receipt.to_string(), "outcome": { "receipt_ids": [] } }
                ],
            });
            *ledger.last.lock().unwrap() = Some(sub);
            reply(&req.id, body)
        }
        "EXPERIMENTAL_tx_status" => {
            let guard = ledger.last.lock().unwrap();
            let sub = guard.as_ref().expect("status queried before submission");

            let mut receipts = if sub.is_local {
                vec![]
            } else {
                vec![json!({ "receipt_id": sub.self_receipt.to_string() })]
            };
            if ledger.corrupt_receipt_list {
                receipts.push(json!({
                    "receipt_id": CryptoHash([0xEEu8; 32]).to_string()
                }));
            }

            reply(&req.id, json!({
                "transaction": transaction_json(sub),
                "transaction_outcome": outcome_json(sub),
                "receipts_outcome": [
                    { "id": sub.self_receipt.to_string(), "outcome": { "receipt_ids": [] } }
                ],
                "receipts": receipts,
            }))
        }
        _ => Json(json!({
            "jsonrpc": "2.0",
            "id": req.id,
            "error": { "code": -32601, "message": "method not found" }
        })),
    }
}

async fn spawn_mock(ledger: MockLedger) -> SocketAddr {
    let app = Router::new().route("/", post(rpc_handler)).with_state(ledger);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn mock_node(root: &TempDir, addr: SocketAddr) -> Node {
    let process = ProcessHandle::new(
        0,
        "/usr/bin/false",
        root.path().join("node0"),
        addr.to_string(),
        "127.0.0.1:0",
    );
    Node::new(
        0,
        NodeRole::Validator,
        BTreeSet::new(),
        SignerKey::for_account(AccountId::test(0)),
        process,
    )
}

fn runner(root: &TempDir) -> ScenarioRunner {
    let config = ClusterConfig::new("/usr/bin/false", root.path())
        .with_startup_timeout(Duration::from_millis(500));
    ScenarioRunner::new(ClusterManager::new(config))
        .with_poll_interval(Duration::from_millis(10))
}

fn submit_scenario(tx: TxTemplate) -> Scenario {
    Scenario {
        name: "submit".to_owned(),
        topology: ClusterTopology::new(1, 0, 1),
        steps: vec![Step::SubmitTx { node: 0, tx }],
        global_timeout: Duration::from_secs(30),
    }
}

#[tokio::test]
async fn payment_submission_validates_receipt_views() {
    let root = TempDir::new().unwrap();
    let addr = spawn_mock(MockLedger::new(false)).await;
    let node = mock_node(&root, addr);

    let scenario = submit_scenario(TxTemplate::Payment {
        signer: 0,
        receiver: 1,
        amount: 100,
        nonce: 1,
    });
    let mut runner = runner(&root);
    runner.run_attached(&scenario, vec![node]).await.unwrap();
    assert_eq!(runner.state(), ScenarioState::Succeeded);
}

#[tokio::test]
async fn local_deploy_discounts_the_self_receipt() {
    let root = TempDir::new().unwrap();
    let addr = spawn_mock(MockLedger::new(false)).await;
    let node = mock_node(&root, addr);

    // Deploying targets the signer, so the node lists no receipts for
    // it; validation must still pass after the self-receipt discount.
    let scenario = submit_scenario(TxTemplate::DeployContract {
        signer: 0,
        code: vec![0, 1, 2, 3],
        nonce: 2,
    });
    let mut runner = runner(&root);
    runner.run_attached(&scenario, vec![node]).await.unwrap();
    assert_eq!(runner.state(), ScenarioState::Succeeded);
}

#[tokio::test]
async fn fabricated_receipt_fails_validation() {
    let root = TempDir::new().unwrap();
    let addr = spawn_mock(MockLedger::new(true)).await;
    let node = mock_node(&root, addr);

    let scenario = submit_scenario(TxTemplate::Payment {
        signer: 0,
        receiver: 1,
        amount: 100,
        nonce: 1,
    });
    let mut runner = runner(&root);
    let err = runner.run_attached(&scenario, vec![node]).await.unwrap_err();
    assert!(matches!(err, ScenarioError::Mismatch(_)), "got {err:?}");
    assert_eq!(runner.state(), ScenarioState::Failed);
}

#[tokio::test]
async fn step_referencing_a_missing_node_fails() {
    let root = TempDir::new().unwrap();
    let addr = spawn_mock(MockLedger::new(false)).await;
    let node = mock_node(&root, addr);

    let scenario = Scenario {
        name: "bad-index".to_owned(),
        topology: ClusterTopology::new(1, 0, 1),
        steps: vec![Step::KillNode { node: 5 }],
        global_timeout: Duration::from_secs(5),
    };
    let mut runner = runner(&root);
    let err = runner.run_attached(&scenario, vec![node]).await.unwrap_err();
    match err {
        ScenarioError::UnknownNode { index, total } => {
            assert_eq!(index, 5);
            assert_eq!(total, 1);
        }
        other => panic!("expected unknown node, got {other:?}"),
    }
}

#[tokio::test]
async fn failed_bring_up_leaves_the_run_failed() {
    let root = TempDir::new().unwrap();
    let mut runner = ScenarioRunner::new(ClusterManager::new(
        ClusterConfig::new(root.path().join("no-such-binary"), root.path())
            .with_startup_timeout(Duration::from_millis(200))
            .with_poll_interval(Duration::from_millis(50)),
    ));

    let err = runner.run(&scenarios::tx_status()).await.unwrap_err();
    assert!(matches!(err, ScenarioError::Bootstrap(_)), "got {err:?}");
    assert_eq!(runner.state(), ScenarioState::Failed);
}
