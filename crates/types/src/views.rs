//! Serde models for the node's JSON-RPC responses.
//!
//! Only the fields the harness asserts on are modelled; everything else
//! the node returns is ignored on decode. Optional fields carry
//! `#[serde(default)]` so older or degraded nodes do not fail the
//! decode step.

use crate::{AccountId, BlockHeight, CryptoHash, Nonce};
use serde::{Deserialize, Serialize};

/// `sync_info` block of the status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncInfo {
    pub latest_block_hash: CryptoHash,
    pub latest_block_height: BlockHeight,
    #[serde(default)]
    pub syncing: bool,
}

/// Response to the generic status query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub sync_info: SyncInfo,
    #[serde(default)]
    pub chain_id: String,
}

/// The transaction header echoed back in execution results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionView {
    pub hash: CryptoHash,
    pub signer_id: AccountId,
    pub receiver_id: AccountId,
    #[serde(default)]
    pub nonce: Nonce,
}

/// The recorded result of executing a transaction or receipt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionOutcomeView {
    /// Ids of the receipts this execution generated, in order.
    #[serde(default)]
    pub receipt_ids: Vec<CryptoHash>,
    #[serde(default)]
    pub gas_burnt: u64,
    #[serde(default)]
    pub executor_id: Option<AccountId>,
}

/// An execution outcome keyed by the id it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeWithId {
    pub id: CryptoHash,
    pub outcome: ExecutionOutcomeView,
}

/// A receipt as listed in the extended status view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptView {
    pub receipt_id: CryptoHash,
    #[serde(default)]
    pub predecessor_id: Option<AccountId>,
    #[serde(default)]
    pub receiver_id: Option<AccountId>,
}

/// Final execution outcome returned by transaction submission.
///
/// Produced once per submission and consumed immediately by validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalExecutionOutcome {
    pub transaction: TransactionView,
    pub transaction_outcome: OutcomeWithId,
    #[serde(default)]
    pub receipts_outcome: Vec<OutcomeWithId>,
}

impl FinalExecutionOutcome {
    /// Whether the submitted transaction was local (signer == receiver).
    pub fn is_local(&self) -> bool {
        self.transaction.signer_id == self.transaction.receiver_id
    }
}

/// Extended transaction status: two independently-derived views of the
/// same execution, retrieved by a follow-up query keyed by tx hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxStatusView {
    pub transaction: TransactionView,
    pub transaction_outcome: OutcomeWithId,
    #[serde(default)]
    pub receipts_outcome: Vec<OutcomeWithId>,
    #[serde(default)]
    pub receipts: Vec<ReceiptView>,
}
