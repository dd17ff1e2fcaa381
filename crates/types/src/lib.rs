//! Core types for the ledgerlab cluster test harness.
//!
//! This crate provides the foundational data model shared by the RPC
//! client, the cluster manager and the scenario runner:
//!
//! - [`CryptoHash`]: 32-byte hash exchanged over RPC as base58 text
//! - [`AccountId`] / [`ShardId`]: participant and shard identifiers
//! - [`SignedTransaction`]: an immutable, signed transaction envelope
//! - RPC view models ([`StatusResponse`], [`FinalExecutionOutcome`],
//!   [`TxStatusView`]) mirroring the node's JSON responses
//!
//! The harness never interprets node state beyond these views; anything
//! the node returns that is not modelled here is ignored on decode.

mod hash;
mod primitives;
mod transaction;
mod views;

pub use hash::{CryptoHash, ParseHashError};
pub use primitives::{AccountId, BlockHeight, Nonce, ShardId};
pub use transaction::{Action, SignedTransaction, SignerKey};
pub use views::{
    ExecutionOutcomeView, FinalExecutionOutcome, OutcomeWithId, ReceiptView, StatusResponse,
    SyncInfo, TransactionView, TxStatusView,
};
