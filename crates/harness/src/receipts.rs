//! Cross-validation of the two receipt views in an extended tx status.
//!
//! The node reports receipts twice: once as execution outcomes under
//! `receipts_outcome` and once as the raw receipt list under `receipts`.
//! After normalization the two id sets must be identical, otherwise the
//! node lost or fabricated a receipt somewhere between execution and
//! the status endpoint.

use std::collections::BTreeSet;

use ledgerlab_types::{CryptoHash, FinalExecutionOutcome, TxStatusView};
use tracing::debug;

/// Why the two receipt views disagree.
#[derive(Debug, thiserror::Error)]
pub enum MismatchError {
    /// A local transaction executed without recording any receipt id,
    /// so the self-receipt to discount cannot be identified.
    #[error("local transaction {tx_hash} recorded no receipt ids in its outcome")]
    NoSelfReceiptRecorded { tx_hash: CryptoHash },

    /// The self-receipt of a local transaction was expected among the
    /// outcome ids but was not there.
    #[error("self-receipt {receipt_id} missing from receipts_outcome")]
    SelfReceiptAbsent { receipt_id: CryptoHash },

    /// The normalized id sets differ.
    #[error(
        "receipt sets diverge: outcomes report {outcome_ids:?}, receipt list reports {receipt_ids:?}"
    )]
    Sets {
        outcome_ids: BTreeSet<CryptoHash>,
        receipt_ids: BTreeSet<CryptoHash>,
    },
}

/// Checks that the receipt ids reported by execution outcomes match the
/// receipt list, after discounting the self-receipt of local
/// transactions.
pub struct TxStatusValidator;

impl TxStatusValidator {
    /// Validate one submission against its follow-up status query.
    ///
    /// A local transaction (signer == receiver) produces one receipt
    /// that executes on the signer itself; that receipt shows up in
    /// `receipts_outcome` but the node never lists it under `receipts`,
    /// so it is removed from the outcome side before comparing.
    pub fn validate(
        submission: &FinalExecutionOutcome,
        query: &TxStatusView,
    ) -> Result<(), MismatchError> {
        let mut outcome_ids: BTreeSet<CryptoHash> = query
            .receipts_outcome
            .iter()
            .map(|outcome| outcome.id)
            .collect();
        let receipt_ids: BTreeSet<CryptoHash> = query
            .receipts
            .iter()
            .map(|receipt| receipt.receipt_id)
            .collect();

        if submission.is_local() {
            let self_id = submission
                .transaction_outcome
                .outcome
                .receipt_ids
                .first()
                .copied()
                .ok_or(MismatchError::NoSelfReceiptRecorded {
                    tx_hash: submission.transaction.hash,
                })?;
            if !outcome_ids.remove(&self_id) {
                return Err(MismatchError::SelfReceiptAbsent {
                    receipt_id: self_id,
                });
            }
            debug!(%self_id, "discounted self-receipt of local transaction");
        }

        if outcome_ids != receipt_ids {
            return Err(MismatchError::Sets {
                outcome_ids,
                receipt_ids,
            });
        }
        Ok(())
    }
}
