//! Signed transaction envelopes and signer identities.
//!
//! Signing here is an opaque "sign and serialize" capability: the
//! harness produces a deterministic signed envelope the node fixture
//! accepts, it does not model the node's real wire format beyond the
//! fields the scenarios assert on.

use crate::{AccountId, CryptoHash, Nonce};
use base64::prelude::*;
use ed25519_dalek::{Signer as _, SigningKey};
use serde::{Deserialize, Serialize};

/// An action carried by a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Transfer `amount` to the receiver.
    Payment { amount: u128 },

    /// Deploy contract code to the receiver account.
    DeployContract {
        #[serde(with = "code_base64")]
        code: Vec<u8>,
    },

    /// Call a method on the receiver's contract.
    FunctionCall {
        method: String,
        #[serde(with = "code_base64")]
        args: Vec<u8>,
        gas: u64,
        deposit: u128,
    },
}

mod code_base64 {
    use base64::prelude::*;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64_STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        BASE64_STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}

/// A node or test account signing identity.
///
/// Derived deterministically from the account name so fixtures can be
/// regenerated without persisting key material.
#[derive(Clone)]
pub struct SignerKey {
    account_id: AccountId,
    key: SigningKey,
}

impl SignerKey {
    /// Derive the key for an account from its name.
    pub fn for_account(account_id: AccountId) -> Self {
        let mut seed = [0u8; 32];
        let name = account_id.as_str().as_bytes();
        let n = name.len().min(32);
        seed[..n].copy_from_slice(&name[..n]);
        SignerKey {
            account_id,
            key: SigningKey::from_bytes(&seed),
        }
    }

    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    /// Hex-encoded public key, as written into node key files.
    pub fn public_key(&self) -> String {
        hex::encode(self.key.verifying_key().to_bytes())
    }

    fn sign(&self, payload: &[u8]) -> [u8; 64] {
        self.key.sign(payload).to_bytes()
    }
}

impl std::fmt::Debug for SignerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerKey")
            .field("account_id", &self.account_id)
            .finish_non_exhaustive()
    }
}

/// An immutable signed transaction.
///
/// The nonce must be strictly increasing per signer across the
/// transactions that signer submits; the harness owns nonce assignment,
/// the node only rejects violations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub signer_id: AccountId,
    pub receiver_id: AccountId,
    pub nonce: Nonce,
    pub actions: Vec<Action>,
    /// Reference block hash anchoring the transaction's validity window.
    pub block_hash: CryptoHash,
    #[serde(with = "sig_base64")]
    signature: Vec<u8>,
}

mod sig_base64 {
    use base64::prelude::*;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64_STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        BASE64_STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}

impl SignedTransaction {
    fn new(
        signer: &SignerKey,
        receiver_id: AccountId,
        nonce: Nonce,
        actions: Vec<Action>,
        block_hash: CryptoHash,
    ) -> Self {
        let mut payload = Vec::new();
        payload.extend_from_slice(signer.account_id().as_str().as_bytes());
        payload.extend_from_slice(receiver_id.as_str().as_bytes());
        payload.extend_from_slice(&nonce.to_le_bytes());
        payload.extend_from_slice(block_hash.as_bytes());
        for action in &actions {
            // Action encoding is stable for a given serde model.
            payload.extend_from_slice(
                serde_json::to_string(action)
                    .unwrap_or_default()
                    .as_bytes(),
            );
        }
        let signature = signer.sign(&payload).to_vec();

        SignedTransaction {
            signer_id: signer.account_id().clone(),
            receiver_id,
            nonce,
            actions,
            block_hash,
            signature,
        }
    }

    /// A payment of `amount` from the signer to `receiver_id`.
    pub fn payment(
        signer: &SignerKey,
        receiver_id: AccountId,
        amount: u128,
        nonce: Nonce,
        block_hash: CryptoHash,
    ) -> Self {
        Self::new(
            signer,
            receiver_id,
            nonce,
            vec![Action::Payment { amount }],
            block_hash,
        )
    }

    /// Deploy `code` to the signer's own account (always local).
    pub fn deploy_contract(
        signer: &SignerKey,
        code: Vec<u8>,
        nonce: Nonce,
        block_hash: CryptoHash,
    ) -> Self {
        Self::new(
            signer,
            signer.account_id().clone(),
            nonce,
            vec![Action::DeployContract { code }],
            block_hash,
        )
    }

    /// Call `method` on the contract deployed at `receiver_id`.
    #[allow(clippy::too_many_arguments)]
    pub fn function_call(
        signer: &SignerKey,
        receiver_id: AccountId,
        method: impl Into<String>,
        args: Vec<u8>,
        gas: u64,
        deposit: u128,
        nonce: Nonce,
        block_hash: CryptoHash,
    ) -> Self {
        Self::new(
            signer,
            receiver_id,
            nonce,
            vec![Action::FunctionCall {
                method: method.into(),
                args,
                gas,
                deposit,
            }],
            block_hash,
        )
    }

    /// Whether the signer sends to itself (a "local" transaction).
    pub fn is_local(&self) -> bool {
        self.signer_id == self.receiver_id
    }

    /// Serialize for submission over RPC.
    pub fn encode(&self) -> String {
        // Infallible for this model: no non-string map keys.
        let json = serde_json::to_vec(self).unwrap_or_default();
        BASE64_STANDARD.encode(json)
    }
}
