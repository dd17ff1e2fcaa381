//! 32-byte hashes with base58 text encoding.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A 32-byte cryptographic hash.
///
/// Block hashes, transaction hashes and receipt ids are all exchanged
/// over RPC as base58-encoded text; this type owns the decode so the
/// rest of the harness only ever sees raw bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct CryptoHash(pub [u8; 32]);

/// Error produced when parsing a base58 hash string.
#[derive(Debug, thiserror::Error)]
pub enum ParseHashError {
    #[error("invalid base58: {0}")]
    Base58(#[from] bs58::decode::Error),

    #[error("expected 32 bytes, got {0}")]
    BadLength(usize),
}

impl CryptoHash {
    /// Access the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Decode from base58 text as received over RPC.
    pub fn from_base58(s: &str) -> Result<Self, ParseHashError> {
        let bytes = bs58::decode(s).into_vec()?;
        let len = bytes.len();
        let arr: [u8; 32] = bytes.try_into().map_err(|_| ParseHashError::BadLength(len))?;
        Ok(CryptoHash(arr))
    }
}

impl fmt::Display for CryptoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(&self.0).into_string())
    }
}

impl fmt::Debug for CryptoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CryptoHash({self})")
    }
}

impl FromStr for CryptoHash {
    type Err = ParseHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base58(s)
    }
}

impl From<[u8; 32]> for CryptoHash {
    fn from(bytes: [u8; 32]) -> Self {
        CryptoHash(bytes)
    }
}

impl Serialize for CryptoHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CryptoHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        CryptoHash::from_base58(&s).map_err(serde::de::Error::custom)
    }
}
