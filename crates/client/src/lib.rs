//! JSON-RPC client for ledger node endpoints.
//!
//! One [`RpcClient`] talks to exactly one node's RPC endpoint. The
//! error taxonomy separates the two failure modes the harness treats
//! differently:
//!
//! - [`RpcError::Timeout`]: the node never replied. Recoverable; the
//!   polling loops log and retry, it is never surfaced as a transaction
//!   failure.
//! - [`RpcError::Node`]: the node replied with an error payload. Always
//!   a hard failure, since the node itself rejected the request.

mod envelope;

pub use envelope::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION};

use ledgerlab_types::{
    AccountId, CryptoHash, FinalExecutionOutcome, SignedTransaction, StatusResponse, TxStatusView,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Default per-request timeout when the caller does not supply one.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Typed request/response transport to one node's RPC endpoint.
#[derive(Debug, Clone)]
pub struct RpcClient {
    endpoint: String,
    http: reqwest::Client,
}

/// RPC failure taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// No response within the caller-supplied duration. Recoverable.
    #[error("rpc request timed out")]
    Timeout,

    /// The node replied with an error payload. Hard failure.
    #[error("node rejected request: {message} (code {code})")]
    Node { code: i64, message: String },

    /// Transport-level failure other than a timeout.
    #[error("http transport error: {0}")]
    Http(reqwest::Error),

    /// The response body did not decode into the expected shape.
    #[error("failed to decode rpc response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A success response with no result payload.
    #[error("rpc response carried neither result nor error")]
    EmptyResponse,
}

impl From<reqwest::Error> for RpcError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RpcError::Timeout
        } else {
            RpcError::Http(err)
        }
    }
}

impl RpcClient {
    /// Create a client for the given `host:port` RPC address.
    pub fn new(addr: impl AsRef<str>) -> Self {
        RpcClient {
            endpoint: format!("http://{}", addr.as_ref()),
            http: reqwest::Client::new(),
        }
    }

    /// The endpoint URL this client talks to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Issue a JSON-RPC call with positional params and the default timeout.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        self.call_with_timeout(method, params, DEFAULT_CALL_TIMEOUT)
            .await
    }

    /// Issue a JSON-RPC call with an explicit per-request timeout.
    pub async fn call_with_timeout(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, RpcError> {
        let payload = JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id: Value::from(1),
            method: method.to_owned(),
            params,
        };

        debug!(endpoint = %self.endpoint, method, "rpc call");

        let response = self
            .http
            .post(&self.endpoint)
            .timeout(timeout)
            .json(&payload)
            .send()
            .await?;

        let body: JsonRpcResponse = response.json().await?;
        if let Some(error) = body.error {
            return Err(RpcError::Node {
                code: error.code,
                message: error.message,
            });
        }
        body.result.ok_or(RpcError::EmptyResponse)
    }

    async fn call_typed<R: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<R, RpcError> {
        let value = self.call_with_timeout(method, params, timeout).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Fetch the node's status (sync info, chain id).
    pub async fn status(&self) -> Result<StatusResponse, RpcError> {
        self.status_with_timeout(DEFAULT_CALL_TIMEOUT).await
    }

    /// Fetch the node's status with an explicit per-request timeout.
    ///
    /// Polling loops use a short timeout here so a hung endpoint is
    /// observed as a timeout per poll instead of stalling the loop.
    pub async fn status_with_timeout(
        &self,
        timeout: Duration,
    ) -> Result<StatusResponse, RpcError> {
        self.call_typed("status", json!([]), timeout).await
    }

    /// Latest block height reported by the node.
    pub async fn latest_height(&self) -> Result<u64, RpcError> {
        Ok(self.status().await?.sync_info.latest_block_height)
    }

    /// Submit a transaction and block until the node reports a final
    /// execution outcome or `timeout` elapses.
    ///
    /// A timeout here means "node never replied", which is distinct from
    /// the node replying with an error ([`RpcError::Node`]).
    pub async fn send_tx_and_wait(
        &self,
        tx: &SignedTransaction,
        timeout: Duration,
    ) -> Result<FinalExecutionOutcome, RpcError> {
        self.call_typed(
            "broadcast_tx_commit",
            json!([tx.encode()]),
            timeout,
        )
        .await
    }

    /// Query the extended transaction status for a committed transaction.
    pub async fn tx_status(
        &self,
        tx_hash: &CryptoHash,
        sender: &AccountId,
    ) -> Result<TxStatusView, RpcError> {
        self.call_typed(
            "EXPERIMENTAL_tx_status",
            json!([tx_hash.to_string(), sender.as_str()]),
            DEFAULT_CALL_TIMEOUT,
        )
        .await
    }

    /// Whether the node answers a status query at all.
    pub async fn is_responsive(&self) -> bool {
        self.status().await.is_ok()
    }
}
