//! Chain access over JSON-RPC
//!
//! The wallet service talks to the network through the [`ChainClient`]
//! trait so tests can substitute a fake node. [`JsonRpcChainClient`] is
//! the real implementation: plain JSON-RPC 2.0 over HTTPS against the
//! active network's endpoint.

use crate::shared::constants::RPC_TIMEOUT_MS;
use crate::shared::error::WalletError;
use crate::shared::types::{Blockhash, Lamports, Network, Signature, WalletResult};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

/// Node access used by the wallet service
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Balance of an address in lamports
    async fn get_balance(&self, address: &str) -> WalletResult<Lamports>;

    /// A recent blockhash for transaction assembly
    async fn latest_blockhash(&self) -> WalletResult<Blockhash>;

    /// Submit a base64-encoded signed transaction; returns its signature
    async fn submit(&self, payload_base64: &str) -> WalletResult<Signature>;

    /// Whether a submitted transaction has been confirmed
    async fn confirm(&self, signature: &str) -> WalletResult<bool>;

    /// Most recent signature descriptors for an address, newest first
    async fn get_signatures(&self, address: &str, limit: usize) -> WalletResult<Vec<Value>>;

    /// Parsed transaction details for a signature
    async fn get_parsed_transaction(&self, signature: &str) -> WalletResult<Value>;
}

/// JSON-RPC client bound to one network endpoint
pub struct JsonRpcChainClient {
    client: Client,
    rpc_url: String,
}

impl JsonRpcChainClient {
    pub fn new(rpc_url: String) -> WalletResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(RPC_TIMEOUT_MS))
            .build()
            .map_err(|e| WalletError::network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, rpc_url })
    }

    /// Client for a network, honoring its endpoint override variable
    pub fn for_network(network: Network) -> WalletResult<Self> {
        let rpc_url = std::env::var(network.rpc_env_var())
            .unwrap_or_else(|_| network.rpc_url().to_string());
        Self::new(rpc_url)
    }

    async fn rpc_call(&self, method: &str, params: Value) -> WalletResult<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });
        let resp = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| WalletError::network(format!("RPC request failed: {}", e)))?;
        let resp_json: Value = resp
            .json()
            .await
            .map_err(|e| WalletError::network(format!("Invalid RPC response: {}", e)))?;

        if let Some(error) = resp_json.get("error") {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown RPC error");
            return Err(WalletError::network(format!("{}: {}", method, message)));
        }
        resp_json
            .get("result")
            .cloned()
            .ok_or_else(|| WalletError::network(format!("{}: empty RPC response", method)))
    }
}

#[async_trait]
impl ChainClient for JsonRpcChainClient {
    async fn get_balance(&self, address: &str) -> WalletResult<Lamports> {
        let result = self.rpc_call("getBalance", json!([address])).await?;
        result
            .get("value")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| WalletError::network("getBalance: malformed result".to_string()))
    }

    async fn latest_blockhash(&self) -> WalletResult<Blockhash> {
        let result = self.rpc_call("getLatestBlockhash", json!([])).await?;
        result
            .get("value")
            .and_then(|v| v.get("blockhash"))
            .and_then(|b| b.as_str())
            .map(|b| b.to_string())
            .ok_or_else(|| WalletError::network("getLatestBlockhash: malformed result".to_string()))
    }

    async fn submit(&self, payload_base64: &str) -> WalletResult<Signature> {
        let result = self
            .rpc_call(
                "sendTransaction",
                json!([payload_base64, { "encoding": "base64" }]),
            )
            .await
            .map_err(|e| WalletError::transaction_failed(e.to_string()))?;
        result
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                WalletError::transaction_failed("sendTransaction: malformed result".to_string())
            })
    }

    async fn confirm(&self, signature: &str) -> WalletResult<bool> {
        let result = self
            .rpc_call("getSignatureStatuses", json!([[signature]]))
            .await?;
        let status = result
            .get("value")
            .and_then(|v| v.get(0))
            .cloned()
            .unwrap_or(Value::Null);
        if status.is_null() {
            return Ok(false);
        }
        if let Some(err) = status.get("err") {
            if !err.is_null() {
                return Err(WalletError::transaction_failed(format!(
                    "Transaction failed on chain: {}",
                    err
                )));
            }
        }
        let confirmed = status
            .get("confirmationStatus")
            .and_then(|s| s.as_str())
            .map(|s| s == "confirmed" || s == "finalized")
            .unwrap_or(false);
        Ok(confirmed)
    }

    async fn get_signatures(&self, address: &str, limit: usize) -> WalletResult<Vec<Value>> {
        let result = self
            .rpc_call(
                "getSignaturesForAddress",
                json!([address, { "limit": limit }]),
            )
            .await?;
        result
            .as_array()
            .cloned()
            .ok_or_else(|| {
                WalletError::network("getSignaturesForAddress: malformed result".to_string())
            })
    }

    async fn get_parsed_transaction(&self, signature: &str) -> WalletResult<Value> {
        self.rpc_call(
            "getTransaction",
            json!([signature, { "encoding": "jsonParsed", "maxSupportedTransactionVersion": 0 }]),
        )
        .await
    }
}
