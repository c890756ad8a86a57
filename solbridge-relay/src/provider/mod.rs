//! Page-side provider stub
//!
//! The object a dapp talks to. It never sees key material: every call is
//! wrapped in a request envelope, posted onto the page's message stream,
//! and awaited through the multiplexer. Connection state changes are
//! broadcast to subscribers.

use crate::error::{BridgeError, BridgeResult};
use crate::protocol::{ProviderMethod, RequestEnvelope, RESPONSE_TYPE};
use crate::relay::{PageMessage, Relay, WindowId};
use crate::rpc::RpcMultiplexer;
use serde_json::{json, Value};
use solbridge_wallet_core::{ServiceHandle, SignedTransaction, TransactionSummary};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

/// Events pushed to subscribers: connection state changes, plus
/// wallet-originated notifications (network switched, account changed)
/// carried as named custom events.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    Connect { address: String },
    Disconnect,
    Custom { name: String, data: Value },
}

pub struct Provider {
    page_tx: mpsc::UnboundedSender<PageMessage>,
    mux: Arc<RpcMultiplexer>,
    events: broadcast::Sender<ProviderEvent>,
    window: WindowId,
    address: Mutex<Option<String>>,
}

impl Provider {
    /// Wire a provider to a running wallet service: spawns the relay on
    /// one end of the message stream and the response pump on the other.
    pub fn bridge(handle: ServiceHandle, origin: String, window: WindowId) -> Self {
        Self::bridge_with_timeout(handle, origin, window, None)
    }

    pub fn bridge_with_timeout(
        handle: ServiceHandle,
        origin: String,
        window: WindowId,
        timeout: Option<Duration>,
    ) -> Self {
        let (page_tx, page_rx) = mpsc::unbounded_channel::<PageMessage>();
        let (response_tx, mut response_rx) = mpsc::unbounded_channel();
        Relay::new(handle, origin, window).spawn(page_rx, response_tx);

        let mux = Arc::new(match timeout {
            Some(t) => RpcMultiplexer::with_timeout(t),
            None => RpcMultiplexer::new(),
        });
        {
            // Response pump: route correlated responses back to waiters
            let mux = mux.clone();
            tokio::spawn(async move {
                while let Some(envelope) = response_rx.recv().await {
                    if envelope.kind == RESPONSE_TYPE {
                        mux.route(envelope);
                    }
                }
            });
        }

        let (events, _) = broadcast::channel(16);
        Self {
            page_tx,
            mux,
            events,
            window,
            address: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }

    /// Broadcast a named event to subscribers. Used by the wallet side
    /// to notify pages of changes they did not initiate.
    pub fn emit_custom(&self, name: &str, data: Value) {
        let _ = self.events.send(ProviderEvent::Custom {
            name: name.to_string(),
            data,
        });
    }

    /// Address of the connected account, if any
    pub fn address(&self) -> Option<String> {
        self.address.lock().ok().and_then(|a| a.clone())
    }

    pub fn is_connected(&self) -> bool {
        self.address().is_some()
    }

    pub async fn connect(&self) -> BridgeResult<String> {
        let result = self.request(ProviderMethod::Connect, Value::Null).await?;
        let address = result
            .get("address")
            .and_then(|a| a.as_str())
            .ok_or_else(|| BridgeError::Protocol("Connect result missing address".to_string()))?
            .to_string();

        if let Ok(mut current) = self.address.lock() {
            *current = Some(address.clone());
        }
        let _ = self.events.send(ProviderEvent::Connect {
            address: address.clone(),
        });
        Ok(address)
    }

    pub async fn disconnect(&self) -> BridgeResult<()> {
        self.request(ProviderMethod::Disconnect, Value::Null).await?;
        if let Ok(mut current) = self.address.lock() {
            *current = None;
        }
        let _ = self.events.send(ProviderEvent::Disconnect);
        Ok(())
    }

    pub async fn get_address(&self) -> BridgeResult<String> {
        let result = self.request(ProviderMethod::GetAddress, Value::Null).await?;
        result
            .get("address")
            .and_then(|a| a.as_str())
            .map(|a| a.to_string())
            .ok_or_else(|| BridgeError::Protocol("Result missing address".to_string()))
    }

    /// Balance of the connected account as `(lamports, sol)`
    pub async fn get_balance(&self) -> BridgeResult<(u64, f64)> {
        let result = self.request(ProviderMethod::GetBalance, Value::Null).await?;
        let lamports = result
            .get("lamports")
            .and_then(|l| l.as_u64())
            .ok_or_else(|| BridgeError::Protocol("Result missing lamports".to_string()))?;
        let sol = result.get("sol").and_then(|s| s.as_f64()).unwrap_or(0.0);
        Ok((lamports, sol))
    }

    pub async fn get_history(&self) -> BridgeResult<Vec<TransactionSummary>> {
        let result = self.request(ProviderMethod::GetHistory, Value::Null).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Sign an opaque base64 payload; the signature comes back, the key never does
    pub async fn sign_transaction(&self, payload: &str) -> BridgeResult<SignedTransaction> {
        let result = self
            .request(
                ProviderMethod::SignTransaction,
                json!({ "payload": payload }),
            )
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Sign then submit in one round trip; returns the chain signature.
    /// If submission fails, no signed artifact is returned.
    pub async fn sign_and_send_transaction(&self, payload: &str) -> BridgeResult<String> {
        let result = self
            .request(
                ProviderMethod::SignAndSendTransaction,
                json!({ "payload": payload }),
            )
            .await?;
        result
            .get("signature")
            .and_then(|s| s.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| BridgeError::Protocol("Result missing signature".to_string()))
    }

    /// Sign a batch; all-or-nothing, stopping at the first refusal
    pub async fn sign_all_transactions(
        &self,
        payloads: &[String],
    ) -> BridgeResult<Vec<SignedTransaction>> {
        let result = self
            .request(
                ProviderMethod::SignAllTransactions,
                json!({ "payloads": payloads }),
            )
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    async fn request(&self, method: ProviderMethod, params: Value) -> BridgeResult<Value> {
        let request_id = self.mux.next_request_id();
        let rx = self.mux.register(&request_id);

        let envelope = RequestEnvelope::new(request_id.clone(), method, params);
        let message = PageMessage {
            source: self.window,
            body: serde_json::to_value(&envelope)?,
        };
        if self.page_tx.send(message).is_err() {
            return Err(BridgeError::ChannelClosed);
        }

        let response = self.mux.wait(&request_id, rx).await?;
        if response.success {
            Ok(response.result.unwrap_or(Value::Null))
        } else {
            Err(BridgeError::Wallet(
                response.error.unwrap_or_else(|| "Unknown error".to_string()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solbridge_wallet_core::{
        ChainClient, ChainFactory, JsonRpcChainClient, MemoryStorage, WalletService,
    };

    fn bridged_provider() -> Provider {
        let factory: ChainFactory = Box::new(|network| {
            Ok(Arc::new(JsonRpcChainClient::for_network(network)?) as Arc<dyn ChainClient>)
        });
        let (service, _listener) =
            WalletService::new(Arc::new(MemoryStorage::new()), factory).unwrap();
        Provider::bridge(
            ServiceHandle::spawn(service),
            "https://app.example".to_string(),
            7,
        )
    }

    #[tokio::test]
    async fn test_custom_events_reach_subscribers() {
        let provider = bridged_provider();
        let mut events = provider.subscribe();

        provider.emit_custom("networkChanged", json!({ "network": "devnet" }));
        match events.recv().await.unwrap() {
            ProviderEvent::Custom { name, data } => {
                assert_eq!(name, "networkChanged");
                assert_eq!(data["network"], "devnet");
            }
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connect_without_wallet_surfaces_error() {
        let provider = bridged_provider();
        let result = provider.connect().await;
        match result {
            Err(BridgeError::Wallet(message)) => assert_eq!(message, "No wallet found"),
            other => panic!("Expected wallet error, got {:?}", other.map(|_| ())),
        }
        assert!(!provider.is_connected());
    }
}
