//! Request correlation
//!
//! Many page requests can be in flight at once over a single message
//! stream. The multiplexer hands out unique request ids, parks a oneshot
//! for each pending request, and routes responses back by id, in whatever
//! order they arrive. A request that misses its deadline is evicted so a
//! late response for it is dropped instead of leaking the table.

use crate::error::{BridgeError, BridgeResult};
use crate::protocol::ResponseEnvelope;
use solbridge_wallet_core::shared::constants::REQUEST_TIMEOUT_MS;
use solbridge_wallet_core::OperationResponse;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::oneshot;

/// Pending-request table shared by the provider and the response pump
pub struct RpcMultiplexer {
    pending: Mutex<HashMap<String, oneshot::Sender<OperationResponse>>>,
    counter: AtomicU64,
    timeout: Duration,
}

impl RpcMultiplexer {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_millis(REQUEST_TIMEOUT_MS))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            counter: AtomicU64::new(1),
            timeout,
        }
    }

    /// A fresh request id: monotonic counter plus a random suffix so ids
    /// are unique even across provider restarts within one page.
    pub fn next_request_id(&self) -> String {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        format!("{}-{}", seq, &nonce[..8])
    }

    /// Park a oneshot for `request_id` and return its receiving half
    pub fn register(&self, request_id: &str) -> oneshot::Receiver<OperationResponse> {
        let (tx, rx) = oneshot::channel();
        if let Ok(mut pending) = self.pending.lock() {
            pending.insert(request_id.to_string(), tx);
        }
        rx
    }

    /// Route a response to its waiter. Responses with no pending entry
    /// (already timed out, or not ours) are dropped.
    pub fn route(&self, envelope: ResponseEnvelope) {
        let waiter = self
            .pending
            .lock()
            .ok()
            .and_then(|mut pending| pending.remove(&envelope.request_id));
        match waiter {
            Some(tx) => {
                let _ = tx.send(envelope.response);
            }
            None => log::debug!("Dropping response for unknown request {}", envelope.request_id),
        }
    }

    /// Await the response for an already-registered request, evicting the
    /// pending entry on timeout.
    pub async fn wait(
        &self,
        request_id: &str,
        rx: oneshot::Receiver<OperationResponse>,
    ) -> BridgeResult<OperationResponse> {
        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => {
                self.evict(request_id);
                Err(BridgeError::ChannelClosed)
            }
            Err(_) => {
                self.evict(request_id);
                log::warn!("Request {} timed out after {:?}", request_id, self.timeout);
                Err(BridgeError::Timeout)
            }
        }
    }

    fn evict(&self, request_id: &str) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(request_id);
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }
}

impl Default for RpcMultiplexer {
    fn default() -> Self {
        Self::new()
    }
}
