//! The relay: untrusted-page boundary
//!
//! Sits between the page's message stream and the wallet service. Only
//! messages from its own window carrying the request type tag are
//! processed; everything else passes by untouched. Each accepted request
//! is dispatched to the service and answered with a correlated response
//! envelope.

use crate::protocol::{ProviderMethod, RequestEnvelope, ResponseEnvelope, REQUEST_TYPE};
use serde_json::{json, Value};
use solbridge_wallet_core::{
    Operation, OperationResponse, ServiceHandle, SignedTransaction, TransactionPayload,
};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Identifies the window a message came from. The relay only trusts
/// messages originating from its own window.
pub type WindowId = u64;

/// One raw message off the page's stream
#[derive(Debug, Clone)]
pub struct PageMessage {
    pub source: WindowId,
    pub body: Value,
}

pub struct Relay {
    handle: ServiceHandle,
    origin: String,
    window: WindowId,
}

impl Relay {
    pub fn new(handle: ServiceHandle, origin: String, window: WindowId) -> Self {
        Self {
            handle,
            origin,
            window,
        }
    }

    /// Process one page message. `None` means the message was not for us:
    /// wrong window, wrong type tag, or no request id to answer to.
    pub async fn process(&self, message: PageMessage) -> Option<ResponseEnvelope> {
        if message.source != self.window {
            return None;
        }
        if message.body.get("type").and_then(|t| t.as_str()) != Some(REQUEST_TYPE) {
            return None;
        }
        let request_id = message
            .body
            .get("request_id")
            .and_then(|id| id.as_str())?
            .to_string();

        let envelope: RequestEnvelope = match serde_json::from_value(message.body) {
            Ok(envelope) => envelope,
            Err(e) => {
                log::warn!("Malformed request {}: {}", request_id, e);
                return Some(ResponseEnvelope::new(
                    request_id,
                    error_response("Unsupported or malformed request"),
                ));
            }
        };
        Some(self.dispatch(envelope).await)
    }

    async fn dispatch(&self, envelope: RequestEnvelope) -> ResponseEnvelope {
        let id = envelope.request_id.clone();
        let response = match envelope.method {
            ProviderMethod::Connect => self.call(&id, Operation::Connect).await,
            ProviderMethod::Disconnect => self.call(&id, Operation::Disconnect).await,
            ProviderMethod::GetAddress => self.call(&id, Operation::GetAddress).await,
            ProviderMethod::GetBalance => self.call(&id, Operation::GetBalance).await,
            ProviderMethod::GetHistory => self.call(&id, Operation::GetHistory).await,
            ProviderMethod::SignTransaction => match payload_param(&envelope.params) {
                Some(payload) => self.call(&id, Operation::SignTransaction { payload }).await,
                None => error_response("Missing transaction payload"),
            },
            ProviderMethod::SignAndSendTransaction => match payload_param(&envelope.params) {
                Some(payload) => self.sign_and_send(&id, payload).await,
                None => error_response("Missing transaction payload"),
            },
            ProviderMethod::SignAllTransactions => self.sign_all(&id, &envelope.params).await,
        };
        ResponseEnvelope::new(id, response)
    }

    async fn call(&self, id: &str, operation: Operation) -> OperationResponse {
        self.handle
            .call(id.to_string(), self.origin.clone(), operation)
            .await
    }

    /// Sign, then submit. A sign failure short-circuits. A submit failure
    /// returns the error alone: the signed artifact is discarded, never
    /// handed to the page.
    async fn sign_and_send(&self, id: &str, payload: TransactionPayload) -> OperationResponse {
        let signed = self.call(id, Operation::SignTransaction { payload }).await;
        if !signed.success {
            return signed;
        }
        let transaction: SignedTransaction = match signed
            .result
            .and_then(|r| serde_json::from_value(r).ok())
        {
            Some(t) => t,
            None => return error_response("Malformed signing result"),
        };
        self.call(
            &format!("{}-submit", id),
            Operation::SubmitTransaction { transaction },
        )
        .await
    }

    /// Sign a batch sequentially, stopping at the first failure
    async fn sign_all(&self, id: &str, params: &Value) -> OperationResponse {
        let payloads = match params.get("payloads").and_then(|p| p.as_array()) {
            Some(payloads) => payloads.clone(),
            None => return error_response("Missing transaction payloads"),
        };

        let mut signed = Vec::with_capacity(payloads.len());
        for (i, entry) in payloads.iter().enumerate() {
            let payload = match entry.as_str() {
                Some(p) => TransactionPayload {
                    payload: p.to_string(),
                },
                None => return error_response("Transaction payloads must be strings"),
            };
            let response = self
                .call(
                    &format!("{}-{}", id, i),
                    Operation::SignTransaction { payload },
                )
                .await;
            if !response.success {
                return response;
            }
            match response.result {
                Some(result) => signed.push(result),
                None => return error_response("Malformed signing result"),
            }
        }
        OperationResponse::ok(json!(signed))
    }

    /// Pump page messages until the stream closes, then disconnect the
    /// origin as a best-effort cleanup.
    pub fn spawn(
        self,
        mut page_rx: mpsc::UnboundedReceiver<PageMessage>,
        response_tx: mpsc::UnboundedSender<ResponseEnvelope>,
    ) {
        let relay = Arc::new(self);
        tokio::spawn(async move {
            while let Some(message) = page_rx.recv().await {
                let relay = relay.clone();
                let response_tx = response_tx.clone();
                tokio::spawn(async move {
                    if let Some(response) = relay.process(message).await {
                        let _ = response_tx.send(response);
                    }
                });
            }
            log::debug!("Page stream closed for {}, disconnecting", relay.origin);
            relay.call("teardown", Operation::Disconnect).await;
        });
    }
}

fn payload_param(params: &Value) -> Option<TransactionPayload> {
    params
        .get("payload")
        .and_then(|p| p.as_str())
        .map(|p| TransactionPayload {
            payload: p.to_string(),
        })
}

fn error_response(message: &str) -> OperationResponse {
    OperationResponse {
        success: false,
        result: None,
        error: Some(message.to_string()),
    }
}
