//! Wire protocol between the page provider and the relay
//!
//! Messages cross the page boundary as tagged JSON envelopes. Requests
//! and responses are matched by `request_id`; the relay ignores anything
//! whose type tag it does not recognize, so unrelated page messages pass
//! through untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use solbridge_wallet_core::OperationResponse;

/// Type tag on page-to-relay request envelopes
pub const REQUEST_TYPE: &str = "SOLBRIDGE_REQUEST";
/// Type tag on relay-to-page response envelopes
pub const RESPONSE_TYPE: &str = "SOLBRIDGE_RESPONSE";

/// Methods the page provider exposes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ProviderMethod {
    Connect,
    Disconnect,
    GetAddress,
    GetBalance,
    GetHistory,
    SignTransaction,
    SignAndSendTransaction,
    SignAllTransactions,
}

/// A page-originated request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub request_id: String,
    pub method: ProviderMethod,
    #[serde(default)]
    pub params: Value,
}

impl RequestEnvelope {
    pub fn new(request_id: String, method: ProviderMethod, params: Value) -> Self {
        Self {
            kind: REQUEST_TYPE.to_string(),
            request_id,
            method,
            params,
        }
    }
}

/// The relay's answer, correlated by `request_id`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub request_id: String,
    pub response: OperationResponse,
}

impl ResponseEnvelope {
    pub fn new(request_id: String, response: OperationResponse) -> Self {
        Self {
            kind: RESPONSE_TYPE.to_string(),
            request_id,
            response,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_envelope_wire_shape() {
        let envelope = RequestEnvelope::new(
            "42-abc".to_string(),
            ProviderMethod::SignTransaction,
            json!({ "payload": "AAAA" }),
        );
        let wire = serde_json::to_value(&envelope).unwrap();
        assert_eq!(wire["type"], REQUEST_TYPE);
        assert_eq!(wire["method"], "signTransaction");
        assert_eq!(wire["request_id"], "42-abc");
    }

    #[test]
    fn test_unknown_method_fails_to_parse() {
        let wire = json!({
            "type": REQUEST_TYPE,
            "request_id": "1",
            "method": "stealAllFunds",
        });
        assert!(serde_json::from_value::<RequestEnvelope>(wire).is_err());
    }

    #[test]
    fn test_params_default_to_null() {
        let wire = json!({
            "type": REQUEST_TYPE,
            "request_id": "1",
            "method": "connect",
        });
        let envelope: RequestEnvelope = serde_json::from_value(wire).unwrap();
        assert!(envelope.params.is_null());
    }
}
