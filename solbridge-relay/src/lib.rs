//! SolBridge Relay
//!
//! The unprivileged half of the SolBridge wallet: the page-facing
//! provider stub, the relay that filters and forwards page messages, and
//! the multiplexer that correlates concurrent requests with their
//! responses. Key material never enters this crate; only envelopes of
//! addresses, payloads and signatures cross it.

pub mod error;
pub mod protocol;
pub mod provider;
pub mod relay;
pub mod rpc;

pub use error::{BridgeError, BridgeResult};
pub use protocol::{ProviderMethod, RequestEnvelope, ResponseEnvelope, REQUEST_TYPE, RESPONSE_TYPE};
pub use provider::{Provider, ProviderEvent};
pub use relay::{PageMessage, Relay, WindowId};
pub use rpc::RpcMultiplexer;
