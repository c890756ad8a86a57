use thiserror::Error;

/// Errors surfaced to the page-side provider
#[derive(Debug, Error)]
pub enum BridgeError {
    /// No response arrived before the deadline; the pending entry is evicted
    #[error("Request timed out")]
    Timeout,

    #[error("Bridge channel closed")]
    ChannelClosed,

    /// The wallet service answered with an error; carries its display string
    #[error("{0}")]
    Wallet(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Protocol(err.to_string())
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;
