//! Error handling for the wallet core
//!
//! This module defines the error types used throughout the wallet core
//! and the relay. Every boundary surfaces these as a uniform
//! `{success: false, error}` response shape.

use thiserror::Error;

/// Wallet error type
#[derive(Error, Debug, Clone)]
pub enum WalletError {
    #[error("No wallet found")]
    NoWallet,

    #[error("Invalid password or corrupted wallet data")]
    InvalidPassword,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    #[error("Network error: {0}")]
    Network(String),

    /// User declined an approval prompt. Non-retryable; callers must not
    /// render this as a generic failure.
    #[error("User rejected the request")]
    UserRejected,

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WalletError {
    /// Create an invalid address error
    pub fn invalid_address(message: impl Into<String>) -> Self {
        Self::InvalidAddress(message.into())
    }

    /// Create an insufficient balance error
    pub fn insufficient_balance(message: impl Into<String>) -> Self {
        Self::InsufficientBalance(message.into())
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Create a transaction failure carrying the chain-provided reason
    pub fn transaction_failed(message: impl Into<String>) -> Self {
        Self::TransactionFailed(message.into())
    }

    /// Create a cryptographic error
    pub fn crypto(message: impl Into<String>) -> Self {
        Self::Crypto(message.into())
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether retrying the same request could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::TransactionFailed(_))
    }
}

// Standard library error conversions
impl From<std::io::Error> for WalletError {
    fn from(err: std::io::Error) -> Self {
        Self::storage(format!("IO error: {}", err))
    }
}

impl From<hex::FromHexError> for WalletError {
    fn from(err: hex::FromHexError) -> Self {
        Self::validation(format!("Hex decoding error: {}", err))
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(err: serde_json::Error) -> Self {
        Self::storage(format!("JSON error: {}", err))
    }
}

impl From<tokio::task::JoinError> for WalletError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::internal(format!("Task join error: {}", err))
    }
}

// Cryptographic error conversions
impl From<bip39::Error> for WalletError {
    fn from(err: bip39::Error) -> Self {
        Self::validation(format!("Invalid seed phrase: {}", err))
    }
}

impl From<ed25519_dalek::SignatureError> for WalletError {
    fn from(err: ed25519_dalek::SignatureError) -> Self {
        Self::crypto(format!("Ed25519 error: {}", err))
    }
}

impl From<argon2::password_hash::Error> for WalletError {
    fn from(err: argon2::password_hash::Error) -> Self {
        Self::crypto(format!("Password hash error: {}", err))
    }
}

impl From<argon2::Error> for WalletError {
    fn from(err: argon2::Error) -> Self {
        Self::crypto(format!("Argon2 error: {}", err))
    }
}

impl From<aes_gcm::Error> for WalletError {
    fn from(err: aes_gcm::Error) -> Self {
        Self::crypto(format!("AES-GCM error: {}", err))
    }
}
