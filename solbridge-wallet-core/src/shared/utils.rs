//! Utility functions for the wallet core
//!
//! This module contains common utility functions used throughout the wallet core.

use crate::shared::constants::{ADDRESS_SIZE, PASSWORD_MAX_LENGTH, PASSWORD_MIN_LENGTH};
use crate::shared::error::WalletError;
use bip39::Mnemonic;

/// Current unix timestamp in seconds
pub fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Validate an address: base58, decoding to exactly 32 bytes
pub fn validate_address(address: &str) -> Result<(), WalletError> {
    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|_| WalletError::invalid_address(format!("Not valid base58: {}", address)))?;

    if bytes.len() != ADDRESS_SIZE {
        return Err(WalletError::invalid_address(format!(
            "Address must decode to {} bytes, got {}",
            ADDRESS_SIZE,
            bytes.len()
        )));
    }

    Ok(())
}

/// Validate a seed phrase against the BIP-39 English wordlist
pub fn validate_seed_phrase(seed_phrase: &str) -> Result<(), WalletError> {
    Mnemonic::parse_in_normalized(bip39::Language::English, seed_phrase)
        .map(|_| ())
        .map_err(|e| WalletError::validation(format!("Invalid BIP39 seed phrase: {}", e)))
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), WalletError> {
    if password.len() < PASSWORD_MIN_LENGTH {
        return Err(WalletError::validation(format!(
            "Password must be at least {} characters long",
            PASSWORD_MIN_LENGTH
        )));
    }

    if password.len() > PASSWORD_MAX_LENGTH {
        return Err(WalletError::validation(format!(
            "Password must be at most {} characters long",
            PASSWORD_MAX_LENGTH
        )));
    }

    Ok(())
}
