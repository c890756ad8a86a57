//! Wallet record persistence
//!
//! Serializes the [`WalletRecord`] to JSON and round-trips it through a
//! [`PlatformStorage`] backend. The record's secret material is already
//! sealed by the vault; everything else in the record is public state
//! (network, account index list, the display address).

use crate::infrastructure::platform::PlatformStorage;
use crate::shared::constants::WALLET_RECORD_KEY;
use crate::shared::error::WalletError;
use crate::shared::types::{WalletRecord, WalletResult};
use std::sync::Arc;

/// Store for the single persisted wallet record
pub struct WalletStore {
    storage: Arc<dyn PlatformStorage>,
}

impl WalletStore {
    pub fn new(storage: Arc<dyn PlatformStorage>) -> Self {
        Self { storage }
    }

    /// Whether a wallet record exists at all
    pub fn has_wallet(&self) -> WalletResult<bool> {
        self.storage.exists(WALLET_RECORD_KEY)
    }

    /// Load the persisted record; `NoWallet` when none exists
    pub fn load(&self) -> WalletResult<WalletRecord> {
        if !self.storage.exists(WALLET_RECORD_KEY)? {
            return Err(WalletError::NoWallet);
        }
        let bytes = self.storage.retrieve(WALLET_RECORD_KEY)?;
        let record: WalletRecord = serde_json::from_slice(&bytes)
            .map_err(|e| WalletError::storage(format!("Corrupt wallet record: {}", e)))?;
        Ok(record)
    }

    /// Persist the record, replacing any previous one
    pub fn save(&self, record: &WalletRecord) -> WalletResult<()> {
        let bytes = serde_json::to_vec(record)?;
        self.storage.store(WALLET_RECORD_KEY, &bytes)
    }

    /// Remove the record entirely
    pub fn clear(&self) -> WalletResult<()> {
        self.storage.delete(WALLET_RECORD_KEY)
    }
}
