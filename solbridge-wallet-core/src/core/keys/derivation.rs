//! Deterministic account derivation
//!
//! Maps `(seed, account index)` to an ed25519 keypair via the hardened
//! SLIP-0010 path `m/44'/501'/<index>'/0'`. The same inputs always yield
//! the same keypair; derived keys are reconstructed on every unlock and
//! never persisted.

use crate::shared::constants::{DERIVATION_COIN_TYPE, DERIVATION_PURPOSE};
use crate::shared::types::{Account, Address};
use ed25519_dalek::SigningKey;

/// SLIP-0010 path components for a given account index.
/// `derive_ed25519_private_key` hardens every component itself.
pub const fn account_path(index: u32) -> [u32; 4] {
    [DERIVATION_PURPOSE, DERIVATION_COIN_TYPE, index, 0]
}

/// Derive the ed25519 keypair for `(seed, index)`.
///
/// `seed` is the 64-byte BIP-39 seed (or any entropy of at least 16 bytes;
/// SLIP-0010 takes it as IKM).
pub fn derive_keypair(seed: &[u8], index: u32) -> SigningKey {
    let path = account_path(index);
    let key = slip10_ed25519::derive_ed25519_private_key(seed, &path);
    SigningKey::from_bytes(&key)
}

/// Base58 address of a keypair's public half
pub fn address_of(key: &SigningKey) -> Address {
    bs58::encode(key.verifying_key().as_bytes()).into_string()
}

/// Derive an [`Account`] (index + address) for `(seed, index)`
pub fn derive_account(seed: &[u8], index: u32) -> Account {
    let key = derive_keypair(seed, index);
    Account {
        index,
        address: address_of(&key),
    }
}
