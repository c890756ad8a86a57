//! At-rest protection for key material
//!
//! Seals secret payloads under a password: Argon2id derives the cipher key
//! from the password and a fresh random salt, AES-256-GCM provides
//! authenticated encryption. Blob layout: `salt || nonce || ciphertext+tag`.
//!
//! Opening fails closed: any tamper, truncation, or wrong password yields
//! `InvalidPassword` with no partial plaintext.

use crate::shared::constants::{
    ARGON2_MEMORY_COST, ARGON2_PARALLELISM, ARGON2_TIME_COST, KEY_SIZE, NONCE_SIZE, SALT_SIZE,
};
use crate::shared::error::WalletError;
use crate::shared::types::WalletResult;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit};
use argon2::{Argon2, PasswordHasher};
use rand_core::{OsRng, RngCore};
use zeroize::Zeroizing;

/// Derive the AES key from a password and salt using Argon2id
fn derive_key(password: &str, salt: &[u8]) -> WalletResult<Zeroizing<[u8; KEY_SIZE]>> {
    let salt = argon2::password_hash::SaltString::encode_b64(salt)?;
    let argon2 = Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon2::Params::new(
            ARGON2_MEMORY_COST,
            ARGON2_TIME_COST,
            ARGON2_PARALLELISM,
            Some(KEY_SIZE),
        )?,
    );
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| WalletError::crypto(format!("Password hashing failed: {}", e)))?;

    let hash = password_hash
        .hash
        .ok_or_else(|| WalletError::crypto("Password hash is empty".to_string()))?;
    let hash_bytes = hash.as_bytes();
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    key.copy_from_slice(&hash_bytes[..KEY_SIZE]);
    Ok(key)
}

/// Seal a plaintext payload under a password
pub fn seal(plaintext: &[u8], password: &str) -> WalletResult<Vec<u8>> {
    let mut salt = [0u8; SALT_SIZE];
    let mut rng = OsRng;
    rng.fill_bytes(&mut salt);

    let key = derive_key(password, &salt)?;
    let cipher = Aes256Gcm::new(GenericArray::from_slice(&*key));

    let mut nonce = [0u8; NONCE_SIZE];
    rng.fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(GenericArray::from_slice(&nonce), plaintext)
        .map_err(|e| WalletError::crypto(format!("Encryption failed: {}", e)))?;

    let mut blob = Vec::with_capacity(SALT_SIZE + NONCE_SIZE + ciphertext.len());
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Open a sealed blob with a password.
///
/// Every failure mode maps to `InvalidPassword`: wrong password, tampered
/// ciphertext, and truncated blobs are indistinguishable to the caller.
pub fn open(blob: &[u8], password: &str) -> WalletResult<Zeroizing<Vec<u8>>> {
    if blob.len() < SALT_SIZE + NONCE_SIZE {
        return Err(WalletError::InvalidPassword);
    }

    let (salt, rest) = blob.split_at(SALT_SIZE);
    let (nonce, ciphertext) = rest.split_at(NONCE_SIZE);

    let key = derive_key(password, salt).map_err(|_| WalletError::InvalidPassword)?;
    let cipher = Aes256Gcm::new(GenericArray::from_slice(&*key));

    let plaintext = cipher
        .decrypt(GenericArray::from_slice(nonce), ciphertext)
        .map_err(|_| WalletError::InvalidPassword)?;

    Ok(Zeroizing::new(plaintext))
}
