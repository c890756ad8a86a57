//! Key management for the wallet core
//!
//! Owns the wallet lifecycle state machine:
//!
//! ```text
//! NoWallet --(create | import)--> Unlocked
//! Locked --(unlock ok)--> Unlocked --(lock / restart)--> Locked
//! ```
//!
//! The unlocked session holds the only cleartext copy of the seed or raw
//! key. Derived signing keys are reconstructed on every unlock and are
//! never persisted; at rest only the vault-sealed blob exists.

pub mod derivation;
pub mod phrase;

pub use phrase::SeedPhrase;

use crate::core::store::WalletStore;
use crate::core::vault;
use crate::infrastructure::platform::PlatformStorage;
use crate::shared::constants::PRIVATE_KEY_SIZE;
use crate::shared::error::WalletError;
use crate::shared::types::{
    Account, Address, EncryptedWallet, ImportMethod, Network, WalletRecord, WalletResult,
};
use crate::shared::utils::validate_password;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bip39::Mnemonic;
use ed25519_dalek::{Signer, SigningKey};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use zeroize::Zeroizing;

/// Wallet lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletState {
    NoWallet,
    Locked,
    Unlocked,
}

/// Cleartext secret payload sealed into the vault blob
#[derive(Serialize, Deserialize)]
struct VaultPayload {
    seed_phrase: Option<String>,
    private_key: Option<String>,
}

/// In-memory unlocked session. Exists only between unlock and lock;
/// keys and seed material are zeroized on drop.
struct Session {
    import_method: ImportMethod,
    seed_phrase: Option<SeedPhrase>,
    seed: Option<Zeroizing<Vec<u8>>>,
    keys: Vec<SigningKey>,
    accounts: Vec<Account>,
    current_index: u32,
}

impl Session {
    fn current_key(&self) -> WalletResult<&SigningKey> {
        self.accounts
            .iter()
            .position(|a| a.index == self.current_index)
            .and_then(|pos| self.keys.get(pos))
            .ok_or_else(|| WalletError::internal("Session key missing for current account"))
    }

    fn current_account(&self) -> WalletResult<Account> {
        self.accounts
            .iter()
            .find(|a| a.index == self.current_index)
            .cloned()
            .ok_or_else(|| WalletError::internal("Current account missing from session"))
    }
}

/// Key manager owning the session and the persisted record
pub struct KeyManager {
    store: WalletStore,
    session: Option<Session>,
}

impl KeyManager {
    pub fn new(storage: Arc<dyn PlatformStorage>) -> Self {
        Self {
            store: WalletStore::new(storage),
            session: None,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> WalletState {
        if self.session.is_some() {
            WalletState::Unlocked
        } else if self.store.has_wallet().unwrap_or(false) {
            WalletState::Locked
        } else {
            WalletState::NoWallet
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.session.is_some()
    }

    /// Create a fresh wallet from newly generated entropy.
    /// Leaves the wallet unlocked with account 0 selected.
    pub fn create_wallet(&mut self, password: &str) -> WalletResult<Account> {
        validate_password(password)?;
        if self.store.has_wallet()? {
            return Err(WalletError::validation("A wallet already exists"));
        }

        let mut entropy = [0u8; 16];
        let mut rng = OsRng;
        rng.fill_bytes(&mut entropy);
        let mnemonic = Mnemonic::from_entropy(&entropy)
            .map_err(|e| WalletError::crypto(format!("Mnemonic generation failed: {}", e)))?;

        self.install_phrase_wallet(SeedPhrase::parse(&mnemonic.to_string())?, password, vec![0], 0)
    }

    /// Import a wallet from an existing BIP-39 phrase
    pub fn import_seed_phrase(&mut self, phrase: &str, password: &str) -> WalletResult<Account> {
        validate_password(password)?;
        let phrase = SeedPhrase::parse(phrase)?;
        if self.store.has_wallet()? {
            return Err(WalletError::validation("A wallet already exists"));
        }
        self.install_phrase_wallet(phrase, password, vec![0], 0)
    }

    /// Import a raw ed25519 secret key. The resulting wallet has exactly
    /// one account at index 0 and can never derive more.
    pub fn import_private_key(&mut self, key_bytes: &[u8], password: &str) -> WalletResult<Account> {
        validate_password(password)?;
        if self.store.has_wallet()? {
            return Err(WalletError::validation("A wallet already exists"));
        }
        if key_bytes.len() != PRIVATE_KEY_SIZE {
            return Err(WalletError::validation(format!(
                "Private key must be {} bytes",
                PRIVATE_KEY_SIZE
            )));
        }

        let mut raw = [0u8; PRIVATE_KEY_SIZE];
        raw.copy_from_slice(key_bytes);
        let key = SigningKey::from_bytes(&raw);
        let account = Account {
            index: 0,
            address: derivation::address_of(&key),
        };

        let payload = VaultPayload {
            seed_phrase: None,
            private_key: Some(hex::encode(key_bytes)),
        };
        let record = self.seal_record(
            &payload,
            password,
            account.address.clone(),
            ImportMethod::PrivateKey,
            vec![0],
            0,
        )?;
        self.store.save(&record)?;

        self.session = Some(Session {
            import_method: ImportMethod::PrivateKey,
            seed_phrase: None,
            seed: None,
            keys: vec![key],
            accounts: vec![account.clone()],
            current_index: 0,
        });

        log::info!("Imported raw-key wallet: {}", account.address);
        Ok(account)
    }

    /// Unlock the wallet with a password.
    ///
    /// Fails closed: wrong password, tampered blob, and corrupt payload
    /// all surface as `InvalidPassword` with no partial session.
    pub fn unlock(&mut self, password: &str) -> WalletResult<Account> {
        let record = self.store.load()?;

        let blob = BASE64
            .decode(&record.encrypted_wallet.data)
            .map_err(|_| WalletError::InvalidPassword)?;
        let plaintext = vault::open(&blob, password)?;
        let payload: VaultPayload =
            serde_json::from_slice(&plaintext).map_err(|_| WalletError::InvalidPassword)?;

        let session = match record.encrypted_wallet.import_method {
            ImportMethod::Phrase => {
                let phrase = payload
                    .seed_phrase
                    .as_deref()
                    .and_then(|p| SeedPhrase::parse(p).ok())
                    .ok_or(WalletError::InvalidPassword)?;
                let mnemonic =
                    Mnemonic::parse_in_normalized(bip39::Language::English, phrase.as_str())
                        .map_err(|_| WalletError::InvalidPassword)?;
                let seed = Zeroizing::new(mnemonic.to_seed_normalized("").to_vec());

                let mut keys = Vec::with_capacity(record.accounts.len());
                let mut accounts = Vec::with_capacity(record.accounts.len());
                for &index in &record.accounts {
                    let key = derivation::derive_keypair(&seed, index);
                    accounts.push(Account {
                        index,
                        address: derivation::address_of(&key),
                    });
                    keys.push(key);
                }

                Session {
                    import_method: ImportMethod::Phrase,
                    seed_phrase: Some(phrase),
                    seed: Some(seed),
                    keys,
                    accounts,
                    current_index: record.current_account_index,
                }
            }
            ImportMethod::PrivateKey => {
                let key_hex = payload.private_key.ok_or(WalletError::InvalidPassword)?;
                let key_bytes = hex::decode(&key_hex).map_err(|_| WalletError::InvalidPassword)?;
                let raw: [u8; PRIVATE_KEY_SIZE] = key_bytes
                    .try_into()
                    .map_err(|_| WalletError::InvalidPassword)?;
                let key = SigningKey::from_bytes(&raw);
                let account = Account {
                    index: 0,
                    address: derivation::address_of(&key),
                };

                Session {
                    import_method: ImportMethod::PrivateKey,
                    seed_phrase: None,
                    seed: None,
                    keys: vec![key],
                    accounts: vec![account],
                    current_index: 0,
                }
            }
        };

        let account = session.current_account()?;
        self.session = Some(session);
        log::info!("Wallet unlocked: {}", account.address);
        Ok(account)
    }

    /// Drop the session; keys and seed material are zeroized on drop
    pub fn lock(&mut self) {
        self.session = None;
        log::info!("Wallet locked");
    }

    /// Remove the wallet entirely: drop the session and delete the record
    pub fn destroy(&mut self) -> WalletResult<()> {
        self.session = None;
        self.store.clear()?;
        log::info!("Wallet removed");
        Ok(())
    }

    /// Append the next sequential account. Seed-derived wallets only.
    pub fn add_account(&mut self) -> WalletResult<Account> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| WalletError::validation("Wallet is locked"))?;

        if session.import_method == ImportMethod::PrivateKey {
            return Err(WalletError::validation(
                "Raw-key wallets cannot derive additional accounts",
            ));
        }
        let seed = session
            .seed
            .as_ref()
            .ok_or_else(|| WalletError::internal("Seed missing from phrase session"))?;

        let next_index = session.accounts.len() as u32;
        let key = derivation::derive_keypair(seed, next_index);
        let account = Account {
            index: next_index,
            address: derivation::address_of(&key),
        };
        session.keys.push(key);
        session.accounts.push(account.clone());
        session.current_index = next_index;

        let mut record = self.store.load()?;
        record.accounts.push(next_index);
        record.current_account_index = next_index;
        self.store.save(&record)?;

        log::info!("Derived account {}: {}", next_index, account.address);
        Ok(account)
    }

    /// Switch the current account to an already-derived index
    pub fn select_account(&mut self, index: u32) -> WalletResult<Account> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| WalletError::validation("Wallet is locked"))?;

        let account = session
            .accounts
            .iter()
            .find(|a| a.index == index)
            .cloned()
            .ok_or_else(|| WalletError::validation(format!("No account at index {}", index)))?;
        session.current_index = index;

        let mut record = self.store.load()?;
        record.current_account_index = index;
        self.store.save(&record)?;

        Ok(account)
    }

    /// The currently selected account
    pub fn current_account(&self) -> WalletResult<Account> {
        self.session
            .as_ref()
            .ok_or_else(|| WalletError::validation("Wallet is locked"))?
            .current_account()
    }

    /// All derived accounts in index order
    pub fn accounts(&self) -> WalletResult<Vec<Account>> {
        Ok(self
            .session
            .as_ref()
            .ok_or_else(|| WalletError::validation("Wallet is locked"))?
            .accounts
            .clone())
    }

    /// The address to display while locked, taken from the record
    pub fn display_address(&self) -> WalletResult<Address> {
        if let Some(session) = &self.session {
            return Ok(session.current_account()?.address);
        }
        Ok(self.store.load()?.encrypted_wallet.public_key)
    }

    /// Disclose the seed phrase. Upstream callers gate this behind an
    /// explicit user approval; raw-key wallets have no seed to export.
    pub fn export_seed_phrase(&self) -> WalletResult<String> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| WalletError::validation("Wallet is locked"))?;
        session
            .seed_phrase
            .as_ref()
            .map(|p| p.as_str().to_string())
            .ok_or_else(|| WalletError::validation("No seed phrase for a raw-key wallet"))
    }

    /// Disclose the current account's secret key, base58-encoded.
    /// Gated upstream by explicit user approval.
    pub fn export_private_key(&self) -> WalletResult<String> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| WalletError::validation("Wallet is locked"))?;
        let key = session.current_key()?;
        Ok(bs58::encode(key.to_bytes()).into_string())
    }

    /// Sign a message with the current account's key
    pub fn sign(&self, message: &[u8]) -> WalletResult<Vec<u8>> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| WalletError::validation("Wallet is locked"))?;
        let key = session.current_key()?;
        Ok(key.sign(message).to_bytes().to_vec())
    }

    /// Active network from the persisted record
    pub fn network(&self) -> WalletResult<Network> {
        Ok(self.store.load()?.network)
    }

    /// Switch the active network and persist the choice
    pub fn set_network(&mut self, network: Network) -> WalletResult<()> {
        let mut record = self.store.load()?;
        record.network = network;
        self.store.save(&record)?;
        log::info!("Switched network to {}", network.name());
        Ok(())
    }

    fn install_phrase_wallet(
        &mut self,
        phrase: SeedPhrase,
        password: &str,
        indices: Vec<u32>,
        current: u32,
    ) -> WalletResult<Account> {
        let mnemonic = Mnemonic::parse_in_normalized(bip39::Language::English, phrase.as_str())
            .map_err(|e| WalletError::validation(format!("Invalid seed phrase: {}", e)))?;
        let seed = Zeroizing::new(mnemonic.to_seed_normalized("").to_vec());

        let mut keys = Vec::with_capacity(indices.len());
        let mut accounts = Vec::with_capacity(indices.len());
        for &index in &indices {
            let key = derivation::derive_keypair(&seed, index);
            accounts.push(Account {
                index,
                address: derivation::address_of(&key),
            });
            keys.push(key);
        }
        let display = accounts
            .first()
            .map(|a| a.address.clone())
            .ok_or_else(|| WalletError::internal("Wallet created with no accounts"))?;

        let payload = VaultPayload {
            seed_phrase: Some(phrase.as_str().to_string()),
            private_key: None,
        };
        let record = self.seal_record(
            &payload,
            password,
            display,
            ImportMethod::Phrase,
            indices,
            current,
        )?;
        self.store.save(&record)?;

        let session = Session {
            import_method: ImportMethod::Phrase,
            seed_phrase: Some(phrase),
            seed: Some(seed),
            keys,
            accounts,
            current_index: current,
        };
        let account = session.current_account()?;
        self.session = Some(session);

        log::info!("Wallet ready: {}", account.address);
        Ok(account)
    }

    fn seal_record(
        &self,
        payload: &VaultPayload,
        password: &str,
        public_key: Address,
        import_method: ImportMethod,
        accounts: Vec<u32>,
        current_account_index: u32,
    ) -> WalletResult<WalletRecord> {
        let plaintext = Zeroizing::new(serde_json::to_vec(payload)?);
        let blob = vault::seal(&plaintext, password)?;

        Ok(WalletRecord {
            encrypted_wallet: EncryptedWallet {
                data: BASE64.encode(blob),
                public_key,
                import_method,
            },
            network: Network::Devnet,
            has_wallet: true,
            accounts,
            current_account_index,
        })
    }
}
