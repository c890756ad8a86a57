//! Constants for the wallet core
//!
//! This module contains all constants used throughout the wallet core.

// Chain constants
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;
/// Flat network fee assumed when validating transfer amounts (5000 lamports)
pub const TRANSFER_FEE_LAMPORTS: u64 = 5_000;
/// Size of an ed25519 public key / address in bytes
pub const ADDRESS_SIZE: usize = 32;
pub const PRIVATE_KEY_SIZE: usize = 32;
pub const SIGNATURE_SIZE: usize = 64;

// Derivation constants: hardened path m/44'/501'/<index>'/0'
pub const DERIVATION_PURPOSE: u32 = 44;
pub const DERIVATION_COIN_TYPE: u32 = 501;

// Password constants
pub const PASSWORD_MIN_LENGTH: usize = 8;
pub const PASSWORD_MAX_LENGTH: usize = 128;

// Vault constants
pub const SALT_SIZE: usize = 16;
pub const NONCE_SIZE: usize = 12;
pub const KEY_SIZE: usize = 32;
pub const ARGON2_MEMORY_COST: u32 = 65536; // 64MB
pub const ARGON2_TIME_COST: u32 = 3;
pub const ARGON2_PARALLELISM: u32 = 1;

// Storage constants
pub const WALLET_RECORD_KEY: &str = "solbridge_wallet_record";
pub const STORAGE_DIR_NAME: &str = "solbridge";

// Service constants
/// Number of history entries returned by a history read
pub const HISTORY_LIMIT: usize = 10;
/// Bound on queued pending approvals
pub const APPROVAL_QUEUE_LIMIT: usize = 16;

// Timeouts (milliseconds)
pub const REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const RPC_TIMEOUT_MS: u64 = 30_000;

// Seed phrase constants
pub const SEED_PHRASE_WORDS: usize = 12;
pub const MIN_SEED_PHRASE_WORDS: usize = 12;
pub const MAX_SEED_PHRASE_WORDS: usize = 24;

// Build information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
