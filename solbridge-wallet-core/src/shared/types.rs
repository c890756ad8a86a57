use serde::{Deserialize, Serialize};

// Basic types for wallet operations
pub type Address = String;
pub type Signature = String;
pub type Blockhash = String;
pub type Lamports = u64;

/// Result alias used throughout the workspace
pub type WalletResult<T> = Result<T, crate::shared::error::WalletError>;

// Network types - the three public cluster endpoints
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
    MainnetBeta,
    Devnet,
    Testnet,
}

impl Network {
    pub fn name(&self) -> &'static str {
        match self {
            Network::MainnetBeta => "mainnet-beta",
            Network::Devnet => "devnet",
            Network::Testnet => "testnet",
        }
    }

    pub fn rpc_url(&self) -> &'static str {
        match self {
            Network::MainnetBeta => "https://api.mainnet-beta.solana.com",
            Network::Devnet => "https://api.devnet.solana.com",
            Network::Testnet => "https://api.testnet.solana.com",
        }
    }

    /// Environment variable that overrides the RPC endpoint for this network
    pub fn rpc_env_var(&self) -> &'static str {
        match self {
            Network::MainnetBeta => "SOLBRIDGE_RPC_MAINNET_BETA",
            Network::Devnet => "SOLBRIDGE_RPC_DEVNET",
            Network::Testnet => "SOLBRIDGE_RPC_TESTNET",
        }
    }
}

/// How the wallet's key material was originally supplied
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ImportMethod {
    /// BIP-39 mnemonic; supports multi-account derivation
    Phrase,
    /// Raw ed25519 secret key; fixed single account at index 0
    PrivateKey,
}

/// A derived account: the address is a pure function of `(seed, index)`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub index: u32,
    pub address: Address,
}

/// Sealed key material as persisted at rest
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedWallet {
    /// Base64 vault blob: salt || nonce || AES-256-GCM ciphertext+tag
    pub data: String,
    /// Address of account 0, kept outside the blob for locked-state display
    pub public_key: Address,
    pub import_method: ImportMethod,
}

/// The full persisted wallet record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletRecord {
    pub encrypted_wallet: EncryptedWallet,
    pub network: Network,
    pub has_wallet: bool,
    /// Ordered account index list; contiguous from 0
    pub accounts: Vec<u32>,
    pub current_account_index: u32,
}

/// Direction of a historical transfer, inferred from the balance delta
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransferDirection {
    Received,
    Sent,
}

/// One reduced history entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub signature: Signature,
    /// Unix timestamp; `None` means the transaction is still pending
    pub timestamp: Option<i64>,
    pub direction: TransferDirection,
    /// Absolute balance delta in native units (SOL)
    pub amount: f64,
    /// Fee paid in native units
    pub fee: f64,
    pub status: String,
}

/// A transfer the page (or UI) asks the service to build, sign and send
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub recipient: Address,
    pub amount_sol: f64,
}

/// An unsigned transaction payload as it crosses the page boundary.
/// Opaque bytes, base64-encoded; the core never interprets its contents
/// beyond signing them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionPayload {
    pub payload: String,
}

/// A signed transaction: the original payload plus the base58 signature.
/// Carries no key material.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedTransaction {
    pub payload: String,
    pub signature: Signature,
}
