//! SolBridge Wallet Core
//!
//! The privileged half of the SolBridge wallet. Owns key material and
//! everything that touches it:
//!
//! - **core**: key management, the at-rest vault, the approval gate,
//!   and the wallet service that terminates page-originated requests
//! - **infrastructure**: storage backends and JSON-RPC chain access
//! - **shared**: common types, errors, constants
//!
//! Key material never leaves this crate. Pages interact only through
//! the operation envelopes in [`core::service`], relayed by the
//! `solbridge-relay` crate; responses carry addresses and signatures,
//! never keys.

pub mod core;
pub mod infrastructure;
pub mod shared;

pub use crate::core::approval::{ApprovalCoordinator, ApprovalKind, ApprovalRequest};
pub use crate::core::keys::{KeyManager, WalletState};
pub use crate::core::service::{
    ChainFactory, Operation, OperationResponse, ServiceHandle, ServiceRequest, WalletService,
};
pub use crate::infrastructure::chain::{ChainClient, JsonRpcChainClient};
pub use crate::infrastructure::platform::{FileStorage, MemoryStorage, PlatformStorage};
pub use crate::shared::error::WalletError;
pub use crate::shared::types::{
    Account, Network, SignedTransaction, TransactionPayload, TransactionSummary, TransferRequest,
    WalletResult,
};

/// Initialize logging for binaries and integration tests
pub fn init() {
    let _ = env_logger::Builder::from_default_env().try_init();
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Build a service over file-backed storage with the default JSON-RPC
/// chain client for whichever network the record selects.
pub fn init_wallet_service() -> WalletResult<(
    std::sync::Arc<WalletService>,
    tokio::sync::mpsc::UnboundedReceiver<ApprovalRequest>,
)> {
    let storage = std::sync::Arc::new(FileStorage::new()?);
    let factory: ChainFactory = Box::new(|network| {
        Ok(std::sync::Arc::new(JsonRpcChainClient::for_network(network)?)
            as std::sync::Arc<dyn ChainClient>)
    });
    WalletService::new(storage, factory)
}
