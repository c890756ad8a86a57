//! Privileged wallet service
//!
//! Terminates every page-originated operation: checks per-origin
//! authorization, routes approval-worthy operations through the
//! [`ApprovalCoordinator`], and talks to the chain through a
//! [`ChainClient`]. The service also carries the management surface the
//! wallet UI drives directly (create, unlock, accounts, transfers).
//!
//! Every page operation produces a uniform [`OperationResponse`]; errors
//! are carried as display strings so the page side never sees internal
//! error structure.

use crate::core::approval::{ApprovalCoordinator, ApprovalKind, ApprovalRequest};
use crate::core::keys::{KeyManager, WalletState};
use crate::infrastructure::chain::ChainClient;
use crate::infrastructure::platform::PlatformStorage;
use crate::shared::constants::{HISTORY_LIMIT, LAMPORTS_PER_SOL, TRANSFER_FEE_LAMPORTS};
use crate::shared::error::WalletError;
use crate::shared::types::{
    Account, Address, Network, SignedTransaction, TransactionPayload, TransactionSummary,
    TransferDirection, TransferRequest, WalletResult,
};
use crate::shared::utils::{current_timestamp, validate_address};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::{mpsc, oneshot};

/// Factory producing a chain client for a network; swapped on network change
pub type ChainFactory =
    Box<dyn Fn(Network) -> WalletResult<Arc<dyn ChainClient>> + Send + Sync>;

/// Page-originated operations the service accepts. Wallet management
/// (unlock, accounts, network switching) is deliberately absent: those
/// live on the methods the wallet UI calls directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Operation {
    Connect,
    Disconnect,
    GetAddress,
    GetBalance,
    GetHistory,
    SignTransaction { payload: TransactionPayload },
    SubmitTransaction { transaction: SignedTransaction },
}

/// Uniform response envelope for page operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OperationResponse {
    pub fn ok(result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(error: &WalletError) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.to_string()),
        }
    }
}

/// One request in flight from the relay to the service task
pub struct ServiceRequest {
    pub id: String,
    pub origin: String,
    pub operation: Operation,
    pub reply: oneshot::Sender<OperationResponse>,
}

/// The privileged wallet process
pub struct WalletService {
    keys: Mutex<KeyManager>,
    approvals: Arc<ApprovalCoordinator>,
    chain: RwLock<Arc<dyn ChainClient>>,
    chain_factory: ChainFactory,
    /// origin -> unix timestamp of when the user approved the connection
    connected: Mutex<HashMap<String, i64>>,
}

impl WalletService {
    /// Build a service over the given storage and chain factory.
    /// Returns the approval stream the wallet UI listens on.
    pub fn new(
        storage: Arc<dyn PlatformStorage>,
        chain_factory: ChainFactory,
    ) -> WalletResult<(Arc<Self>, mpsc::UnboundedReceiver<ApprovalRequest>)> {
        let keys = KeyManager::new(storage);
        let network = keys.network().unwrap_or(Network::Devnet);
        let chain = chain_factory(network)?;
        let (approvals, listener) = ApprovalCoordinator::new();

        Ok((
            Arc::new(Self {
                keys: Mutex::new(keys),
                approvals: Arc::new(approvals),
                chain: RwLock::new(chain),
                chain_factory,
                connected: Mutex::new(HashMap::new()),
            }),
            listener,
        ))
    }

    pub fn approvals(&self) -> Arc<ApprovalCoordinator> {
        self.approvals.clone()
    }

    /// Handle one page-originated operation
    pub async fn handle(&self, id: &str, origin: &str, operation: Operation) -> OperationResponse {
        log::debug!("Handling {:?} from {} ({})", operation, origin, id);
        let outcome = match operation {
            Operation::Connect => self.connect(id, origin).await,
            Operation::Disconnect => self.disconnect(origin),
            Operation::GetAddress => self.address_for(origin),
            Operation::GetBalance => self.balance_for(origin).await,
            Operation::GetHistory => self.history_for(origin).await,
            Operation::SignTransaction { payload } => {
                self.sign_transaction(id, origin, payload).await
            }
            Operation::SubmitTransaction { transaction } => {
                self.submit_transaction(origin, transaction).await
            }
        };

        match outcome {
            Ok(result) => OperationResponse::ok(result),
            Err(error) => {
                log::warn!("Operation failed for {} ({}): {}", origin, id, error);
                OperationResponse::err(&error)
            }
        }
    }

    async fn connect(&self, id: &str, origin: &str) -> WalletResult<Value> {
        // Idempotent: a connected origin reconnects without a prompt
        let already = {
            let connected = self.lock_connected()?;
            connected.contains_key(origin)
        };
        if already {
            let address = self.current_address()?;
            return Ok(json!({ "address": address }));
        }

        let address = self.current_address()?;
        self.approvals
            .request(id.to_string(), origin.to_string(), ApprovalKind::Connect)
            .await?;

        self.lock_connected()?
            .insert(origin.to_string(), current_timestamp());
        log::info!("Origin connected: {}", origin);
        Ok(json!({ "address": address }))
    }

    fn disconnect(&self, origin: &str) -> WalletResult<Value> {
        self.lock_connected()?.remove(origin);
        log::info!("Origin disconnected: {}", origin);
        Ok(json!({ "disconnected": true }))
    }

    fn address_for(&self, origin: &str) -> WalletResult<Value> {
        self.require_connected(origin)?;
        let address = self.current_address()?;
        Ok(json!({ "address": address }))
    }

    async fn balance_for(&self, origin: &str) -> WalletResult<Value> {
        self.require_connected(origin)?;
        let address = self.current_address()?;
        let lamports = self.chain().get_balance(&address).await?;
        Ok(json!({
            "lamports": lamports,
            "sol": lamports as f64 / LAMPORTS_PER_SOL as f64,
        }))
    }

    async fn history_for(&self, origin: &str) -> WalletResult<Value> {
        self.require_connected(origin)?;
        let address = self.current_address()?;
        let summaries = self.recent_history(&address).await?;
        Ok(serde_json::to_value(summaries)?)
    }

    async fn sign_transaction(
        &self,
        id: &str,
        origin: &str,
        payload: TransactionPayload,
    ) -> WalletResult<Value> {
        self.require_connected(origin)?;
        let message = BASE64
            .decode(&payload.payload)
            .map_err(|_| WalletError::validation("Transaction payload is not valid base64"))?;

        self.approvals
            .request(
                id.to_string(),
                origin.to_string(),
                ApprovalKind::SignTransaction {
                    summary: format!("{} byte transaction", message.len()),
                },
            )
            .await?;

        let signature = {
            let keys = self.lock_keys()?;
            keys.sign(&message)?
        };
        let signed = SignedTransaction {
            payload: payload.payload,
            signature: bs58::encode(signature).into_string(),
        };
        Ok(serde_json::to_value(signed)?)
    }

    async fn submit_transaction(
        &self,
        origin: &str,
        transaction: SignedTransaction,
    ) -> WalletResult<Value> {
        self.require_connected(origin)?;
        let chain = self.chain();
        // Refresh the blockhash first; an unreachable node fails here
        // instead of after submission
        chain.latest_blockhash().await?;
        let signature = chain.submit(&transaction.payload).await?;
        let confirmed = match chain.confirm(&signature).await {
            Ok(confirmed) => confirmed,
            Err(e) => {
                log::warn!("Confirmation check failed for {}: {}", signature, e);
                false
            }
        };
        Ok(json!({ "signature": signature, "confirmed": confirmed }))
    }

    fn require_connected(&self, origin: &str) -> WalletResult<()> {
        let connected = self.lock_connected()?;
        if connected.contains_key(origin) {
            Ok(())
        } else {
            Err(WalletError::validation("Origin not connected"))
        }
    }

    /// Origins currently authorized, for the UI's connected-sites view
    pub fn connected_origins(&self) -> Vec<String> {
        self.lock_connected()
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default()
    }

    // --- management surface (driven by the wallet UI, not the page) ---

    pub fn state(&self) -> WalletState {
        self.lock_keys()
            .map(|k| k.state())
            .unwrap_or(WalletState::Locked)
    }

    pub fn create_wallet(&self, password: &str) -> WalletResult<Account> {
        self.lock_keys()?.create_wallet(password)
    }

    pub fn import_seed_phrase(&self, phrase: &str, password: &str) -> WalletResult<Account> {
        self.lock_keys()?.import_seed_phrase(phrase, password)
    }

    pub fn import_private_key(&self, key_bytes: &[u8], password: &str) -> WalletResult<Account> {
        self.lock_keys()?.import_private_key(key_bytes, password)
    }

    pub fn unlock(&self, password: &str) -> WalletResult<Account> {
        self.lock_keys()?.unlock(password)
    }

    /// Lock the wallet and revoke every origin authorization
    pub fn lock(&self) -> WalletResult<()> {
        self.lock_keys()?.lock();
        self.lock_connected()?.clear();
        Ok(())
    }

    /// Delete the wallet record outright and revoke every grant
    pub fn reset(&self) -> WalletResult<()> {
        self.lock_keys()?.destroy()?;
        self.lock_connected()?.clear();
        Ok(())
    }

    /// Address for the UI to show; read from the record while locked
    pub fn display_address(&self) -> WalletResult<Address> {
        self.lock_keys()?.display_address()
    }

    pub fn add_account(&self) -> WalletResult<Account> {
        self.lock_keys()?.add_account()
    }

    pub fn select_account(&self, index: u32) -> WalletResult<Account> {
        self.lock_keys()?.select_account(index)
    }

    pub fn accounts(&self) -> WalletResult<Vec<Account>> {
        self.lock_keys()?.accounts()
    }

    pub fn current_account(&self) -> WalletResult<Account> {
        self.lock_keys()?.current_account()
    }

    pub fn network(&self) -> WalletResult<Network> {
        self.lock_keys()?.network()
    }

    /// Switch networks and rebind the chain client
    pub fn set_network(&self, network: Network) -> WalletResult<()> {
        let chain = (self.chain_factory)(network)?;
        self.lock_keys()?.set_network(network)?;
        let mut current = self
            .chain
            .write()
            .map_err(|_| WalletError::internal("Chain client lock poisoned"))?;
        *current = chain;
        Ok(())
    }

    /// Disclose the seed phrase after an explicit user approval
    pub async fn export_seed_phrase(&self, id: &str) -> WalletResult<String> {
        self.approvals
            .request(id.to_string(), "wallet-ui".to_string(), ApprovalKind::ExportSecret)
            .await?;
        self.lock_keys()?.export_seed_phrase()
    }

    /// Disclose the current account's secret key after user approval
    pub async fn export_private_key(&self, id: &str) -> WalletResult<String> {
        self.approvals
            .request(id.to_string(), "wallet-ui".to_string(), ApprovalKind::ExportSecret)
            .await?;
        self.lock_keys()?.export_private_key()
    }

    /// Balance of the current account in lamports
    pub async fn balance(&self) -> WalletResult<u64> {
        let address = self.current_address()?;
        self.chain().get_balance(&address).await
    }

    /// Build, sign and submit a simple transfer from the current account.
    ///
    /// The blockhash is fetched immediately before assembly so the
    /// submitted transaction is never stale. If submission fails the
    /// signed artifact is discarded, not retried.
    pub async fn send_transfer(&self, request: TransferRequest) -> WalletResult<String> {
        validate_address(&request.recipient)?;
        if !request.amount_sol.is_finite() || request.amount_sol <= 0.0 {
            return Err(WalletError::validation(
                "Transfer amount must be a positive number",
            ));
        }
        let lamports = (request.amount_sol * LAMPORTS_PER_SOL as f64).round() as u64;

        let address = self.current_address()?;
        let balance = self.chain().get_balance(&address).await?;
        let required = lamports.saturating_add(TRANSFER_FEE_LAMPORTS);
        if balance < required {
            return Err(WalletError::insufficient_balance(format!(
                "Need {} lamports, have {}",
                required, balance
            )));
        }

        let blockhash = self.chain().latest_blockhash().await?;
        let message = serde_json::to_vec(&json!({
            "from": address,
            "to": request.recipient,
            "lamports": lamports,
            "recentBlockhash": blockhash,
        }))?;
        let signature = {
            let keys = self.lock_keys()?;
            keys.sign(&message)?
        };

        let mut payload = Vec::with_capacity(signature.len() + message.len());
        payload.extend_from_slice(&signature);
        payload.extend_from_slice(&message);
        self.chain().submit(&BASE64.encode(payload)).await
    }

    /// Recent history of the current account, newest first, reduced to
    /// summaries. Entries that fail to parse are skipped, not fatal.
    pub async fn recent_history(&self, address: &str) -> WalletResult<Vec<TransactionSummary>> {
        let chain = self.chain();
        let entries = chain.get_signatures(address, HISTORY_LIMIT).await?;

        let mut summaries = Vec::with_capacity(entries.len());
        for entry in entries {
            let signature = match entry.get("signature").and_then(|s| s.as_str()) {
                Some(s) => s.to_string(),
                None => continue,
            };
            match chain.get_parsed_transaction(&signature).await {
                Ok(parsed) => match summarize(address, &signature, &entry, &parsed) {
                    Some(summary) => summaries.push(summary),
                    None => log::warn!("Skipping unparseable transaction {}", signature),
                },
                Err(e) => log::warn!("Skipping transaction {}: {}", signature, e),
            }
        }
        Ok(summaries)
    }

    fn current_address(&self) -> WalletResult<String> {
        let keys = self.lock_keys()?;
        match keys.state() {
            WalletState::NoWallet => Err(WalletError::NoWallet),
            WalletState::Locked => Err(WalletError::validation("Wallet is locked")),
            WalletState::Unlocked => Ok(keys.current_account()?.address),
        }
    }

    fn chain(&self) -> Arc<dyn ChainClient> {
        self.chain
            .read()
            .map(|c| c.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn lock_keys(&self) -> WalletResult<std::sync::MutexGuard<'_, KeyManager>> {
        self.keys
            .lock()
            .map_err(|_| WalletError::internal("Key manager lock poisoned"))
    }

    fn lock_connected(&self) -> WalletResult<std::sync::MutexGuard<'_, HashMap<String, i64>>> {
        self.connected
            .lock()
            .map_err(|_| WalletError::internal("Connection table lock poisoned"))
    }
}

/// Reduce one parsed transaction to a history summary for `address`.
/// Returns `None` when the parsed form is missing the needed fields.
fn summarize(
    address: &str,
    signature: &str,
    entry: &Value,
    parsed: &Value,
) -> Option<TransactionSummary> {
    let meta = parsed.get("meta")?;
    let keys = parsed
        .get("transaction")?
        .get("message")?
        .get("accountKeys")?
        .as_array()?;
    let position = keys.iter().position(|k| {
        k.get("pubkey")
            .and_then(|p| p.as_str())
            .or_else(|| k.as_str())
            == Some(address)
    })?;

    let pre = meta.get("preBalances")?.as_array()?.get(position)?.as_u64()?;
    let post = meta.get("postBalances")?.as_array()?.get(position)?.as_u64()?;
    let fee = meta.get("fee").and_then(|f| f.as_u64()).unwrap_or(0);

    let (direction, delta) = if post >= pre {
        (TransferDirection::Received, post - pre)
    } else {
        (TransferDirection::Sent, pre - post)
    };
    let failed = meta.get("err").map(|e| !e.is_null()).unwrap_or(false);

    Some(TransactionSummary {
        signature: signature.to_string(),
        timestamp: entry
            .get("blockTime")
            .and_then(|t| t.as_i64())
            .or_else(|| parsed.get("blockTime").and_then(|t| t.as_i64())),
        direction,
        amount: delta as f64 / LAMPORTS_PER_SOL as f64,
        fee: fee as f64 / LAMPORTS_PER_SOL as f64,
        status: if failed { "failed" } else { "success" }.to_string(),
    })
}

/// Clonable handle for submitting page operations to a running service
#[derive(Clone)]
pub struct ServiceHandle {
    tx: mpsc::UnboundedSender<ServiceRequest>,
}

impl ServiceHandle {
    /// Spawn the dispatch task. Each request is handled on its own task
    /// so one pending approval never blocks unrelated operations.
    pub fn spawn(service: Arc<WalletService>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<ServiceRequest>();
        tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                let service = service.clone();
                tokio::spawn(async move {
                    let response = service
                        .handle(&request.id, &request.origin, request.operation)
                        .await;
                    let _ = request.reply.send(response);
                });
            }
        });
        Self { tx }
    }

    /// Submit one operation and wait for its response
    pub async fn call(&self, id: String, origin: String, operation: Operation) -> OperationResponse {
        let (reply, rx) = oneshot::channel();
        let request = ServiceRequest {
            id,
            origin,
            operation,
            reply,
        };
        if self.tx.send(request).is_err() {
            return OperationResponse::err(&WalletError::internal("Wallet service unavailable"));
        }
        match rx.await {
            Ok(response) => response,
            Err(_) => OperationResponse::err(&WalletError::internal("Wallet service dropped request")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::approval::ApprovalRequest;
    use crate::infrastructure::platform::MemoryStorage;
    use async_trait::async_trait;

    const PASSWORD: &str = "correct horse battery";

    /// Fake node with scriptable balances and submission outcomes
    struct MockChain {
        balances: Mutex<HashMap<String, u64>>,
        submissions: Mutex<Vec<String>>,
        fail_submit: Mutex<bool>,
        signatures: Mutex<Vec<Value>>,
        transactions: Mutex<HashMap<String, Value>>,
    }

    impl MockChain {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                balances: Mutex::new(HashMap::new()),
                submissions: Mutex::new(Vec::new()),
                fail_submit: Mutex::new(false),
                signatures: Mutex::new(Vec::new()),
                transactions: Mutex::new(HashMap::new()),
            })
        }

        fn set_balance(&self, address: &str, lamports: u64) {
            self.balances
                .lock()
                .unwrap()
                .insert(address.to_string(), lamports);
        }

        fn set_fail_submit(&self, fail: bool) {
            *self.fail_submit.lock().unwrap() = fail;
        }
    }

    #[async_trait]
    impl ChainClient for MockChain {
        async fn get_balance(&self, address: &str) -> WalletResult<u64> {
            Ok(*self.balances.lock().unwrap().get(address).unwrap_or(&0))
        }

        async fn latest_blockhash(&self) -> WalletResult<String> {
            Ok("FwRYtTPRk5N4wUeP87rTw9kQVSwigB6kbikGzzeCMrW5".to_string())
        }

        async fn submit(&self, payload: &str) -> WalletResult<String> {
            if *self.fail_submit.lock().unwrap() {
                return Err(WalletError::transaction_failed("node rejected transaction"));
            }
            self.submissions.lock().unwrap().push(payload.to_string());
            Ok(format!("sig-{}", self.submissions.lock().unwrap().len()))
        }

        async fn confirm(&self, _signature: &str) -> WalletResult<bool> {
            Ok(true)
        }

        async fn get_signatures(&self, _address: &str, limit: usize) -> WalletResult<Vec<Value>> {
            let all = self.signatures.lock().unwrap();
            Ok(all.iter().take(limit).cloned().collect())
        }

        async fn get_parsed_transaction(&self, signature: &str) -> WalletResult<Value> {
            self.transactions
                .lock()
                .unwrap()
                .get(signature)
                .cloned()
                .ok_or_else(|| WalletError::network("unknown transaction"))
        }
    }

    fn service_with_chain(
        chain: Arc<MockChain>,
    ) -> (Arc<WalletService>, mpsc::UnboundedReceiver<ApprovalRequest>) {
        let factory: ChainFactory = Box::new(move |_| Ok(chain.clone() as Arc<dyn ChainClient>));
        WalletService::new(Arc::new(MemoryStorage::new()), factory).unwrap()
    }

    /// Approve everything that arrives on the listener
    fn auto_approve(
        service: &Arc<WalletService>,
        mut listener: mpsc::UnboundedReceiver<ApprovalRequest>,
    ) {
        let approvals = service.approvals();
        tokio::spawn(async move {
            while let Some(request) = listener.recv().await {
                let _ = approvals.resolve(&request.id, true);
            }
        });
    }

    #[tokio::test]
    async fn test_connect_without_wallet_fails() {
        let (service, _listener) = service_with_chain(MockChain::new());
        let response = service
            .handle("r1", "https://app.example", Operation::Connect)
            .await;
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("No wallet found"));
    }

    #[tokio::test]
    async fn test_connect_is_approval_gated_and_idempotent() {
        let (service, listener) = service_with_chain(MockChain::new());
        auto_approve(&service, listener);
        let account = service.create_wallet(PASSWORD).unwrap();

        let first = service
            .handle("r1", "https://app.example", Operation::Connect)
            .await;
        assert!(first.success);
        assert_eq!(
            first.result.unwrap()["address"].as_str().unwrap(),
            account.address
        );
        assert_eq!(service.connected_origins().len(), 1);

        // Second connect returns without another approval round
        let second = service
            .handle("r2", "https://app.example", Operation::Connect)
            .await;
        assert!(second.success);
        assert_eq!(service.connected_origins().len(), 1);
    }

    #[tokio::test]
    async fn test_connect_rejection_leaves_origin_unauthorized() {
        let (service, mut listener) = service_with_chain(MockChain::new());
        service.create_wallet(PASSWORD).unwrap();

        let approvals = service.approvals();
        tokio::spawn(async move {
            if let Some(request) = listener.recv().await {
                let _ = approvals.resolve(&request.id, false);
            }
        });

        let response = service
            .handle("r1", "https://app.example", Operation::Connect)
            .await;
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("User rejected the request"));
        assert!(service.connected_origins().is_empty());
    }

    #[tokio::test]
    async fn test_operations_require_connection() {
        let (service, _listener) = service_with_chain(MockChain::new());
        service.create_wallet(PASSWORD).unwrap();

        let response = service
            .handle("r1", "https://app.example", Operation::GetBalance)
            .await;
        assert!(!response.success);
        assert!(response.error.unwrap().contains("not connected"));
    }

    #[tokio::test]
    async fn test_balance_converts_lamports() {
        let chain = MockChain::new();
        let (service, listener) = service_with_chain(chain.clone());
        auto_approve(&service, listener);
        let account = service.create_wallet(PASSWORD).unwrap();
        chain.set_balance(&account.address, 2_500_000_000);

        service
            .handle("r1", "https://app.example", Operation::Connect)
            .await;
        let response = service
            .handle("r2", "https://app.example", Operation::GetBalance)
            .await;
        assert!(response.success);
        let result = response.result.unwrap();
        assert_eq!(result["lamports"].as_u64().unwrap(), 2_500_000_000);
        assert!((result["sol"].as_f64().unwrap() - 2.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_sign_transaction_round_trip() {
        use ed25519_dalek::{Signature as DalekSignature, Verifier, VerifyingKey};

        let (service, listener) = service_with_chain(MockChain::new());
        auto_approve(&service, listener);
        let account = service.create_wallet(PASSWORD).unwrap();
        service
            .handle("r1", "https://app.example", Operation::Connect)
            .await;

        let message = b"opaque transaction bytes";
        let response = service
            .handle(
                "r2",
                "https://app.example",
                Operation::SignTransaction {
                    payload: TransactionPayload {
                        payload: BASE64.encode(message),
                    },
                },
            )
            .await;
        assert!(response.success);
        let signed: SignedTransaction =
            serde_json::from_value(response.result.unwrap()).unwrap();
        assert_eq!(signed.payload, BASE64.encode(message));

        let pk: [u8; 32] = bs58::decode(&account.address)
            .into_vec()
            .unwrap()
            .try_into()
            .unwrap();
        let sig: [u8; 64] = bs58::decode(&signed.signature)
            .into_vec()
            .unwrap()
            .try_into()
            .unwrap();
        assert!(VerifyingKey::from_bytes(&pk)
            .unwrap()
            .verify(message, &DalekSignature::from_bytes(&sig))
            .is_ok());
    }

    #[tokio::test]
    async fn test_sign_rejects_bad_base64() {
        let (service, listener) = service_with_chain(MockChain::new());
        auto_approve(&service, listener);
        service.create_wallet(PASSWORD).unwrap();
        service
            .handle("r1", "https://app.example", Operation::Connect)
            .await;

        let response = service
            .handle(
                "r2",
                "https://app.example",
                Operation::SignTransaction {
                    payload: TransactionPayload {
                        payload: "not base64 !!!".to_string(),
                    },
                },
            )
            .await;
        assert!(!response.success);
    }

    #[tokio::test]
    async fn test_send_transfer_checks_balance() {
        let chain = MockChain::new();
        let (service, listener) = service_with_chain(chain.clone());
        auto_approve(&service, listener);
        let account = service.create_wallet(PASSWORD).unwrap();
        chain.set_balance(&account.address, 1_000);

        let result = service
            .send_transfer(TransferRequest {
                recipient: "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin".to_string(),
                amount_sol: 1.0,
            })
            .await;
        assert!(matches!(result, Err(WalletError::InsufficientBalance(_))));
        assert!(chain.submissions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_transfer_submits() {
        let chain = MockChain::new();
        let (service, listener) = service_with_chain(chain.clone());
        auto_approve(&service, listener);
        let account = service.create_wallet(PASSWORD).unwrap();
        chain.set_balance(&account.address, 5_000_000_000);

        let signature = service
            .send_transfer(TransferRequest {
                recipient: "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin".to_string(),
                amount_sol: 1.0,
            })
            .await
            .unwrap();
        assert!(signature.starts_with("sig-"));
        assert_eq!(chain.submissions.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_submit_failure_is_reported() {
        let chain = MockChain::new();
        let (service, listener) = service_with_chain(chain.clone());
        auto_approve(&service, listener);
        service.create_wallet(PASSWORD).unwrap();
        service
            .handle("r1", "https://app.example", Operation::Connect)
            .await;
        chain.set_fail_submit(true);

        let response = service
            .handle(
                "r2",
                "https://app.example",
                Operation::SubmitTransaction {
                    transaction: SignedTransaction {
                        payload: BASE64.encode(b"payload"),
                        signature: "deadbeef".to_string(),
                    },
                },
            )
            .await;
        assert!(!response.success);
        assert!(response.error.unwrap().contains("node rejected"));
    }

    #[tokio::test]
    async fn test_history_skips_unparseable_entries() {
        let chain = MockChain::new();
        let (service, listener) = service_with_chain(chain.clone());
        auto_approve(&service, listener);
        let account = service.create_wallet(PASSWORD).unwrap();

        {
            let mut signatures = chain.signatures.lock().unwrap();
            signatures.push(json!({ "signature": "good", "blockTime": 1700000000 }));
            signatures.push(json!({ "signature": "missing-parse" }));
            signatures.push(json!({ "no_signature_field": true }));
        }
        chain.transactions.lock().unwrap().insert(
            "good".to_string(),
            json!({
                "meta": {
                    "err": null,
                    "fee": 5000,
                    "preBalances": [2_000_000_000u64],
                    "postBalances": [1_000_000_000u64],
                },
                "transaction": {
                    "message": { "accountKeys": [{ "pubkey": account.address }] }
                },
            }),
        );

        let history = service.recent_history(&account.address).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].signature, "good");
        assert_eq!(history[0].direction, TransferDirection::Sent);
        assert!((history[0].amount - 1.0).abs() < f64::EPSILON);
        assert_eq!(history[0].status, "success");
    }

    #[tokio::test]
    async fn test_lock_revokes_origins() {
        let (service, listener) = service_with_chain(MockChain::new());
        auto_approve(&service, listener);
        service.create_wallet(PASSWORD).unwrap();
        service
            .handle("r1", "https://app.example", Operation::Connect)
            .await;
        assert_eq!(service.connected_origins().len(), 1);

        service.lock().unwrap();
        assert!(service.connected_origins().is_empty());

        let response = service
            .handle("r2", "https://app.example", Operation::GetAddress)
            .await;
        assert!(!response.success);
    }

    #[tokio::test]
    async fn test_set_network_rebinds_chain() {
        let (service, _listener) = service_with_chain(MockChain::new());
        service.create_wallet(PASSWORD).unwrap();

        service.set_network(Network::Testnet).unwrap();
        assert_eq!(service.network().unwrap(), Network::Testnet);
    }

    #[tokio::test]
    async fn test_send_transfer_rejects_non_finite_amounts() {
        let chain = MockChain::new();
        let (service, _listener) = service_with_chain(chain.clone());
        let account = service.create_wallet(PASSWORD).unwrap();
        chain.set_balance(&account.address, u64::MAX);

        for amount in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, -1.0, 0.0] {
            let result = service
                .send_transfer(TransferRequest {
                    recipient: "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin".to_string(),
                    amount_sol: amount,
                })
                .await;
            assert!(matches!(result, Err(WalletError::Validation(_))));
        }
        assert!(chain.submissions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reset_deletes_wallet_and_grants() {
        let (service, listener) = service_with_chain(MockChain::new());
        auto_approve(&service, listener);
        let account = service.create_wallet(PASSWORD).unwrap();
        service
            .handle("r1", "https://app.example", Operation::Connect)
            .await;
        assert_eq!(service.display_address().unwrap(), account.address);

        service.reset().unwrap();
        assert_eq!(service.state(), WalletState::NoWallet);
        assert!(service.connected_origins().is_empty());

        let response = service
            .handle("r2", "https://app.example", Operation::Connect)
            .await;
        assert_eq!(response.error.as_deref(), Some("No wallet found"));
    }

    #[tokio::test]
    async fn test_export_gated_by_approval() {
        let (service, mut listener) = service_with_chain(MockChain::new());
        service.create_wallet(PASSWORD).unwrap();

        let approvals = service.approvals();
        tokio::spawn(async move {
            if let Some(request) = listener.recv().await {
                assert_eq!(request.kind, ApprovalKind::ExportSecret);
                let _ = approvals.resolve(&request.id, false);
            }
        });

        let result = service.export_seed_phrase("export-1").await;
        assert!(matches!(result, Err(WalletError::UserRejected)));
    }

    #[tokio::test]
    async fn test_service_handle_dispatches() {
        let (service, listener) = service_with_chain(MockChain::new());
        auto_approve(&service, listener);
        let account = service.create_wallet(PASSWORD).unwrap();

        let handle = ServiceHandle::spawn(service);
        let response = handle
            .call("r1".into(), "https://app.example".into(), Operation::Connect)
            .await;
        assert!(response.success);
        assert_eq!(
            response.result.unwrap()["address"].as_str().unwrap(),
            account.address
        );
    }
}
