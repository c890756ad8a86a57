//! User approval gate
//!
//! Privileged operations (connecting an origin, signing, exporting
//! secrets) block until the user resolves them. Requests queue in FIFO
//! order, the queue is bounded, and a rejection surfaces as
//! `UserRejected` to the caller.

use crate::shared::constants::APPROVAL_QUEUE_LIMIT;
use crate::shared::error::WalletError;
use crate::shared::types::WalletResult;
use crate::shared::utils::current_timestamp;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::{mpsc, oneshot};

/// What the user is being asked to approve
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalKind {
    Connect,
    SignTransaction { summary: String },
    ExportSecret,
}

/// A pending approval as shown to the user
#[derive(Debug, Clone)]
pub struct ApprovalRequest {
    pub id: String,
    pub origin: String,
    pub kind: ApprovalKind,
    pub requested_at: i64,
}

struct Pending {
    request: ApprovalRequest,
    decision: oneshot::Sender<bool>,
}

/// FIFO queue of pending approvals, resolved out of band by the user
pub struct ApprovalCoordinator {
    queue: Mutex<VecDeque<Pending>>,
    notify: mpsc::UnboundedSender<ApprovalRequest>,
}

impl ApprovalCoordinator {
    /// Returns the coordinator and the stream of newly queued requests
    /// the approval surface listens on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ApprovalRequest>) {
        let (notify, listener) = mpsc::unbounded_channel();
        (
            Self {
                queue: Mutex::new(VecDeque::new()),
                notify,
            },
            listener,
        )
    }

    /// Queue a request and wait for the user's decision.
    /// Rejection maps to `UserRejected`.
    pub async fn request(
        &self,
        id: String,
        origin: String,
        kind: ApprovalKind,
    ) -> WalletResult<()> {
        let (tx, rx) = oneshot::channel();
        let request = ApprovalRequest {
            id,
            origin,
            kind,
            requested_at: current_timestamp(),
        };

        {
            let mut queue = self
                .queue
                .lock()
                .map_err(|_| WalletError::internal("Approval queue lock poisoned"))?;
            if queue.len() >= APPROVAL_QUEUE_LIMIT {
                return Err(WalletError::validation("Too many pending approvals"));
            }
            queue.push_back(Pending {
                request: request.clone(),
                decision: tx,
            });
        }
        let _ = self.notify.send(request);

        match rx.await {
            Ok(true) => Ok(()),
            Ok(false) => Err(WalletError::UserRejected),
            // Resolver dropped without deciding, treat as rejection
            Err(_) => Err(WalletError::UserRejected),
        }
    }

    /// Snapshot of pending requests in arrival order
    pub fn pending(&self) -> Vec<ApprovalRequest> {
        self.queue
            .lock()
            .map(|q| q.iter().map(|p| p.request.clone()).collect())
            .unwrap_or_default()
    }

    /// Grant the request with the given id
    pub fn approve(&self, id: &str) -> WalletResult<()> {
        self.resolve(id, true)
    }

    /// Deny the request; the waiter sees `UserRejected`
    pub fn reject(&self, id: &str) -> WalletResult<()> {
        self.resolve(id, false)
    }

    /// Resolve the request with the given id
    pub fn resolve(&self, id: &str, approved: bool) -> WalletResult<()> {
        let pending = {
            let mut queue = self
                .queue
                .lock()
                .map_err(|_| WalletError::internal("Approval queue lock poisoned"))?;
            let pos = queue
                .iter()
                .position(|p| p.request.id == id)
                .ok_or_else(|| WalletError::validation(format!("No pending approval: {}", id)))?;
            queue
                .remove(pos)
                .ok_or_else(|| WalletError::internal("Approval queue position vanished"))?
        };
        let _ = pending.decision.send(approved);
        Ok(())
    }
}
