//! Permission Gate Service
//!
//! Central gate that every side-effectful tool operation passes through
//! before touching the filesystem. A request either short-circuits on a
//! stored session grant or suspends the calling task until the user
//! resolves the prompt in the UI. Prompts are strictly serialized: at most
//! one is shown at a time, and queued requests are served in arrival order.
//!
//! Thread-safe: all fields use interior mutability. Designed to be wrapped
//! in `Arc` and cloned into concurrent tool calls.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// A permission prompt as presented to the UI.
///
/// `path` is the working-directory prefix when the target lies inside the
/// project (see `utils::paths::permission_scope`), so an allow-session
/// decision covers the whole project rather than a single file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionRequest {
    pub session_id: String,
    /// Correlation key; the UI echoes it back through `resolve`.
    pub tool_call_id: String,
    pub tool_name: String,
    pub action: String,
    pub path: String,
    pub description: String,
    pub params: serde_json::Value,
}

/// The user's answer to a permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionDecision {
    Deny,
    AllowOnce,
    /// Allow, and remember the `(path, action)` scope for the session.
    AllowSession,
}

/// A remembered allow-session decision.
#[derive(Debug, Clone)]
struct SessionGrant {
    path: String,
    action: String,
}

impl SessionGrant {
    fn covers(&self, req: &PermissionRequest) -> bool {
        // Path-component prefix match: a grant for /w covers /w/src/a.rs
        // but a grant for /etc/foo.txt must not cover /etc/foo.txt2.
        req.action == self.action && Path::new(&req.path).starts_with(Path::new(&self.path))
    }
}

/// Interactive allow/deny gate with session-scoped grant memoization.
pub struct PermissionGate {
    /// Per-session allow-session grants.
    session_grants: RwLock<HashMap<String, Vec<SessionGrant>>>,
    /// Sessions where every request is approved without prompting.
    auto_approved: RwLock<HashSet<String>>,
    /// Pending prompts awaiting a UI response, keyed by tool call id.
    pending: Mutex<HashMap<String, oneshot::Sender<PermissionDecision>>>,
    /// Serializes prompt presentation. tokio's Mutex queues waiters fairly,
    /// which gives the required FIFO ordering across concurrent requests.
    prompt_lock: Mutex<()>,
    /// Event sender connected to the UI. Set once the UI is attached.
    event_tx: RwLock<Option<mpsc::Sender<PermissionRequest>>>,
}

impl PermissionGate {
    pub fn new() -> Self {
        Self {
            session_grants: RwLock::new(HashMap::new()),
            auto_approved: RwLock::new(HashSet::new()),
            pending: Mutex::new(HashMap::new()),
            prompt_lock: Mutex::new(()),
            event_tx: RwLock::new(None),
        }
    }

    /// Connect the event sender for streaming permission prompts to the UI.
    pub async fn set_event_tx(&self, tx: mpsc::Sender<PermissionRequest>) {
        let mut guard = self.event_tx.write().await;
        *guard = Some(tx);
    }

    /// Clear the event sender (e.g., when the UI detaches).
    pub async fn clear_event_tx(&self) {
        let mut guard = self.event_tx.write().await;
        *guard = None;
    }

    /// Approve everything in this session without prompting.
    pub async fn auto_approve_session(&self, session_id: &str) {
        let mut sessions = self.auto_approved.write().await;
        sessions.insert(session_id.to_string());
    }

    /// Core permission check.
    ///
    /// - An auto-approved session or a matching allow-session grant
    ///   returns `true` immediately.
    /// - Otherwise the request is queued behind any prompt already on
    ///   screen, emitted to the UI, and the task parks until `resolve`
    ///   is called for this tool call id.
    /// - Cancellation of `cancel` while waiting resolves as denied.
    /// - No UI channel connected resolves as denied.
    pub async fn request(&self, req: PermissionRequest, cancel: &CancellationToken) -> bool {
        if self.auto_approved.read().await.contains(&req.session_id) {
            return true;
        }
        if self.granted(&req).await {
            return true;
        }

        let (resp_tx, resp_rx) = oneshot::channel::<PermissionDecision>();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(req.tool_call_id.clone(), resp_tx);
        }

        // Queue behind the prompt currently on screen, if any.
        let _prompt = self.prompt_lock.lock().await;

        // A prompt answered while we were queued may have granted our scope.
        if self.granted(&req).await {
            self.pending.lock().await.remove(&req.tool_call_id);
            return true;
        }

        {
            let tx_guard = self.event_tx.read().await;
            let Some(tx) = tx_guard.as_ref() else {
                warn!(tool = %req.tool_name, "permission request with no UI attached, denying");
                self.pending.lock().await.remove(&req.tool_call_id);
                return false;
            };
            if tx.send(req.clone()).await.is_err() {
                warn!(tool = %req.tool_name, "permission channel closed, denying");
                self.pending.lock().await.remove(&req.tool_call_id);
                return false;
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(call = %req.tool_call_id, "permission request cancelled");
                self.pending.lock().await.remove(&req.tool_call_id);
                false
            }
            resp = resp_rx => match resp {
                Ok(decision) => {
                    if decision == PermissionDecision::AllowSession {
                        let mut grants = self.session_grants.write().await;
                        grants.entry(req.session_id.clone()).or_default().push(SessionGrant {
                            path: req.path.clone(),
                            action: req.action.clone(),
                        });
                    }
                    decision != PermissionDecision::Deny
                }
                // Sender dropped without an answer
                Err(_) => false,
            }
        }
    }

    /// Resolve a pending prompt (called by the UI event handler).
    pub async fn resolve(&self, tool_call_id: &str, decision: PermissionDecision) {
        let mut pending = self.pending.lock().await;
        if let Some(tx) = pending.remove(tool_call_id) {
            let _ = tx.send(decision);
        }
    }

    /// Drop all permission state for a session.
    pub async fn cleanup_session(&self, session_id: &str) {
        self.session_grants.write().await.remove(session_id);
        self.auto_approved.write().await.remove(session_id);
    }

    async fn granted(&self, req: &PermissionRequest) -> bool {
        let grants = self.session_grants.read().await;
        grants
            .get(&req.session_id)
            .map(|list| list.iter().any(|g| g.covers(req)))
            .unwrap_or(false)
    }
}

impl Default for PermissionGate {
    fn default() -> Self {
        Self::new()
    }
}
