//! Shared fixtures for tool tests.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::services::file_tracker::FileTimeTracker;
use crate::services::lsp::LspLiaison;
use crate::services::permission_gate::PermissionGate;
use crate::services::tools::trait_def::ToolExecutionContext;
use crate::storage::history::SqliteFileHistory;

pub(crate) const TEST_SESSION: &str = "test-session";

/// Build a context with real services rooted in `dir`. The permission gate
/// starts with no UI attached; call `approve_all` for tests that mutate.
pub(crate) fn make_test_context(dir: &Path) -> ToolExecutionContext {
    let history = Arc::new(SqliteFileHistory::new(&dir.join(".quill/history.db")).unwrap());
    ToolExecutionContext {
        session_id: Some(TEST_SESSION.to_string()),
        message_id: Some("test-message".to_string()),
        working_dir: dir.to_path_buf(),
        cancellation_token: CancellationToken::new(),
        file_times: Arc::new(FileTimeTracker::new()),
        history,
        permissions: Arc::new(PermissionGate::new()),
        lsp: Arc::new(LspLiaison::new()),
    }
}

pub(crate) async fn approve_all(ctx: &ToolExecutionContext) {
    ctx.permissions.auto_approve_session(TEST_SESSION).await;
}
