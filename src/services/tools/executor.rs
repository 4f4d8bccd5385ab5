//! Tool Executor
//!
//! Executes tool calls requested by LLM providers: selects the tool from
//! the registry, builds the per-call execution context, and runs it.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::services::file_tracker::FileTimeTracker;
use crate::services::history::FileHistoryService;
use crate::services::llm::types::{ToolCall, ToolDefinition};
use crate::services::lsp::LspLiaison;
use crate::services::permission_gate::PermissionGate;
use crate::services::tools::impls::{EditTool, ViewTool, WriteTool};
use crate::services::tools::trait_def::{Tool, ToolExecutionContext, ToolRegistry};
use crate::utils::error::AppResult;

/// Result of a tool execution as sent back to the model.
///
/// `is_error: true` marks a content error (bad arguments, benign
/// conflicts); infrastructural failures never reach this envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponse {
    pub content: String,
    pub is_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl ToolResponse {
    /// Create a successful text response
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
            metadata: None,
        }
    }

    /// Create a content-error response
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
            metadata: None,
        }
    }

    /// Attach response metadata (e.g. diff statistics)
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Request-scoped values handed over by the chat loop for one call.
#[derive(Debug, Clone, Default)]
pub struct CallScope {
    pub session_id: Option<String>,
    pub message_id: Option<String>,
    pub cancellation_token: CancellationToken,
}

/// Per-invocation orchestrator over the registered tools.
pub struct ToolExecutor {
    registry: ToolRegistry,
    working_dir: PathBuf,
    file_times: Arc<FileTimeTracker>,
    history: Arc<dyn FileHistoryService>,
    permissions: Arc<PermissionGate>,
    lsp: Arc<LspLiaison>,
}

impl ToolExecutor {
    /// Create an executor with the built-in file tools registered.
    pub fn new(
        working_dir: impl Into<PathBuf>,
        file_times: Arc<FileTimeTracker>,
        history: Arc<dyn FileHistoryService>,
        permissions: Arc<PermissionGate>,
        lsp: Arc<LspLiaison>,
    ) -> Self {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(ViewTool::new()));
        registry.register(Arc::new(WriteTool::new()));
        registry.register(Arc::new(EditTool::new()));

        Self {
            registry,
            working_dir: working_dir.into(),
            file_times,
            history,
            permissions,
            lsp,
        }
    }

    /// Register an additional tool.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.registry.register(tool);
    }

    /// Tool definitions for the LLM dispatcher, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }

    /// Execute one tool call within the given scope.
    ///
    /// Unknown tool names are content errors: the model picked a tool we
    /// never offered, and should be told so rather than aborting the turn.
    pub async fn execute(&self, scope: &CallScope, call: &ToolCall) -> AppResult<ToolResponse> {
        let Some(tool) = self.registry.get(&call.name) else {
            return Ok(ToolResponse::error(format!("Unknown tool: {}", call.name)));
        };

        debug!(tool = %call.name, call_id = %call.id, "executing tool");

        let ctx = ToolExecutionContext {
            session_id: scope.session_id.clone(),
            message_id: scope.message_id.clone(),
            working_dir: self.working_dir.clone(),
            cancellation_token: scope.cancellation_token.clone(),
            file_times: Arc::clone(&self.file_times),
            history: Arc::clone(&self.history),
            permissions: Arc::clone(&self.permissions),
            lsp: Arc::clone(&self.lsp),
        };

        tool.execute(&ctx, call).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::history::SqliteFileHistory;
    use tempfile::TempDir;

    fn make_executor(dir: &TempDir) -> ToolExecutor {
        let history =
            Arc::new(SqliteFileHistory::new(&dir.path().join("state/history.db")).unwrap());
        ToolExecutor::new(
            dir.path(),
            Arc::new(FileTimeTracker::new()),
            history,
            Arc::new(PermissionGate::new()),
            Arc::new(LspLiaison::new()),
        )
    }

    #[test]
    fn test_builtin_tools_registered() {
        let dir = TempDir::new().unwrap();
        let executor = make_executor(&dir);
        let names: Vec<String> = executor.definitions().iter().map(|d| d.name.clone()).collect();
        assert_eq!(names, vec!["view", "write", "edit"]);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_content_error() {
        let dir = TempDir::new().unwrap();
        let executor = make_executor(&dir);

        let call = ToolCall {
            id: "tc1".to_string(),
            name: "teleport".to_string(),
            arguments: serde_json::json!({}),
        };
        let response = executor.execute(&CallScope::default(), &call).await.unwrap();
        assert!(response.is_error);
        assert!(response.content.contains("Unknown tool: teleport"));
    }

    #[tokio::test]
    async fn test_scope_threads_session_ids_into_tools() {
        let dir = TempDir::new().unwrap();
        let executor = make_executor(&dir);

        // write requires session context; with none supplied it must fail
        // with MissingContext, proving the scope reached the tool.
        let call = ToolCall {
            id: "tc1".to_string(),
            name: "write".to_string(),
            arguments: serde_json::json!({"file_path": "b.txt", "content": "hello"}),
        };
        let err = executor.execute(&CallScope::default(), &call).await.unwrap_err();
        assert!(matches!(err, crate::utils::error::AppError::MissingContext(_)));
    }

    #[test]
    fn test_response_metadata_serialization() {
        let response = ToolResponse::text("ok")
            .with_metadata(serde_json::json!({"additions": 1, "removals": 0}));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["metadata"]["additions"], 1);

        let bare = serde_json::to_value(ToolResponse::error("bad")).unwrap();
        assert!(bare.get("metadata").is_none());
        assert_eq!(bare["is_error"], true);
    }
}
