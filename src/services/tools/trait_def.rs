//! Tool Trait and Registry
//!
//! Defines the unified `Tool` trait interface and `ToolRegistry` for
//! dynamic tool registration, lookup, and definition export to the LLM
//! dispatcher. Tools receive everything through `ToolExecutionContext`
//! so implementations never depend on executor-private state.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::services::file_tracker::FileTimeTracker;
use crate::services::history::FileHistoryService;
use crate::services::llm::types::{ParameterSchema, ToolCall, ToolDefinition};
use crate::services::lsp::LspLiaison;
use crate::services::permission_gate::PermissionGate;
use crate::services::tools::executor::ToolResponse;
use crate::utils::error::{AppError, AppResult};

/// Context provided to each tool during execution.
///
/// Session and message ids arrive from the chat loop per call and may be
/// absent for out-of-band invocations; tools that record history must call
/// `require_session` to validate them at the boundary.
pub struct ToolExecutionContext {
    pub session_id: Option<String>,
    pub message_id: Option<String>,
    /// Project root; relative tool paths resolve against it.
    pub working_dir: PathBuf,
    /// Cancellation token for cooperative cancellation
    pub cancellation_token: CancellationToken,

    pub file_times: Arc<FileTimeTracker>,
    pub history: Arc<dyn FileHistoryService>,
    pub permissions: Arc<PermissionGate>,
    pub lsp: Arc<LspLiaison>,
}

impl ToolExecutionContext {
    /// Session and message ids, or a `MissingContext` error.
    pub fn require_session(&self) -> AppResult<(&str, &str)> {
        match (self.session_id.as_deref(), self.message_id.as_deref()) {
            (Some(session), Some(message)) if !session.is_empty() && !message.is_empty() => {
                Ok((session, message))
            }
            _ => Err(AppError::missing_context(
                "session_id and message_id are required",
            )),
        }
    }
}

/// Unified tool interface.
///
/// Argument problems and benign conflicts come back as
/// `Ok(ToolResponse::error(..))`; infrastructural failures and permission
/// denials are `Err`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name of this tool (e.g., "view", "write")
    fn name(&self) -> &str;

    /// Human-readable description of what this tool does
    fn description(&self) -> &str;

    /// JSON schema describing the tool's input parameters
    fn parameters_schema(&self) -> ParameterSchema;

    /// Execute the tool with the given context and call.
    async fn execute(&self, ctx: &ToolExecutionContext, call: &ToolCall) -> AppResult<ToolResponse>;
}

/// Registry of available tools.
///
/// Provides O(1) lookup by name and definition export in registration
/// order. Nothing here executes anything.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    /// Insertion order for deterministic iteration
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a tool. If a tool with the same name already exists, it is replaced.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if !self.tools.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.tools.insert(name, tool);
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// All tool definitions, suitable for sending to LLM providers.
    /// Returned in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.parameters_schema(),
            })
            .collect()
    }

    /// All registered tool names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
