//! Quill - Tool Execution Core
//!
//! This library provides the tool-execution substrate for the quill terminal
//! AI coding assistant. It includes:
//! - The tool registry and per-call executor driven by the chat loop
//! - The interactive permission gate with session-scoped grants
//! - Session-scoped file version history (SQLite-backed by default)
//! - Language-server diagnostics collection after each mutation
//! - Shared services: diff generation, file read/write time tracking

pub mod services;
pub mod storage;
pub mod utils;

// Re-export commonly used items
pub use services::diff::generate_diff;
pub use services::file_tracker::FileTimeTracker;
pub use services::history::{FileHistoryService, FileVersion};
pub use services::llm::types::{ParameterSchema, ToolCall, ToolDefinition};
pub use services::lsp::{FileWatchRegistrationHandler, LspClient, LspLiaison};
pub use services::permission_gate::{PermissionDecision, PermissionGate, PermissionRequest};
pub use services::tools::executor::{CallScope, ToolExecutor, ToolResponse};
pub use services::tools::trait_def::{Tool, ToolExecutionContext, ToolRegistry};
pub use storage::history::SqliteFileHistory;
pub use utils::error::{AppError, AppResult};
