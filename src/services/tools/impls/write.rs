//! Write Tool Implementation
//!
//! Creates or overwrites a file, gated by the permission broker and guarded
//! by the optimistic concurrency check: an existing file must have been
//! read (or written) by a tool after its last on-disk modification, so
//! edits the user made outside the assistant are never silently clobbered.

use std::collections::HashMap;
use std::io::ErrorKind;

use async_trait::async_trait;
use serde::Deserialize;

use crate::services::diff::generate_diff;
use crate::services::llm::types::{ParameterSchema, ToolCall};
use crate::services::permission_gate::PermissionRequest;
use crate::services::tools::executor::ToolResponse;
use crate::services::tools::impls::mutation::finalize_mutation;
use crate::services::tools::trait_def::{Tool, ToolExecutionContext};
use crate::utils::error::AppError;
use crate::utils::paths::{display_path, permission_scope, resolve_path};

pub const WRITE_TOOL_NAME: &str = "write";

#[derive(Debug, Deserialize)]
struct WriteParams {
    #[serde(default)]
    file_path: String,
    #[serde(default)]
    content: String,
}

/// Write file tool — creates or overwrites a file with full gating:
/// conflict detection, permission prompt, history versioning, diagnostics.
pub struct WriteTool;

impl WriteTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WriteTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WriteTool {
    fn name(&self) -> &str {
        WRITE_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Write content to a file. Creates the file if it doesn't exist, overwrites if it does. \
         Creates parent directories as needed. Existing files must be read with the view tool \
         first; the write is rejected if the file changed on disk since it was last read."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut properties = HashMap::new();
        properties.insert(
            "file_path".to_string(),
            ParameterSchema::string(Some(
                "The path to the file to write (absolute or relative to the working directory)",
            )),
        );
        properties.insert(
            "content".to_string(),
            ParameterSchema::string(Some("The content to write to the file")),
        );
        ParameterSchema::object(
            Some("Write file parameters"),
            properties,
            vec!["file_path".to_string(), "content".to_string()],
        )
    }

    async fn execute(
        &self,
        ctx: &ToolExecutionContext,
        call: &ToolCall,
    ) -> crate::utils::error::AppResult<ToolResponse> {
        let params: WriteParams = match serde_json::from_value(call.arguments.clone()) {
            Ok(p) => p,
            Err(e) => {
                return Ok(ToolResponse::error(format!("error parsing parameters: {}", e)))
            }
        };

        if params.file_path.is_empty() {
            return Ok(ToolResponse::error("file_path is required"));
        }
        if params.content.is_empty() {
            return Ok(ToolResponse::error("content is required"));
        }

        let path = resolve_path(&params.file_path, &ctx.working_dir);

        let metadata = match std::fs::metadata(&path) {
            Ok(m) => Some(m),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        // Empty only when the file does not exist; an unreadable existing
        // file must never be mistaken for a missing one, or its real
        // content would be lost from the diff, the prompt, and the
        // recorded pre-image.
        let mut old_content = String::new();

        if let Some(metadata) = &metadata {
            if metadata.is_dir() {
                return Ok(ToolResponse::error(format!(
                    "Path is a directory, not a file: {}",
                    path.display()
                )));
            }

            let mod_time = metadata.modified()?;
            let last_read = ctx.file_times.last_read(&path);
            if mod_time > last_read {
                return Ok(ToolResponse::error(format!(
                    "File {} has been modified since it was last read.\n\
                     Last modification: {}\nLast read: {}\n\n\
                     Please read the file again before modifying it.",
                    path.display(),
                    chrono::DateTime::<chrono::Utc>::from(mod_time).to_rfc3339(),
                    chrono::DateTime::<chrono::Utc>::from(last_read).to_rfc3339(),
                )));
            }

            old_content = match std::fs::read_to_string(&path) {
                Ok(c) => c,
                Err(e) if e.kind() == ErrorKind::InvalidData => {
                    return Ok(ToolResponse::error(format!(
                        "Cannot overwrite binary file: {}",
                        path.display()
                    )));
                }
                Err(e) => return Err(e.into()),
            };

            if old_content == params.content {
                return Ok(ToolResponse::error(format!(
                    "File {} already contains the exact content. No changes made.",
                    path.display()
                )));
            }
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let (session_id, _message_id) = ctx.require_session()?;

        let (diff, additions, removals) = generate_diff(
            &old_content,
            &params.content,
            &display_path(&path, &ctx.working_dir),
        );

        let approved = ctx
            .permissions
            .request(
                PermissionRequest {
                    session_id: session_id.to_string(),
                    tool_call_id: call.id.clone(),
                    tool_name: WRITE_TOOL_NAME.to_string(),
                    action: "write".to_string(),
                    path: permission_scope(&path, &ctx.working_dir),
                    description: format!("Create file {}", path.display()),
                    params: serde_json::json!({
                        "file_path": path.to_string_lossy(),
                        "old_content": old_content,
                        "new_content": params.content,
                    }),
                },
                &ctx.cancellation_token,
            )
            .await;
        if !approved {
            return Err(AppError::PermissionDenied);
        }

        // Cancelled while the prompt was open: abort with no filesystem
        // effect. Cancellation after this point is ignored; the write lands
        // and history/diagnostics run best-effort.
        if ctx.cancellation_token.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        std::fs::write(&path, &params.content)?;

        let diagnostics =
            finalize_mutation(ctx, session_id, &path, &old_content, &params.content).await?;

        let mut content = format!(
            "<result>\nFile successfully written: {}\n</result>",
            path.display()
        );
        content.push_str(&diagnostics);

        Ok(ToolResponse::text(content).with_metadata(serde_json::json!({
            "diff": diff,
            "additions": additions,
            "removals": removals,
        })))
    }
}
