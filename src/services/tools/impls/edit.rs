//! Edit Tool Implementation
//!
//! String replacement in files with uniqueness checking, running on the
//! same gating skeleton as the write tool: staleness check, permission
//! prompt, history versioning, and diagnostics collection.

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

pub const EDIT_TOOL_NAME: &str = "edit";

#[derive(Debug, Deserialize)]
struct EditParams {
    #[serde(default)]
    file_path: String,
    #[serde(default)]
    old_string: String,
    #[serde(default)]
    new_string: String,
    #[serde(default)]
    replace_all: bool,
}

/// Edit file tool — gated string replacement.
pub struct EditTool;

impl EditTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EditTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for EditTool {
    fn name(&self) -> &str {
        EDIT_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Perform string replacement in a file. The old_string must be unique in the file unless \
         replace_all is true. The file must have been read with the view tool after its last \
         modification."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut properties = HashMap::new();
        properties.insert(
            "file_path".to_string(),
            ParameterSchema::string(Some(
                "The path to the file to edit (absolute or relative to the working directory)",
            )),
        );
        properties.insert(
            "old_string".to_string(),
            ParameterSchema::string(Some("The exact string to replace")),
        );
        properties.insert(
            "new_string".to_string(),
            ParameterSchema::string(Some("The string to replace it with")),
        );
        properties.insert(
            "replace_all".to_string(),
            ParameterSchema::boolean(Some("Replace all occurrences (default: false)")),
        );
        ParameterSchema::object(
            Some("Edit file parameters"),
            properties,
            vec![
                "file_path".to_string(),
                "old_string".to_string(),
                "new_string".to_string(),
            ],
        )
    }

    async fn execute(
        &self,
        ctx: &ToolExecutionContext,
        call: &ToolCall,
    ) -> crate::utils::error::AppResult<ToolResponse> {
        let params: EditParams = match serde_json::from_value(call.arguments.clone()) {
            Ok(p) => p,
            Err(e) => {
                return Ok(ToolResponse::error(format!("error parsing parameters: {}", e)))
            }
        };

        if params.file_path.is_empty() {
            return Ok(ToolResponse::error("file_path is required"));
        }
        if params.old_string.is_empty() {
            return Ok(ToolResponse::error("old_string is required"));
        }
        if params.old_string == params.new_string {
            return Ok(ToolResponse::error(
                "old_string and new_string must be different",
            ));
        }

        let path = resolve_path(&params.file_path, &ctx.working_dir);

        let metadata = match std::fs::metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(ToolResponse::error(format!(
                    "File not found: {}",
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

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

        let old_content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                return Ok(ToolResponse::error(format!(
                    "Cannot edit binary file: {}",
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let occurrences = old_content.matches(&params.old_string).count();
        if occurrences == 0 {
            return Ok(ToolResponse::error(
                "old_string not found in file. It must match the file contents exactly.",
            ));
        }
        if !params.replace_all && occurrences > 1 {
            return Ok(ToolResponse::error(format!(
                "old_string appears {} times in the file. Either provide more context to make it \
                 unique, or set replace_all to true.",
                occurrences
            )));
        }

        let new_content = if params.replace_all {
            old_content.replace(&params.old_string, &params.new_string)
        } else {
            old_content.replacen(&params.old_string, &params.new_string, 1)
        };

        let (session_id, _message_id) = ctx.require_session()?;

        let (diff, additions, removals) = generate_diff(
            &old_content,
            &new_content,
            &display_path(&path, &ctx.working_dir),
        );

        let approved = ctx
            .permissions
            .request(
                PermissionRequest {
                    session_id: session_id.to_string(),
                    tool_call_id: call.id.clone(),
                    tool_name: EDIT_TOOL_NAME.to_string(),
                    // Same action as write, so a session grant covers both
                    // mutating tools on the project prefix.
                    action: "write".to_string(),
                    path: permission_scope(&path, &ctx.working_dir),
                    description: format!("Edit file {}", path.display()),
                    params: serde_json::json!({
                        "file_path": path.to_string_lossy(),
                        "old_content": old_content,
                        "new_content": new_content,
                    }),
                },
                &ctx.cancellation_token,
            )
            .await;
        if !approved {
            return Err(AppError::PermissionDenied);
        }

        if ctx.cancellation_token.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        std::fs::write(&path, &new_content)?;

        let diagnostics =
            finalize_mutation(ctx, session_id, &path, &old_content, &new_content).await?;

        let mut content = format!(
            "<result>\nContent replaced in file: {}\n</result>",
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::tools::impls::test_helpers::{approve_all, make_test_context, TEST_SESSION};
    use tempfile::TempDir;

    fn edit_call(args: serde_json::Value) -> ToolCall {
        ToolCall {
            id: "tc1".to_string(),
            name: EDIT_TOOL_NAME.to_string(),
            arguments: args,
        }
    }

    #[tokio::test]
    async fn test_edit_basic_replacement() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "line 1\nline 2\nline 3\n").unwrap();

        let ctx = make_test_context(dir.path());
        approve_all(&ctx).await;
        ctx.file_times.record_read(&path);

        let tool = EditTool::new();
        let response = tool
            .execute(
                &ctx,
                &edit_call(serde_json::json!({
                    "file_path": "a.txt",
                    "old_string": "line 2",
                    "new_string": "changed line 2"
                })),
            )
            .await
            .unwrap();

        assert!(!response.is_error, "{}", response.content);
        assert!(response.content.contains("Content replaced"));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("changed line 2"));

        let metadata = response.metadata.unwrap();
        assert_eq!(metadata["additions"], 1);
        assert_eq!(metadata["removals"], 1);
    }

    #[tokio::test]
    async fn test_edit_non_unique_without_replace_all() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dup.txt");
        std::fs::write(&path, "foo foo foo").unwrap();

        let ctx = make_test_context(dir.path());
        approve_all(&ctx).await;
        ctx.file_times.record_read(&path);

        let tool = EditTool::new();
        let response = tool
            .execute(
                &ctx,
                &edit_call(serde_json::json!({
                    "file_path": "dup.txt",
                    "old_string": "foo",
                    "new_string": "bar"
                })),
            )
            .await
            .unwrap();

        assert!(response.is_error);
        assert!(response.content.contains("appears 3 times"));
        // No side effects on a content error.
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "foo foo foo");
        assert!(ctx
            .history
            .list_versions(TEST_SESSION, &path.to_string_lossy())
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_edit_replace_all() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dup.txt");
        std::fs::write(&path, "foo foo foo").unwrap();

        let ctx = make_test_context(dir.path());
        approve_all(&ctx).await;
        ctx.file_times.record_read(&path);

        let tool = EditTool::new();
        let response = tool
            .execute(
                &ctx,
                &edit_call(serde_json::json!({
                    "file_path": "dup.txt",
                    "old_string": "foo",
                    "new_string": "bar",
                    "replace_all": true
                })),
            )
            .await
            .unwrap();

        assert!(!response.is_error);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "bar bar bar");
    }

    #[tokio::test]
    async fn test_edit_stale_file_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "content").unwrap();

        let ctx = make_test_context(dir.path());
        approve_all(&ctx).await;
        // No read recorded: the file is stale by definition.

        let tool = EditTool::new();
        let response = tool
            .execute(
                &ctx,
                &edit_call(serde_json::json!({
                    "file_path": "a.txt",
                    "old_string": "content",
                    "new_string": "other"
                })),
            )
            .await
            .unwrap();

        assert!(response.is_error);
        assert!(response.content.contains("modified since"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "content");
    }

    #[tokio::test]
    async fn test_edit_missing_file() {
        let dir = TempDir::new().unwrap();
        let ctx = make_test_context(dir.path());

        let tool = EditTool::new();
        let response = tool
            .execute(
                &ctx,
                &edit_call(serde_json::json!({
                    "file_path": "nope.txt",
                    "old_string": "a",
                    "new_string": "b"
                })),
            )
            .await
            .unwrap();
        assert!(response.is_error);
        assert!(response.content.contains("File not found"));
    }

    #[tokio::test]
    async fn test_edit_old_string_not_found() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "hello").unwrap();

        let ctx = make_test_context(dir.path());
        ctx.file_times.record_read(&path);

        let tool = EditTool::new();
        let response = tool
            .execute(
                &ctx,
                &edit_call(serde_json::json!({
                    "file_path": "a.txt",
                    "old_string": "absent",
                    "new_string": "other"
                })),
            )
            .await
            .unwrap();
        assert!(response.is_error);
        assert!(response.content.contains("not found in file"));
    }

    #[tokio::test]
    async fn test_edit_identical_strings_rejected() {
        let dir = TempDir::new().unwrap();
        let ctx = make_test_context(dir.path());

        let tool = EditTool::new();
        let response = tool
            .execute(
                &ctx,
                &edit_call(serde_json::json!({
                    "file_path": "a.txt",
                    "old_string": "same",
                    "new_string": "same"
                })),
            )
            .await
            .unwrap();
        assert!(response.is_error);
        assert!(response.content.contains("must be different"));
    }

    #[tokio::test]
    async fn test_edit_records_history_versions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "before edit").unwrap();

        let ctx = make_test_context(dir.path());
        approve_all(&ctx).await;
        ctx.file_times.record_read(&path);

        let tool = EditTool::new();
        tool.execute(
            &ctx,
            &edit_call(serde_json::json!({
                "file_path": "a.txt",
                "old_string": "before",
                "new_string": "after"
            })),
        )
        .await
        .unwrap();

        let versions: Vec<String> = ctx
            .history
            .list_versions(TEST_SESSION, &path.to_string_lossy())
            .unwrap()
            .into_iter()
            .map(|v| v.content)
            .collect();
        assert_eq!(versions, vec!["before edit", "after edit"]);
    }

    #[tokio::test]
    async fn test_edit_denied_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "guarded").unwrap();

        let ctx = make_test_context(dir.path());
        ctx.file_times.record_read(&path);
        // No UI channel attached: the gate denies.

        let tool = EditTool::new();
        let err = tool
            .execute(
                &ctx,
                &edit_call(serde_json::json!({
                    "file_path": "a.txt",
                    "old_string": "guarded",
                    "new_string": "changed"
                })),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::PermissionDenied));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "guarded");
        assert!(ctx
            .history
            .list_versions(TEST_SESSION, &path.to_string_lossy())
            .unwrap()
            .is_empty());
    }
}
