//! Server-to-Client Request Handling
//!
//! The wire layer decodes server requests and calls into these handlers.
//! Only the small surface we actually serve is implemented:
//! `workspace/configuration` (empty per-scope config),
//! `workspace/applyEdit` (apply to the filesystem), and
//! `client/registerCapability` (on `LspLiaison`).

use std::fs;
use std::path::Path;

use lsp_types::{
    ApplyWorkspaceEditParams, ApplyWorkspaceEditResponse, DocumentChanges, Position, TextEdit,
    WorkspaceEdit,
};
use serde_json::Value;
use tracing::warn;

use super::client::uri_to_path;
use crate::utils::error::{AppError, AppResult};

/// `workspace/configuration`: reply with an empty configuration per
/// requested scope.
pub fn handle_workspace_configuration(params: &Value) -> Value {
    let scopes = params
        .get("items")
        .and_then(|items| items.as_array())
        .map(|items| items.len())
        .unwrap_or(1);
    Value::Array(vec![serde_json::json!({}); scopes])
}

/// `workspace/applyEdit`: apply the proposed edit to the filesystem and
/// report the outcome.
pub fn handle_apply_edit(params: &Value) -> ApplyWorkspaceEditResponse {
    let edit_params: ApplyWorkspaceEditParams = match serde_json::from_value(params.clone()) {
        Ok(p) => p,
        Err(e) => {
            return ApplyWorkspaceEditResponse {
                applied: false,
                failure_reason: Some(format!("invalid applyEdit params: {}", e)),
                failed_change: None,
            }
        }
    };

    match apply_workspace_edit(&edit_params.edit) {
        Ok(()) => ApplyWorkspaceEditResponse {
            applied: true,
            failure_reason: None,
            failed_change: None,
        },
        Err(e) => {
            warn!(error = %e, "failed to apply workspace edit");
            ApplyWorkspaceEditResponse {
                applied: false,
                failure_reason: Some(e.to_string()),
                failed_change: None,
            }
        }
    }
}

/// Apply a workspace edit to the filesystem.
pub fn apply_workspace_edit(edit: &WorkspaceEdit) -> AppResult<()> {
    if let Some(changes) = &edit.changes {
        for (uri, edits) in changes {
            apply_text_edits(&uri_to_path(uri.as_str()), edits)?;
        }
    }

    if let Some(document_changes) = &edit.document_changes {
        match document_changes {
            DocumentChanges::Edits(doc_edits) => {
                for doc_edit in doc_edits {
                    let path = uri_to_path(doc_edit.text_document.uri.as_str());
                    let edits: Vec<TextEdit> = doc_edit
                        .edits
                        .iter()
                        .map(|e| match e {
                            lsp_types::OneOf::Left(edit) => edit.clone(),
                            lsp_types::OneOf::Right(annotated) => annotated.text_edit.clone(),
                        })
                        .collect();
                    apply_text_edits(&path, &edits)?;
                }
            }
            DocumentChanges::Operations(_) => {
                return Err(AppError::internal(
                    "resource operations in workspace edits are not supported",
                ));
            }
        }
    }

    Ok(())
}

/// Apply a set of text edits to one file.
///
/// Edits are applied back-to-front so earlier offsets stay valid.
fn apply_text_edits(path: &Path, edits: &[TextEdit]) -> AppResult<()> {
    if edits.is_empty() {
        return Ok(());
    }

    let mut content = fs::read_to_string(path)?;

    let mut ordered: Vec<&TextEdit> = edits.iter().collect();
    ordered.sort_by_key(|e| (e.range.start.line, e.range.start.character));

    for edit in ordered.iter().rev() {
        let start = offset_of(&content, &edit.range.start);
        let end = offset_of(&content, &edit.range.end).max(start);
        content.replace_range(start..end, &edit.new_text);
    }

    fs::write(path, content)?;
    Ok(())
}

/// Byte offset of an LSP position, clamped to the document bounds.
fn offset_of(text: &str, position: &Position) -> usize {
    let mut offset = 0;
    for (line_number, line) in text.split_inclusive('\n').enumerate() {
        if line_number as u32 == position.line {
            let column = (position.character as usize).min(line.trim_end_matches('\n').len());
            return offset + column;
        }
        offset += line.len();
    }
    text.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsp_types::Range;
    use tempfile::TempDir;

    fn edit(start: (u32, u32), end: (u32, u32), new_text: &str) -> TextEdit {
        TextEdit {
            range: Range::new(
                Position::new(start.0, start.1),
                Position::new(end.0, end.1),
            ),
            new_text: new_text.to_string(),
        }
    }

    #[test]
    fn test_workspace_configuration_replies_per_scope() {
        let params = serde_json::json!({"items": [{"section": "rust"}, {"section": "go"}]});
        let reply = handle_workspace_configuration(&params);
        assert_eq!(reply, serde_json::json!([{}, {}]));
    }

    #[test]
    fn test_workspace_configuration_defaults_to_single_scope() {
        let reply = handle_workspace_configuration(&serde_json::json!({}));
        assert_eq!(reply, serde_json::json!([{}]));
    }

    #[test]
    fn test_offset_of_positions() {
        let text = "hello\nworld\n";
        assert_eq!(offset_of(text, &Position::new(0, 0)), 0);
        assert_eq!(offset_of(text, &Position::new(0, 5)), 5);
        assert_eq!(offset_of(text, &Position::new(1, 2)), 8);
        // Past the end of a line clamps to the line end.
        assert_eq!(offset_of(text, &Position::new(0, 99)), 5);
        // Past the last line clamps to the document end.
        assert_eq!(offset_of(text, &Position::new(9, 0)), text.len());
    }

    #[test]
    fn test_apply_text_edits_single_replacement() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "hello world\n").unwrap();

        apply_text_edits(&path, &[edit((0, 6), (0, 11), "there")]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello there\n");
    }

    #[test]
    fn test_apply_text_edits_multiple_keep_offsets_valid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "aaa\nbbb\nccc\n").unwrap();

        apply_text_edits(
            &path,
            &[
                edit((0, 0), (0, 3), "AAA"),
                edit((2, 0), (2, 3), "CCC"),
            ],
        )
        .unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "AAA\nbbb\nCCC\n");
    }

    #[test]
    fn test_handle_apply_edit_success() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "old\n").unwrap();

        let mut changes = serde_json::Map::new();
        changes.insert(
            format!("file://{}", path.display()),
            serde_json::json!([
                {"range": {"start": {"line": 0, "character": 0},
                           "end": {"line": 0, "character": 3}},
                 "newText": "new"}
            ]),
        );
        let params = serde_json::json!({"edit": {"changes": changes}});

        let response = handle_apply_edit(&params);
        assert!(response.applied, "{:?}", response.failure_reason);
        assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
    }

    #[test]
    fn test_handle_apply_edit_missing_file_reports_failure() {
        let params = serde_json::json!({
            "edit": {
                "changes": {
                    "file:///definitely/not/here.txt": [
                        {"range": {"start": {"line": 0, "character": 0},
                                   "end": {"line": 0, "character": 1}},
                         "newText": "x"}
                    ]
                }
            }
        });

        let response = handle_apply_edit(&params);
        assert!(!response.applied);
        assert!(response.failure_reason.is_some());
    }

    #[test]
    fn test_handle_apply_edit_invalid_params() {
        let response = handle_apply_edit(&serde_json::json!({"edit": 42}));
        assert!(!response.applied);
        assert!(response.failure_reason.unwrap().contains("invalid"));
    }
}
