//! View Tool Implementation
//!
//! Reads file contents with line numbers and offset/limit windowing. Every
//! successful view records a last-read timestamp, which is what arms the
//! write tools' conflict detection for that file.

use std::collections::HashMap;
use std::io::ErrorKind;

use async_trait::async_trait;
use serde::Deserialize;

use crate::services::llm::types::{ParameterSchema, ToolCall};
use crate::services::tools::executor::ToolResponse;
use crate::services::tools::trait_def::{Tool, ToolExecutionContext};
use crate::utils::paths::resolve_path;

pub const VIEW_TOOL_NAME: &str = "view";

/// Default number of lines shown per view.
const DEFAULT_LIMIT: usize = 2000;
/// Longer lines are cut off at this many characters.
const MAX_LINE_LENGTH: usize = 2000;

#[derive(Debug, Deserialize)]
struct ViewParams {
    #[serde(default)]
    file_path: String,
    /// 1-indexed first line to show.
    offset: Option<usize>,
    limit: Option<usize>,
}

/// View file tool — numbered-line reads with windowing.
pub struct ViewTool;

impl ViewTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ViewTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ViewTool {
    fn name(&self) -> &str {
        VIEW_TOOL_NAME
    }

    fn description(&self) -> &str {
        "View the contents of a file with line numbers. Supports optional offset and limit for \
         reading portions of large files. Read a file with this tool before writing or editing it."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut properties = HashMap::new();
        properties.insert(
            "file_path".to_string(),
            ParameterSchema::string(Some(
                "The path to the file to view (absolute or relative to the working directory)",
            )),
        );
        properties.insert(
            "offset".to_string(),
            ParameterSchema::integer(Some("The line number to start viewing from (1-indexed)")),
        );
        properties.insert(
            "limit".to_string(),
            ParameterSchema::integer(Some("Maximum number of lines to view (default: 2000)")),
        );
        ParameterSchema::object(
            Some("View file parameters"),
            properties,
            vec!["file_path".to_string()],
        )
    }

    async fn execute(
        &self,
        ctx: &ToolExecutionContext,
        call: &ToolCall,
    ) -> crate::utils::error::AppResult<ToolResponse> {
        let params: ViewParams = match serde_json::from_value(call.arguments.clone()) {
            Ok(p) => p,
            Err(e) => {
                return Ok(ToolResponse::error(format!("error parsing parameters: {}", e)))
            }
        };

        if params.file_path.is_empty() {
            return Ok(ToolResponse::error("file_path is required"));
        }

        let path = resolve_path(&params.file_path, &ctx.working_dir);

        match std::fs::metadata(&path) {
            Ok(m) if m.is_dir() => {
                return Ok(ToolResponse::error(format!(
                    "Path is a directory, not a file: {}",
                    path.display()
                )));
            }
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(ToolResponse::error(format!(
                    "File not found: {}",
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        }

        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                return Ok(ToolResponse::error(format!(
                    "Cannot display binary file: {}",
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let offset = params.offset.unwrap_or(1).max(1);
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).max(1);

        let total_lines = content.lines().count();
        let mut output = String::new();
        let mut shown = 0usize;
        for (index, line) in content.lines().enumerate().skip(offset - 1).take(limit) {
            output.push_str(&format!("{:>6}|{}\n", index + 1, clip_line(line)));
            shown += 1;
        }

        if shown == 0 && total_lines > 0 {
            return Ok(ToolResponse::error(format!(
                "Offset {} is past the end of the file ({} lines)",
                offset, total_lines
            )));
        }

        let last_shown = offset - 1 + shown;
        if last_shown < total_lines {
            output.push_str(&format!(
                "\n(truncated: showing lines {}-{} of {})\n",
                offset, last_shown, total_lines
            ));
        }

        ctx.file_times.record_read(&path);

        Ok(ToolResponse::text(output))
    }
}

/// Cut a line off at the display limit, respecting char boundaries.
fn clip_line(line: &str) -> &str {
    if line.len() <= MAX_LINE_LENGTH {
        return line;
    }
    let mut end = MAX_LINE_LENGTH;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}
