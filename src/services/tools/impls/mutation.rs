//! Post-Mutation Bookkeeping Shared by the Mutating Tools
//!
//! After a tool has written to disk it must version the change, update the
//! read/write tracker, and give the language servers a chance to re-analyze
//! the file. The sequence is identical for every mutating tool.

use std::path::Path;

use tracing::warn;

use crate::services::tools::trait_def::ToolExecutionContext;
use crate::utils::error::AppResult;

/// Record history, update the tracker, and wait for diagnostics.
///
/// Returns the diagnostics summary to append to the tool response.
///
/// History failure policy: losing the pre-image is unrecoverable, so a
/// failed initial `create` aborts the call. Later `create_version`
/// failures only cost a history entry and are logged instead.
pub(crate) async fn finalize_mutation(
    ctx: &ToolExecutionContext,
    session_id: &str,
    path: &Path,
    old_content: &str,
    new_content: &str,
) -> AppResult<String> {
    let path_str = path.to_string_lossy();

    let latest = match ctx.history.get_by_path_and_session(session_id, &path_str) {
        Ok(latest) => latest,
        Err(e) => {
            warn!(path = %path_str, error = %e, "history lookup failed, treating as unseen");
            None
        }
    };

    match latest {
        None => {
            ctx.history.create(session_id, &path_str, old_content)?;
        }
        Some(latest) if latest.content != old_content => {
            // The user changed the file outside the assistant since the last
            // recorded version; keep their edits as an intermediate version.
            if let Err(e) = ctx.history.create_version(session_id, &path_str, old_content) {
                warn!(path = %path_str, error = %e, "failed to record intermediate version");
            }
        }
        Some(_) => {}
    }

    if let Err(e) = ctx.history.create_version(session_id, &path_str, new_content) {
        warn!(path = %path_str, error = %e, "failed to record new version");
    }

    ctx.file_times.record_write(path);
    // Writing counts as reading for conflict purposes.
    ctx.file_times.record_read(path);

    ctx.lsp.notify_write(path);
    ctx.lsp
        .wait_for_diagnostics(&ctx.cancellation_token, path)
        .await;

    Ok(ctx.lsp.collect(path))
}
