//! Session-Scoped File History
//!
//! Every file mutation made by a tool is versioned per `(session, path)`:
//! the first version holds the pre-mutation content (empty for a new file),
//! and each write appends the post-mutation content. When the on-disk
//! content drifted from the last recorded version (the user edited the
//! file outside the assistant), an intermediate version is inserted first
//! so those edits survive in the history.
//!
//! The storage backend is behind `FileHistoryService`; the default SQLite
//! implementation lives in `storage::history`.

use serde::{Deserialize, Serialize};

use crate::utils::error::AppResult;

/// One recorded version of a file within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileVersion {
    pub id: String,
    pub session_id: String,
    pub path: String,
    /// Monotonic per `(session, path)`, starting at 0 for the pre-image.
    pub version: i64,
    pub content: String,
    /// Unix millis.
    pub created_at: i64,
}

/// Storage contract for the version history.
///
/// Implementations must make `create` and `create_version` on the same
/// `(session, path)` linearizable; versions are append-only and ordered.
pub trait FileHistoryService: Send + Sync {
    /// Latest recorded version for `(session, path)`, if any.
    fn get_by_path_and_session(
        &self,
        session_id: &str,
        path: &str,
    ) -> AppResult<Option<FileVersion>>;

    /// Record the initial (pre-image) version. Fails if the pair already
    /// has history.
    fn create(&self, session_id: &str, path: &str, content: &str) -> AppResult<FileVersion>;

    /// Append a new version.
    fn create_version(&self, session_id: &str, path: &str, content: &str)
        -> AppResult<FileVersion>;

    /// All versions for `(session, path)` in append order.
    fn list_versions(&self, session_id: &str, path: &str) -> AppResult<Vec<FileVersion>>;
}
