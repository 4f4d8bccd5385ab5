//! Language Server Client State
//!
//! Per-server diagnostics bookkeeping. The JSON-RPC transport lives outside
//! this crate; it feeds `publish_diagnostics` with the typed payloads it
//! decodes and consults the handlers in `super::handlers` for the small set
//! of server-to-client requests we answer.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use lsp_types::Diagnostic;
use tokio::sync::Notify;
use tracing::debug;

/// Callback invoked with `(client_name, total_diagnostic_count)` whenever a
/// server publishes diagnostics.
pub type DiagnosticsChangedCallback = Arc<dyn Fn(&str, usize) + Send + Sync>;

/// Diagnostics state for one language server.
pub struct LspClient {
    name: String,
    workspace_root: PathBuf,
    /// uri -> latest published diagnostics
    diagnostics: DashMap<String, Vec<Diagnostic>>,
    /// uris written since their last publish; drained as publishes arrive
    awaiting_publish: DashMap<String, ()>,
    /// Wakes diagnostics waiters on every publish
    changed: Notify,
    on_diagnostics_changed: RwLock<Option<DiagnosticsChangedCallback>>,
}

impl LspClient {
    pub fn new(name: impl Into<String>, workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            workspace_root: workspace_root.into(),
            diagnostics: DashMap::new(),
            awaiting_publish: DashMap::new(),
            changed: Notify::new(),
            on_diagnostics_changed: RwLock::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Whether this server's workspace covers the given path.
    pub fn covers(&self, path: &Path) -> bool {
        path.starts_with(&self.workspace_root)
    }

    pub fn set_diagnostics_callback(&self, callback: DiagnosticsChangedCallback) {
        let mut guard = self.on_diagnostics_changed.write().expect("callback lock poisoned");
        *guard = Some(callback);
    }

    /// Mark a path as changed on disk; the server owes us a fresh publish.
    pub fn notify_change(&self, path: &Path) {
        self.awaiting_publish.insert(path_to_uri(path), ());
    }

    /// Entry point for the typed diagnostics stream from the wire layer.
    pub fn publish_diagnostics(&self, uri: impl Into<String>, diagnostics: Vec<Diagnostic>) {
        let uri = uri.into();
        debug!(client = %self.name, uri = %uri, count = diagnostics.len(), "diagnostics published");
        self.diagnostics.insert(uri.clone(), diagnostics);
        self.awaiting_publish.remove(&uri);

        let total: usize = self.diagnostics.iter().map(|entry| entry.value().len()).sum();
        if let Some(callback) = self
            .on_diagnostics_changed
            .read()
            .expect("callback lock poisoned")
            .as_ref()
        {
            callback(&self.name, total);
        }

        self.changed.notify_waiters();
    }

    /// True once the server has published for the path since the last
    /// `notify_change` (or was never told about a change).
    pub fn has_published_for(&self, path: &Path) -> bool {
        !self.awaiting_publish.contains_key(&path_to_uri(path))
    }

    /// Current diagnostics for a path (empty when clean or unknown).
    pub fn diagnostics_for(&self, path: &Path) -> Vec<Diagnostic> {
        self.diagnostics
            .get(&path_to_uri(path))
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Resolves the next time this client publishes diagnostics.
    pub async fn wait_changed(&self) {
        self.changed.notified().await;
    }
}

/// file:// URI for an absolute path.
pub fn path_to_uri(path: &Path) -> String {
    format!("file://{}", path.display())
}

/// Absolute path for a file:// URI (returned as-is when not a file URI).
pub fn uri_to_path(uri: &str) -> PathBuf {
    PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsp_types::{DiagnosticSeverity, Position, Range};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn diagnostic(message: &str) -> Diagnostic {
        Diagnostic {
            range: Range::new(Position::new(0, 0), Position::new(0, 1)),
            severity: Some(DiagnosticSeverity::ERROR),
            message: message.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_covers_workspace_paths_only() {
        let client = LspClient::new("rust-analyzer", "/work");
        assert!(client.covers(Path::new("/work/src/main.rs")));
        assert!(!client.covers(Path::new("/elsewhere/main.rs")));
    }

    #[test]
    fn test_publish_clears_awaiting_state() {
        let client = LspClient::new("rust-analyzer", "/work");
        let path = Path::new("/work/src/main.rs");

        assert!(client.has_published_for(path));
        client.notify_change(path);
        assert!(!client.has_published_for(path));

        client.publish_diagnostics(path_to_uri(path), vec![diagnostic("oops")]);
        assert!(client.has_published_for(path));
        assert_eq!(client.diagnostics_for(path).len(), 1);
    }

    #[test]
    fn test_publish_replaces_previous_diagnostics() {
        let client = LspClient::new("rust-analyzer", "/work");
        let path = Path::new("/work/src/main.rs");

        client.publish_diagnostics(path_to_uri(path), vec![diagnostic("a"), diagnostic("b")]);
        client.publish_diagnostics(path_to_uri(path), vec![]);
        assert!(client.diagnostics_for(path).is_empty());
    }

    #[test]
    fn test_callback_receives_total_count() {
        let client = LspClient::new("rust-analyzer", "/work");
        let seen = Arc::new(AtomicUsize::new(usize::MAX));
        let seen_clone = Arc::clone(&seen);
        client.set_diagnostics_callback(Arc::new(move |name, total| {
            assert_eq!(name, "rust-analyzer");
            seen_clone.store(total, Ordering::SeqCst);
        }));

        client.publish_diagnostics("file:///work/a.rs", vec![diagnostic("x")]);
        client.publish_diagnostics("file:///work/b.rs", vec![diagnostic("y"), diagnostic("z")]);
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_uri_roundtrip() {
        let path = Path::new("/work/src/main.rs");
        assert_eq!(path_to_uri(path), "file:///work/src/main.rs");
        assert_eq!(uri_to_path("file:///work/src/main.rs"), path);
        assert_eq!(uri_to_path("untitled:1"), PathBuf::from("untitled:1"));
    }

    #[tokio::test]
    async fn test_wait_changed_wakes_on_publish() {
        let client = Arc::new(LspClient::new("rust-analyzer", "/work"));
        let waiter = Arc::clone(&client);
        let handle = tokio::spawn(async move { waiter.wait_changed().await });
        tokio::task::yield_now().await;
        client.publish_diagnostics("file:///work/a.rs", vec![]);
        tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .expect("waiter should wake")
            .unwrap();
    }
}
