//! LSP Liaison — Diagnostics Fan-Out over Language Server Clients
//!
//! Wraps the set of running language-server clients. After each file
//! mutation the executor notifies every client whose workspace covers the
//! path, waits for their analysis to settle, and collects a human-readable
//! diagnostics summary for the tool response.

pub mod client;
pub mod handlers;

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use lsp_types::{DiagnosticSeverity, FileSystemWatcher};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub use client::{path_to_uri, uri_to_path, DiagnosticsChangedCallback, LspClient};

use crate::utils::error::AppResult;

/// No diagnostics from any relevant client for this long counts as quiet.
const DIAGNOSTIC_QUIET_PERIOD: Duration = Duration::from_millis(700);
/// Hard ceiling on the diagnostics wait, independent of quiescence.
const DIAGNOSTIC_WAIT_CEILING: Duration = Duration::from_secs(5);

/// Receives `workspace/didChangeWatchedFiles` registrations so the host can
/// wire them into its own file watcher.
pub trait FileWatchRegistrationHandler: Send + Sync {
    fn watch_registered(&self, id: &str, watchers: &[FileSystemWatcher]);
}

/// Fan-out wrapper over the registered language-server clients.
pub struct LspLiaison {
    clients: RwLock<HashMap<String, Arc<LspClient>>>,
    watch_handler: RwLock<Option<Arc<dyn FileWatchRegistrationHandler>>>,
    /// registration id -> watcher list, as received from servers
    watch_registrations: Mutex<HashMap<String, Vec<FileSystemWatcher>>>,
}

impl LspLiaison {
    pub fn new() -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            watch_handler: RwLock::new(None),
            watch_registrations: Mutex::new(HashMap::new()),
        }
    }

    pub fn register_client(&self, client: Arc<LspClient>) {
        let mut clients = self.clients.write().expect("client map lock poisoned");
        clients.insert(client.name().to_string(), client);
    }

    pub fn client(&self, name: &str) -> Option<Arc<LspClient>> {
        self.clients
            .read()
            .expect("client map lock poisoned")
            .get(name)
            .cloned()
    }

    pub fn set_file_watch_handler(&self, handler: Arc<dyn FileWatchRegistrationHandler>) {
        let mut guard = self.watch_handler.write().expect("watch handler lock poisoned");
        *guard = Some(handler);
    }

    /// Clients whose workspace covers the path.
    fn clients_for(&self, path: &Path) -> Vec<Arc<LspClient>> {
        self.clients
            .read()
            .expect("client map lock poisoned")
            .values()
            .filter(|c| c.covers(path))
            .cloned()
            .collect()
    }

    /// Tell every covering client the file changed on disk.
    pub fn notify_write(&self, path: &Path) {
        let clients = self.clients_for(path);
        debug!(path = %path.display(), clients = clients.len(), "notifying write");
        for client in clients {
            client.notify_change(path);
        }
    }

    /// Block until every covering client has published diagnostics for the
    /// path since the write, or no diagnostics have arrived from any of
    /// them for the quiet period, or the ceiling elapses, or `cancel`
    /// fires. Returns immediately when no client covers the path.
    pub async fn wait_for_diagnostics(&self, cancel: &CancellationToken, path: &Path) {
        let relevant = self.clients_for(path);
        if relevant.is_empty() {
            return;
        }

        let deadline = tokio::time::Instant::now() + DIAGNOSTIC_WAIT_CEILING;
        loop {
            if relevant.iter().all(|c| c.has_published_for(path)) {
                return;
            }

            let publishes: Vec<_> = relevant
                .iter()
                .map(|c| Box::pin(c.wait_changed()))
                .collect();

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(path = %path.display(), "diagnostics wait cancelled");
                    return;
                }
                _ = tokio::time::sleep_until(deadline) => {
                    debug!(path = %path.display(), "diagnostics wait hit ceiling");
                    return;
                }
                // Quiet period restarts each loop turn, i.e. after every publish.
                _ = tokio::time::sleep(DIAGNOSTIC_QUIET_PERIOD) => {
                    return;
                }
                _ = futures_util::future::select_all(publishes) => {}
            }
        }
    }

    /// Human-readable diagnostics summary for the path across all clients,
    /// grouped by severity. Empty string when there is nothing to report.
    pub fn collect(&self, path: &Path) -> String {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut other = Vec::new();

        for client in self.clients_for(path) {
            for diagnostic in client.diagnostics_for(path) {
                let line = format_diagnostic(client.name(), &diagnostic);
                if diagnostic.severity == Some(DiagnosticSeverity::ERROR) {
                    errors.push(line);
                } else if diagnostic.severity == Some(DiagnosticSeverity::WARNING) {
                    warnings.push(line);
                } else {
                    other.push(line);
                }
            }
        }

        if errors.is_empty() && warnings.is_empty() && other.is_empty() {
            return String::new();
        }

        let mut output = String::from("\n\n<file_diagnostics>\n");
        for line in errors.iter().chain(warnings.iter()).chain(other.iter()) {
            output.push_str(line);
            output.push('\n');
        }
        output.push_str("</file_diagnostics>\n");
        output
    }

    /// Handle a `client/registerCapability` request from a server: record
    /// `workspace/didChangeWatchedFiles` watcher lists and inform the
    /// injected handler. Other registration methods are ignored.
    pub fn register_capability(&self, params: &serde_json::Value) -> AppResult<()> {
        let registration_params: lsp_types::RegistrationParams =
            serde_json::from_value(params.clone())?;

        for registration in registration_params.registrations {
            if registration.method != "workspace/didChangeWatchedFiles" {
                continue;
            }
            let Some(options) = registration.register_options else {
                continue;
            };
            let options: lsp_types::DidChangeWatchedFilesRegistrationOptions =
                serde_json::from_value(options)?;

            if let Some(handler) = self
                .watch_handler
                .read()
                .expect("watch handler lock poisoned")
                .as_ref()
            {
                handler.watch_registered(&registration.id, &options.watchers);
            }

            self.watch_registrations
                .lock()
                .expect("watch registration lock poisoned")
                .insert(registration.id, options.watchers);
        }

        Ok(())
    }

    /// Watcher lists recorded from `client/registerCapability`.
    pub fn watch_registrations(&self) -> HashMap<String, Vec<FileSystemWatcher>> {
        self.watch_registrations
            .lock()
            .expect("watch registration lock poisoned")
            .clone()
    }
}

impl Default for LspLiaison {
    fn default() -> Self {
        Self::new()
    }
}

fn format_diagnostic(client_name: &str, diagnostic: &lsp_types::Diagnostic) -> String {
    let severity = diagnostic.severity;
    let label = if severity == Some(DiagnosticSeverity::ERROR) {
        "Error"
    } else if severity == Some(DiagnosticSeverity::WARNING) {
        "Warn"
    } else if severity == Some(DiagnosticSeverity::HINT) {
        "Hint"
    } else {
        "Info"
    };
    format!(
        "{} [{}:{}] {} ({})",
        label,
        diagnostic.range.start.line + 1,
        diagnostic.range.start.character + 1,
        diagnostic.message,
        client_name
    )
}
