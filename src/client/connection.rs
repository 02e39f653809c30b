/*
 * Copyright (C) 2026 Mark Wells Dev
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use anyhow::{Context, Result, anyhow};
use lsp_types::{
    ClientCapabilities, Diagnostic, DidChangeTextDocumentParams, DidCloseTextDocumentParams,
    DidOpenTextDocumentParams, Hover, HoverParams, InitializeParams, InitializeResult,
    InitializedParams, PositionEncodingKind, ProgressParams, PublishDiagnosticsParams, Uri,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::protocol::{NotificationMessage, RequestId, RequestMessage, ResponseMessage};
use super::state::{ProgressState, ProgressTracker};
use super::transport::{Inbound, Outbound, Transport};

/// Cached diagnostics per document.
pub type DiagnosticsCache = Arc<Mutex<HashMap<Uri, Vec<Diagnostic>>>>;

type PendingMap = Arc<Mutex<HashMap<RequestId, oneshot::Sender<ResponseMessage>>>>;

/// The logical language-client connection over one transport.
///
/// Owns the background reader task routing responses, caching diagnostics,
/// and tracking server progress. Constructed by the wrapper; the wrapper's
/// state machine decides when one of these exists.
pub struct LanguageClient {
    next_id: AtomicI64,
    outbound: Outbound,
    pending: PendingMap,
    diagnostics: DiagnosticsCache,
    progress: Arc<Mutex<ProgressTracker>>,
    alive: Arc<AtomicBool>,
    closed_rx: watch::Receiver<bool>,
    stop_tx: watch::Sender<bool>,
    reader: Option<JoinHandle<Inbound>>,
    request_timeout: Duration,
    transport_kind: &'static str,
}

impl LanguageClient {
    /// Binds a client to a transport and starts the reader task.
    pub(crate) fn new(transport: Transport, request_timeout: Duration) -> Self {
        let Transport {
            outbound,
            inbound,
            kind,
        } = transport;

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let diagnostics: DiagnosticsCache = Arc::new(Mutex::new(HashMap::new()));
        let progress = Arc::new(Mutex::new(ProgressTracker::new()));
        let alive = Arc::new(AtomicBool::new(true));
        let (closed_tx, closed_rx) = watch::channel(false);
        let (stop_tx, stop_rx) = watch::channel(false);

        let reader = tokio::spawn(Self::reader_task(
            inbound,
            outbound.clone(),
            pending.clone(),
            diagnostics.clone(),
            progress.clone(),
            alive.clone(),
            closed_tx,
            stop_rx,
        ));

        Self {
            next_id: AtomicI64::new(1),
            outbound,
            pending,
            diagnostics,
            progress,
            alive,
            closed_rx,
            stop_tx,
            reader: Some(reader),
            request_timeout,
            transport_kind: kind,
        }
    }

    /// Background task reading messages until the transport closes or a
    /// stop is requested. Returns the inbound half so worker channels can
    /// be rebound.
    #[allow(
        clippy::too_many_arguments,
        reason = "The task owns clones of every shared handle"
    )]
    async fn reader_task(
        mut inbound: Inbound,
        outbound: Outbound,
        pending: PendingMap,
        diagnostics: DiagnosticsCache,
        progress: Arc<Mutex<ProgressTracker>>,
        alive: Arc<AtomicBool>,
        closed_tx: watch::Sender<bool>,
        mut stop_rx: watch::Receiver<bool>,
    ) -> Inbound {
        loop {
            tokio::select! {
                _ = stop_rx.changed() => {
                    // Requested stop, or the client itself was dropped.
                    debug!("reader task stopping");
                    break;
                }
                message = inbound.next_message() => {
                    let Some(text) = message else {
                        alive.store(false, Ordering::SeqCst);
                        let _ = closed_tx.send(true);
                        warn!("language server transport closed");
                        break;
                    };
                    Self::handle_message(&text, &outbound, &pending, &diagnostics, &progress).await;
                }
            }
        }
        inbound
    }

    async fn handle_message(
        text: &str,
        outbound: &Outbound,
        pending: &PendingMap,
        diagnostics: &DiagnosticsCache,
        progress: &Arc<Mutex<ProgressTracker>>,
    ) {
        trace!("received message: {}", text);

        let value: serde_json::Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                warn!("failed to parse message JSON: {}", e);
                return;
            }
        };

        if let Some(method) = value.get("method").and_then(|m| m.as_str()) {
            if let Some(id) = value.get("id") {
                // Server-to-client request. Answer MethodNotFound so the
                // server is never left waiting on us.
                debug!("received server request: {} (id: {})", method, id);
                let id = serde_json::from_value(id.clone()).unwrap_or(RequestId::Number(0));
                let reply = ResponseMessage::method_not_found(id, method);
                if let Ok(body) = serde_json::to_string(&reply) {
                    if let Err(e) = outbound.send(&body).await {
                        warn!("failed to answer server request: {}", e);
                    }
                }
            } else {
                Self::handle_notification(method, &value, diagnostics, progress).await;
            }
        } else if value.get("id").is_some() {
            if let Ok(response) = serde_json::from_value::<ResponseMessage>(value)
                && let Some(id) = &response.id
            {
                let mut pending = pending.lock().await;
                if let Some(sender) = pending.remove(id) {
                    let _ = sender.send(response);
                } else {
                    warn!("received response for unknown request id: {:?}", id);
                }
            }
        } else {
            warn!("unknown message format: {}", text);
        }
    }

    async fn handle_notification(
        method: &str,
        value: &serde_json::Value,
        diagnostics: &DiagnosticsCache,
        progress: &Arc<Mutex<ProgressTracker>>,
    ) {
        let params = value.get("params").cloned().unwrap_or(serde_json::Value::Null);
        match method {
            "textDocument/publishDiagnostics" => {
                if let Ok(params) = serde_json::from_value::<PublishDiagnosticsParams>(params) {
                    debug!(
                        "received {} diagnostics for {:?}",
                        params.diagnostics.len(),
                        params.uri.as_str()
                    );
                    diagnostics.lock().await.insert(params.uri, params.diagnostics);
                } else {
                    warn!("failed to parse publishDiagnostics params");
                }
            }
            "$/progress" => {
                if let Ok(params) = serde_json::from_value::<ProgressParams>(params) {
                    progress.lock().await.update(&params);
                }
            }
            "window/logMessage" | "window/showMessage" => {
                if let Some(message) = params.get("message").and_then(|m| m.as_str()) {
                    debug!("language server message: {}", message);
                }
            }
            _ => {
                trace!("ignoring notification: {}", method);
            }
        }
    }

    /// Sends a request and waits for the response with timeout.
    async fn request<P: serde::Serialize, R: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<R> {
        if !self.is_alive() {
            return Err(anyhow!("language server transport is closed"));
        }

        let id = RequestId::Number(self.next_id.fetch_add(1, Ordering::SeqCst));
        let request = RequestMessage::new(id.clone(), method, serde_json::to_value(params)?);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        let body = serde_json::to_string(&request)?;
        self.outbound.send(&body).await?;

        let response = match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                return Err(anyhow!("language server closed the connection"));
            }
            Err(_) => {
                self.pending.lock().await.remove(&id);
                return Err(anyhow!(
                    "request '{}' timed out after {:?}",
                    method,
                    self.request_timeout
                ));
            }
        };

        if let Some(error) = response.error {
            return Err(anyhow!(
                "language server error {}: {}",
                error.code,
                error.message
            ));
        }

        let result = response.result.unwrap_or(serde_json::Value::Null);
        serde_json::from_value(result).context("failed to parse language server response")
    }

    /// Sends a notification (no response expected).
    async fn notify<P: serde::Serialize>(&self, method: &str, params: P) -> Result<()> {
        let notification = NotificationMessage::new(method, serde_json::to_value(params)?);
        let body = serde_json::to_string(&notification)?;
        self.outbound.send(&body).await
    }

    /// Performs the initialize handshake.
    pub(crate) async fn initialize(
        &self,
        initialization_options: Option<serde_json::Value>,
    ) -> Result<InitializeResult> {
        let params = InitializeParams {
            process_id: Some(std::process::id()),
            initialization_options,
            capabilities: ClientCapabilities {
                general: Some(lsp_types::GeneralClientCapabilities {
                    position_encodings: Some(vec![
                        PositionEncodingKind::UTF8,
                        PositionEncodingKind::UTF16,
                    ]),
                    ..Default::default()
                }),
                ..Default::default()
            },
            ..Default::default()
        };

        let result: InitializeResult = self.request("initialize", params).await?;
        self.notify("initialized", InitializedParams {}).await?;
        Ok(result)
    }

    /// Sends the shutdown request, and the exit notification unless the
    /// transport is being retained for rebinding.
    pub(crate) async fn shutdown(&self, send_exit: bool) -> Result<()> {
        let _: serde_json::Value = self.request("shutdown", serde_json::Value::Null).await?;
        if send_exit {
            self.notify("exit", serde_json::Value::Null).await?;
        }
        Ok(())
    }

    /// Stops the reader task and recovers the inbound transport half.
    pub(crate) async fn close(mut self) -> Option<Inbound> {
        let _ = self.stop_tx.send(true);
        match self.reader.take() {
            Some(handle) => handle.await.ok(),
            None => None,
        }
    }

    /// Notifies the server that a document was opened.
    pub async fn did_open(&self, params: DidOpenTextDocumentParams) -> Result<()> {
        self.notify("textDocument/didOpen", params).await
    }

    /// Notifies the server that a document changed.
    pub async fn did_change(&self, params: DidChangeTextDocumentParams) -> Result<()> {
        self.notify("textDocument/didChange", params).await
    }

    /// Notifies the server that a document was closed.
    pub async fn did_close(&self, params: DidCloseTextDocumentParams) -> Result<()> {
        self.notify("textDocument/didClose", params).await
    }

    /// Gets hover information for a position in a document.
    pub async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        self.request("textDocument/hover", params).await
    }

    /// Gets cached diagnostics for a specific URI.
    pub async fn diagnostics_for(&self, uri: &Uri) -> Vec<Diagnostic> {
        self.diagnostics.lock().await.get(uri).cloned().unwrap_or_default()
    }

    /// Snapshot of the server's progress state: busy flag and the primary
    /// active operation.
    pub(crate) async fn progress_snapshot(&self) -> (bool, Option<ProgressState>) {
        let tracker = self.progress.lock().await;
        (tracker.is_busy(), tracker.primary_progress().cloned())
    }

    /// Whether the transport is still open.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// A signal that flips to `true` when the remote end closes the
    /// transport.
    pub(crate) fn closed_signal(&self) -> watch::Receiver<bool> {
        self.closed_rx.clone()
    }

    /// Transport family name for status reports.
    pub(crate) const fn transport_kind(&self) -> &'static str {
        self.transport_kind
    }
}
