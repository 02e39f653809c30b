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

//! The language-client wrapper.
//!
//! Owns a single language-client connection and its transport, and drives
//! the run-state machine: Unstarted → Starting → Running → Stopping →
//! Stopped, with Disposed as the terminal state. At most one connection is
//! live at a time; restart fully disposes the previous one first. Worker
//! handles survive restarts only when explicitly retained.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use lsp_types::{
    Diagnostic, Hover, HoverParams, Position, TextDocumentIdentifier, TextDocumentPositionParams,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, watch};
use tracing::{debug, info, warn};

use super::connection::LanguageClient;
use super::documents::{DocumentSync, SyncNotification};
use super::error::ClientError;
use super::state::{ClientState, ClientStatus, ProgressState};
use super::transport::{Inbound, SocketConfig, Transport, TransportConfig};
use super::worker::{Worker, WorkerOptions};
use crate::config::{ClientHooks, LanguageClientConfig};
use crate::editor::TextModel;

enum TransportPlan {
    Socket(SocketConfig),
    Worker,
}

struct Inner {
    language_id: String,
    plan: TransportPlan,
    initialization_options: Option<serde_json::Value>,
    start_timeout: Duration,
    request_timeout: Duration,
    report_status: bool,
    status_sink: Option<mpsc::UnboundedSender<ClientStatus>>,
    hooks: ClientHooks,
    state: ClientState,
    client: Option<LanguageClient>,
    worker: Option<Worker>,
    worker_options: Option<WorkerOptions>,
    documents: DocumentSync,
    started_at: Option<DateTime<Utc>>,
}

/// Owns one language-client connection and its run state.
pub struct LanguageClientWrapper {
    inner: Arc<Mutex<Inner>>,
}

impl LanguageClientWrapper {
    /// Creates an unstarted wrapper from a client configuration.
    ///
    /// A pre-built worker handle in the configuration is adopted
    /// immediately; options-based workers are spawned lazily on start.
    #[must_use]
    pub fn new(config: LanguageClientConfig) -> Self {
        let (plan, worker, worker_options) = match config.transport {
            TransportConfig::Socket(socket) => (TransportPlan::Socket(socket), None, None),
            TransportConfig::WorkerOptions(options) => (TransportPlan::Worker, None, Some(options)),
            TransportConfig::Worker(worker) => (TransportPlan::Worker, Some(worker), None),
        };

        Self {
            inner: Arc::new(Mutex::new(Inner {
                language_id: config.language_id,
                plan,
                initialization_options: config.initialization_options,
                start_timeout: config.start_timeout,
                request_timeout: config.request_timeout,
                report_status: config.report_status,
                status_sink: config.status_sink,
                hooks: config.hooks,
                state: ClientState::Unstarted,
                client: None,
                worker,
                worker_options,
                documents: DocumentSync::new(),
                started_at: None,
            })),
        }
    }

    /// Starts the language client.
    ///
    /// Builds the transport (opening a socket, or binding — and lazily
    /// spawning — the worker), performs the handshake, and moves to
    /// Running. Calling start on a running client is an idempotent no-op.
    ///
    /// # Errors
    ///
    /// Rejects with [`ClientError::InvalidState`] when a start or stop is
    /// already in flight or the wrapper is disposed, and with a wrapped
    /// connect/handshake error when the transport cannot be established.
    pub async fn start(&self) -> Result<(), ClientError> {
        let mut inner = self.inner.lock().await;
        match inner.state {
            ClientState::Running => {
                debug!("language client already running, start is a no-op");
                return Ok(());
            }
            ClientState::Starting | ClientState::Stopping => {
                return Err(ClientError::InvalidState {
                    expected: "an idle client",
                    actual: inner.state,
                });
            }
            ClientState::Disposed => {
                return Err(ClientError::InvalidState {
                    expected: "an undisposed client",
                    actual: inner.state,
                });
            }
            ClientState::Unstarted | ClientState::Stopped => {}
        }
        inner.state = ClientState::Starting;

        let transport = match Self::build_transport(&mut inner).await {
            Ok(transport) => transport,
            Err(e) => {
                inner.state = ClientState::Stopped;
                return Err(e);
            }
        };

        let client = LanguageClient::new(transport, inner.request_timeout);
        let handshake = tokio::time::timeout(
            inner.start_timeout,
            client.initialize(inner.initialization_options.clone()),
        )
        .await;

        let result = match handshake {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                let restored = client.close().await;
                Self::recover_channel(&mut inner, restored);
                inner.state = ClientState::Stopped;
                return Err(ClientError::Handshake(e));
            }
            Err(_) => {
                let restored = client.close().await;
                Self::recover_channel(&mut inner, restored);
                inner.state = ClientState::Stopped;
                return Err(ClientError::Handshake(anyhow!(
                    "initialize timed out after {:?}",
                    inner.start_timeout
                )));
            }
        };

        if let Some(server) = result.server_info {
            debug!(
                "connected to {} {}",
                server.name,
                server.version.as_deref().unwrap_or("")
            );
        }

        let closed_rx = client.closed_signal();
        let transport_kind = client.transport_kind();
        inner.client = Some(client);
        inner.state = ClientState::Running;
        inner.started_at = Some(Utc::now());
        inner.documents.clear();

        if let Some(hook) = &inner.hooks.on_start {
            hook();
        }
        info!(
            "language client for {} running over {}",
            inner.language_id, transport_kind
        );
        drop(inner);

        self.spawn_close_watcher(closed_rx);
        Ok(())
    }

    /// Restarts the language client.
    ///
    /// With `updated_worker`, the prior worker is disposed exactly once and
    /// the replacement installed before the new start. With `keep_worker`
    /// and no replacement, the existing worker handle is left intact and
    /// rebound by the new connection.
    ///
    /// # Errors
    ///
    /// Rejects when the wrapper is disposed, when a replacement worker is
    /// supplied for a non-worker transport, or when the stop or the
    /// subsequent start fails.
    pub async fn restart(
        &self,
        updated_worker: Option<Worker>,
        keep_worker: bool,
    ) -> Result<(), ClientError> {
        {
            let mut inner = self.inner.lock().await;
            if inner.state == ClientState::Disposed {
                return Err(ClientError::InvalidState {
                    expected: "an undisposed client",
                    actual: inner.state,
                });
            }
            if updated_worker.is_some() && !matches!(inner.plan, TransportPlan::Worker) {
                return Err(ClientError::UnexpectedWorker);
            }

            if let Some(replacement) = updated_worker {
                if inner.state == ClientState::Running {
                    inner.state = ClientState::Stopping;
                    match Self::stop_client(&mut inner, false).await {
                        Ok(()) => inner.state = ClientState::Stopped,
                        Err(e) => {
                            inner.state = ClientState::Stopped;
                            return Err(ClientError::Stop(e));
                        }
                    }
                } else if let Some(mut old) = inner.worker.take() {
                    old.terminate().await?;
                }
                inner.worker = Some(replacement);
            } else if inner.state == ClientState::Running {
                inner.state = ClientState::Stopping;
                match Self::stop_client(&mut inner, keep_worker).await {
                    Ok(()) => inner.state = ClientState::Stopped,
                    Err(e) => {
                        inner.state = ClientState::Stopped;
                        return Err(ClientError::Stop(e));
                    }
                }
            }
        }

        self.start().await
    }

    /// Stops the client and disposes the wrapper (terminal).
    ///
    /// The worker is terminated unless `keep_worker` is set, in which case
    /// ownership of the handle transfers back to the caller through the
    /// return value.
    ///
    /// # Errors
    ///
    /// Rejects with [`ClientError::InvalidState`] when the client is not
    /// running, and with [`ClientError::Stop`] carrying the underlying
    /// error when shutdown fails.
    pub async fn dispose(&self, keep_worker: bool) -> Result<Option<Worker>, ClientError> {
        let mut inner = self.inner.lock().await;
        if inner.state != ClientState::Running {
            return Err(ClientError::InvalidState {
                expected: "a running client",
                actual: inner.state,
            });
        }
        inner.state = ClientState::Stopping;

        match Self::stop_client(&mut inner, keep_worker).await {
            Ok(()) => {
                inner.state = ClientState::Disposed;
                let status = Self::build_status(&inner, false, None);
                let retained = if keep_worker { inner.worker.take() } else { None };

                if let Some(hook) = &inner.hooks.on_stop {
                    hook();
                }
                if inner.report_status {
                    Self::emit_status(&inner, status);
                }
                info!("language client for {} disposed", inner.language_id);
                Ok(retained)
            }
            Err(e) => {
                inner.state = ClientState::Stopped;
                Err(ClientError::Stop(e))
            }
        }
    }

    /// Current run state.
    pub async fn state(&self) -> ClientState {
        self.inner.lock().await.state
    }

    /// Whether the client is running.
    pub async fn is_running(&self) -> bool {
        self.state().await == ClientState::Running
    }

    /// The language this connection serves.
    pub async fn language_id(&self) -> String {
        self.inner.lock().await.language_id.clone()
    }

    /// OS process id of the current worker, if the transport is
    /// worker-based and a worker exists.
    pub async fn worker_id(&self) -> Option<u32> {
        self.inner.lock().await.worker.as_ref().map(Worker::id)
    }

    /// A point-in-time status report.
    pub async fn status(&self) -> ClientStatus {
        let inner = self.inner.lock().await;
        let (busy, progress) = match &inner.client {
            Some(client) => client.progress_snapshot().await,
            None => (false, None),
        };
        Self::build_status(&inner, busy, progress)
    }

    /// Brings the server's view of `model` current, sending didOpen or
    /// didChange as needed. A no-op when the client is not running.
    ///
    /// # Errors
    ///
    /// Returns an error if the notification cannot be sent.
    pub async fn sync_model(&self, model: &TextModel) -> Result<()> {
        let mut guard = self.inner.lock().await;
        if guard.state != ClientState::Running {
            debug!("sync_model with no running client is a no-op");
            return Ok(());
        }

        let inner = &mut *guard;
        let Some(notification) = inner.documents.sync_params(model)? else {
            return Ok(());
        };
        let Some(client) = inner.client.as_ref() else {
            return Ok(());
        };
        match notification {
            SyncNotification::Open(params) => client.did_open(params).await,
            SyncNotification::Change(params) => client.did_change(params).await,
        }
    }

    /// Tells the server a previously synced model went away. A no-op when
    /// the client is not running or the model was never synced.
    ///
    /// # Errors
    ///
    /// Returns an error if the notification cannot be sent.
    pub async fn close_model(&self, uri: &str) -> Result<()> {
        let mut guard = self.inner.lock().await;
        if guard.state != ClientState::Running {
            return Ok(());
        }

        let inner = &mut *guard;
        let Some(params) = inner.documents.close_params(uri)? else {
            return Ok(());
        };
        let Some(client) = inner.client.as_ref() else {
            return Ok(());
        };
        client.did_close(params).await
    }

    /// Requests hover information at a position in a synced model.
    ///
    /// # Errors
    ///
    /// Returns an error when the client is not running or the request
    /// fails.
    pub async fn hover(&self, uri: &str, position: Position) -> Result<Option<Hover>> {
        let guard = self.inner.lock().await;
        let client = match (&guard.state, guard.client.as_ref()) {
            (ClientState::Running, Some(client)) => client,
            _ => return Err(anyhow!("language client is not running")),
        };

        let params = HoverParams {
            text_document_position_params: TextDocumentPositionParams {
                text_document: TextDocumentIdentifier {
                    uri: uri.parse().map_err(|e| anyhow!("invalid URI {uri}: {e}"))?,
                },
                position,
            },
            work_done_progress_params: lsp_types::WorkDoneProgressParams::default(),
        };
        client.hover(params).await
    }

    /// Diagnostics the server has published for a model URI.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid URI.
    pub async fn diagnostics_for(&self, uri: &str) -> Result<Vec<Diagnostic>> {
        let parsed = uri.parse().map_err(|e| anyhow!("invalid URI {uri}: {e}"))?;
        let guard = self.inner.lock().await;
        match guard.client.as_ref() {
            Some(client) => Ok(client.diagnostics_for(&parsed).await),
            None => Ok(Vec::new()),
        }
    }

    async fn build_transport(inner: &mut Inner) -> Result<Transport, ClientError> {
        match &inner.plan {
            TransportPlan::Socket(socket) => {
                let endpoint = socket.endpoint()?;
                Transport::connect_socket(&endpoint, inner.start_timeout).await
            }
            TransportPlan::Worker => {
                if inner.worker.is_none() {
                    let options = inner.worker_options.as_ref().ok_or(ClientError::NoWorker)?;
                    inner.worker = Some(Worker::spawn(options)?);
                }
                match inner.worker.as_mut() {
                    Some(worker) => worker.channel(),
                    None => Err(ClientError::NoWorker),
                }
            }
        }
    }

    /// Stops the connection. With `keep_worker` the LSP `exit` is skipped
    /// and the worker channel restored so the process can be rebound.
    async fn stop_client(inner: &mut Inner, keep_worker: bool) -> Result<()> {
        let is_worker = matches!(inner.plan, TransportPlan::Worker);
        let Some(client) = inner.client.take() else {
            return Ok(());
        };

        let send_exit = !(is_worker && keep_worker);
        let shutdown = client.shutdown(send_exit).await;
        let restored = client.close().await;

        if is_worker && keep_worker {
            Self::recover_channel(inner, restored);
        } else if is_worker && let Some(mut worker) = inner.worker.take() {
            worker
                .terminate()
                .await
                .context("failed to terminate worker")?;
        }

        inner.documents.clear();
        inner.started_at = None;
        shutdown.context("shutdown request failed")?;
        Ok(())
    }

    fn recover_channel(inner: &mut Inner, restored: Option<Inbound>) {
        if let (Some(worker), Some(Inbound::Worker(inbox))) = (inner.worker.as_mut(), restored) {
            worker.restore_channel(inbox);
        }
    }

    fn spawn_close_watcher(&self, mut closed_rx: watch::Receiver<bool>) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            // Ends silently when the connection is dropped first.
            while closed_rx.changed().await.is_ok() {
                if *closed_rx.borrow() {
                    Self::on_transport_closed(&inner).await;
                    break;
                }
            }
        });
    }

    /// The remote end closed the channel: stop the client, run the on-stop
    /// hook, and report status if configured.
    async fn on_transport_closed(inner: &Arc<Mutex<Inner>>) {
        let mut guard = inner.lock().await;
        if guard.state != ClientState::Running {
            return;
        }
        warn!(
            "language server transport for {} closed remotely, stopping client",
            guard.language_id
        );

        let client = guard.client.take();
        let (busy, progress) = match &client {
            Some(client) => client.progress_snapshot().await,
            None => (false, None),
        };
        if let Some(client) = client {
            let _ = client.close().await;
        }

        // The channel died with the transport; a dead worker is not retained.
        if matches!(guard.plan, TransportPlan::Worker)
            && let Some(mut worker) = guard.worker.take()
        {
            let _ = worker.terminate().await;
        }

        guard.state = ClientState::Stopped;
        guard.documents.clear();
        let status = Self::build_status(&guard, busy, progress);
        guard.started_at = None;

        if let Some(hook) = &guard.hooks.on_stop {
            hook();
        }
        if guard.report_status {
            Self::emit_status(&guard, status);
        }
    }

    fn build_status(inner: &Inner, busy: bool, progress: Option<ProgressState>) -> ClientStatus {
        ClientStatus {
            language_id: inner.language_id.clone(),
            state: inner.state,
            transport: Some(match inner.plan {
                TransportPlan::Socket(_) => "socket",
                TransportPlan::Worker => "worker",
            }),
            started_at: inner.started_at,
            uptime_secs: inner.started_at.map_or(0, |started| {
                u64::try_from((Utc::now() - started).num_seconds()).unwrap_or(0)
            }),
            busy,
            progress_title: progress.as_ref().map(|p| p.title.clone()),
            progress_percentage: progress.and_then(|p| p.percentage),
        }
    }

    fn emit_status(inner: &Inner, status: ClientStatus) {
        if let Ok(json) = serde_json::to_string(&status) {
            info!("language client status: {}", json);
        }
        if let Some(sink) = &inner.status_sink {
            let _ = sink.send(status);
        }
    }
}
