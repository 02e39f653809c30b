// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Integration tests for the language-client wrapper lifecycle.
//!
//! Socket tests run against an in-process WebSocket mock server; worker
//! tests spawn the `mockls` fixture binary over stdio.

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};

use pantograph::client::{
    ClientError, ClientState, LanguageClientWrapper, SocketConfig, SocketOptions, TransportConfig,
    Worker, WorkerOptions,
};
use pantograph::config::LanguageClientConfig;
use pantograph::editor::EditorServices;

/// How the mock WebSocket server behaves after the handshake.
#[derive(Clone, Copy, PartialEq)]
enum MockBehavior {
    /// Serve requests until the client disconnects.
    Normal,
    /// Close the connection as soon as `initialized` arrives.
    CloseAfterInitialized,
}

/// Spawns a mock language server speaking JSON-RPC over WebSocket text
/// frames. Returns the `ws://` URL. Each accepted connection bumps
/// `connections`.
async fn spawn_mock_server(
    connections: Arc<AtomicUsize>,
    behavior: MockBehavior,
) -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            connections.fetch_add(1, Ordering::SeqCst);

            tokio::spawn(async move {
                let Ok(mut ws) = accept_async(stream).await else {
                    return;
                };

                while let Some(Ok(message)) = ws.next().await {
                    let Message::Text(text) = message else {
                        continue;
                    };
                    let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) else {
                        continue;
                    };

                    let method = value.get("method").and_then(|m| m.as_str());
                    let id = value.get("id").cloned();

                    match (method, id) {
                        (Some("initialize"), Some(id)) => {
                            let response = serde_json::json!({
                                "jsonrpc": "2.0",
                                "id": id,
                                "result": {
                                    "capabilities": { "hoverProvider": true },
                                    "serverInfo": { "name": "mockws" }
                                }
                            });
                            if ws.send(Message::Text(response.to_string())).await.is_err() {
                                break;
                            }
                        }
                        (Some("initialized"), None) => {
                            if behavior == MockBehavior::CloseAfterInitialized {
                                let _ = ws.close(None).await;
                                break;
                            }
                        }
                        (Some("shutdown"), Some(id)) => {
                            let response = serde_json::json!({
                                "jsonrpc": "2.0",
                                "id": id,
                                "result": null
                            });
                            if ws.send(Message::Text(response.to_string())).await.is_err() {
                                break;
                            }
                        }
                        (Some("exit"), None) => {
                            let _ = ws.close(None).await;
                            break;
                        }
                        (Some(method), Some(id)) => {
                            let response = serde_json::json!({
                                "jsonrpc": "2.0",
                                "id": id,
                                "error": {
                                    "code": -32601,
                                    "message": format!("not supported: {method}")
                                }
                            });
                            if ws.send(Message::Text(response.to_string())).await.is_err() {
                                break;
                            }
                        }
                        _ => {}
                    }
                }
            });
        }
    });

    Ok(format!("ws://{addr}"))
}

fn socket_config(url: String) -> LanguageClientConfig {
    let mut config =
        LanguageClientConfig::new("json", TransportConfig::Socket(SocketConfig::Url { url }));
    config.start_timeout = Duration::from_secs(5);
    config.request_timeout = Duration::from_secs(5);
    config
}

fn worker_config(options: WorkerOptions) -> LanguageClientConfig {
    let mut config =
        LanguageClientConfig::new("plaintext", TransportConfig::WorkerOptions(options));
    config.start_timeout = Duration::from_secs(10);
    config.request_timeout = Duration::from_secs(10);
    config
}

fn mockls_options() -> WorkerOptions {
    WorkerOptions::new(env!("CARGO_BIN_EXE_mockls")).with_name("mockls")
}

/// Polls a condition for a few seconds.
async fn eventually(mut condition: impl AsyncFnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

/// Check whether a process is still running.
fn process_alive(pid: u32) -> bool {
    #[cfg(target_os = "linux")]
    {
        std::path::Path::new("/proc").join(pid.to_string()).exists()
    }

    #[cfg(not(target_os = "linux"))]
    {
        std::process::Command::new("kill")
            .arg("-0")
            .arg(pid.to_string())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

#[tokio::test]
async fn test_start_twice_creates_one_transport() -> Result<()> {
    let connections = Arc::new(AtomicUsize::new(0));
    let url = spawn_mock_server(connections.clone(), MockBehavior::Normal).await?;

    let wrapper = LanguageClientWrapper::new(socket_config(url));
    wrapper.start().await?;
    assert!(wrapper.is_running().await);

    // Second start resolves immediately without a second connection.
    wrapper.start().await?;
    assert_eq!(connections.load(Ordering::SeqCst), 1);

    wrapper.dispose(false).await?;
    assert_eq!(wrapper.state().await, ClientState::Disposed);
    Ok(())
}

#[tokio::test]
async fn test_connect_failure_rejects_start() -> Result<()> {
    // Bind then drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    drop(listener);

    let config = {
        let mut config = LanguageClientConfig::new(
            "json",
            TransportConfig::Socket(SocketConfig::Options(SocketOptions {
                secured: false,
                host: "127.0.0.1".to_string(),
                port: Some(port),
                path: None,
            })),
        );
        config.start_timeout = Duration::from_secs(5);
        config
    };

    let wrapper = LanguageClientWrapper::new(config);
    let err = wrapper.start().await.err().context("start must fail")?;
    assert!(matches!(err, ClientError::Connect { .. }), "got: {err}");
    assert_eq!(wrapper.state().await, ClientState::Stopped);
    Ok(())
}

#[tokio::test]
async fn test_dispose_never_started_rejects() -> Result<()> {
    let connections = Arc::new(AtomicUsize::new(0));
    let url = spawn_mock_server(connections, MockBehavior::Normal).await?;

    let wrapper = LanguageClientWrapper::new(socket_config(url));
    let err = wrapper.dispose(false).await.err().context("must fail")?;
    assert!(matches!(
        err,
        ClientError::InvalidState {
            actual: ClientState::Unstarted,
            ..
        }
    ));
    Ok(())
}

#[tokio::test]
async fn test_transport_close_stops_client_and_runs_hook() -> Result<()> {
    let connections = Arc::new(AtomicUsize::new(0));
    let url = spawn_mock_server(connections, MockBehavior::CloseAfterInitialized).await?;

    let stops = Arc::new(AtomicUsize::new(0));
    let (status_tx, mut status_rx) = mpsc::unbounded_channel();

    let mut config = socket_config(url);
    config.report_status = true;
    config.status_sink = Some(status_tx);
    config.hooks.on_stop = Some(Box::new({
        let stops = Arc::clone(&stops);
        move || {
            stops.fetch_add(1, Ordering::SeqCst);
        }
    }));

    let wrapper = LanguageClientWrapper::new(config);
    wrapper.start().await?;

    // The server closes right after the handshake; the wrapper must move
    // to Stopped on its own.
    assert!(eventually(async || wrapper.state().await == ClientState::Stopped).await);
    assert_eq!(stops.load(Ordering::SeqCst), 1, "on_stop must run exactly once");

    let status = status_rx.recv().await.context("missing status report")?;
    assert_eq!(status.state, ClientState::Stopped);
    assert_eq!(status.transport, Some("socket"));
    Ok(())
}

#[tokio::test]
async fn test_worker_lifecycle_with_document_sync() -> Result<()> {
    let wrapper = LanguageClientWrapper::new(worker_config(mockls_options()));
    wrapper.start().await?;
    let pid = wrapper.worker_id().await.context("missing worker pid")?;
    assert!(process_alive(pid));

    // Open a model, then hover through the running client.
    let services = EditorServices::new();
    let mut model = services.create_model("plaintext", "hello worker")?;
    wrapper.sync_model(&model).await?;

    let hover = wrapper
        .hover(model.uri(), lsp_types::Position::new(0, 0))
        .await?
        .context("missing hover result")?;
    let rendered = serde_json::to_string(&hover)?;
    assert!(rendered.contains("mockls hover"), "got: {rendered}");

    // A change containing the marker provokes a diagnostic.
    model.set_value("hello !! worker");
    wrapper.sync_model(&model).await?;
    assert!(
        eventually(async || {
            wrapper
                .diagnostics_for(model.uri())
                .await
                .map(|d| d.len() == 1)
                .unwrap_or(false)
        })
        .await,
        "diagnostic never arrived"
    );

    wrapper.dispose(false).await?;
    assert!(
        eventually(async || !process_alive(pid)).await,
        "worker must be terminated on dispose"
    );
    Ok(())
}

#[tokio::test]
async fn test_restart_with_replacement_worker() -> Result<()> {
    let first = Worker::spawn(&mockls_options())?;
    let first_pid = first.id();

    let mut config = LanguageClientConfig::new("plaintext", TransportConfig::Worker(first));
    config.start_timeout = Duration::from_secs(10);
    config.request_timeout = Duration::from_secs(10);

    let wrapper = LanguageClientWrapper::new(config);
    wrapper.start().await?;
    assert_eq!(wrapper.worker_id().await, Some(first_pid));

    let replacement = Worker::spawn(&mockls_options())?;
    let replacement_pid = replacement.id();

    wrapper.restart(Some(replacement), false).await?;

    // Only the new worker is in use; the prior one is gone.
    assert_eq!(wrapper.worker_id().await, Some(replacement_pid));
    assert!(wrapper.is_running().await);
    assert!(
        eventually(async || !process_alive(first_pid)).await,
        "prior worker must be disposed"
    );
    assert!(process_alive(replacement_pid));

    wrapper.dispose(false).await?;
    Ok(())
}

#[tokio::test]
async fn test_restart_keep_worker_reuses_handle() -> Result<()> {
    let wrapper = LanguageClientWrapper::new(worker_config(mockls_options()));
    wrapper.start().await?;
    let pid = wrapper.worker_id().await.context("missing worker pid")?;

    wrapper.restart(None, true).await?;

    assert_eq!(
        wrapper.worker_id().await,
        Some(pid),
        "the worker handle must be left intact and reused"
    );
    assert!(wrapper.is_running().await);
    assert!(process_alive(pid));

    wrapper.dispose(false).await?;
    Ok(())
}

#[tokio::test]
async fn test_dispose_keep_worker_transfers_ownership() -> Result<()> {
    let wrapper = LanguageClientWrapper::new(worker_config(mockls_options()));
    wrapper.start().await?;
    let pid = wrapper.worker_id().await.context("missing worker pid")?;

    let retained = wrapper.dispose(true).await?;
    let mut worker = retained.context("dispose(keep_worker) must return the handle")?;

    assert_eq!(worker.id(), pid);
    assert!(!worker.is_terminated());
    assert!(process_alive(pid), "retained worker must stay alive");

    worker.terminate().await?;
    assert!(eventually(async || !process_alive(pid)).await);
    Ok(())
}

#[tokio::test]
async fn test_worker_handshake_failure_rejects_start() -> Result<()> {
    let options = mockls_options().with_args(vec!["--fail-initialize".to_string()]);
    let wrapper = LanguageClientWrapper::new(worker_config(options));

    let err = wrapper.start().await.err().context("start must fail")?;
    assert!(matches!(err, ClientError::Handshake(_)), "got: {err}");
    assert_eq!(wrapper.state().await, ClientState::Stopped);
    Ok(())
}
