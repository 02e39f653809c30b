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

//! Transport families for the language client.
//!
//! A transport is one message channel: a WebSocket carrying one JSON-RPC
//! message per text frame, or a worker process speaking Content-Length
//! framed JSON-RPC over stdio. Both are unified behind [`Outbound`] /
//! [`Inbound`] halves so the connection layer never branches on the family.

use anyhow::{Context, Result, anyhow};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::process::ChildStdin;
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace, warn};
use url::Url;

use super::error::ClientError;
use super::protocol::encode_frame;
use super::worker::{Worker, WorkerOptions};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Structured options for building a WebSocket endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SocketOptions {
    /// Use `wss://` instead of `ws://`.
    #[serde(default)]
    pub secured: bool,

    /// Host name or address of the language server.
    pub host: String,

    /// Port, omitted from the URL when absent.
    #[serde(default)]
    pub port: Option<u16>,

    /// Path below the host, with or without a leading slash.
    #[serde(default)]
    pub path: Option<String>,
}

impl SocketOptions {
    /// Builds the `ws://` / `wss://` URL these options describe.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Endpoint`] if the pieces do not form a valid
    /// URL.
    pub fn endpoint(&self) -> Result<Url, ClientError> {
        let scheme = if self.secured { "wss" } else { "ws" };
        let mut endpoint = format!("{scheme}://{}", self.host);
        if let Some(port) = self.port {
            endpoint.push(':');
            endpoint.push_str(&port.to_string());
        }
        if let Some(path) = &self.path {
            endpoint.push('/');
            endpoint.push_str(path.trim_start_matches('/'));
        }
        Url::parse(&endpoint).map_err(|e| ClientError::Endpoint(format!("{endpoint}: {e}")))
    }
}

/// Socket transport configuration: structured options or a literal URL.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SocketConfig {
    /// A literal endpoint URL.
    Url {
        /// The full `ws://` / `wss://` URL.
        url: String,
    },
    /// Structured options the URL is built from.
    Options(SocketOptions),
}

impl SocketConfig {
    /// Resolves the endpoint URL.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Endpoint`] for an unparseable URL or options
    /// that do not form one.
    pub fn endpoint(&self) -> Result<Url, ClientError> {
        match self {
            Self::Url { url } => {
                Url::parse(url).map_err(|e| ClientError::Endpoint(format!("{url}: {e}")))
            }
            Self::Options(options) => options.endpoint(),
        }
    }
}

/// Which transport family a language client uses, and how to build it.
pub enum TransportConfig {
    /// WebSocket transport.
    Socket(SocketConfig),
    /// Worker transport, spawned lazily from options.
    WorkerOptions(WorkerOptions),
    /// Worker transport over an already-constructed worker.
    Worker(Worker),
}

/// A live transport: one outbound and one inbound half.
pub(crate) struct Transport {
    pub(crate) outbound: Outbound,
    pub(crate) inbound: Inbound,
    pub(crate) kind: &'static str,
}

impl Transport {
    /// Opens a WebSocket transport, bounding the connect by `timeout`.
    pub(crate) async fn connect_socket(
        endpoint: &Url,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        debug!("connecting language client socket to {}", endpoint);

        let connected = tokio::time::timeout(timeout, connect_async(endpoint.as_str()))
            .await
            .map_err(|_| ClientError::Connect {
                endpoint: endpoint.to_string(),
                source: anyhow!("timed out after {timeout:?}"),
            })?
            .map_err(|e| ClientError::Connect {
                endpoint: endpoint.to_string(),
                source: anyhow!(e),
            })?;

        let (sink, stream) = connected.0.split();
        Ok(Self {
            outbound: Outbound::Socket(Arc::new(Mutex::new(sink))),
            inbound: Inbound::Socket(stream),
            kind: "socket",
        })
    }
}

/// The sending half of a transport. Cheap to clone; the reader task keeps a
/// copy to answer server-to-client requests.
#[derive(Clone)]
pub(crate) enum Outbound {
    Socket(Arc<Mutex<SplitSink<WsStream, Message>>>),
    Worker(Arc<Mutex<ChildStdin>>),
}

impl Outbound {
    /// Sends one JSON-RPC message body.
    pub(crate) async fn send(&self, body: &str) -> Result<()> {
        trace!("sending message: {}", body);
        match self {
            Self::Socket(sink) => sink
                .lock()
                .await
                .send(Message::Text(body.to_string()))
                .await
                .context("failed to send WebSocket frame"),
            Self::Worker(stdin) => {
                let frame = encode_frame(body);
                let mut stdin = stdin.lock().await;
                stdin
                    .write_all(frame.as_bytes())
                    .await
                    .context("failed to write to worker stdin")?;
                stdin.flush().await.context("failed to flush worker stdin")
            }
        }
    }
}

/// The receiving half of a transport.
pub(crate) enum Inbound {
    Socket(SplitStream<WsStream>),
    Worker(mpsc::UnboundedReceiver<String>),
}

impl Inbound {
    /// The next complete JSON-RPC message body, or `None` once the
    /// transport has closed.
    pub(crate) async fn next_message(&mut self) -> Option<String> {
        match self {
            Self::Socket(stream) => loop {
                match stream.next().await {
                    Some(Ok(Message::Text(text))) => return Some(text),
                    Some(Ok(Message::Close(_))) | None => return None,
                    Some(Ok(_)) => {} // ping/pong/binary frames are not ours
                    Some(Err(e)) => {
                        warn!("WebSocket read error: {}", e);
                        return None;
                    }
                }
            },
            Self::Worker(inbox) => inbox.recv().await,
        }
    }
}
