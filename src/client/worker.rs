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

//! Background worker processes hosting a language server.
//!
//! A worker owns a child process speaking Content-Length framed JSON-RPC
//! over stdio. The stdout pump runs for the worker's whole lifetime; each
//! language-client connection borrows the message channel and returns it on
//! a clean stop, so a retained worker can be rebound after a restart.

use bytes::BytesMut;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::error::ClientError;
use super::protocol::decode_frame;
use super::transport::{Inbound, Outbound, Transport};

/// How a worker program is launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerKind {
    /// Execute the program directly.
    #[default]
    Classic,
    /// Launch the program as a JavaScript module via `node`, the common
    /// packaging for worker-style language servers.
    Module,
}

/// Descriptor for spawning a worker.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerOptions {
    /// Path to the worker program.
    pub url: PathBuf,

    /// Launch style.
    #[serde(default)]
    pub kind: WorkerKind,

    /// Display name used in logs.
    #[serde(default)]
    pub name: Option<String>,

    /// Extra arguments passed to the program.
    #[serde(default)]
    pub args: Vec<String>,
}

impl WorkerOptions {
    /// Options for a classic worker with no arguments.
    #[must_use]
    pub fn new(url: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            kind: WorkerKind::Classic,
            name: None,
            args: Vec::new(),
        }
    }

    /// Sets the launch style.
    #[must_use]
    pub const fn with_kind(mut self, kind: WorkerKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets extra program arguments.
    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}

/// A running worker process.
pub struct Worker {
    name: Option<String>,
    id: u32,
    child: Child,
    stdin: Arc<Mutex<tokio::process::ChildStdin>>,
    inbox: Option<mpsc::UnboundedReceiver<String>>,
    pump: JoinHandle<()>,
    terminations: u32,
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("terminated", &(self.terminations > 0))
            .finish_non_exhaustive()
    }
}

impl Worker {
    /// Spawns the worker process and starts its stdout pump.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::WorkerSpawn`] if the process cannot be
    /// started or its stdio cannot be captured.
    pub fn spawn(options: &WorkerOptions) -> Result<Self, ClientError> {
        let program = options.url.display().to_string();

        let mut command = match options.kind {
            WorkerKind::Classic => Command::new(&options.url),
            WorkerKind::Module => {
                let mut command = Command::new("node");
                command.arg(&options.url);
                command
            }
        };
        command
            .args(&options.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| ClientError::WorkerSpawn {
            program: program.clone(),
            source,
        })?;

        let stdin = child.stdin.take().ok_or_else(|| ClientError::WorkerSpawn {
            program: program.clone(),
            source: std::io::Error::other("worker stdin not captured"),
        })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ClientError::WorkerSpawn {
                program: program.clone(),
                source: std::io::Error::other("worker stdout not captured"),
            })?;

        let id = child.id().unwrap_or_default();
        let (messages_tx, messages_rx) = mpsc::unbounded_channel();
        let pump = tokio::spawn(Self::pump_stdout(stdout, messages_tx));

        debug!(
            "spawned worker {} (pid {})",
            options.name.as_deref().unwrap_or(&program),
            id
        );

        Ok(Self {
            name: options.name.clone(),
            id,
            child,
            stdin: Arc::new(Mutex::new(stdin)),
            inbox: Some(messages_rx),
            pump,
            terminations: 0,
        })
    }

    /// Reads framed messages off the worker's stdout for the worker's
    /// whole lifetime, across client rebinds.
    async fn pump_stdout(stdout: ChildStdout, messages: mpsc::UnboundedSender<String>) {
        let mut reader = BufReader::new(stdout);
        let mut buffer = BytesMut::with_capacity(8192);

        loop {
            let mut chunk = [0u8; 4096];
            match reader.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => buffer.extend_from_slice(&chunk[..n]),
                Err(e) => {
                    warn!("error reading worker stdout: {}", e);
                    break;
                }
            }

            loop {
                match decode_frame(&mut buffer) {
                    Ok(Some(body)) => {
                        if messages.send(body).is_err() {
                            return;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("malformed frame from worker: {}", e);
                        return;
                    }
                }
            }
        }
        debug!("worker stdout closed");
    }

    /// Takes the message channel, producing a transport bound to this
    /// worker.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ChannelBusy`] while another connection holds
    /// the channel.
    pub(crate) fn channel(&mut self) -> Result<Transport, ClientError> {
        let inbox = self.inbox.take().ok_or(ClientError::ChannelBusy)?;
        Ok(Transport {
            outbound: Outbound::Worker(self.stdin.clone()),
            inbound: Inbound::Worker(inbox),
            kind: "worker",
        })
    }

    /// Returns the message channel after a clean client stop so the worker
    /// can be rebound.
    pub(crate) fn restore_channel(&mut self, inbox: mpsc::UnboundedReceiver<String>) {
        self.inbox = Some(inbox);
    }

    /// Kills the worker process. Idempotent: only the first call acts.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::WorkerTerminate`] if the kill signal cannot
    /// be delivered.
    pub async fn terminate(&mut self) -> Result<(), ClientError> {
        if self.terminations > 0 {
            warn!("worker {} already terminated", self.id);
            return Ok(());
        }
        self.terminations += 1;

        self.pump.abort();
        self.child.start_kill().map_err(ClientError::WorkerTerminate)?;
        let _ = self.child.wait().await;

        debug!("terminated worker {}", self.id);
        Ok(())
    }

    /// Whether `terminate` has run.
    #[must_use]
    pub const fn is_terminated(&self) -> bool {
        self.terminations > 0
    }

    /// OS process id of the worker.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Display name, if one was configured.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}
