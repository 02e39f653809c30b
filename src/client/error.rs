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

use thiserror::Error;

use super::state::ClientState;

/// Errors from language-client lifecycle operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// An operation was invoked while the client was in the wrong state.
    #[error("invalid client state: expected {expected}, client is {actual}")]
    InvalidState {
        /// What the operation requires.
        expected: &'static str,
        /// The state the client was actually in.
        actual: ClientState,
    },

    /// Restart was requested but no language client is configured.
    #[error("no language client is configured")]
    NotConfigured,

    /// The socket endpoint could not be built or parsed.
    #[error("invalid socket endpoint: {0}")]
    Endpoint(String),

    /// The transport could not be opened.
    #[error("failed to connect language client to {endpoint}")]
    Connect {
        /// The endpoint that was dialed.
        endpoint: String,
        /// The underlying failure.
        #[source]
        source: anyhow::Error,
    },

    /// The transport opened but the server handshake failed.
    #[error("language server handshake failed")]
    Handshake(#[source] anyhow::Error),

    /// The worker process could not be spawned.
    #[error("failed to spawn worker {program}")]
    WorkerSpawn {
        /// The program that was launched.
        program: String,
        /// The underlying failure.
        #[source]
        source: std::io::Error,
    },

    /// The worker process could not be terminated.
    #[error("failed to terminate worker")]
    WorkerTerminate(#[source] std::io::Error),

    /// The worker's message channel is bound to another connection.
    #[error("worker channel is already in use")]
    ChannelBusy,

    /// A worker transport was requested but no worker exists and no
    /// options are available to spawn one.
    #[error("no worker available and no worker options to spawn one")]
    NoWorker,

    /// A replacement worker was supplied for a non-worker transport.
    #[error("a replacement worker was supplied but the transport is not worker-based")]
    UnexpectedWorker,

    /// Stopping the client failed.
    #[error("failed to stop language client")]
    Stop(#[source] anyhow::Error),
}
