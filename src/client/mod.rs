// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

/// The logical language-client connection over a transport.
pub mod connection;
/// Editor-model to language-server document synchronization.
pub mod documents;
/// Lifecycle error taxonomy.
pub mod error;
/// JSON-RPC message types and Content-Length framing.
pub mod protocol;
/// Client run state, progress tracking, and status reports.
pub mod state;
/// Socket and worker transport families.
pub mod transport;
/// Background worker processes hosting a language server.
pub mod worker;
/// The language-client wrapper and its state machine.
pub mod wrapper;

pub use connection::LanguageClient;
pub use documents::DocumentSync;
pub use error::ClientError;
pub use state::{ClientState, ClientStatus, ProgressTracker};
pub use transport::{SocketConfig, SocketOptions, TransportConfig};
pub use worker::{Worker, WorkerKind, WorkerOptions};
pub use wrapper::LanguageClientWrapper;
