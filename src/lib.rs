// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Pantograph is an embeddable code-editor component paired with a
//! language-client bridge.
//!
//! It keeps a reflected-property editor component, the editor instances it
//! owns, and a single language-client connection in sync, speaking to a
//! language server over a WebSocket or a background worker process.

/// Language-client wrapper, transports, and the logical connection.
pub mod client;
/// Reflected-property editor component and its injected capabilities.
pub mod component;
/// Editor and language-client configuration, plus the file/env layer.
pub mod config;
/// Editor app, text models, and shared editor services.
pub mod editor;
