// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

/// Editor app owning live editor and diff-editor instances.
pub mod app;
/// In-memory text models.
pub mod model;
/// Shared, init-at-most-once editor services.
pub mod services;

pub use app::{CodeEditor, DiffEditor, EditorApp, EditorError, Surface};
pub use model::TextModel;
pub use services::EditorServices;
