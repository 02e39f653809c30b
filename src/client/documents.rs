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

use anyhow::{Result, anyhow};
use lsp_types::{
    DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams,
    TextDocumentContentChangeEvent, TextDocumentIdentifier, TextDocumentItem, Uri,
    VersionedTextDocumentIdentifier,
};
use std::collections::HashMap;
use tracing::trace;

use crate::editor::TextModel;

/// Notification to send to the language server for a model.
pub enum SyncNotification {
    /// The model is newly visible to the server.
    Open(DidOpenTextDocumentParams),
    /// The model changed since the server last saw it.
    Change(DidChangeTextDocumentParams),
}

/// Tracks which editor models the language server has seen, and at what
/// version.
///
/// The server requires documents to be opened before most operations; this
/// tracker turns model state into the didOpen/didChange/didClose
/// notifications that keep the server's view current. Sync is full-content:
/// the orchestration layer has no incremental edits to forward.
#[derive(Debug, Default)]
pub struct DocumentSync {
    open: HashMap<String, i32>,
}

impl DocumentSync {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Produces the notification that brings the server's view of `model`
    /// current, or `None` when it already is.
    ///
    /// # Errors
    ///
    /// Returns an error if the model URI is not a valid URI.
    pub fn sync_params(&mut self, model: &TextModel) -> Result<Option<SyncNotification>> {
        let uri = parse_uri(model.uri())?;

        match self.open.get_mut(model.uri()) {
            None => {
                self.open.insert(model.uri().to_string(), model.version());
                Ok(Some(SyncNotification::Open(DidOpenTextDocumentParams {
                    text_document: TextDocumentItem {
                        uri,
                        language_id: model.language_id().to_string(),
                        version: model.version(),
                        text: model.value().to_string(),
                    },
                })))
            }
            Some(seen) if *seen < model.version() => {
                *seen = model.version();
                Ok(Some(SyncNotification::Change(DidChangeTextDocumentParams {
                    text_document: VersionedTextDocumentIdentifier {
                        uri,
                        version: model.version(),
                    },
                    content_changes: vec![TextDocumentContentChangeEvent {
                        range: None,
                        range_length: None,
                        text: model.value().to_string(),
                    }],
                })))
            }
            Some(_) => {
                trace!("model {} already current at the server", model.uri());
                Ok(None)
            }
        }
    }

    /// Produces the close notification for a previously synced URI, or
    /// `None` if the server never saw it.
    ///
    /// # Errors
    ///
    /// Returns an error if `uri` is not a valid URI.
    pub fn close_params(&mut self, uri: &str) -> Result<Option<DidCloseTextDocumentParams>> {
        if self.open.remove(uri).is_none() {
            return Ok(None);
        }
        Ok(Some(DidCloseTextDocumentParams {
            text_document: TextDocumentIdentifier {
                uri: parse_uri(uri)?,
            },
        }))
    }

    /// Whether the server has seen this URI.
    #[must_use]
    pub fn is_open(&self, uri: &str) -> bool {
        self.open.contains_key(uri)
    }

    /// Forgets everything; used when a connection goes away.
    pub fn clear(&mut self) {
        self.open.clear();
    }
}

fn parse_uri(uri: &str) -> Result<Uri> {
    uri.parse()
        .map_err(|e| anyhow!("invalid model URI {uri}: {e}"))
}
