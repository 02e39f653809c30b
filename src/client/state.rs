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

//! Client run state, progress tracking, and status reports.

use chrono::{DateTime, Utc};
use lsp_types::{NumberOrString, ProgressParams, ProgressParamsValue, WorkDoneProgress};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

/// Token type for progress tracking (string or number).
pub type ProgressToken = NumberOrString;

/// Run state of the language-client wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientState {
    /// No start has been attempted yet.
    Unstarted,
    /// A start is in flight.
    Starting,
    /// The connection is live.
    Running,
    /// A stop is in flight.
    Stopping,
    /// The connection has been stopped; start may be called again.
    Stopped,
    /// Terminal: the wrapper has been disposed.
    Disposed,
}

impl ClientState {
    /// Lowercase name used in status reports and error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unstarted => "unstarted",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Disposed => "disposed",
        }
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of an active progress operation reported by the server.
#[derive(Debug, Clone)]
pub struct ProgressState {
    /// The title of the progress operation.
    pub title: String,
    /// The optional progress message.
    pub message: Option<String>,
    /// The optional progress percentage (0-100).
    pub percentage: Option<u32>,
    /// When the operation started.
    pub started: Instant,
}

/// Status report emitted when the client stops or on demand.
#[derive(Debug, Clone, Serialize)]
pub struct ClientStatus {
    /// The language ID this connection serves.
    pub language_id: String,
    /// Current run state.
    pub state: ClientState,
    /// Transport family in use ("socket" or "worker"), if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<&'static str>,
    /// When the client reached the running state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// Seconds since the client reached the running state.
    pub uptime_secs: u64,
    /// Whether the server reported unfinished progress operations.
    pub busy: bool,
    /// Active progress title, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_title: Option<String>,
    /// Active progress percentage, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_percentage: Option<u32>,
}

/// Tracks `$/progress` operations for a single connection.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    active_progress: HashMap<ProgressToken, ProgressState>,
}

impl ProgressTracker {
    /// Creates a new `ProgressTracker`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Update state from a progress notification.
    pub fn update(&mut self, params: &ProgressParams) {
        match &params.value {
            ProgressParamsValue::WorkDone(progress) => match progress {
                WorkDoneProgress::Begin(begin) => {
                    self.active_progress.insert(
                        params.token.clone(),
                        ProgressState {
                            title: begin.title.clone(),
                            message: begin.message.clone(),
                            percentage: begin.percentage,
                            started: Instant::now(),
                        },
                    );
                }
                WorkDoneProgress::Report(report) => {
                    if let Some(state) = self.active_progress.get_mut(&params.token) {
                        if report.message.is_some() {
                            state.message.clone_from(&report.message);
                        }
                        if report.percentage.is_some() {
                            state.percentage = report.percentage;
                        }
                    }
                }
                WorkDoneProgress::End(_) => {
                    self.active_progress.remove(&params.token);
                }
            },
        }
    }

    /// Returns true if the server is busy with any progress operations.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        !self.active_progress.is_empty()
    }

    /// Returns the most significant active progress (lowest percentage).
    #[must_use]
    pub fn primary_progress(&self) -> Option<&ProgressState> {
        self.active_progress
            .values()
            .min_by_key(|p| p.percentage.unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    fn make_progress_params(token: &str, progress: WorkDoneProgress) -> ProgressParams {
        ProgressParams {
            token: NumberOrString::String(token.to_string()),
            value: ProgressParamsValue::WorkDone(progress),
        }
    }

    #[test]
    fn test_progress_begin_end() -> Result<()> {
        let mut tracker = ProgressTracker::new();
        assert!(!tracker.is_busy());

        let begin = make_progress_params(
            "indexing",
            WorkDoneProgress::Begin(lsp_types::WorkDoneProgressBegin {
                title: "Indexing".to_string(),
                cancellable: None,
                message: Some("src/lib.rs".to_string()),
                percentage: Some(0),
            }),
        );
        tracker.update(&begin);

        assert!(tracker.is_busy());
        let primary = tracker.primary_progress().context("missing progress")?;
        assert_eq!(primary.title, "Indexing");
        assert_eq!(primary.percentage, Some(0));

        let end = make_progress_params(
            "indexing",
            WorkDoneProgress::End(lsp_types::WorkDoneProgressEnd { message: None }),
        );
        tracker.update(&end);

        assert!(!tracker.is_busy());
        Ok(())
    }

    #[test]
    fn test_progress_report_updates_fields() -> Result<()> {
        let mut tracker = ProgressTracker::new();

        let begin = make_progress_params(
            "indexing",
            WorkDoneProgress::Begin(lsp_types::WorkDoneProgressBegin {
                title: "Indexing".to_string(),
                cancellable: None,
                message: None,
                percentage: Some(0),
            }),
        );
        tracker.update(&begin);

        let report = make_progress_params(
            "indexing",
            WorkDoneProgress::Report(lsp_types::WorkDoneProgressReport {
                cancellable: None,
                message: Some("half way".to_string()),
                percentage: Some(50),
            }),
        );
        tracker.update(&report);

        let primary = tracker.primary_progress().context("missing progress")?;
        assert_eq!(primary.percentage, Some(50));
        assert_eq!(primary.message, Some("half way".to_string()));
        Ok(())
    }

    #[test]
    fn test_client_state_display() {
        assert_eq!(ClientState::Unstarted.to_string(), "unstarted");
        assert_eq!(ClientState::Running.to_string(), "running");
        assert_eq!(ClientState::Disposed.to_string(), "disposed");
    }

    #[test]
    fn test_status_serializes_lowercase_state() {
        let status = ClientStatus {
            language_id: "json".to_string(),
            state: ClientState::Stopped,
            transport: Some("socket"),
            started_at: None,
            uptime_secs: 0,
            busy: false,
            progress_title: None,
            progress_percentage: None,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "stopped");
        assert_eq!(json["transport"], "socket");
    }
}
