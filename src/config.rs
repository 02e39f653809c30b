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

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::client::state::ClientStatus;
use crate::client::transport::{SocketConfig, TransportConfig};
use crate::client::worker::WorkerOptions;
use crate::component::theme::THEME_LIGHT;

/// Editor options that apply to a single editor or diff-editor pair.
///
/// These mirror the option surface of the wrapped editor; only the fields
/// the component orchestrates are modelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorOptions {
    /// Whether the editor rejects edits.
    #[serde(default)]
    pub read_only: bool,

    /// Whether long lines wrap instead of scrolling horizontally.
    #[serde(default)]
    pub word_wrap: bool,

    /// Whether the line-number gutter is shown.
    #[serde(default = "default_true")]
    pub line_numbers: bool,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            read_only: false,
            word_wrap: false,
            line_numbers: true,
        }
    }
}

/// The editor configuration record.
///
/// Created once per component instantiation and mutated in place as
/// properties change; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorConfig {
    /// The buffer content. In diff mode this is the original (left) side.
    #[serde(default)]
    pub code: String,

    /// Language identifier for `code` (e.g. "rust", "json").
    #[serde(default = "default_language_id")]
    pub language_id: String,

    /// The modified (right) side of a diff pair.
    #[serde(default)]
    pub modified_code: Option<String>,

    /// Language identifier for the modified side; falls back to `language_id`.
    #[serde(default)]
    pub modified_language_id: Option<String>,

    /// Editor theme (e.g. "vs-light", "vs-dark").
    #[serde(default = "default_theme")]
    pub theme: String,

    /// Whether to create a diff-editor pair instead of a single editor.
    #[serde(default)]
    pub use_diff_editor: bool,

    /// Remaining editor options.
    #[serde(default)]
    pub options: EditorOptions,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            code: String::new(),
            language_id: default_language_id(),
            modified_code: None,
            modified_language_id: None,
            theme: default_theme(),
            use_diff_editor: false,
            options: EditorOptions::default(),
        }
    }
}

/// A partial update applied to live editors without recreating them.
#[derive(Debug, Clone, Default)]
pub struct OptionsPatch {
    /// New theme, if changing.
    pub theme: Option<String>,
    /// New read-only flag, if changing.
    pub read_only: Option<bool>,
    /// New word-wrap flag, if changing.
    pub word_wrap: Option<bool>,
    /// New line-number flag, if changing.
    pub line_numbers: Option<bool>,
}

impl OptionsPatch {
    /// A patch that changes only the theme.
    #[must_use]
    pub fn theme_only(theme: impl Into<String>) -> Self {
        Self {
            theme: Some(theme.into()),
            ..Self::default()
        }
    }

    /// Folds the patch into a configuration record.
    pub fn apply_to(&self, config: &mut EditorConfig) {
        if let Some(theme) = &self.theme {
            config.theme.clone_from(theme);
        }
        if let Some(read_only) = self.read_only {
            config.options.read_only = read_only;
        }
        if let Some(word_wrap) = self.word_wrap {
            config.options.word_wrap = word_wrap;
        }
        if let Some(line_numbers) = self.line_numbers {
            config.options.line_numbers = line_numbers;
        }
    }
}

/// A lifecycle callback invoked by the language-client wrapper.
pub type LifecycleHook = Box<dyn Fn() + Send + Sync>;

/// Optional start/stop hooks for the language-client wrapper.
#[derive(Default)]
pub struct ClientHooks {
    /// Invoked after the client reaches the running state.
    pub on_start: Option<LifecycleHook>,
    /// Invoked after the client stops, including on transport close.
    pub on_stop: Option<LifecycleHook>,
}

impl std::fmt::Debug for ClientHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientHooks")
            .field("on_start", &self.on_start.as_ref().map(|_| "…"))
            .field("on_stop", &self.on_stop.as_ref().map(|_| "…"))
            .finish()
    }
}

/// Configuration for a single language-client connection.
pub struct LanguageClientConfig {
    /// Language the connection serves; also used for document sync.
    pub language_id: String,

    /// Which transport family to use and how to reach it.
    pub transport: TransportConfig,

    /// Opaque `initializationOptions` passed through the handshake.
    pub initialization_options: Option<serde_json::Value>,

    /// Bound on transport construction and the initialize handshake.
    pub start_timeout: Duration,

    /// Bound on individual requests once running.
    pub request_timeout: Duration,

    /// Whether to emit a status report when the client stops.
    pub report_status: bool,

    /// Where status reports go when `report_status` is set.
    pub status_sink: Option<mpsc::UnboundedSender<ClientStatus>>,

    /// Start/stop callback hooks.
    pub hooks: ClientHooks,
}

impl LanguageClientConfig {
    /// Creates a configuration with default timeouts and no hooks.
    #[must_use]
    pub fn new(language_id: impl Into<String>, transport: TransportConfig) -> Self {
        Self {
            language_id: language_id.into(),
            transport,
            initialization_options: None,
            start_timeout: Duration::from_secs(default_start_timeout()),
            request_timeout: Duration::from_secs(default_start_timeout()),
            report_status: false,
            status_sink: None,
            hooks: ClientHooks::default(),
        }
    }
}

/// A transport entry as it appears in the configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "transport", rename_all = "lowercase")]
pub enum TransportEntry {
    /// WebSocket transport.
    Socket(SocketConfig),
    /// Worker-process transport.
    Worker(WorkerOptions),
}

impl TransportEntry {
    /// Converts the file entry into a live transport configuration.
    #[must_use]
    pub fn into_transport_config(self) -> TransportConfig {
        match self {
            Self::Socket(socket) => TransportConfig::Socket(socket),
            Self::Worker(options) => TransportConfig::WorkerOptions(options),
        }
    }
}

/// Host-level configuration loaded from files and the environment.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Bound in seconds on transport construction and the handshake (default: 30).
    #[serde(default = "default_start_timeout")]
    pub start_timeout: u64,

    /// Default editor theme for new components.
    #[serde(default = "default_theme")]
    pub theme: String,

    /// Transport definitions keyed by language ID (e.g. "rust", "json").
    #[serde(default)]
    pub client: HashMap<String, TransportEntry>,
}

impl Config {
    /// Load configuration from standard paths or a specific file.
    ///
    /// Layering order: built-in defaults, then the user config directory
    /// (`~/.config/pantograph/config.toml`), then `explicit_file`, then
    /// `PANTOGRAPH_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a source fails to parse or deserialize.
    pub fn load(explicit_file: Option<PathBuf>) -> Result<Self> {
        let mut builder = config::Config::builder();

        builder = builder
            .set_default("start_timeout", default_start_timeout())?
            .set_default("theme", default_theme())?;

        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("pantograph").join("config.toml");
            if config_path.exists() {
                builder = builder.add_source(config::File::from(config_path));
            }
        }

        if let Some(path) = explicit_file {
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(config::Environment::with_prefix("PANTOGRAPH"));

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Builds a language-client configuration from the entry for `language_id`.
    ///
    /// Returns `None` when no transport is configured for the language.
    #[must_use]
    pub fn client_config(&self, language_id: &str) -> Option<LanguageClientConfig> {
        let entry = self.client.get(language_id)?.clone();
        let mut client = LanguageClientConfig::new(language_id, entry.into_transport_config());
        client.start_timeout = Duration::from_secs(self.start_timeout);
        Some(client)
    }
}

const fn default_start_timeout() -> u64 {
    30
}

fn default_theme() -> String {
    THEME_LIGHT.to_string()
}

fn default_language_id() -> String {
    "plaintext".to_string()
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_editor_config_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.language_id, "plaintext");
        assert_eq!(config.theme, "vs-light");
        assert!(!config.use_diff_editor);
        assert!(config.modified_code.is_none());
        assert!(config.options.line_numbers);
    }

    #[test]
    fn test_options_patch_theme_only() {
        let mut config = EditorConfig::default();
        config.options.read_only = true;

        OptionsPatch::theme_only("vs-dark").apply_to(&mut config);

        assert_eq!(config.theme, "vs-dark");
        assert!(config.options.read_only, "patch must not touch other fields");
    }

    #[test]
    fn test_options_patch_full() {
        let mut config = EditorConfig::default();
        let patch = OptionsPatch {
            theme: None,
            read_only: Some(true),
            word_wrap: Some(true),
            line_numbers: Some(false),
        };
        patch.apply_to(&mut config);

        assert_eq!(config.theme, "vs-light");
        assert!(config.options.read_only);
        assert!(config.options.word_wrap);
        assert!(!config.options.line_numbers);
    }

    #[test]
    fn test_transport_entry_socket_from_toml() {
        let entry: TransportEntry = serde_json::from_value(serde_json::json!({
            "transport": "socket",
            "secured": false,
            "host": "localhost",
            "port": 30000,
            "path": "sampleServer"
        }))
        .unwrap();

        match entry {
            TransportEntry::Socket(_) => {}
            TransportEntry::Worker(_) => panic!("expected socket entry"),
        }
    }

    #[test]
    fn test_transport_entry_worker_from_toml() {
        let entry: TransportEntry = serde_json::from_value(serde_json::json!({
            "transport": "worker",
            "url": "/usr/local/bin/example-ls",
            "kind": "classic"
        }))
        .unwrap();

        match entry {
            TransportEntry::Worker(options) => {
                assert_eq!(options.url, PathBuf::from("/usr/local/bin/example-ls"));
            }
            TransportEntry::Socket(_) => panic!("expected worker entry"),
        }
    }
}
