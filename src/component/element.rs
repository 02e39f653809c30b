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

//! The reflected-property editor component.
//!
//! A host-neutral stand-in for a custom element: external attribute writes
//! and imperative setters both funnel through one `on_property_changed`
//! dispatch into the configuration record. Nothing re-renders until the
//! first `render` or an explicit update call, except theme changes, which
//! patch live editors in place.

use anyhow::Result;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;

use super::inline::InlineConfigProvider;
use super::theme::ColorScheme;
use crate::client::error::ClientError;
use crate::client::worker::Worker;
use crate::client::wrapper::LanguageClientWrapper;
use crate::config::{EditorConfig, LanguageClientConfig, OptionsPatch};
use crate::editor::{EditorApp, EditorServices, Surface};

/// Errors from the component's attribute surface.
#[derive(Debug, Error)]
pub enum ComponentError {
    /// The attribute name is not one the component reflects.
    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),

    /// The attribute value could not be parsed.
    #[error("invalid value for attribute {name}: {value:?}")]
    InvalidValue {
        /// The attribute that was set.
        name: String,
        /// The rejected value.
        value: String,
    },
}

/// A reflected component property change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Property {
    /// Buffer content (original side in diff mode).
    Code(String),
    /// Language id for the buffer.
    LanguageId(String),
    /// Modified-side content.
    ModifiedCode(String),
    /// Modified-side language id.
    ModifiedLanguageId(String),
    /// Editor theme.
    Theme(String),
    /// Whether inline configuration is consulted on first render.
    EnableInlineConfig(bool),
    /// Whether to create a diff-editor pair.
    UseDiffEditor(bool),
}

/// The editor component: reflected attributes, an editor app, and an
/// optional language client.
pub struct EditorComponent {
    id: String,
    app: EditorApp,
    wrapper: Option<LanguageClientWrapper>,
    inline_provider: Option<Arc<dyn InlineConfigProvider>>,
    enable_inline_config: bool,
    surface: Option<Surface>,
    rendered: bool,
}

impl EditorComponent {
    /// Creates a component with a default configuration.
    #[must_use]
    pub fn new(id: impl Into<String>, services: Arc<EditorServices>) -> Self {
        Self::with_config(id, services, EditorConfig::default())
    }

    /// Creates a component with an explicit initial configuration.
    #[must_use]
    pub fn with_config(
        id: impl Into<String>,
        services: Arc<EditorServices>,
        config: EditorConfig,
    ) -> Self {
        Self {
            id: id.into(),
            app: EditorApp::new(services, config),
            wrapper: None,
            inline_provider: None,
            enable_inline_config: false,
            surface: None,
            rendered: false,
        }
    }

    /// The component's id, also used for inline-config lookups.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Injects the inline-configuration capability.
    pub fn set_inline_config_provider(&mut self, provider: Arc<dyn InlineConfigProvider>) {
        self.inline_provider = Some(provider);
    }

    /// Configures a language client; the connection starts on render.
    pub fn set_language_client_config(&mut self, config: LanguageClientConfig) {
        self.wrapper = Some(LanguageClientWrapper::new(config));
    }

    /// Reflects an external attribute write into the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown attribute name or an unparseable
    /// boolean value.
    pub fn set_attribute(&mut self, name: &str, value: &str) -> Result<(), ComponentError> {
        let property = match name {
            "code" => Property::Code(value.to_string()),
            "language-id" => Property::LanguageId(value.to_string()),
            "modified-code" => Property::ModifiedCode(value.to_string()),
            "modified-language-id" => Property::ModifiedLanguageId(value.to_string()),
            "theme" => Property::Theme(value.to_string()),
            "enable-inline-config" => Property::EnableInlineConfig(parse_bool(name, value)?),
            "use-diff-editor" => Property::UseDiffEditor(parse_bool(name, value)?),
            other => return Err(ComponentError::UnknownAttribute(other.to_string())),
        };
        self.on_property_changed(property);
        Ok(())
    }

    /// Reads an attribute back out of the configuration.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<String> {
        let config = self.app.config();
        match name {
            "code" => Some(config.code.clone()),
            "language-id" => Some(config.language_id.clone()),
            "modified-code" => config.modified_code.clone(),
            "modified-language-id" => config.modified_language_id.clone(),
            "theme" => Some(config.theme.clone()),
            "enable-inline-config" => Some(self.enable_inline_config.to_string()),
            "use-diff-editor" => Some(config.use_diff_editor.to_string()),
            _ => None,
        }
    }

    /// The property-change dispatch table.
    ///
    /// Every property lands in the configuration record; only theme
    /// changes additionally patch live editors, without recreating them.
    pub fn on_property_changed(&mut self, property: Property) {
        match property {
            Property::Code(code) => self.app.config_mut().code = code,
            Property::LanguageId(language_id) => self.app.config_mut().language_id = language_id,
            Property::ModifiedCode(code) => self.app.config_mut().modified_code = Some(code),
            Property::ModifiedLanguageId(language_id) => {
                self.app.config_mut().modified_language_id = Some(language_id);
            }
            Property::Theme(theme) => self.app.update_config(&OptionsPatch::theme_only(theme)),
            Property::EnableInlineConfig(enabled) => self.enable_inline_config = enabled,
            Property::UseDiffEditor(use_diff) => {
                self.app.config_mut().use_diff_editor = use_diff;
            }
        }
    }

    /// Sets the buffer content property.
    pub fn set_code(&mut self, code: impl Into<String>) {
        self.on_property_changed(Property::Code(code.into()));
    }

    /// Sets the language-id property.
    pub fn set_language_id(&mut self, language_id: impl Into<String>) {
        self.on_property_changed(Property::LanguageId(language_id.into()));
    }

    /// Sets the modified-side content property.
    pub fn set_modified_code(&mut self, code: impl Into<String>) {
        self.on_property_changed(Property::ModifiedCode(code.into()));
    }

    /// Sets the modified-side language-id property.
    pub fn set_modified_language_id(&mut self, language_id: impl Into<String>) {
        self.on_property_changed(Property::ModifiedLanguageId(language_id.into()));
    }

    /// Sets the theme property, patching live editors in place.
    pub fn set_theme(&mut self, theme: impl Into<String>) {
        self.on_property_changed(Property::Theme(theme.into()));
    }

    /// Sets the inline-config flag.
    pub fn set_enable_inline_config(&mut self, enabled: bool) {
        self.on_property_changed(Property::EnableInlineConfig(enabled));
    }

    /// Sets the diff-mode flag.
    pub fn set_use_diff_editor(&mut self, use_diff: bool) {
        self.on_property_changed(Property::UseDiffEditor(use_diff));
    }

    /// Renders the component into a surface.
    ///
    /// On the first render, inline configuration is loaded (when enabled)
    /// before editors are created; a configured language client is started
    /// and the primary model synced to it.
    ///
    /// # Errors
    ///
    /// Returns the editor misconfiguration or client start failure.
    pub async fn render(&mut self, surface: Surface) -> Result<()> {
        if !self.rendered && self.enable_inline_config {
            self.load_inline_config();
        }

        self.app.init();
        self.app.create_editors(&surface)?;
        self.surface = Some(surface);
        self.rendered = true;

        if let Some(wrapper) = &self.wrapper {
            wrapper.start().await?;
            if let Some(editor) = self.app.editor() {
                wrapper.sync_model(editor.model()).await?;
            }
        }
        Ok(())
    }

    /// Recreates editors from the current configuration and resyncs the
    /// primary model. A defined no-op before the first render.
    ///
    /// # Errors
    ///
    /// Returns the editor misconfiguration or sync failure.
    pub async fn update_editor(&mut self) -> Result<()> {
        let Some(surface) = self.surface.clone() else {
            debug!("update_editor before first render is a no-op");
            return Ok(());
        };

        self.app.create_editors(&surface)?;
        if let (Some(wrapper), Some(editor)) = (&self.wrapper, self.app.editor()) {
            wrapper.sync_model(editor.model()).await?;
        }
        Ok(())
    }

    /// Replaces the live editor's buffer and syncs it to a running client.
    ///
    /// # Errors
    ///
    /// Returns the model or sync failure.
    pub async fn update_editor_model(&mut self, code: &str, language_id: &str) -> Result<()> {
        self.app.update_model(code, language_id)?;
        if let (Some(wrapper), Some(editor)) = (&self.wrapper, self.app.editor()) {
            wrapper.sync_model(editor.model()).await?;
        }
        Ok(())
    }

    /// Restarts the language client.
    ///
    /// # Errors
    ///
    /// Fails with [`ClientError::NotConfigured`] when no language-client
    /// configuration exists, otherwise as the wrapper's restart does.
    pub async fn restart_language_client(
        &self,
        updated_worker: Option<Worker>,
        keep_worker: bool,
    ) -> Result<(), ClientError> {
        match &self.wrapper {
            Some(wrapper) => wrapper.restart(updated_worker, keep_worker).await,
            None => Err(ClientError::NotConfigured),
        }
    }

    /// Applies a system color-scheme change: updates the theme property
    /// and patches live editors without recreating them.
    pub fn apply_color_scheme(&mut self, scheme: ColorScheme) {
        let theme = scheme.theme();
        if self.app.config().theme == theme {
            return;
        }
        debug!("color scheme changed, switching theme to {}", theme);
        self.on_property_changed(Property::Theme(theme.to_string()));
    }

    /// Registers a listener on the system color-scheme source.
    ///
    /// The returned task applies every change through
    /// [`Self::apply_color_scheme`] and ends when the source is dropped.
    pub fn spawn_color_scheme_watcher(
        component: &Arc<tokio::sync::Mutex<Self>>,
        mut schemes: watch::Receiver<ColorScheme>,
    ) -> tokio::task::JoinHandle<()> {
        let component = Arc::clone(component);
        tokio::spawn(async move {
            while schemes.changed().await.is_ok() {
                let scheme = *schemes.borrow();
                component.lock().await.apply_color_scheme(scheme);
            }
        })
    }

    /// Disposes the language client (if running) and all editors.
    ///
    /// # Errors
    ///
    /// Returns the client disposal failure.
    pub async fn dispose(&mut self) -> Result<()> {
        if let Some(wrapper) = &self.wrapper {
            if wrapper.is_running().await {
                wrapper.dispose(false).await?;
            }
        }
        self.app.dispose_editor();
        self.app.dispose_diff_editor();
        self.rendered = false;
        Ok(())
    }

    /// The editor app this component drives.
    #[must_use]
    pub const fn app(&self) -> &EditorApp {
        &self.app
    }

    /// The language-client wrapper, when one is configured.
    #[must_use]
    pub const fn wrapper(&self) -> Option<&LanguageClientWrapper> {
        self.wrapper.as_ref()
    }

    /// Whether the first render has happened.
    #[must_use]
    pub const fn is_rendered(&self) -> bool {
        self.rendered
    }

    fn load_inline_config(&mut self) {
        let Some(provider) = self.inline_provider.clone() else {
            // The feature is opt-in; absence is fine.
            return;
        };

        if let Some(overrides) = provider.editor_overrides(&self.id) {
            overrides.merge_into(self.app.config_mut());
        }
        if self.app.config().use_diff_editor
            && let Some(overrides) = provider.diff_overrides(&self.id)
        {
            overrides.merge_into(self.app.config_mut());
        }
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ComponentError> {
    // Presence-style boolean attributes: an empty value means enabled.
    match value {
        "" | "true" => Ok(true),
        "false" => Ok(false),
        other => Err(ComponentError::InvalidValue {
            name: name.to_string(),
            value: other.to_string(),
        }),
    }
}
