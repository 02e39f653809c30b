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

use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use super::model::TextModel;
use super::services::EditorServices;
use crate::config::{EditorConfig, EditorOptions, OptionsPatch};

/// Errors from editor creation and model management.
#[derive(Debug, Error)]
pub enum EditorError {
    /// Diff mode was requested without the paired modified content.
    #[error("diff editor requires an original/modified pair: modified content missing")]
    DiffPairIncomplete,

    /// A model URI collided in the shared registry.
    #[error("a model for {uri} is already registered")]
    DuplicateModel {
        /// The colliding URI.
        uri: String,
    },
}

/// A handle to the host container an editor is created into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    id: String,
}

impl Surface {
    /// Creates a surface handle with a host-assigned id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// The host-assigned container id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// A live single-buffer editor instance.
#[derive(Debug)]
pub struct CodeEditor {
    generation: u64,
    surface: String,
    model: TextModel,
    theme: String,
    options: EditorOptions,
}

impl CodeEditor {
    /// Generation counter; unchanged for as long as this instance lives.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// The model this editor displays.
    #[must_use]
    pub const fn model(&self) -> &TextModel {
        &self.model
    }

    /// The surface this editor was created into.
    #[must_use]
    pub fn surface(&self) -> &str {
        &self.surface
    }

    /// The active theme.
    #[must_use]
    pub fn theme(&self) -> &str {
        &self.theme
    }

    /// The active options.
    #[must_use]
    pub const fn options(&self) -> &EditorOptions {
        &self.options
    }
}

/// A live diff-editor pair showing original vs. modified content.
#[derive(Debug)]
pub struct DiffEditor {
    generation: u64,
    surface: String,
    original: TextModel,
    modified: TextModel,
    theme: String,
    options: EditorOptions,
}

impl DiffEditor {
    /// Generation counter; unchanged for as long as this instance lives.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// The original (left) model.
    #[must_use]
    pub const fn original(&self) -> &TextModel {
        &self.original
    }

    /// The modified (right) model.
    #[must_use]
    pub const fn modified(&self) -> &TextModel {
        &self.modified
    }

    /// The surface this editor was created into.
    #[must_use]
    pub fn surface(&self) -> &str {
        &self.surface
    }

    /// The active theme.
    #[must_use]
    pub fn theme(&self) -> &str {
        &self.theme
    }

    /// The active options.
    #[must_use]
    pub const fn options(&self) -> &EditorOptions {
        &self.options
    }
}

/// Owns zero, one, or two live editor instances and their models.
///
/// Which instances exist follows the configuration's diff-mode flag. The
/// instances are replaced (old disposed, new created) on `create_editors`;
/// option patches apply in place without replacement.
#[derive(Debug)]
pub struct EditorApp {
    services: Arc<EditorServices>,
    config: EditorConfig,
    editor: Option<CodeEditor>,
    diff_editor: Option<DiffEditor>,
    next_generation: u64,
}

impl EditorApp {
    /// Creates an app bound to a shared services handle.
    #[must_use]
    pub fn new(services: Arc<EditorServices>, config: EditorConfig) -> Self {
        Self {
            services,
            config,
            editor: None,
            diff_editor: None,
            next_generation: 0,
        }
    }

    /// Idempotent service bootstrap.
    ///
    /// Returns `true` if this call performed the shared initialization,
    /// `false` if it had already happened.
    pub fn init(&self) -> bool {
        self.services.initialize()
    }

    /// The configuration record.
    #[must_use]
    pub const fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Mutable access for property pushes.
    ///
    /// Mutations do not touch live editors until `create_editors` or an
    /// update call applies them.
    pub const fn config_mut(&mut self) -> &mut EditorConfig {
        &mut self.config
    }

    /// Creates the editor or diff-editor pair inside `surface`.
    ///
    /// Existing instances are disposed first. In diff mode the paired
    /// modified content must be present; the check runs before any editor
    /// or model is created.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::DiffPairIncomplete`] if diff mode is
    /// requested without modified content.
    pub fn create_editors(&mut self, surface: &Surface) -> Result<(), EditorError> {
        if self.config.use_diff_editor {
            let Some(modified_code) = self.config.modified_code.clone() else {
                return Err(EditorError::DiffPairIncomplete);
            };

            self.dispose_editor();
            self.dispose_diff_editor();

            let original = self
                .services
                .create_model(&self.config.language_id, &self.config.code)?;
            let modified_language = self
                .config
                .modified_language_id
                .clone()
                .unwrap_or_else(|| self.config.language_id.clone());
            let modified = self
                .services
                .create_model(&modified_language, &modified_code)?;

            self.diff_editor = Some(DiffEditor {
                generation: self.bump_generation(),
                surface: surface.id().to_string(),
                original,
                modified,
                theme: self.config.theme.clone(),
                options: self.config.options.clone(),
            });
            debug!("created diff editor in surface {}", surface.id());
        } else {
            self.dispose_editor();
            self.dispose_diff_editor();

            let model = self
                .services
                .create_model(&self.config.language_id, &self.config.code)?;

            self.editor = Some(CodeEditor {
                generation: self.bump_generation(),
                surface: surface.id().to_string(),
                model,
                theme: self.config.theme.clone(),
                options: self.config.options.clone(),
            });
            debug!("created editor in surface {}", surface.id());
        }

        Ok(())
    }

    /// Replaces the single editor's buffer contents and language.
    ///
    /// A language change replaces the model; a content-only change bumps
    /// the version in place. With no live editor this is a defined no-op
    /// beyond recording the values in the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a replacement model cannot be registered.
    pub fn update_model(&mut self, code: &str, language_id: &str) -> Result<(), EditorError> {
        self.config.code = code.to_string();
        self.config.language_id = language_id.to_string();

        let Some(editor) = self.editor.as_mut() else {
            debug!("update_model with no live editor, configuration updated only");
            return Ok(());
        };

        if editor.model.language_id() == language_id {
            editor.model.set_value(code);
        } else {
            self.services.release_model(editor.model.uri());
            editor.model = self.services.create_model(language_id, code)?;
        }
        Ok(())
    }

    /// Replaces both sides of the diff pair.
    ///
    /// Language changes replace the affected models; content-only changes
    /// bump versions in place. With no live diff editor this is a defined
    /// no-op beyond recording the values in the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a replacement model cannot be registered.
    pub fn update_diff_model(
        &mut self,
        original: &str,
        modified: &str,
        language_id: &str,
    ) -> Result<(), EditorError> {
        self.config.code = original.to_string();
        self.config.modified_code = Some(modified.to_string());
        self.config.language_id = language_id.to_string();
        self.config.modified_language_id = Some(language_id.to_string());

        let Some(diff) = self.diff_editor.as_mut() else {
            debug!("update_diff_model with no live diff editor, configuration updated only");
            return Ok(());
        };

        if diff.original.language_id() == language_id {
            diff.original.set_value(original);
        } else {
            self.services.release_model(diff.original.uri());
            diff.original = self.services.create_model(language_id, original)?;
        }

        if diff.modified.language_id() == language_id {
            diff.modified.set_value(modified);
        } else {
            self.services.release_model(diff.modified.uri());
            diff.modified = self.services.create_model(language_id, modified)?;
        }
        Ok(())
    }

    /// Applies an option patch to the configuration and any live editors
    /// without recreating them.
    pub fn update_config(&mut self, patch: &OptionsPatch) {
        patch.apply_to(&mut self.config);

        if let Some(editor) = self.editor.as_mut() {
            editor.theme.clone_from(&self.config.theme);
            editor.options = self.config.options.clone();
        }
        if let Some(diff) = self.diff_editor.as_mut() {
            diff.theme.clone_from(&self.config.theme);
            diff.options = self.config.options.clone();
        }
    }

    /// Disposes the single editor, releasing its model.
    pub fn dispose_editor(&mut self) {
        if let Some(editor) = self.editor.take() {
            self.services.release_model(editor.model.uri());
            debug!("disposed editor (generation {})", editor.generation);
        }
    }

    /// Disposes the diff editor, releasing both models.
    pub fn dispose_diff_editor(&mut self) {
        if let Some(diff) = self.diff_editor.take() {
            self.services.release_model(diff.original.uri());
            self.services.release_model(diff.modified.uri());
            debug!("disposed diff editor (generation {})", diff.generation);
        }
    }

    /// The live single editor, if any.
    #[must_use]
    pub const fn editor(&self) -> Option<&CodeEditor> {
        self.editor.as_ref()
    }

    /// The live diff editor, if any.
    #[must_use]
    pub const fn diff_editor(&self) -> Option<&DiffEditor> {
        self.diff_editor.as_ref()
    }

    const fn bump_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_with(config: EditorConfig) -> EditorApp {
        EditorApp::new(Arc::new(EditorServices::new()), config)
    }

    #[test]
    fn test_diff_without_modified_fails_before_creation() {
        let mut app = app_with(EditorConfig {
            use_diff_editor: true,
            code: "left".to_string(),
            ..EditorConfig::default()
        });

        let err = app.create_editors(&Surface::new("main")).unwrap_err();
        assert!(matches!(err, EditorError::DiffPairIncomplete));

        // Nothing may have been created.
        assert!(app.editor().is_none());
        assert!(app.diff_editor().is_none());
    }

    #[test]
    fn test_create_single_editor() {
        let mut app = app_with(EditorConfig {
            code: "{}".to_string(),
            language_id: "json".to_string(),
            ..EditorConfig::default()
        });

        app.create_editors(&Surface::new("main")).unwrap();

        let editor = app.editor().unwrap();
        assert_eq!(editor.model().value(), "{}");
        assert_eq!(editor.model().language_id(), "json");
        assert_eq!(editor.surface(), "main");
        assert!(app.diff_editor().is_none());
    }

    #[test]
    fn test_create_diff_pair() {
        let mut app = app_with(EditorConfig {
            use_diff_editor: true,
            code: "a".to_string(),
            modified_code: Some("b".to_string()),
            language_id: "plaintext".to_string(),
            ..EditorConfig::default()
        });

        app.create_editors(&Surface::new("main")).unwrap();

        let diff = app.diff_editor().unwrap();
        assert_eq!(diff.original().value(), "a");
        assert_eq!(diff.modified().value(), "b");
        assert_ne!(diff.original().uri(), diff.modified().uri());
    }

    #[test]
    fn test_update_model_content_keeps_model() {
        let mut app = app_with(EditorConfig {
            code: "{}".to_string(),
            language_id: "json".to_string(),
            ..EditorConfig::default()
        });
        app.create_editors(&Surface::new("main")).unwrap();
        let uri = app.editor().unwrap().model().uri().to_string();

        app.update_model("[1]", "json").unwrap();

        let model = app.editor().unwrap().model();
        assert_eq!(model.uri(), uri, "content change must not replace the model");
        assert_eq!(model.version(), 2);
        assert_eq!(model.value(), "[1]");
    }

    #[test]
    fn test_update_model_language_replaces_model() {
        let mut app = app_with(EditorConfig {
            code: "{}".to_string(),
            language_id: "json".to_string(),
            ..EditorConfig::default()
        });
        app.create_editors(&Surface::new("main")).unwrap();
        let uri = app.editor().unwrap().model().uri().to_string();

        app.update_model("x = 1", "python").unwrap();

        let model = app.editor().unwrap().model();
        assert_ne!(model.uri(), uri, "language change must replace the model");
        assert_eq!(model.language_id(), "python");
        assert_eq!(model.version(), 1);
    }

    #[test]
    fn test_update_model_without_editor_is_noop() {
        let mut app = app_with(EditorConfig::default());

        app.update_model("hello", "plaintext").unwrap();

        assert!(app.editor().is_none());
        assert_eq!(app.config().code, "hello");
    }

    #[test]
    fn test_update_config_does_not_recreate() {
        let mut app = app_with(EditorConfig::default());
        app.create_editors(&Surface::new("main")).unwrap();
        let generation = app.editor().unwrap().generation();

        app.update_config(&OptionsPatch::theme_only("vs-dark"));

        let editor = app.editor().unwrap();
        assert_eq!(editor.generation(), generation);
        assert_eq!(editor.theme(), "vs-dark");
        assert_eq!(app.config().theme, "vs-dark");
    }

    #[test]
    fn test_dispose_releases_models() {
        let services = Arc::new(EditorServices::new());
        let mut app = EditorApp::new(
            services.clone(),
            EditorConfig {
                use_diff_editor: true,
                modified_code: Some("b".to_string()),
                ..EditorConfig::default()
            },
        );
        app.create_editors(&Surface::new("main")).unwrap();
        assert_eq!(services.model_count(), 2);

        app.dispose_diff_editor();
        assert_eq!(services.model_count(), 0);
        assert!(app.diff_editor().is_none());
    }

    #[test]
    fn test_init_is_idempotent() {
        let app = app_with(EditorConfig::default());
        assert!(app.init());
        assert!(!app.init());
    }
}
