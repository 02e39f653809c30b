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

//! Inline configuration.
//!
//! An injected capability supplying editor and diff-editor option
//! overrides, keyed by component id so several components can share one
//! provider. The feature is opt-in; a missing provider, or a provider with
//! nothing to say, is always tolerated.

use std::collections::HashMap;

use crate::config::EditorConfig;

/// Key under which shared (non-id-specific) overrides are stored.
const SHARED: &str = "";

/// Editor option overrides supplied by the host page.
#[derive(Debug, Clone, Default)]
pub struct EditorOverrides {
    /// Replacement buffer content.
    pub code: Option<String>,
    /// Replacement language id.
    pub language_id: Option<String>,
    /// Replacement theme.
    pub theme: Option<String>,
}

impl EditorOverrides {
    /// Folds the overrides into a configuration; absent fields are left
    /// untouched.
    pub fn merge_into(&self, config: &mut EditorConfig) {
        if let Some(code) = &self.code {
            config.code.clone_from(code);
        }
        if let Some(language_id) = &self.language_id {
            config.language_id.clone_from(language_id);
        }
        if let Some(theme) = &self.theme {
            config.theme.clone_from(theme);
        }
    }
}

/// Diff-editor option overrides supplied by the host page.
#[derive(Debug, Clone, Default)]
pub struct DiffOverrides {
    /// Replacement modified-side content.
    pub modified_code: Option<String>,
    /// Replacement modified-side language id.
    pub modified_language_id: Option<String>,
}

impl DiffOverrides {
    /// Folds the overrides into a configuration; absent fields are left
    /// untouched.
    pub fn merge_into(&self, config: &mut EditorConfig) {
        if let Some(modified_code) = &self.modified_code {
            config.modified_code = Some(modified_code.clone());
        }
        if let Some(modified_language_id) = &self.modified_language_id {
            config.modified_language_id = Some(modified_language_id.clone());
        }
    }
}

/// The injected inline-configuration capability.
pub trait InlineConfigProvider: Send + Sync {
    /// Editor overrides for the component with `component_id`, if any.
    fn editor_overrides(&self, component_id: &str) -> Option<EditorOverrides>;

    /// Diff-editor overrides for the component with `component_id`, if any.
    fn diff_overrides(&self, component_id: &str) -> Option<DiffOverrides>;
}

/// A map-backed provider.
///
/// Lookups prefer an entry under the exact component id and fall back to
/// the shared entry, mirroring per-instance overrides on a page that also
/// defines page-wide ones.
#[derive(Debug, Default)]
pub struct StaticInlineConfig {
    editors: HashMap<String, EditorOverrides>,
    diffs: HashMap<String, DiffOverrides>,
}

impl StaticInlineConfig {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers editor overrides for a specific component id.
    #[must_use]
    pub fn with_editor_overrides(
        mut self,
        component_id: impl Into<String>,
        overrides: EditorOverrides,
    ) -> Self {
        self.editors.insert(component_id.into(), overrides);
        self
    }

    /// Registers editor overrides shared by all components.
    #[must_use]
    pub fn with_shared_editor_overrides(mut self, overrides: EditorOverrides) -> Self {
        self.editors.insert(SHARED.to_string(), overrides);
        self
    }

    /// Registers diff overrides for a specific component id.
    #[must_use]
    pub fn with_diff_overrides(
        mut self,
        component_id: impl Into<String>,
        overrides: DiffOverrides,
    ) -> Self {
        self.diffs.insert(component_id.into(), overrides);
        self
    }

    /// Registers diff overrides shared by all components.
    #[must_use]
    pub fn with_shared_diff_overrides(mut self, overrides: DiffOverrides) -> Self {
        self.diffs.insert(SHARED.to_string(), overrides);
        self
    }
}

impl InlineConfigProvider for StaticInlineConfig {
    fn editor_overrides(&self, component_id: &str) -> Option<EditorOverrides> {
        self.editors
            .get(component_id)
            .or_else(|| self.editors.get(SHARED))
            .cloned()
    }

    fn diff_overrides(&self, component_id: &str) -> Option<DiffOverrides> {
        self.diffs
            .get(component_id)
            .or_else(|| self.diffs.get(SHARED))
            .cloned()
    }
}
