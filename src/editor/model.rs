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

//! In-memory text models.
//!
//! A model is the buffer an editor instance displays: content, a language
//! id, a generated `inmemory://` URI, and a version that increases on every
//! change. The editing engine itself lives in the wrapped editor; models
//! here only carry the state the orchestration layer needs.

/// An in-memory buffer owned by an editor instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextModel {
    uri: String,
    language_id: String,
    version: i32,
    content: String,
}

impl TextModel {
    /// Creates a model. Only `EditorServices` constructs these, so URIs
    /// stay unique per registry.
    pub(crate) fn new(uri: String, language_id: &str, content: &str) -> Self {
        Self {
            uri,
            language_id: language_id.to_string(),
            version: 1,
            content: content.to_string(),
        }
    }

    /// The model's `inmemory://` URI.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The language identifier this model is parsed as.
    #[must_use]
    pub fn language_id(&self) -> &str {
        &self.language_id
    }

    /// The version, starting at 1 and bumped on every content change.
    #[must_use]
    pub const fn version(&self) -> i32 {
        self.version
    }

    /// The current buffer content.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.content
    }

    /// Replaces the entire buffer content, bumping the version.
    ///
    /// Setting identical content is a no-op and does not bump the version.
    pub fn set_value(&mut self, content: &str) {
        if self.content == content {
            return;
        }
        self.content = content.to_string();
        self.version += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_value_bumps_version() {
        let mut model = TextModel::new("inmemory://model/1".to_string(), "json", "{}");
        assert_eq!(model.version(), 1);

        model.set_value("{\"a\": 1}");
        assert_eq!(model.version(), 2);
        assert_eq!(model.value(), "{\"a\": 1}");
    }

    #[test]
    fn test_set_identical_value_is_noop() {
        let mut model = TextModel::new("inmemory://model/1".to_string(), "json", "{}");
        model.set_value("{}");
        assert_eq!(model.version(), 1);
    }
}
