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

//! Shared editor services.
//!
//! One `EditorServices` handle backs every editor app that should share a
//! model registry and a single service bootstrap. The handle is injected
//! explicitly; there is no ambient global. Initialization runs at most once
//! per handle no matter how many apps call `initialize`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, warn};

use super::model::TextModel;
use crate::editor::app::EditorError;

/// Shared service registry for editor apps.
#[derive(Debug, Default)]
pub struct EditorServices {
    initialized: AtomicBool,
    next_model_id: AtomicU64,
    models: Mutex<HashMap<String, String>>,
}

impl EditorServices {
    /// Creates an empty, uninitialized registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Performs the one-time service bootstrap.
    ///
    /// Returns `true` if this call performed initialization, `false` if a
    /// previous call already had.
    pub fn initialize(&self) -> bool {
        if self.initialized.swap(true, Ordering::SeqCst) {
            debug!("editor services already initialized, skipping");
            return false;
        }
        debug!("editor services initialized");
        true
    }

    /// Whether the one-time bootstrap has run.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Creates and registers a model with a fresh `inmemory://` URI.
    ///
    /// # Errors
    ///
    /// Returns an error if the generated URI is already registered, which
    /// indicates a registry shared across more handles than intended.
    pub fn create_model(&self, language_id: &str, content: &str) -> Result<TextModel, EditorError> {
        let id = self.next_model_id.fetch_add(1, Ordering::SeqCst) + 1;
        let uri = format!("inmemory://model/{id}");

        let mut models = lock_or_recover(&self.models);
        if models.contains_key(&uri) {
            return Err(EditorError::DuplicateModel { uri });
        }
        models.insert(uri.clone(), language_id.to_string());
        drop(models);

        debug!("created model {} ({})", uri, language_id);
        Ok(TextModel::new(uri, language_id, content))
    }

    /// Removes a model from the registry.
    pub fn release_model(&self, uri: &str) {
        if lock_or_recover(&self.models).remove(uri).is_none() {
            warn!("released unknown model {}", uri);
        } else {
            debug!("released model {}", uri);
        }
    }

    /// Number of live models in the registry.
    #[must_use]
    pub fn model_count(&self) -> usize {
        lock_or_recover(&self.models).len()
    }
}

/// Registry access survives a poisoned lock; the map holds only strings.
fn lock_or_recover<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_runs_at_most_once() {
        let services = EditorServices::new();
        assert!(!services.is_initialized());

        assert!(services.initialize(), "first call performs init");
        assert!(!services.initialize(), "second call must skip");
        assert!(!services.initialize(), "third call must skip");
        assert!(services.is_initialized());
    }

    #[test]
    fn test_model_uris_are_unique() {
        let services = EditorServices::new();
        let a = services.create_model("rust", "fn main() {}").unwrap();
        let b = services.create_model("rust", "fn main() {}").unwrap();

        assert_ne!(a.uri(), b.uri());
        assert_eq!(services.model_count(), 2);
    }

    #[test]
    fn test_release_model() {
        let services = EditorServices::new();
        let model = services.create_model("json", "{}").unwrap();
        assert_eq!(services.model_count(), 1);

        services.release_model(model.uri());
        assert_eq!(services.model_count(), 0);

        // Releasing again logs but does not panic.
        services.release_model(model.uri());
    }
}
