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

//! System color-scheme watching.
//!
//! The host owns a [`ColorSchemeSource`] and feeds it the platform's
//! dark/light preference; components subscribe and switch their theme
//! without recreating editors.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// The built-in light theme.
pub const THEME_LIGHT: &str = "vs-light";
/// The built-in dark theme.
pub const THEME_DARK: &str = "vs-dark";

/// The system dark/light preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    /// Light preference.
    Light,
    /// Dark preference.
    Dark,
}

impl ColorScheme {
    /// The editor theme matching this scheme.
    #[must_use]
    pub const fn theme(self) -> &'static str {
        match self {
            Self::Light => THEME_LIGHT,
            Self::Dark => THEME_DARK,
        }
    }
}

/// Host-side handle publishing system color-scheme changes.
#[derive(Debug)]
pub struct ColorSchemeSource {
    sender: watch::Sender<ColorScheme>,
}

impl ColorSchemeSource {
    /// Creates a source with the current system preference.
    #[must_use]
    pub fn new(initial: ColorScheme) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    /// Subscribes a component to scheme changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ColorScheme> {
        self.sender.subscribe()
    }

    /// Publishes a scheme change. Safe to call with no subscribers.
    pub fn set(&self, scheme: ColorScheme) {
        self.sender.send_replace(scheme);
    }

    /// The most recently published scheme.
    #[must_use]
    pub fn current(&self) -> ColorScheme {
        *self.sender.borrow()
    }
}

impl Default for ColorSchemeSource {
    fn default() -> Self {
        Self::new(ColorScheme::Light)
    }
}
