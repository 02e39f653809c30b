// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

/// The reflected-property editor component.
pub mod element;
/// Injected inline-configuration capability.
pub mod inline;
/// System color-scheme watching and theme constants.
pub mod theme;

pub use element::{ComponentError, EditorComponent, Property};
pub use inline::{DiffOverrides, EditorOverrides, InlineConfigProvider, StaticInlineConfig};
pub use theme::{ColorScheme, ColorSchemeSource, THEME_DARK, THEME_LIGHT};
