//! Style preferences
//!
//! The platform preference store is an external key-value collaborator. The
//! bridge only reads three integers from it and falls back to the configured
//! defaults when a value is unset or not usable (zero, negative, or one).

use std::collections::HashMap;
use std::sync::RwLock;

use crate::config::StyleDefaults;
use crate::types::{ColorScheme, StyleConfig};

/// Keys read from the preference store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreferenceKey {
    FontSize,
    LineSpacing,
    Margin,
}

impl PreferenceKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FontSize => "preferredWebFontSize",
            Self::LineSpacing => "preferredWebLineSpacing",
            Self::Margin => "preferredWebMargin",
        }
    }
}

/// Read access to persisted integer preferences
///
/// Like the platform store, an unset key reads as zero.
pub trait PreferenceStore: Send + Sync {
    fn integer(&self, key: PreferenceKey) -> i64;
}

impl PreferenceStore for HashMap<String, i64> {
    fn integer(&self, key: PreferenceKey) -> i64 {
        self.get(key.as_str()).copied().unwrap_or(0)
    }
}

/// In-memory preference store
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: RwLock<HashMap<PreferenceKey, i64>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: PreferenceKey, value: i64) {
        if let Ok(mut values) = self.values.write() {
            values.insert(key, value);
        }
    }
}

impl PreferenceStore for MemoryPreferences {
    fn integer(&self, key: PreferenceKey) -> i64 {
        self.values
            .read()
            .ok()
            .and_then(|values| values.get(&key).copied())
            .unwrap_or(0)
    }
}

/// Resolves style snapshots from a preference store
pub struct StylePreferences<'a> {
    store: &'a dyn PreferenceStore,
    defaults: &'a StyleDefaults,
}

impl<'a> StylePreferences<'a> {
    pub fn new(store: &'a dyn PreferenceStore, defaults: &'a StyleDefaults) -> Self {
        Self { store, defaults }
    }

    pub fn font_size(&self) -> u32 {
        stored_or(self.store.integer(PreferenceKey::FontSize), self.defaults.font_size)
    }

    pub fn line_height(&self) -> u32 {
        stored_or(self.store.integer(PreferenceKey::LineSpacing), self.defaults.line_height)
    }

    pub fn margin(&self) -> u32 {
        stored_or(self.store.integer(PreferenceKey::Margin), self.defaults.margin)
    }

    /// Snapshot for one render pass
    ///
    /// The color scheme comes from the host appearance, not from storage.
    pub fn snapshot(&self, color_scheme: ColorScheme) -> StyleConfig {
        StyleConfig {
            font_size: self.font_size(),
            line_height: self.line_height(),
            margin: self.margin(),
            color_scheme,
            font_family: self.defaults.font_family,
        }
    }
}

fn stored_or(stored: i64, fallback: u32) -> u32 {
    if stored <= 1 {
        return fallback;
    }
    u32::try_from(stored).unwrap_or(fallback)
}
