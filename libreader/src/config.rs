//! Configuration management for the reader bridge

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};
use crate::types::{ColorScheme, FontFamily};

/// Font size used when no preference is stored
pub const DEFAULT_FONT_SIZE: u32 = 20;
/// Line height percentage used when no preference is stored
pub const DEFAULT_LINE_HEIGHT: u32 = 150;
/// Content width used when no preference is stored
pub const DEFAULT_MARGIN: u32 = 360;
/// Height of the reader nav bar, also the scroll transition region
pub const DEFAULT_NAV_BAR_HEIGHT: f64 = 50.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub style: StyleDefaults,
    #[serde(default)]
    pub reader: ReaderSettings,
    /// Stored user preferences, keyed like the platform preference store
    #[serde(default)]
    pub preferences: HashMap<String, i64>,
}

/// Fallbacks applied when a preference is unset or not usable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleDefaults {
    pub font_size: u32,
    pub line_height: u32,
    pub margin: u32,
    pub font_family: FontFamily,
    pub color_scheme: ColorScheme,
}

impl Default for StyleDefaults {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            line_height: DEFAULT_LINE_HEIGHT,
            margin: DEFAULT_MARGIN,
            font_family: FontFamily::Inter,
            color_scheme: ColorScheme::Light,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderSettings {
    pub nav_bar_height: f64,
    /// Buffer per bridge event subscriber
    pub event_capacity: usize,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            nav_bar_height: DEFAULT_NAV_BAR_HEIGHT,
            event_capacity: 100,
        }
    }
}

impl Config {
    /// Load configuration from the default location
    ///
    /// A missing file yields the default configuration.
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        if !config_path.exists() {
            tracing::debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::ParseError)?;
        if config.reader.nav_bar_height <= 0.0 {
            return Err(ConfigError::MissingField("reader.nav_bar_height".to_string()).into());
        }
        Ok(config)
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("READER_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("reader-bridge").join("config.toml"))
}
