//! Core types for the reader bridge

use serde::{Deserialize, Serialize};

/// Identity of the library item being read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemIdentity {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub original_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// One render pass worth of input from the document source
///
/// `raw_content` is sanitized HTML supplied by the content loader and
/// `highlights_json` is the serialized highlight list for the same item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub raw_content: String,
    pub highlights_json: String,
    pub item: ItemIdentity,
}

impl Document {
    pub fn new(raw_content: impl Into<String>, highlights_json: impl Into<String>, item: ItemIdentity) -> Self {
        Self {
            raw_content: raw_content.into(),
            highlights_json: highlights_json.into(),
            item,
        }
    }
}

/// Byte range into `Document::raw_content`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightAnchor {
    pub start: usize,
    pub end: usize,
}

/// A saved highlight as delivered by the document source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_id: Option<String>,
    #[serde(default)]
    pub quote: String,
    pub anchor: HighlightAnchor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Light or dark palette
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    #[default]
    Light,
    Dark,
}

impl ColorScheme {
    pub fn is_dark(&self) -> bool {
        matches!(self, ColorScheme::Dark)
    }
}

/// Reader font family
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontFamily {
    #[default]
    Inter,
    System,
    Merriweather,
    Lora,
    OpenDyslexic,
}

impl FontFamily {
    /// Identifier used by the in-document scripts
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inter => "inter",
            Self::System => "system",
            Self::Merriweather => "merriweather",
            Self::Lora => "lora",
            Self::OpenDyslexic => "opendyslexic",
        }
    }

    /// CSS `font-family` stack
    pub fn css_stack(&self) -> &'static str {
        match self {
            Self::Inter => "Inter, -apple-system, system-ui, sans-serif",
            Self::System => "-apple-system, system-ui, sans-serif",
            Self::Merriweather => "Merriweather, Georgia, serif",
            Self::Lora => "Lora, Georgia, serif",
            Self::OpenDyslexic => "OpenDyslexic, sans-serif",
        }
    }
}

impl std::str::FromStr for FontFamily {
    type Err = crate::error::ReaderError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inter" => Ok(Self::Inter),
            "system" => Ok(Self::System),
            "merriweather" => Ok(Self::Merriweather),
            "lora" => Ok(Self::Lora),
            "opendyslexic" => Ok(Self::OpenDyslexic),
            other => Err(crate::error::ReaderError::InvalidInput(format!(
                "Unknown font family: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for FontFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Style snapshot for one render pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleConfig {
    /// Font size in points
    pub font_size: u32,
    /// Line height as a percentage of the font size
    pub line_height: u32,
    /// Maximum content width in pixels
    pub margin: u32,
    pub color_scheme: ColorScheme,
    pub font_family: FontFamily,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            font_size: crate::config::DEFAULT_FONT_SIZE,
            line_height: crate::config::DEFAULT_LINE_HEIGHT,
            margin: crate::config::DEFAULT_MARGIN,
            color_scheme: ColorScheme::Light,
            font_family: FontFamily::Inter,
        }
    }
}
