//! Rendering surface abstraction
//!
//! A rendering surface is the embedded web-content view that displays a
//! composed document and runs the in-document scripts. Each embedding (a
//! native web view, a headless test double) implements [`RenderSurface`];
//! the rest of the bridge only talks to the trait.
//!
//! Surfaces are identified by a [`SurfaceId`]. The [`SurfaceRegistry`] of a
//! screen remembers which surface is currently mounted, and every callback
//! checks that identity before acting so a torn-down surface can never
//! affect a newer one.
//!
//! # Examples
//!
//! ```no_run
//! use libreader::surface::{RenderSurface, SurfaceCommand};
//!
//! # async fn example(surface: &dyn RenderSurface) -> libreader::Result<()> {
//! surface.execute(SurfaceCommand::ShowNavBar).await?;
//!
//! if !surface.is_loading() && !surface.has_root_marker().await? {
//!     println!("surface {} lost its content", surface.id());
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

// Mock surface is available for all builds to support integration tests
pub mod mock;

/// Identity of one rendering surface instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceId(Uuid);

impl SurfaceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SurfaceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Instruction sent into the rendering surface
///
/// Style updates carry the recomposed document: content is always delivered
/// whole, there is no incremental patch protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SurfaceCommand {
    /// Replace the content with a freshly composed document
    Load { markup: String },
    #[serde(rename_all = "camelCase")]
    UpdateFontSize { font_size: u32, markup: String },
    UpdateMargin { margin: u32, markup: String },
    #[serde(rename_all = "camelCase")]
    UpdateLineHeight { line_height: u32, markup: String },
    ShowNavBar,
    ShareOriginalItem { url: String },
    /// Acknowledged later on the article-action channel
    SaveAnnotation { annotation: String },
}

impl SurfaceCommand {
    /// Command name on the renderer side
    pub fn name(&self) -> &'static str {
        match self {
            Self::Load { .. } => "load",
            Self::UpdateFontSize { .. } => "updateFontSize",
            Self::UpdateMargin { .. } => "updateMargin",
            Self::UpdateLineHeight { .. } => "updateLineHeight",
            Self::ShowNavBar => "showNavBar",
            Self::ShareOriginalItem { .. } => "shareOriginalItem",
            Self::SaveAnnotation { .. } => "saveAnnotation",
        }
    }

    /// Full document carried by this command, if it replaces the content
    pub fn markup(&self) -> Option<&str> {
        match self {
            Self::Load { markup }
            | Self::UpdateFontSize { markup, .. }
            | Self::UpdateMargin { markup, .. }
            | Self::UpdateLineHeight { markup, .. } => Some(markup),
            _ => None,
        }
    }

    /// Script an embedder evaluates for commands against the live document
    pub fn script(&self) -> Option<String> {
        match self {
            Self::SaveAnnotation { annotation } => Some(format!(
                "document.dispatchEvent(new CustomEvent('saveAnnotation', {{ detail: {{ annotation: {} }} }}))",
                serde_json::Value::String(annotation.clone())
            )),
            Self::ShareOriginalItem { url } => Some(format!(
                "document.dispatchEvent(new CustomEvent('share', {{ detail: {{ url: {} }} }}))",
                serde_json::Value::String(url.clone())
            )),
            Self::ShowNavBar => {
                Some("document.dispatchEvent(new Event('showNavBar'))".to_string())
            }
            _ => None,
        }
    }
}

/// Embedded rendering surface
#[async_trait]
pub trait RenderSurface: Send + Sync {
    /// Identity of this surface instance
    fn id(&self) -> SurfaceId;

    /// Issue a one-way command
    ///
    /// # Errors
    ///
    /// Returns `SurfaceError` when the command could not reach the surface.
    async fn execute(&self, command: SurfaceCommand) -> Result<()>;

    /// Ask the live document whether the root content marker exists
    ///
    /// This waits for the surface to answer; no timeout is imposed here.
    async fn has_root_marker(&self) -> Result<bool>;

    /// Whether a load is currently in progress
    fn is_loading(&self) -> bool;
}

/// Tracks the surface currently mounted for one screen
#[derive(Debug, Clone, Default)]
pub struct SurfaceRegistry {
    current: Arc<RwLock<Option<SurfaceId>>>,
}

impl SurfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `id` the mounted surface, replacing any previous one
    pub fn mount(&self, id: SurfaceId) {
        if let Ok(mut current) = self.current.write() {
            *current = Some(id);
        }
    }

    pub fn current(&self) -> Option<SurfaceId> {
        self.current.read().ok().and_then(|current| *current)
    }

    pub fn is_current(&self, id: SurfaceId) -> bool {
        self.current() == Some(id)
    }

    /// Clear the slot if `id` is still the mounted surface
    pub fn release(&self, id: SurfaceId) -> bool {
        match self.current.write() {
            Ok(mut current) if *current == Some(id) => {
                *current = None;
                true
            }
            _ => false,
        }
    }
}

/// Screen-side handle of a mounted surface
///
/// Dropping the handle does not tear the surface down; call
/// [`RenderSurfaceHandle::teardown`] when the screen goes away.
#[derive(Debug)]
pub struct RenderSurfaceHandle {
    id: SurfaceId,
    registry: SurfaceRegistry,
}

impl RenderSurfaceHandle {
    pub(crate) fn new(id: SurfaceId, registry: SurfaceRegistry) -> Self {
        Self { id, registry }
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    /// Whether this surface is still the one mounted for its screen
    pub fn is_current(&self) -> bool {
        self.registry.is_current(self.id)
    }

    /// Unmount the surface; every pending callback for it becomes a no-op
    pub fn teardown(self) {
        if self.registry.release(self.id) {
            tracing::debug!(surface = %self.id, "Surface torn down");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_replaces_surface() {
        let registry = SurfaceRegistry::new();
        let first = SurfaceId::new();
        let second = SurfaceId::new();

        registry.mount(first);
        assert!(registry.is_current(first));

        registry.mount(second);
        assert!(!registry.is_current(first));
        assert!(registry.is_current(second));
    }

    #[test]
    fn test_release_of_stale_surface_keeps_current() {
        let registry = SurfaceRegistry::new();
        let stale = SurfaceId::new();
        let fresh = SurfaceId::new();
        registry.mount(stale);
        registry.mount(fresh);

        assert!(!registry.release(stale));
        assert_eq!(registry.current(), Some(fresh));
        assert!(registry.release(fresh));
        assert_eq!(registry.current(), None);
    }

    #[test]
    fn test_handle_teardown() {
        let registry = SurfaceRegistry::new();
        let id = SurfaceId::new();
        registry.mount(id);
        let handle = RenderSurfaceHandle::new(id, registry.clone());

        assert!(handle.is_current());
        handle.teardown();
        assert!(!registry.is_current(id));
    }

    #[test]
    fn test_command_names_and_markup() {
        let update = SurfaceCommand::UpdateFontSize {
            font_size: 18,
            markup: "<html></html>".to_string(),
        };
        assert_eq!(update.name(), "updateFontSize");
        assert_eq!(update.markup(), Some("<html></html>"));
        assert!(update.script().is_none());

        assert_eq!(SurfaceCommand::ShowNavBar.markup(), None);
    }

    #[test]
    fn test_save_annotation_script_quotes_text() {
        let command = SurfaceCommand::SaveAnnotation {
            annotation: "it's \"good\"".to_string(),
        };
        let script = command.script().unwrap();
        assert!(script.contains(r#"annotation: "it's \"good\"""#));
    }

    #[test]
    fn test_command_serialization() {
        let command = SurfaceCommand::UpdateLineHeight {
            line_height: 175,
            markup: "x".to_string(),
        };
        let json = serde_json::to_string(&command).unwrap();
        assert!(json.contains(r#""type":"updateLineHeight""#));
        assert!(json.contains(r#""lineHeight":175"#));
    }
}
