//! libreader - bridge between a native reader view-model and an embedded
//! document rendering surface
//!
//! The library composes saved articles into self-contained HTML documents,
//! keeps a rendering surface in step with host-side actions (style changes,
//! annotations, sharing), reloads the surface when its content goes away,
//! and routes the messages the in-document scripts post back to the host.

pub mod action;
pub mod compose;
pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod lifecycle;
pub mod logging;
pub mod message;
pub mod monitor;
pub mod preferences;
pub mod router;
pub mod session;
pub mod surface;
pub mod types;
pub mod visibility;

// Re-export commonly used types
pub use action::{ActionKind, ActionToken, ActionTokenSet, ReconciliationState};
pub use compose::{compose, RenderableMarkup};
pub use config::Config;
pub use error::{ReaderError, Result};
pub use host::{PassOutcome, RendererHost};
pub use router::{MessageRouter, ReaderDelegate};
pub use session::{Observation, ReaderSession};
pub use surface::{RenderSurface, RenderSurfaceHandle, SurfaceCommand, SurfaceId, SurfaceRegistry};
pub use types::{Document, HighlightRecord, ItemIdentity, StyleConfig};
