//! Message router
//!
//! Classifies messages coming out of the rendered document and hands each one
//! to exactly one host callback. Routing is a fixed table over
//! `(channel, name)`; names the table does not know are forwarded to the
//! generic handler of their channel so newer in-document scripts keep working.
//!
//! The router also watches renderer lifecycle signals for the mounted surface
//! and turns scroll messages into nav-bar visibility ratios.
//!
//! Delivery can happen at any time, including in the middle of a
//! reconciliation pass. Everything the router touches is either atomic or
//! behind a short-lived lock, and callbacks must not assume the host is idle.

use std::sync::{Arc, RwLock};

use tracing::{debug, trace, warn};
use url::Url;

use crate::events::{BridgeEvent, EventBus};
use crate::lifecycle::Lifecycle;
use crate::message::{Channel, LifecycleSignal, MessageEnvelope, ReplyHandle};
use crate::surface::{SurfaceId, SurfaceRegistry};
use crate::visibility::NavBarVisibility;

/// Message name for link taps on the viewer channel
pub const OPEN_LINK: &str = "openLink";
/// Message name for scroll samples on the renderer channel
pub const SCROLL: &str = "scroll";

/// Host callbacks invoked by the router
///
/// Called from whatever task delivered the message; implementations should
/// hand work off rather than block.
pub trait ReaderDelegate: Send + Sync {
    /// A link inside the document was activated
    fn open_link(&self, url: Url);

    /// Renderer-channel message, forwarded verbatim
    fn renderer_action(&self, envelope: MessageEnvelope, reply: Option<ReplyHandle>);

    /// Article-channel message; answer through `reply` if the script waits
    fn article_action(&self, envelope: MessageEnvelope, reply: Option<ReplyHandle>);

    /// New nav-bar visibility ratio in [0, 1]
    fn visibility_ratio(&self, _ratio: f64) {}
}

/// Where a message goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    OpenLink,
    Scroll,
    Renderer,
    Article,
}

/// Fixed routing table
pub fn route(channel: Channel, name: &str) -> Route {
    match (channel, name) {
        (Channel::ViewerAction, OPEN_LINK) => Route::OpenLink,
        (Channel::RendererAction, SCROLL) => Route::Scroll,
        (Channel::ArticleAction, _) => Route::Article,
        (Channel::RendererAction, _) | (Channel::ViewerAction, _) => Route::Renderer,
    }
}

#[derive(Debug, Clone)]
struct Binding {
    surface: SurfaceId,
    lifecycle: Lifecycle,
}

struct RouterInner {
    delegate: Arc<dyn ReaderDelegate>,
    registry: SurfaceRegistry,
    binding: RwLock<Option<Binding>>,
    visibility: NavBarVisibility,
    events: EventBus,
}

/// Dispatches inbound messages for one screen
#[derive(Clone)]
pub struct MessageRouter {
    inner: Arc<RouterInner>,
}

impl MessageRouter {
    pub fn new(
        delegate: Arc<dyn ReaderDelegate>,
        registry: SurfaceRegistry,
        visibility: NavBarVisibility,
        events: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                delegate,
                registry,
                binding: RwLock::new(None),
                visibility,
                events,
            }),
        }
    }

    /// Register every channel for `surface`, dropping any previous binding
    pub fn bind(&self, surface: SurfaceId, lifecycle: Lifecycle) {
        if let Ok(mut binding) = self.inner.binding.write() {
            *binding = Some(Binding { surface, lifecycle });
        }
        debug!(%surface, channels = ?Channel::ALL, "Router bound to surface");
    }

    /// Surface the channels are registered for
    pub fn bound_surface(&self) -> Option<SurfaceId> {
        self.live_binding(None).map(|b| b.surface)
    }

    pub fn visibility(&self) -> &NavBarVisibility {
        &self.inner.visibility
    }

    /// Binding for `surface` if it is both bound and currently mounted
    fn live_binding(&self, surface: Option<SurfaceId>) -> Option<Binding> {
        let binding = self.inner.binding.read().ok()?.clone()?;
        if let Some(surface) = surface {
            if binding.surface != surface {
                return None;
            }
        }
        self.inner
            .registry
            .is_current(binding.surface)
            .then_some(binding)
    }

    fn drop_stale(&self, surface: SurfaceId, what: &str) {
        debug!(%surface, what, "Ignoring callback for surface that is no longer mounted");
        self.inner.events.emit(BridgeEvent::StaleDropped { surface });
    }

    /// Dispatch one inbound message
    ///
    /// Returns the route taken, or `None` when the message was discarded.
    pub fn deliver(&self, mut envelope: MessageEnvelope) -> Option<Route> {
        if self.live_binding(Some(envelope.surface)).is_none() {
            self.drop_stale(envelope.surface, &envelope.name);
            return None;
        }

        let route = route(envelope.channel, &envelope.name);
        trace!(channel = %envelope.channel, name = %envelope.name, ?route, "Routing message");

        match route {
            Route::OpenLink => {
                let url = envelope
                    .payload
                    .get("url")
                    .and_then(|v| v.as_str())
                    .and_then(|raw| Url::parse(raw).ok());
                match url {
                    Some(url) => self.inner.delegate.open_link(url),
                    None => {
                        warn!(payload = %envelope.payload, "openLink without a usable url");
                        return None;
                    }
                }
            }
            Route::Scroll => {
                let offset = envelope
                    .payload
                    .get("offsetY")
                    .and_then(|v| v.as_f64());
                match offset {
                    Some(offset) => {
                        self.inner.visibility.on_scroll(offset);
                    }
                    None => {
                        // Not a scroll sample we understand; let the host see it
                        let reply = envelope.reply.take();
                        self.inner.delegate.renderer_action(envelope, reply);
                        return Some(Route::Renderer);
                    }
                }
            }
            Route::Renderer => {
                let reply = envelope.reply.take();
                self.inner.delegate.renderer_action(envelope, reply);
            }
            Route::Article => {
                let reply = envelope.reply.take();
                self.inner.delegate.article_action(envelope, reply);
            }
        }
        Some(route)
    }

    /// Parse and dispatch a raw script message
    ///
    /// Malformed messages are logged and dropped.
    pub fn deliver_json(&self, surface: SurfaceId, json: &str, reply: Option<ReplyHandle>) -> Option<Route> {
        match MessageEnvelope::from_json(surface, json) {
            Ok(envelope) => {
                let envelope = match reply {
                    Some(reply) => envelope.with_reply(reply),
                    None => envelope,
                };
                self.deliver(envelope)
            }
            Err(e) => {
                warn!(%surface, "Dropping script message: {}", e);
                None
            }
        }
    }

    /// Apply a renderer lifecycle signal
    ///
    /// Returns `false` when the signal was for a stale surface.
    pub fn signal(&self, surface: SurfaceId, signal: LifecycleSignal) -> bool {
        let Some(binding) = self.live_binding(Some(surface)) else {
            self.drop_stale(surface, "lifecycle");
            return false;
        };

        match signal {
            LifecycleSignal::LoadStarted => {
                debug!(%surface, "Load started");
                binding.lifecycle.load_started();
            }
            LifecycleSignal::LoadFinished => {
                // Pending action tokens stay with the host's own cadence
                debug!(%surface, "Load finished");
                binding.lifecycle.load_finished();
            }
            LifecycleSignal::LoadFailed { error } => {
                warn!(%surface, "Load failed: {}", error);
                binding.lifecycle.load_failed_with_retry();
                self.inner
                    .events
                    .emit(BridgeEvent::LoadFailed { surface, error });
            }
            LifecycleSignal::ProcessTerminated => {
                warn!(%surface, "Renderer process terminated; reload scheduled");
                binding.lifecycle.request_reload();
            }
        }
        true
    }
}
