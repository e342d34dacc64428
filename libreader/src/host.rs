//! Renderer host
//!
//! Owns one rendering surface for the lifetime of a screen and keeps it in
//! step with the host view-model. Each reconciliation pass compares the
//! action tokens the host currently holds against the ones already applied
//! and issues one command per token that moved.
//!
//! A pass runs in this order:
//!
//! 1. If a reload is pending (process terminated, load failed) the document
//!    is recomposed and loaded, the style tokens count as applied, and the
//!    pass ends there. Discrete actions (annotation, nav bar, share) stay
//!    pending for the next pass.
//! 2. Otherwise each changed token is applied; its slot is only recorded
//!    after the command reached the surface.
//! 3. The liveness monitor checks that the document is still there and
//!    reloads it if not.

use tracing::{debug, info, warn};

use crate::action::{ActionKind, ActionToken, ActionTokenSet, ReconciliationState};
use crate::compose::compose;
use crate::error::Result;
use crate::events::{BridgeEvent, EventBus, ReloadReason};
use crate::lifecycle::Lifecycle;
use crate::monitor::{Liveness, LivenessMonitor};
use crate::router::MessageRouter;
use crate::surface::{RenderSurface, RenderSurfaceHandle, SurfaceCommand, SurfaceId, SurfaceRegistry};
use crate::types::{Document, StyleConfig};
use crate::visibility::NavBarVisibility;

/// What one reconciliation pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassOutcome {
    /// Set when the pass replaced the whole document
    pub reloaded: Option<ReloadReason>,
    /// Actions whose commands were issued, in order
    pub issued: Vec<ActionKind>,
    /// Actions whose commands did not reach the surface
    pub failed: Vec<ActionKind>,
    /// Result of the liveness check, if it ran
    pub liveness: Option<Liveness>,
    /// The surface was no longer mounted; nothing was applied
    pub cancelled: bool,
}

impl PassOutcome {
    fn cancelled() -> Self {
        Self {
            cancelled: true,
            ..Self::default()
        }
    }

    /// Whether the pass sent nothing to the surface
    pub fn is_noop(&self) -> bool {
        self.reloaded.is_none() && self.issued.is_empty() && self.failed.is_empty()
    }
}

/// Drives one rendering surface
pub struct RendererHost {
    surface: Box<dyn RenderSurface>,
    registry: SurfaceRegistry,
    lifecycle: Lifecycle,
    state: ReconciliationState,
    last_style: StyleConfig,
    monitor: LivenessMonitor,
    visibility: NavBarVisibility,
    events: EventBus,
}

impl RendererHost {
    /// Mount `surface` for its screen and issue the initial render
    ///
    /// Binds every router channel to the new surface and makes it the
    /// current surface in `registry`. `tokens` are the action tokens the
    /// host holds at mount time; the initial render already reflects them,
    /// so they are recorded as applied.
    ///
    /// # Errors
    ///
    /// Fails only when the document cannot be composed. A load that does not
    /// reach the surface is retried on the next pass.
    pub async fn mount(
        surface: Box<dyn RenderSurface>,
        registry: SurfaceRegistry,
        router: &MessageRouter,
        events: EventBus,
        document: &Document,
        style: &StyleConfig,
        tokens: &ActionTokenSet,
    ) -> Result<(Self, RenderSurfaceHandle)> {
        let markup = compose(document, style)?;
        let id = surface.id();

        let lifecycle = Lifecycle::new();
        registry.mount(id);
        router.bind(id, lifecycle.clone());

        let mut state = ReconciliationState::new();
        state.absorb(tokens);

        let host = Self {
            surface,
            registry: registry.clone(),
            lifecycle,
            state,
            last_style: *style,
            monitor: LivenessMonitor::new(),
            visibility: router.visibility().clone(),
            events,
        };

        info!(surface = %id, item = %document.item.id, "Mounting reader surface");
        match host
            .surface
            .execute(SurfaceCommand::Load { markup: markup.html })
            .await
        {
            Ok(()) => host.events.emit(BridgeEvent::Mounted { surface: id }),
            Err(e) => {
                warn!(surface = %id, "Initial load failed: {}", e);
                host.lifecycle.request_reload();
            }
        }

        Ok((host, RenderSurfaceHandle::new(id, registry)))
    }

    pub fn surface_id(&self) -> SurfaceId {
        self.surface.id()
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn state(&self) -> &ReconciliationState {
        &self.state
    }

    pub fn last_style(&self) -> &StyleConfig {
        &self.last_style
    }

    pub fn needs_reload(&self) -> bool {
        self.lifecycle.needs_reload()
    }

    /// The renderer process went away; reload on the next pass
    pub fn handle_terminated(&self) {
        self.lifecycle.request_reload();
    }

    fn is_current(&self) -> bool {
        self.registry.is_current(self.surface.id())
    }

    /// Unmount the surface; later passes become no-ops
    pub fn teardown(&self) {
        let id = self.surface.id();
        if self.registry.release(id) {
            info!(surface = %id, "Reader surface torn down");
            self.events.emit(BridgeEvent::TornDown { surface: id });
        }
    }

    /// Run one reconciliation pass
    ///
    /// # Errors
    ///
    /// Fails only when the document cannot be composed. Surface failures are
    /// reported in the outcome and retried on later passes.
    pub async fn reconcile(
        &mut self,
        tokens: &ActionTokenSet,
        document: &Document,
        style: &StyleConfig,
    ) -> Result<PassOutcome> {
        if !self.is_current() {
            debug!(surface = %self.surface.id(), "Skipping pass for unmounted surface");
            return Ok(PassOutcome::cancelled());
        }

        let mut outcome = PassOutcome::default();

        if self.lifecycle.needs_reload() {
            if self.reload(document, style, ReloadReason::Requested).await? {
                self.state.absorb_restyles(tokens);
                outcome.reloaded = Some(ReloadReason::Requested);
            }
            return Ok(outcome);
        }

        let mut recomposed: Option<String> = None;
        for (kind, token) in self.state.pending(tokens) {
            let command = self.command_for(kind, tokens, document, style, &mut recomposed)?;
            let name = command.name();
            match self.surface.execute(command).await {
                Ok(()) => {
                    self.applied(kind, token, name);
                    outcome.issued.push(kind);
                }
                Err(e) => {
                    warn!(surface = %self.surface.id(), action = %kind, "Command {} failed: {}", name, e);
                    self.events.emit(BridgeEvent::CommandFailed {
                        surface: self.surface.id(),
                        action: kind,
                        error: e.to_string(),
                    });
                    outcome.failed.push(kind);
                }
            }
        }
        if recomposed.is_some() {
            self.last_style = *style;
        }

        let liveness = self.monitor.check(self.surface.as_ref(), &self.lifecycle).await;
        if !self.is_current() {
            // Torn down while the presence query was outstanding
            outcome.cancelled = true;
            return Ok(outcome);
        }
        outcome.liveness = Some(liveness);

        if liveness == Liveness::Lost {
            let id = self.surface.id();
            info!(surface = %id, "Document content lost; reloading");
            self.events.emit(BridgeEvent::ContentLost { surface: id });
            self.handle_terminated();
            if self.reload(document, style, ReloadReason::ContentLost).await? {
                outcome.reloaded = Some(ReloadReason::ContentLost);
            }
        }

        Ok(outcome)
    }

    /// Recompose and load the whole document
    ///
    /// Returns whether the load reached the surface. Only reload requests
    /// made before the load started are cleared, and only once it landed.
    async fn reload(&mut self, document: &Document, style: &StyleConfig, reason: ReloadReason) -> Result<bool> {
        let markup = compose(document, style)?;
        let id = self.surface.id();
        let ticket = self.lifecycle.reload_ticket();

        match self
            .surface
            .execute(SurfaceCommand::Load { markup: markup.html })
            .await
        {
            Ok(()) => {
                self.lifecycle.clear_reload(ticket);
                self.last_style = *style;
                info!(surface = %id, ?reason, "Reloaded document");
                self.events.emit(BridgeEvent::Reloaded { surface: id, reason });
                Ok(true)
            }
            Err(e) => {
                warn!(surface = %id, ?reason, "Reload failed, will retry: {}", e);
                Ok(false)
            }
        }
    }

    fn applied(&mut self, kind: ActionKind, token: Option<ActionToken>, command: &str) {
        self.state.mark_applied(kind, token);
        if kind == ActionKind::ToggleNavBar {
            self.visibility.show();
        }
        debug!(surface = %self.surface.id(), action = %kind, command, "Applied action");
        self.events.emit(BridgeEvent::CommandIssued {
            surface: self.surface.id(),
            action: kind,
            command: command.to_string(),
        });
    }

    fn command_for(
        &self,
        kind: ActionKind,
        tokens: &ActionTokenSet,
        document: &Document,
        style: &StyleConfig,
        recomposed: &mut Option<String>,
    ) -> Result<SurfaceCommand> {
        let command = match kind {
            ActionKind::IncreaseFont | ActionKind::DecreaseFont => SurfaceCommand::UpdateFontSize {
                font_size: style.font_size,
                markup: recompose(recomposed, document, style)?,
            },
            ActionKind::IncreaseMargin | ActionKind::DecreaseMargin => SurfaceCommand::UpdateMargin {
                margin: style.margin,
                markup: recompose(recomposed, document, style)?,
            },
            ActionKind::IncreaseLineHeight | ActionKind::DecreaseLineHeight => {
                SurfaceCommand::UpdateLineHeight {
                    line_height: style.line_height,
                    markup: recompose(recomposed, document, style)?,
                }
            }
            ActionKind::SaveAnnotation => SurfaceCommand::SaveAnnotation {
                annotation: tokens.annotation.clone(),
            },
            ActionKind::ToggleNavBar => SurfaceCommand::ShowNavBar,
            ActionKind::Share => SurfaceCommand::ShareOriginalItem {
                url: document.item.original_url.clone(),
            },
        };
        Ok(command)
    }
}

/// Compose at most once per pass; every restyle carries the same document
fn recompose(cache: &mut Option<String>, document: &Document, style: &StyleConfig) -> Result<String> {
    if let Some(html) = cache.as_ref() {
        return Ok(html.clone());
    }
    let html = compose(document, style)?.html;
    *cache = Some(html.clone());
    Ok(html)
}
