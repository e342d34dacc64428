//! Reader session
//!
//! Ties one renderer host, its router and the background tasks of a reader
//! screen together. Host observations go through a `watch` channel; the
//! driver task always reconciles the most recent one, so observations that
//! arrive while a pass is running collapse into a single follow-up pass.
//! Only one pass runs at a time because the host sits behind a
//! `tokio::sync::Mutex`.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::action::ActionTokenSet;
use crate::config::Config;
use crate::error::Result;
use crate::events::{EventBus, EventReceiver};
use crate::host::{PassOutcome, RendererHost};
use crate::lifecycle::Lifecycle;
use crate::router::{MessageRouter, ReaderDelegate};
use crate::surface::{RenderSurface, RenderSurfaceHandle, SurfaceId, SurfaceRegistry};
use crate::types::{Document, StyleConfig};
use crate::visibility::NavBarVisibility;

/// Everything the host view-model currently wants rendered
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub tokens: ActionTokenSet,
    pub document: Document,
    pub style: StyleConfig,
}

impl Observation {
    pub fn new(tokens: ActionTokenSet, document: Document, style: StyleConfig) -> Self {
        Self {
            tokens,
            document,
            style,
        }
    }
}

pub struct ReaderSession {
    host: Arc<Mutex<RendererHost>>,
    handle: RenderSurfaceHandle,
    lifecycle: Lifecycle,
    router: MessageRouter,
    events: EventBus,
    observations: watch::Sender<Observation>,
    tasks: Vec<JoinHandle<()>>,
}

impl ReaderSession {
    /// Mount `surface` with the initial observation and start the
    /// background tasks
    ///
    /// Must be called from within a tokio runtime.
    pub async fn mount(
        config: &Config,
        delegate: Arc<dyn ReaderDelegate>,
        surface: Box<dyn RenderSurface>,
        initial: Observation,
    ) -> Result<Self> {
        let registry = SurfaceRegistry::new();
        let events = EventBus::new(config.reader.event_capacity);
        let visibility = NavBarVisibility::new(config.reader.nav_bar_height);
        let router = MessageRouter::new(delegate.clone(), registry.clone(), visibility.clone(), events.clone());

        let (host, handle) = RendererHost::mount(
            surface,
            registry,
            &router,
            events.clone(),
            &initial.document,
            &initial.style,
            &initial.tokens,
        )
        .await?;
        let lifecycle = host.lifecycle().clone();
        let host = Arc::new(Mutex::new(host));

        let (observations, receiver) = watch::channel(initial);
        let tasks = vec![
            tokio::spawn(drive(host.clone(), receiver)),
            tokio::spawn(forward_visibility(visibility, delegate)),
        ];

        Ok(Self {
            host,
            handle,
            lifecycle,
            router,
            events,
            observations,
            tasks,
        })
    }

    pub fn surface_id(&self) -> SurfaceId {
        self.handle.id()
    }

    pub fn is_mounted(&self) -> bool {
        self.handle.is_current()
    }

    /// Router to hand inbound script messages and lifecycle signals to
    pub fn router(&self) -> &MessageRouter {
        &self.router
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// Publish a new observation; the driver reconciles the latest one
    pub fn observe(&self, observation: Observation) {
        self.observations.send_replace(observation);
    }

    /// Run one pass over the latest observation
    ///
    /// This is the retry tick: failed commands and pending reloads are
    /// picked up here even when nothing new was observed.
    pub async fn run_pass(&self) -> Result<PassOutcome> {
        let observation = self.observations.borrow().clone();
        self.reconcile_now(&observation).await
    }

    /// Reconcile `observation` immediately, waiting for any running pass
    pub async fn reconcile_now(&self, observation: &Observation) -> Result<PassOutcome> {
        let mut host = self.host.lock().await;
        host.reconcile(&observation.tokens, &observation.document, &observation.style)
            .await
    }

    /// Stop the background tasks and unmount the surface
    pub async fn teardown(mut self) {
        self.abort_tasks();
        self.host.lock().await.teardown();
    }

    fn abort_tasks(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for ReaderSession {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}

async fn drive(host: Arc<Mutex<RendererHost>>, mut receiver: watch::Receiver<Observation>) {
    while receiver.changed().await.is_ok() {
        let observation = receiver.borrow_and_update().clone();
        let mut host = host.lock().await;
        match host
            .reconcile(&observation.tokens, &observation.document, &observation.style)
            .await
        {
            Ok(outcome) if outcome.cancelled => {
                debug!("Surface unmounted; stopping driver");
                break;
            }
            Ok(outcome) => debug!(?outcome, "Reconciliation pass finished"),
            Err(e) => warn!("Reconciliation pass failed: {}", e),
        }
    }
}

async fn forward_visibility(visibility: NavBarVisibility, delegate: Arc<dyn ReaderDelegate>) {
    let mut receiver = visibility.subscribe();
    while receiver.changed().await.is_ok() {
        let ratio = *receiver.borrow_and_update();
        delegate.visibility_ratio(ratio);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionKind;
    use crate::message::{MessageEnvelope, ReplyHandle};
    use crate::surface::mock::MockSurface;
    use crate::types::ItemIdentity;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Ratios(StdMutex<Vec<f64>>);

    impl ReaderDelegate for Ratios {
        fn open_link(&self, _url: url::Url) {}
        fn renderer_action(&self, _envelope: MessageEnvelope, _reply: Option<ReplyHandle>) {}
        fn article_action(&self, _envelope: MessageEnvelope, _reply: Option<ReplyHandle>) {}
        fn visibility_ratio(&self, ratio: f64) {
            self.0.lock().unwrap().push(ratio);
        }
    }

    fn observation() -> Observation {
        Observation::new(
            ActionTokenSet::new(),
            Document::new(
                "<p>Session body</p>",
                "",
                ItemIdentity {
                    id: "s1".to_string(),
                    slug: "s1".to_string(),
                    title: "Session".to_string(),
                    original_url: "https://example.com/s1".to_string(),
                    author: None,
                },
            ),
            StyleConfig::default(),
        )
    }

    async fn wait_for(mut condition: impl FnMut() -> bool) {
        for _ in 0..100 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_observe_drives_a_pass() {
        let surface = MockSurface::healthy();
        let probe = surface.clone();
        let session = ReaderSession::mount(
            &Config::default(),
            Arc::new(Ratios::default()),
            Box::new(surface),
            observation(),
        )
        .await
        .unwrap();

        let mut next = observation();
        next.tokens.request(ActionKind::Share);
        session.observe(next);

        wait_for(|| probe.count("shareOriginalItem") == 1).await;
        session.teardown().await;
    }

    #[tokio::test]
    async fn test_observations_during_a_pass_coalesce() {
        let surface = MockSurface::with_presence_delay(Duration::from_millis(150));
        let probe = surface.clone();
        let session = ReaderSession::mount(
            &Config::default(),
            Arc::new(Ratios::default()),
            Box::new(surface),
            observation(),
        )
        .await
        .unwrap();

        let mut first = observation();
        first.tokens.request(ActionKind::Share);
        session.observe(first.clone());
        wait_for(|| probe.count("shareOriginalItem") == 1).await;

        // The first pass is now waiting on the presence query
        for size in [21, 22, 23] {
            let mut next = first.clone();
            next.tokens.request(ActionKind::IncreaseFont);
            next.style.font_size = size;
            session.observe(next);
        }

        wait_for(|| probe.count("updateFontSize") == 1).await;
        tokio::time::sleep(Duration::from_millis(400)).await;

        let updates: Vec<_> = probe
            .commands()
            .into_iter()
            .filter_map(|c| match c {
                crate::surface::SurfaceCommand::UpdateFontSize { font_size, .. } => Some(font_size),
                _ => None,
            })
            .collect();
        assert_eq!(updates, vec![23]);
        session.teardown().await;
    }

    #[tokio::test]
    async fn test_visibility_ratios_reach_delegate() {
        let delegate = Arc::new(Ratios::default());
        let session = ReaderSession::mount(
            &Config::default(),
            delegate.clone(),
            Box::new(MockSurface::healthy()),
            observation(),
        )
        .await
        .unwrap();

        let id = session.surface_id();
        let scroll = |offset: f64| {
            MessageEnvelope::new(id, crate::message::Channel::RendererAction, "scroll", json!({ "offsetY": offset }))
        };
        session.router().deliver(scroll(0.0));
        session.router().deliver(scroll(100.0));

        wait_for(|| delegate.0.lock().unwrap().last() == Some(&0.0)).await;
        session.teardown().await;
    }

    #[tokio::test]
    async fn test_teardown_unmounts() {
        let surface = MockSurface::healthy();
        let probe = surface.clone();
        let session = ReaderSession::mount(
            &Config::default(),
            Arc::new(Ratios::default()),
            Box::new(surface),
            observation(),
        )
        .await
        .unwrap();
        let mut events = session.subscribe();
        let router = session.router().clone();
        let id = session.surface_id();

        session.teardown().await;

        assert_eq!(router.bound_surface(), None);
        assert!(!router.signal(id, crate::message::LifecycleSignal::ProcessTerminated));
        assert!(matches!(
            events.recv().await.unwrap(),
            crate::events::BridgeEvent::TornDown { .. }
        ));
        assert_eq!(probe.command_names(), vec!["load"]);
    }
}
