//! Liveness monitor
//!
//! Web views can silently lose their document: the content process gets
//! evicted under memory pressure, or an unrelated script error navigates
//! away. The monitor asks the live document whether the root content marker
//! is still there. It never queries while a load is in flight or while the
//! last load is known to have failed.

use tracing::{debug, warn};

use crate::lifecycle::Lifecycle;
use crate::surface::RenderSurface;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Loading,
    LoadFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Root marker present
    Alive,
    /// No query was made
    Skipped(SkipReason),
    /// Root marker absent; the content must be reloaded
    Lost,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LivenessMonitor;

impl LivenessMonitor {
    pub fn new() -> Self {
        Self
    }

    /// Query `surface` for the root marker
    ///
    /// A failed query counts as alive: only a definite "absent" answer
    /// triggers a reload.
    pub async fn check(&self, surface: &dyn RenderSurface, lifecycle: &Lifecycle) -> Liveness {
        if lifecycle.is_loading() || surface.is_loading() {
            return Liveness::Skipped(SkipReason::Loading);
        }
        if lifecycle.load_failed() {
            return Liveness::Skipped(SkipReason::LoadFailed);
        }

        match surface.has_root_marker().await {
            Ok(true) => Liveness::Alive,
            Ok(false) => {
                debug!(surface = %surface.id(), "Root marker missing");
                Liveness::Lost
            }
            Err(e) => {
                warn!(surface = %surface.id(), "Presence check failed: {}", e);
                Liveness::Alive
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::mock::{MockConfig, MockSurface};
    use crate::surface::SurfaceCommand;

    async fn loaded_surface() -> MockSurface {
        let surface = MockSurface::healthy();
        surface
            .execute(SurfaceCommand::Load {
                markup: "<div id=\"root\"></div>".to_string(),
            })
            .await
            .unwrap();
        surface
    }

    #[tokio::test]
    async fn test_alive() {
        let surface = loaded_surface().await;
        let liveness = LivenessMonitor::new().check(&surface, &Lifecycle::new()).await;
        assert_eq!(liveness, Liveness::Alive);
    }

    #[tokio::test]
    async fn test_lost() {
        let surface = loaded_surface().await;
        surface.drop_content();
        let liveness = LivenessMonitor::new().check(&surface, &Lifecycle::new()).await;
        assert_eq!(liveness, Liveness::Lost);
    }

    #[tokio::test]
    async fn test_skips_while_surface_loading() {
        let surface = MockSurface::healthy();
        surface.set_loading(true);

        let liveness = LivenessMonitor::new().check(&surface, &Lifecycle::new()).await;
        assert_eq!(liveness, Liveness::Skipped(SkipReason::Loading));
        assert_eq!(surface.presence_calls(), 0);
    }

    #[tokio::test]
    async fn test_skips_while_lifecycle_loading_or_failed() {
        let surface = MockSurface::healthy();
        let lifecycle = Lifecycle::new();

        lifecycle.load_started();
        assert_eq!(
            LivenessMonitor::new().check(&surface, &lifecycle).await,
            Liveness::Skipped(SkipReason::Loading)
        );

        lifecycle.load_failed_with_retry();
        assert_eq!(
            LivenessMonitor::new().check(&surface, &lifecycle).await,
            Liveness::Skipped(SkipReason::LoadFailed)
        );
        assert_eq!(surface.presence_calls(), 0);
    }

    #[tokio::test]
    async fn test_query_error_is_not_loss() {
        let surface = MockSurface::new(MockConfig {
            presence_fails: true,
            ..Default::default()
        });
        let liveness = LivenessMonitor::new().check(&surface, &Lifecycle::new()).await;
        assert_eq!(liveness, Liveness::Alive);
    }
}
