//! Mock rendering surface for testing
//!
//! Records every command it receives and lets a test simulate the things a
//! real web view does behind the bridge's back: losing its content, being
//! stuck mid-load, rejecting commands, or answering the presence query slowly.
//! Clones share state, so a test can keep one clone as a probe after handing
//! the other to a renderer host.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::compose::ROOT_MARKER_ID;
use crate::error::{Result, SurfaceError};
use crate::surface::{RenderSurface, SurfaceCommand, SurfaceId};

/// Configuration for mock surface behavior
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Command name that should be rejected (e.g. "updateMargin")
    pub reject_command: Option<String>,

    /// Delay before the presence query answers
    pub presence_delay: Duration,

    /// Whether the presence query itself should fail
    pub presence_fails: bool,
}

#[derive(Debug, Default)]
struct MockState {
    commands: Mutex<Vec<SurfaceCommand>>,
    root_present: AtomicBool,
    loading: AtomicBool,
    presence_calls: AtomicUsize,
    reject_command: Mutex<Option<String>>,
}

/// Mock surface for testing
#[derive(Debug, Clone)]
pub struct MockSurface {
    id: SurfaceId,
    config: MockConfig,
    state: Arc<MockState>,
}

impl MockSurface {
    /// Create a new mock surface with the given configuration
    pub fn new(config: MockConfig) -> Self {
        let state = MockState::default();
        *state.reject_command.lock().unwrap() = config.reject_command.clone();
        Self {
            id: SurfaceId::new(),
            config,
            state: Arc::new(state),
        }
    }

    /// Create a surface that accepts everything
    pub fn healthy() -> Self {
        Self::new(MockConfig::default())
    }

    /// Create a surface that rejects the named command
    pub fn rejecting(command: &str) -> Self {
        Self::new(MockConfig {
            reject_command: Some(command.to_string()),
            ..Default::default()
        })
    }

    /// Create a surface whose presence query answers after `delay`
    pub fn with_presence_delay(delay: Duration) -> Self {
        Self::new(MockConfig {
            presence_delay: delay,
            ..Default::default()
        })
    }

    /// Simulate the renderer discarding its content
    pub fn drop_content(&self) {
        self.state.root_present.store(false, Ordering::SeqCst);
    }

    /// Simulate a load that has started but not finished
    pub fn set_loading(&self, loading: bool) {
        self.state.loading.store(loading, Ordering::SeqCst);
    }

    /// Change which command is rejected (None accepts everything)
    pub fn set_reject(&self, command: Option<&str>) {
        *self.state.reject_command.lock().unwrap() = command.map(str::to_string);
    }

    /// Whether the current content has the root marker
    pub fn root_present(&self) -> bool {
        self.state.root_present.load(Ordering::SeqCst)
    }

    /// All commands received, in order
    pub fn commands(&self) -> Vec<SurfaceCommand> {
        self.state.commands.lock().unwrap().clone()
    }

    /// Names of all commands received, in order
    pub fn command_names(&self) -> Vec<&'static str> {
        self.commands().iter().map(SurfaceCommand::name).collect()
    }

    /// Number of received commands with the given name
    pub fn count(&self, name: &str) -> usize {
        self.commands().iter().filter(|c| c.name() == name).count()
    }

    /// Forget recorded commands
    pub fn clear_commands(&self) {
        self.state.commands.lock().unwrap().clear();
    }

    /// Number of times the presence query ran
    pub fn presence_calls(&self) -> usize {
        self.state.presence_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenderSurface for MockSurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    async fn execute(&self, command: SurfaceCommand) -> Result<()> {
        let rejected = self.state.reject_command.lock().unwrap().clone();
        if rejected.as_deref() == Some(command.name()) {
            return Err(SurfaceError::Command(command.name().to_string()).into());
        }

        if let Some(markup) = command.markup() {
            let marker = format!("id=\"{}\"", ROOT_MARKER_ID);
            self.state
                .root_present
                .store(markup.contains(&marker), Ordering::SeqCst);
        }

        self.state.commands.lock().unwrap().push(command);
        Ok(())
    }

    async fn has_root_marker(&self) -> Result<bool> {
        self.state.presence_calls.fetch_add(1, Ordering::SeqCst);

        if !self.config.presence_delay.is_zero() {
            sleep(self.config.presence_delay).await;
        }

        if self.config.presence_fails {
            return Err(SurfaceError::Script("evaluateJavaScript failed".to_string()).into());
        }

        Ok(self.root_present())
    }

    fn is_loading(&self) -> bool {
        self.state.loading.load(Ordering::SeqCst)
    }
}
