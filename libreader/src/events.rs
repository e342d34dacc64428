//! Bridge events
//!
//! In-process event bus for observers of the bridge (diagnostics overlays,
//! logging sinks, tests). Emitting never blocks: with no subscribers the
//! event is dropped, and lagging subscribers lose the oldest events.
//!
//! ```
//! use libreader::events::{BridgeEvent, EventBus};
//! use libreader::surface::SurfaceId;
//!
//! # async fn example() {
//! let bus = EventBus::new(100);
//! let mut receiver = bus.subscribe();
//!
//! bus.emit(BridgeEvent::Mounted { surface: SurfaceId::new() });
//!
//! if let Ok(event) = receiver.recv().await {
//!     println!("{:?}", event);
//! }
//! # }
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::action::ActionKind;
use crate::surface::SurfaceId;

pub type EventReceiver = broadcast::Receiver<BridgeEvent>;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BridgeEvent>,
}

impl EventBus {
    /// `capacity` is the buffer per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: BridgeEvent) {
        // Err only means nobody is listening
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Why the host replaced the whole document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadReason {
    /// Process termination or a failed load set the reload flag
    Requested,
    /// The liveness check found no root marker
    ContentLost,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeEvent {
    Mounted {
        surface: SurfaceId,
    },
    Reloaded {
        surface: SurfaceId,
        reason: ReloadReason,
    },
    CommandIssued {
        surface: SurfaceId,
        action: ActionKind,
        command: String,
    },
    CommandFailed {
        surface: SurfaceId,
        action: ActionKind,
        error: String,
    },
    ContentLost {
        surface: SurfaceId,
    },
    LoadFailed {
        surface: SurfaceId,
        error: String,
    },
    /// Message or signal for a surface that is no longer mounted
    StaleDropped {
        surface: SurfaceId,
    },
    TornDown {
        surface: SurfaceId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_and_receive() {
        let bus = EventBus::new(10);
        let mut receiver = bus.subscribe();
        let surface = SurfaceId::new();

        bus.emit(BridgeEvent::ContentLost { surface });

        assert_eq!(receiver.recv().await.unwrap(), BridgeEvent::ContentLost { surface });
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = EventBus::new(10);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        let surface = SurfaceId::new();

        bus.emit(BridgeEvent::Reloaded {
            surface,
            reason: ReloadReason::Requested,
        });

        assert!(matches!(first.recv().await.unwrap(), BridgeEvent::Reloaded { .. }));
        assert!(matches!(second.recv().await.unwrap(), BridgeEvent::Reloaded { .. }));
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[test]
    fn test_no_subscribers() {
        let bus = EventBus::new(10);
        bus.emit(BridgeEvent::Mounted {
            surface: SurfaceId::new(),
        });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_event_serialization() {
        let event = BridgeEvent::CommandIssued {
            surface: SurfaceId::new(),
            action: ActionKind::IncreaseFont,
            command: "updateFontSize".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"command_issued""#));
        assert!(json.contains(r#""action":"increase_font""#));

        let back: BridgeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
