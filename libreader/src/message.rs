//! Messages posted by scripts running inside the rendered document
//!
//! Scripts post JSON objects of the form
//! `{"channel": "articleAction", "name": "createHighlight", "payload": {...}}`.
//! The embedder stamps each one with the id of the surface it came from and,
//! for request/response messages, a [`ReplyHandle`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::{BridgeError, Result};
use crate::surface::SurfaceId;

/// Message channel registered on the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Channel {
    /// Renderer behaviour: scroll, reading progress, selection menus
    RendererAction,
    /// Content events: highlight and annotation changes
    ArticleAction,
    /// Private viewer channel: link taps and similar chrome requests
    ViewerAction,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RendererAction => "rendererAction",
            Self::ArticleAction => "articleAction",
            Self::ViewerAction => "viewerAction",
        }
    }

    pub const ALL: [Channel; 3] = [
        Channel::RendererAction,
        Channel::ArticleAction,
        Channel::ViewerAction,
    ];
}

impl std::str::FromStr for Channel {
    type Err = BridgeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Channel::ALL
            .into_iter()
            .find(|channel| channel.as_str() == s)
            .ok_or_else(|| BridgeError::UnknownChannel(s.to_string()))
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Answer to a request/response message
pub type ReplyResult = std::result::Result<Value, String>;

/// One-shot responder for a message that expects an answer
pub struct ReplyHandle {
    sender: oneshot::Sender<ReplyResult>,
}

impl ReplyHandle {
    /// Create a handle and the receiver the embedder waits on
    pub fn channel() -> (Self, oneshot::Receiver<ReplyResult>) {
        let (sender, receiver) = oneshot::channel();
        (Self { sender }, receiver)
    }

    pub fn reply(self, value: Value) -> Result<()> {
        self.sender
            .send(Ok(value))
            .map_err(|_| BridgeError::ReplyClosed.into())
    }

    pub fn reject(self, error: impl Into<String>) -> Result<()> {
        self.sender
            .send(Err(error.into()))
            .map_err(|_| BridgeError::ReplyClosed.into())
    }
}

impl std::fmt::Debug for ReplyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyHandle")
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

#[derive(Deserialize)]
struct RawMessage {
    channel: String,
    name: String,
    #[serde(default)]
    payload: Value,
}

/// Inbound message from the rendered document
#[derive(Debug)]
pub struct MessageEnvelope {
    pub surface: SurfaceId,
    pub channel: Channel,
    pub name: String,
    pub payload: Value,
    pub reply: Option<ReplyHandle>,
}

impl MessageEnvelope {
    pub fn new(surface: SurfaceId, channel: Channel, name: impl Into<String>, payload: Value) -> Self {
        Self {
            surface,
            channel,
            name: name.into(),
            payload,
            reply: None,
        }
    }

    pub fn with_reply(mut self, reply: ReplyHandle) -> Self {
        self.reply = Some(reply);
        self
    }

    /// Parse a message as posted by an in-document script
    ///
    /// # Errors
    ///
    /// `BridgeError::MalformedMessage` when the JSON does not have the message
    /// shape, `BridgeError::UnknownChannel` for channels that were never
    /// registered.
    pub fn from_json(surface: SurfaceId, json: &str) -> Result<Self> {
        let raw: RawMessage = serde_json::from_str(json)
            .map_err(|e| BridgeError::MalformedMessage(e.to_string()))?;
        let channel = raw.channel.parse::<Channel>()?;
        Ok(Self::new(surface, channel, raw.name, raw.payload))
    }
}

/// Renderer lifecycle notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleSignal {
    LoadStarted,
    LoadFinished,
    LoadFailed { error: String },
    /// The backing web content process was killed
    ProcessTerminated,
}
