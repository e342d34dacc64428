//! Action tokens and reconciliation bookkeeping
//!
//! The host UI expresses "please do X again" by writing a fresh token into the
//! slot for X. The renderer host compares each slot against the token it last
//! applied and issues one command per slot that moved.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique value standing for the most recent request of one action kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionToken(Uuid);

impl ActionToken {
    /// Mint a new token
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActionToken {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ActionToken {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ActionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Every host-triggered action the renderer host knows how to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    SaveAnnotation,
    IncreaseFont,
    DecreaseFont,
    IncreaseMargin,
    DecreaseMargin,
    IncreaseLineHeight,
    DecreaseLineHeight,
    ToggleNavBar,
    Share,
}

impl ActionKind {
    /// Order in which a reconciliation pass visits the slots
    pub const ALL: [ActionKind; 9] = [
        ActionKind::SaveAnnotation,
        ActionKind::IncreaseFont,
        ActionKind::DecreaseFont,
        ActionKind::IncreaseMargin,
        ActionKind::DecreaseMargin,
        ActionKind::IncreaseLineHeight,
        ActionKind::DecreaseLineHeight,
        ActionKind::ToggleNavBar,
        ActionKind::Share,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SaveAnnotation => "save_annotation",
            Self::IncreaseFont => "increase_font",
            Self::DecreaseFont => "decrease_font",
            Self::IncreaseMargin => "increase_margin",
            Self::DecreaseMargin => "decrease_margin",
            Self::IncreaseLineHeight => "increase_line_height",
            Self::DecreaseLineHeight => "decrease_line_height",
            Self::ToggleNavBar => "toggle_nav_bar",
            Self::Share => "share",
        }
    }

    /// Whether applying this action re-renders the whole document
    pub fn restyles(&self) -> bool {
        matches!(
            self,
            Self::IncreaseFont
                | Self::DecreaseFont
                | Self::IncreaseMargin
                | Self::DecreaseMargin
                | Self::IncreaseLineHeight
                | Self::DecreaseLineHeight
        )
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Current value of every action slot as observed on the host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionTokenSet {
    slots: HashMap<ActionKind, ActionToken>,
    /// Text sent along with `SaveAnnotation`
    pub annotation: String,
}

impl ActionTokenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token currently in the slot for `kind`
    pub fn get(&self, kind: ActionKind) -> Option<ActionToken> {
        self.slots.get(&kind).copied()
    }

    /// Put `token` into the slot for `kind`
    pub fn set(&mut self, kind: ActionKind, token: ActionToken) {
        self.slots.insert(kind, token);
    }

    /// Mint a fresh token for `kind` and return it
    pub fn request(&mut self, kind: ActionKind) -> ActionToken {
        let token = ActionToken::new();
        self.set(kind, token);
        token
    }

    /// Builder form of [`ActionTokenSet::request`]
    pub fn with_request(mut self, kind: ActionKind) -> Self {
        self.request(kind);
        self
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = annotation.into();
        self
    }
}

/// Last applied token per action kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationState {
    applied: HashMap<ActionKind, ActionToken>,
}

impl ReconciliationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn applied(&self, kind: ActionKind) -> Option<ActionToken> {
        self.applied.get(&kind).copied()
    }

    /// Kinds whose desired token differs from the applied one, in pass order
    pub fn pending(&self, desired: &ActionTokenSet) -> Vec<(ActionKind, Option<ActionToken>)> {
        ActionKind::ALL
            .iter()
            .filter_map(|kind| {
                let wanted = desired.get(*kind);
                (wanted != self.applied(*kind)).then_some((*kind, wanted))
            })
            .collect()
    }

    /// Record `token` as applied for `kind`
    pub fn mark_applied(&mut self, kind: ActionKind, token: Option<ActionToken>) {
        match token {
            Some(token) => {
                self.applied.insert(kind, token);
            }
            None => {
                self.applied.remove(&kind);
            }
        }
    }

    /// Treat the style slots of `tokens` as applied
    ///
    /// A full reload renders with the current style, so pending restyles are
    /// covered by it. Discrete actions are not replayed by a reload and stay
    /// pending.
    pub fn absorb_restyles(&mut self, tokens: &ActionTokenSet) {
        for kind in ActionKind::ALL.into_iter().filter(|kind| kind.restyles()) {
            self.mark_applied(kind, tokens.get(kind));
        }
    }

    /// Treat every slot of `tokens` as applied
    pub fn absorb(&mut self, tokens: &ActionTokenSet) {
        for kind in ActionKind::ALL {
            self.mark_applied(kind, tokens.get(kind));
        }
    }
}
