//! Tokens: point-like actors with a grid footprint

use serde::{Deserialize, Serialize};

use crate::core::types::DVec2;
use crate::math::Rect;
use super::ids::TokenId;

/// A placed token. Visibility and control state are owned by the host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub id: TokenId,
    /// Footprint in world units, anchored top-left
    pub rect: Rect,
    /// Host line-of-sight result, read-only here
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub controlled: bool,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
}

fn default_true() -> bool {
    true
}

fn default_alpha() -> f64 {
    1.0
}

impl Token {
    /// A visible, uncontrolled token
    pub fn new(id: impl Into<TokenId>, rect: Rect) -> Self {
        Self {
            id: id.into(),
            rect,
            visible: true,
            controlled: false,
            alpha: 1.0,
        }
    }

    /// Top-left corner of the footprint, used for token-token ordering
    pub fn origin(&self) -> DVec2 {
        self.rect.origin()
    }

    /// Footprint center, used for tile occlusion tests
    pub fn anchor(&self) -> DVec2 {
        self.rect.center()
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn with_controlled(mut self, controlled: bool) -> Self {
        self.controlled = controlled;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }
}
