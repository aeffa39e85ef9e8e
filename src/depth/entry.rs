//! Per-frame depth entries

use crate::scene::{TileId, TokenId};

/// The placeable a depth entry draws
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EntrySource {
    Tile(TileId),
    Token(TokenId),
}

impl EntrySource {
    pub fn is_tile(&self) -> bool {
        matches!(self, EntrySource::Tile(_))
    }

    pub fn is_token(&self) -> bool {
        matches!(self, EntrySource::Token(_))
    }
}

/// Culling outcome for one entry
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Visibility {
    #[default]
    Visible,
    /// Seen before but not in sight now; drawn with the fog filter
    Fogged,
    /// Not drawn
    Hidden,
}

/// One drawable object for this update cycle. Never persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct DepthEntry {
    pub source: EntrySource,
    /// Draw-order scalar; larger draws in front
    pub depth: f64,
    pub visibility: Visibility,
    /// Final alpha, starts at the host base alpha
    pub alpha: f64,
}

impl DepthEntry {
    pub fn new(source: EntrySource, depth: f64, alpha: f64) -> Self {
        Self {
            source,
            depth,
            visibility: Visibility::Visible,
            alpha,
        }
    }

    /// Entry will be inserted into a draw layer
    pub fn is_drawn(&self) -> bool {
        self.visibility != Visibility::Hidden
    }
}
