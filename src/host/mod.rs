//! Host seams: scene reads, draw layers, line of sight and flag persistence.
//!
//! The tabletop owns sprites, containers and documents. The pipeline only
//! sees them through [`SceneHost`] and [`DrawLayer`].

pub mod memory;

use std::collections::BTreeSet;

use serde_json::Value;

use crate::core::Result;
use crate::core::types::DMat2;
use crate::depth::EntrySource;
use crate::math::Rect;
use crate::scene::{SceneSnapshot, TileId, TokenId};
use crate::visibility::{ColorMatrix, SeenByUpdate, SightQuery};

pub use memory::{LineOfSight, MemoryHost, MemoryLayer};

/// Which draw layer to create
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayerKind {
    /// Floor tiles, drawn under everything
    Background,
    /// Depth-sorted tiles and tokens
    Foreground,
}

/// One cloned sprite to insert into a draw layer
#[derive(Clone, Debug, PartialEq)]
pub struct SpriteDesc {
    pub source: EntrySource,
    /// World-space footprint
    pub rect: Rect,
    /// Draw order inside the layer; equals the entry depth
    pub z_index: f64,
    pub alpha: f64,
    pub filter: Option<ColorMatrix>,
    /// Local transform about the sprite anchor
    pub transform: DMat2,
}

/// Host document write
#[derive(Clone, Debug, PartialEq)]
pub enum FlagUpdate {
    /// Replace a tile's seen-by set
    SeenBy { tile: TileId, viewers: BTreeSet<TokenId> },
    /// Replace a tile's whole flag bag
    TileFlags { tile: TileId, flags: Value },
}

impl FlagUpdate {
    pub fn tile(&self) -> &TileId {
        match self {
            FlagUpdate::SeenBy { tile, .. } | FlagUpdate::TileFlags { tile, .. } => tile,
        }
    }
}

impl From<SeenByUpdate> for FlagUpdate {
    fn from(update: SeenByUpdate) -> Self {
        FlagUpdate::SeenBy { tile: update.tile, viewers: update.viewers }
    }
}

/// A host container that holds cloned sprites
pub trait DrawLayer {
    /// Remove every sprite
    fn clear(&mut self);

    /// Add a sprite. Fails when the host cannot build it (missing texture or
    /// geometry).
    fn insert(&mut self, sprite: SpriteDesc) -> Result<()>;

    /// Sprites currently held
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The tabletop the pipeline runs against
pub trait SceneHost: SightQuery {
    type Layer: DrawLayer;

    /// Current scene, or `None` while no scene is drawn
    fn snapshot(&self) -> Option<SceneSnapshot>;

    fn create_layer(&mut self, kind: LayerKind) -> Result<Self::Layer>;

    /// Alpha of the host's own sprite for a placeable
    fn set_source_alpha(&mut self, source: &EntrySource, alpha: f64);

    /// Persist flag changes
    fn write_flags(&mut self, updates: &[FlagUpdate]) -> Result<()>;
}
