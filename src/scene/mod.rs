//! Scene model: tiles, tokens, walls, viewers, events and settings

pub mod config;
pub mod event;
pub mod ids;
pub mod overlay;
pub mod snapshot;
pub mod tile;
pub mod token;
pub mod viewer;
pub mod wall;

pub use config::IsoConfig;
pub use event::{EventEffect, SceneEvent};
pub use ids::{TileId, TokenId, WallId};
pub use snapshot::SceneSnapshot;
pub use tile::{Tile, TileConfig, TileLayer, TileRecord};
pub use token::Token;
pub use viewer::{ViewerSet, ViewerSource};
pub use wall::{DoorKind, DoorState, Wall};
