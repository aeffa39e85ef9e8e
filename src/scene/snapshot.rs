//! Per-cycle view of the host scene

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::Result;
use crate::math::Grid;
use super::ids::{TokenId, WallId};
use super::tile::{Tile, TileRecord};
use super::token::Token;
use super::wall::Wall;

/// Everything the pipeline reads from the host for one update cycle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneSnapshot {
    #[serde(default = "default_grid_size")]
    pub grid_size: f64,
    #[serde(default)]
    pub tiles: Vec<TileRecord>,
    #[serde(default)]
    pub tokens: Vec<Token>,
    #[serde(default)]
    pub walls: Vec<Wall>,
    /// Scene-level fog-of-war exploration toggle
    #[serde(default)]
    pub fog_exploration: bool,
    /// Scene flag bag; may override the global toggles
    #[serde(default)]
    pub flags: Value,
}

fn default_grid_size() -> f64 {
    100.0
}

impl Default for SceneSnapshot {
    fn default() -> Self {
        Self {
            grid_size: default_grid_size(),
            tiles: Vec::new(),
            tokens: Vec::new(),
            walls: Vec::new(),
            fog_exploration: false,
            flags: Value::Null,
        }
    }
}

impl SceneSnapshot {
    /// Scene grid; falls back to the default grid for an invalid size
    pub fn grid(&self) -> Grid {
        Grid::new(self.grid_size).unwrap_or_else(|e| {
            log::warn!("{e}, using default grid");
            Grid::default()
        })
    }

    /// Typed tiles. Records with invalid geometry are skipped.
    pub fn typed_tiles(&self) -> Vec<Tile> {
        self.tiles
            .iter()
            .filter_map(|record| match Tile::from_record(record) {
                Ok(tile) => Some(tile),
                Err(e) => {
                    log::debug!("Skipping tile: {e}");
                    None
                }
            })
            .collect()
    }

    /// Walls indexed by id
    pub fn walls_by_id(&self) -> HashMap<&WallId, &Wall> {
        self.walls.iter().map(|w| (&w.id, w)).collect()
    }

    pub fn token(&self, id: &TokenId) -> Option<&Token> {
        self.tokens.iter().find(|t| &t.id == id)
    }

    /// Load from a JSON file (sync)
    pub fn load_sync(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Save to a JSON file (sync)
    pub fn save_sync(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }
}
