//! Grid classification of world points and tile edges.
//!
//! Bottom edges are nudged inward by [`EDGE_EPSILON`] before flooring, so a
//! tile whose bottom edge sits exactly on a grid line lands in the row above.
//! A token centered on that same line floors into the row below, which keeps
//! "tile ends where token begins" consistent everywhere the rule is applied.
//! Every bottom-edge classification in the crate goes through this module.

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::core::types::DVec2;
use super::rect::Rect;

/// Inward nudge applied to bottom edges, in world units
pub const EDGE_EPSILON: f64 = 1e-4;

/// Integer grid cell coordinate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    pub x: i64,
    pub y: i64,
}

impl GridCell {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// Square scene grid
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Grid {
    size: f64,
}

impl Grid {
    /// Create a grid with the given cell size in world units
    pub fn new(size: f64) -> Result<Self> {
        if !(size.is_finite() && size > 0.0) {
            return Err(Error::Geometry(format!("invalid grid size {size}")));
        }
        Ok(Self { size })
    }

    /// Cell size in world units
    pub fn size(&self) -> f64 {
        self.size
    }

    /// Cell containing a world point
    pub fn cell_of(&self, point: DVec2) -> GridCell {
        GridCell::new(
            (point.x / self.size).floor() as i64,
            (point.y / self.size).floor() as i64,
        )
    }

    /// Row of a rectangle's bottom edge, with the inward nudge applied
    pub fn bottom_row(&self, rect: &Rect) -> i64 {
        (classified_bottom(rect) / self.size).floor() as i64
    }

    /// Cell holding a rectangle's bottom-left corner, with the inward nudge applied
    pub fn bottom_cell(&self, rect: &Rect) -> GridCell {
        GridCell::new((rect.x / self.size).floor() as i64, self.bottom_row(rect))
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self { size: 100.0 }
    }
}

/// Bottom edge y of a rectangle after the inward nudge
pub fn classified_bottom(rect: &Rect) -> f64 {
    rect.bottom() - EDGE_EPSILON
}
