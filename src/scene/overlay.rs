//! Debug overlay: which grid cell each placeable is classified into.
//!
//! Tiles report their bottom-edge cell using the same inward nudge as the
//! depth engine, so what the overlay draws is what the sort used.

use crate::math::{Grid, GridCell};
use super::tile::Tile;
use super::token::Token;

/// What an overlay mark refers to
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum OverlaySource {
    Tile(String),
    Token(String),
}

/// One highlighted cell
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverlayMark {
    pub cell: GridCell,
    pub source: OverlaySource,
}

/// Marks for every tile bottom edge and token anchor, ordered by row then
/// column then source.
pub fn grid_overlay(grid: &Grid, tiles: &[Tile], tokens: &[Token]) -> Vec<OverlayMark> {
    let mut marks: Vec<OverlayMark> = tiles
        .iter()
        .map(|tile| OverlayMark {
            cell: grid.bottom_cell(&tile.rect),
            source: OverlaySource::Tile(tile.id.to_string()),
        })
        .chain(tokens.iter().map(|token| OverlayMark {
            cell: grid.cell_of(token.anchor()),
            source: OverlaySource::Token(token.id.to_string()),
        }))
        .collect();

    marks.sort_by(|a, b| {
        (a.cell.y, a.cell.x, &a.source).cmp(&(b.cell.y, b.cell.x, &b.source))
    });
    marks
}
