//! Final sprite alpha and colour filter per depth entry

use std::collections::HashMap;

use crate::core::types::DVec2;
use crate::depth::{tile_occludes, DepthEntry, DepthPlan, EntrySource, Visibility};
use crate::scene::{Tile, TileId};
use crate::visibility::{ColorMatrix, FOG_MATRIX};

/// Alpha rules for one update cycle
#[derive(Clone, Debug)]
pub struct Compositor {
    /// Anchors of the current viewers
    viewer_anchors: Vec<DVec2>,
    occlusion: bool,
    tile_opacity: f64,
}

impl Compositor {
    pub fn new(viewer_anchors: Vec<DVec2>) -> Self {
        Self { viewer_anchors, occlusion: true, tile_opacity: 1.0 }
    }

    pub fn with_occlusion(mut self, occlusion: bool) -> Self {
        self.occlusion = occlusion;
        self
    }

    /// Global multiplier on foreground tiles, clamped to 0-1
    pub fn with_tile_opacity(mut self, opacity: f64) -> Self {
        self.tile_opacity = if opacity.is_nan() { 1.0 } else { opacity.clamp(0.0, 1.0) };
        self
    }

    /// Whether the tile stands in front of any viewer
    pub fn occludes_viewer(&self, tile: &Tile) -> bool {
        self.viewer_anchors.iter().any(|&p| tile_occludes(&tile.rect, p))
    }

    /// Alpha of a foreground tile
    pub fn tile_alpha(&self, tile: &Tile) -> f64 {
        let mut alpha = tile.alpha * self.tile_opacity;
        if self.occlusion && self.occludes_viewer(tile) {
            alpha *= tile.config.occlusion_opacity;
        }
        alpha
    }

    /// Set the alpha of every drawn foreground tile. Tokens and background
    /// tiles keep their base alpha.
    pub fn apply(&self, plan: &mut DepthPlan, tiles: &[Tile]) {
        let tiles: HashMap<&TileId, &Tile> = tiles.iter().map(|t| (&t.id, t)).collect();
        for entry in plan.foreground.iter_mut().filter(|e| e.is_drawn()) {
            if let EntrySource::Tile(id) = &entry.source {
                if let Some(tile) = tiles.get(id) {
                    entry.alpha = self.tile_alpha(tile);
                }
            }
        }
    }
}

/// Colour filter for an entry's culling state
pub fn filter_for(entry: &DepthEntry) -> Option<ColorMatrix> {
    (entry.visibility == Visibility::Fogged).then_some(FOG_MATRIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depth::{DepthEngine, SortOptions};
    use crate::math::Rect;
    use crate::scene::{TileConfig, Token};

    fn roof() -> Tile {
        Tile::new("roof", Rect::new(0.0, 0.0, 100.0, 200.0), 0)
            .unwrap()
            .with_config(TileConfig::default().with_occlusion_opacity(0.3))
            .with_alpha(0.8)
    }

    #[test]
    fn test_occluding_tile_fades() {
        let behind = Compositor::new(vec![DVec2::new(50.0, 150.0)]);
        assert!((behind.tile_alpha(&roof()) - 0.24).abs() < 1e-12);

        let clear = Compositor::new(vec![DVec2::new(50.0, 500.0)]);
        assert!((clear.tile_alpha(&roof()) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_any_viewer_triggers_fade() {
        let c = Compositor::new(vec![DVec2::new(50.0, 500.0), DVec2::new(60.0, 100.0)]);
        assert!(c.occludes_viewer(&roof()));
    }

    #[test]
    fn test_occlusion_disabled_keeps_base_alpha() {
        let c = Compositor::new(vec![DVec2::new(50.0, 150.0)]).with_occlusion(false);
        assert!((c.tile_alpha(&roof()) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_global_tile_opacity() {
        let c = Compositor::new(vec![]).with_tile_opacity(0.5);
        assert!((c.tile_alpha(&roof()) - 0.4).abs() < 1e-12);
        let c = Compositor::new(vec![]).with_tile_opacity(7.0);
        assert!((c.tile_alpha(&roof()) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_hidden_entries_untouched_and_fog_filter() {
        let tiles = vec![roof()];
        let hero = Token::new("hero", Rect::new(0.0, 100.0, 100.0, 100.0));
        let mut plan = DepthEngine::default().assign(&tiles, &[hero.clone()], &[], SortOptions::default());
        let source = EntrySource::Tile(TileId::from("roof"));

        for entry in plan.foreground.iter_mut().filter(|e| e.source == source) {
            entry.visibility = Visibility::Hidden;
        }
        Compositor::new(vec![hero.anchor()]).apply(&mut plan, &tiles);
        assert_eq!(plan.entry(&source).map(|e| e.alpha), Some(0.8));

        let mut entry = plan.entry(&source).cloned().unwrap();
        assert_eq!(filter_for(&entry), None);
        entry.visibility = Visibility::Fogged;
        assert_eq!(filter_for(&entry), Some(FOG_MATRIX));
    }
}
