//! Line-of-sight culling of tiles and tokens.
//!
//! A tile is in sight when any point sampled along its perimeter, or along a
//! wall linked to it, is visible to any viewer. Tiles seen earlier by a
//! current viewer fall back to fog instead of disappearing when fog
//! exploration is on. Tokens that are not viewers are shown or hidden.
//!
//! The host predicate may be missing or fail. Either way the object is
//! treated as visible.

use std::collections::{BTreeSet, HashMap};

use crate::core::Result;
use crate::core::types::DVec2;
use crate::depth::{DepthPlan, EntrySource, Visibility};
use crate::math::Grid;
use crate::scene::{Tile, TileId, Token, TokenId, Wall, WallId};

/// Host line-of-sight query
pub trait SightQuery {
    /// Whether the host can answer visibility queries right now
    fn visibility_available(&self) -> bool {
        true
    }

    /// Whether `viewer` can see `point`
    fn test_visibility(&self, point: DVec2, viewer: &Token) -> Result<bool>;
}

/// Viewers who have seen each tile this session, ahead of host persistence
pub type SeenCache = HashMap<TileId, BTreeSet<TokenId>>;

/// A tile's seen-by set grew; carries the full new set
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeenByUpdate {
    pub tile: TileId,
    pub viewers: BTreeSet<TokenId>,
}

/// Per-cycle culling against one viewer set
pub struct VisibilityFilter<'a, Q: SightQuery + ?Sized> {
    query: &'a Q,
    viewers: Vec<&'a Token>,
    step: f64,
    walls: HashMap<&'a WallId, &'a Wall>,
    fog_exploration: bool,
    enabled: bool,
}

impl<'a, Q: SightQuery + ?Sized> VisibilityFilter<'a, Q> {
    /// Sample every `grid.size()` world units along edges and walls
    pub fn new(query: &'a Q, viewers: Vec<&'a Token>, grid: Grid, walls: &'a [Wall]) -> Self {
        Self {
            query,
            viewers,
            step: grid.size(),
            walls: walls.iter().map(|w| (&w.id, w)).collect(),
            fog_exploration: false,
            enabled: true,
        }
    }

    pub fn with_fog_exploration(mut self, fog_exploration: bool) -> Self {
        self.fog_exploration = fog_exploration;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Culling has nothing to decide: disabled, no predicate, or no viewers
    fn is_passthrough(&self) -> bool {
        !self.enabled || self.viewers.is_empty() || !self.query.visibility_available()
    }

    fn is_viewer(&self, id: &TokenId) -> bool {
        self.viewers.iter().any(|v| &v.id == id)
    }

    /// Any viewer sees any of the points. A failing query counts as seen.
    fn any_visible(&self, points: &[DVec2]) -> bool {
        for viewer in &self.viewers {
            for &point in points {
                match self.query.test_visibility(point, viewer) {
                    Ok(true) => return true,
                    Ok(false) => {}
                    Err(e) => {
                        log::debug!("Visibility test failed for viewer {}: {e}", viewer.id);
                        return true;
                    }
                }
            }
        }
        false
    }

    fn tile_samples(&self, tile: &Tile) -> Vec<DVec2> {
        let mut points = tile.rect.perimeter_samples(self.step);
        for id in &tile.config.linked_walls {
            if let Some(wall) = self.walls.get(id) {
                points.extend(wall.segment.samples(self.step));
            }
        }
        points
    }

    /// Culling state of one tile, plus the seen-by growth when it is in sight
    pub fn classify_tile(&self, tile: &Tile, cache: &SeenCache) -> (Visibility, Option<SeenByUpdate>) {
        if self.is_passthrough() {
            return (Visibility::Visible, None);
        }

        let mut seen: BTreeSet<TokenId> = tile.config.seen_by.clone();
        if let Some(cached) = cache.get(&tile.id) {
            seen.extend(cached.iter().cloned());
        }

        if self.any_visible(&self.tile_samples(tile)) {
            let before = seen.len();
            seen.extend(self.viewers.iter().map(|v| v.id.clone()));
            let update = (seen.len() != before)
                .then(|| SeenByUpdate { tile: tile.id.clone(), viewers: seen });
            return (Visibility::Visible, update);
        }

        let seen_by_viewer = seen.iter().any(|id| self.is_viewer(id));
        if seen_by_viewer && self.fog_exploration && !tile.config.hide_on_fog {
            (Visibility::Fogged, None)
        } else {
            (Visibility::Hidden, None)
        }
    }

    /// Culling state of one token. Viewers are always shown.
    pub fn classify_token(&self, token: &Token) -> Visibility {
        if self.is_passthrough() || self.is_viewer(&token.id) {
            return Visibility::Visible;
        }
        if self.any_visible(&token.rect.perimeter_samples(self.step)) {
            Visibility::Visible
        } else {
            Visibility::Hidden
        }
    }

    /// Mark every foreground entry of `plan`. Background tiles are floor and
    /// are never culled.
    ///
    /// New seen-by sets are written into `cache` and returned for persistence.
    pub fn apply(
        &self,
        plan: &mut DepthPlan,
        tiles: &[Tile],
        tokens: &[Token],
        cache: &mut SeenCache,
    ) -> Vec<SeenByUpdate> {
        let tiles: HashMap<&TileId, &Tile> = tiles.iter().map(|t| (&t.id, t)).collect();
        let tokens: HashMap<&TokenId, &Token> = tokens.iter().map(|t| (&t.id, t)).collect();
        let mut updates = Vec::new();

        for entry in &mut plan.foreground {
            entry.visibility = match &entry.source {
                EntrySource::Tile(id) => match tiles.get(id) {
                    Some(tile) => {
                        let (visibility, update) = self.classify_tile(tile, cache);
                        if let Some(update) = update {
                            cache.insert(update.tile.clone(), update.viewers.clone());
                            updates.push(update);
                        }
                        visibility
                    }
                    None => Visibility::Visible,
                },
                EntrySource::Token(id) => tokens
                    .get(id)
                    .map_or(Visibility::Visible, |token| self.classify_token(token)),
            };
        }

        if !updates.is_empty() {
            log::debug!("{} tiles gained viewers", updates.len());
        }
        updates
    }
}
