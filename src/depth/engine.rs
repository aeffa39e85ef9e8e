//! Depth assignment for tiles and tokens.
//!
//! Tiles get `band * stride + offset` where the offset spaces tiles of one
//! sort band evenly inside `[margin, stride - margin]`. Tokens are slotted
//! between the tiles that do and do not occlude them, then ordered among
//! themselves by a deterministic topological sort over the origin predicate.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap, HashSet};

use serde::{Deserialize, Serialize};

use crate::math::grid::classified_bottom;
use crate::scene::{Tile, TileId, Token, Wall, WallId};
use super::entry::{DepthEntry, EntrySource};
use super::occlusion::{tile_occludes, token_draws_after};

/// Depth spacing parameters
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DepthConfig {
    /// Depth distance between consecutive sort bands
    pub stride: f64,
    /// Unused depth at each end of a band
    pub margin: f64,
    /// Preferred spacing between tiles of one band
    pub step: f64,
    /// Spacing between consecutive tokens after refinement
    pub token_epsilon: f64,
}

impl Default for DepthConfig {
    fn default() -> Self {
        Self {
            stride: 10_000.0,
            margin: 10.0,
            step: 10.0,
            token_epsilon: 1e-3,
        }
    }
}

impl DepthConfig {
    /// Tiles one band holds at the preferred step
    pub fn band_capacity(&self) -> usize {
        let usable = (self.stride - 2.0 * self.margin).max(0.0);
        if self.step <= 0.0 {
            return 1;
        }
        (usable / self.step).floor() as usize + 1
    }
}

/// Feature switches for one assignment pass
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortOptions {
    /// Interpolate token depth against occluding tiles
    pub occlusion: bool,
    /// Order tiles inside a band by footprint rather than host order
    pub auto_sort: bool,
}

impl Default for SortOptions {
    fn default() -> Self {
        Self { occlusion: true, auto_sort: true }
    }
}

/// Output of one assignment pass
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DepthPlan {
    /// Background tiles, ascending depth
    pub background: Vec<DepthEntry>,
    /// Foreground tiles and tokens merged, ascending depth
    pub foreground: Vec<DepthEntry>,
    /// Tiles removed because a linked door stands open
    pub door_hidden: Vec<TileId>,
}

impl DepthPlan {
    pub fn entry(&self, source: &EntrySource) -> Option<&DepthEntry> {
        self.foreground
            .iter()
            .chain(self.background.iter())
            .find(|e| &e.source == source)
    }

    pub fn depth_of(&self, source: &EntrySource) -> Option<f64> {
        self.entry(source).map(|e| e.depth)
    }

    /// Foreground sources in draw order (back to front)
    pub fn draw_order(&self) -> impl Iterator<Item = &EntrySource> + '_ {
        self.foreground.iter().map(|e| &e.source)
    }
}

/// Computes draw depths for one update cycle
#[derive(Clone, Debug, Default)]
pub struct DepthEngine {
    config: DepthConfig,
}

impl DepthEngine {
    pub fn new(config: DepthConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DepthConfig {
        &self.config
    }

    /// Assign depths to every tile and token.
    pub fn assign(
        &self,
        tiles: &[Tile],
        tokens: &[Token],
        walls: &[Wall],
        options: SortOptions,
    ) -> DepthPlan {
        let open_doors: HashSet<&WallId> = walls
            .iter()
            .filter(|w| w.is_open_door())
            .map(|w| &w.id)
            .collect();

        let mut background = Vec::new();
        let mut foreground = Vec::new();
        let mut door_hidden = Vec::new();

        for (index, tile) in tiles.iter().enumerate() {
            if tile.config.linked_walls.iter().any(|w| open_doors.contains(w)) {
                door_hidden.push(tile.id.clone());
            } else if tile.is_foreground() {
                foreground.push((index, tile));
            } else {
                background.push((index, tile));
            }
        }

        let background_depths = self.band_depths(&background, false);
        let foreground_depths = self.band_depths(&foreground, options.auto_sort);

        let fg_tiles: Vec<(&Tile, f64)> = foreground_depths
            .iter()
            .map(|&(index, depth)| (&tiles[index], depth))
            .collect();

        let token_depths = self.token_depths(tokens, &fg_tiles, options.occlusion);

        let mut bg_entries: Vec<(DepthEntry, u8, usize)> = background_depths
            .iter()
            .map(|&(index, depth)| {
                let tile = &tiles[index];
                (DepthEntry::new(EntrySource::Tile(tile.id.clone()), depth, tile.alpha), 0, index)
            })
            .collect();

        let mut fg_entries: Vec<(DepthEntry, u8, usize)> = foreground_depths
            .iter()
            .map(|&(index, depth)| {
                let tile = &tiles[index];
                (DepthEntry::new(EntrySource::Tile(tile.id.clone()), depth, tile.alpha), 0, index)
            })
            .collect();
        fg_entries.extend(token_depths.iter().enumerate().map(|(rank, &(index, depth))| {
            let token = &tokens[index];
            (DepthEntry::new(EntrySource::Token(token.id.clone()), depth, token.alpha), 1, rank)
        }));

        DepthPlan {
            background: into_sorted(&mut bg_entries),
            foreground: into_sorted(&mut fg_entries),
            door_hidden,
        }
    }

    /// Depth per tile: grouped by sort band, evenly spaced inside each band.
    ///
    /// Returns `(tile index, depth)` pairs.
    fn band_depths(&self, tiles: &[(usize, &Tile)], by_footprint: bool) -> Vec<(usize, f64)> {
        let mut bands: BTreeMap<i32, Vec<(usize, &Tile)>> = BTreeMap::new();
        for &(index, tile) in tiles {
            bands.entry(tile.sort).or_default().push((index, tile));
        }

        let usable = (self.config.stride - 2.0 * self.config.margin).max(0.0);
        let mut out = Vec::with_capacity(tiles.len());

        for (band, mut members) in bands {
            if by_footprint {
                members.sort_by(|(ia, a), (ib, b)| {
                    classified_bottom(&a.rect)
                        .total_cmp(&classified_bottom(&b.rect))
                        .then(a.rect.x.total_cmp(&b.rect.x))
                        .then(ia.cmp(ib))
                });
            }

            let n = members.len();
            let mut step = self.config.step;
            if n > self.config.band_capacity() {
                step = usable / (n - 1) as f64;
                log::warn!(
                    "Sort band {} holds {} tiles, more than fit at step {}; compressing to {:.4}",
                    band, n, self.config.step, step
                );
            }

            let base = band as f64 * self.config.stride + self.config.margin;
            for (slot, (index, _)) in members.into_iter().enumerate() {
                out.push((index, base + slot as f64 * step));
            }
        }

        out
    }

    /// Final token depths in draw order, as `(token index, depth)` pairs.
    fn token_depths(
        &self,
        tokens: &[Token],
        fg_tiles: &[(&Tile, f64)],
        occlusion: bool,
    ) -> Vec<(usize, f64)> {
        let top = fg_tiles.iter().map(|&(_, d)| d).fold(None, |acc: Option<f64>, d| {
            Some(acc.map_or(d, |a| a.max(d)))
        });

        let (base, ceiling): (Vec<f64>, Vec<Option<f64>>) = tokens
            .iter()
            .map(|token| {
                if occlusion {
                    base_token_depth(token, fg_tiles)
                } else {
                    (top.map_or(0.0, |d| d + 1.0), None)
                }
            })
            .unzip();

        let order = order_tokens(tokens, &base);

        // Rank spacing may reorder tokens, never lift one past an occluder
        let eps = self.config.token_epsilon;
        order
            .into_iter()
            .enumerate()
            .map(|(rank, index)| {
                let mut depth = base[index] + rank as f64 * eps;
                if let Some(occluder) = ceiling[index] {
                    depth = depth.min(occluder - eps).max(base[index]);
                }
                (index, depth)
            })
            .collect()
    }
}

/// Depth of a token before token-token refinement, paired with the depth of
/// the nearest tile occluding it
fn base_token_depth(token: &Token, fg_tiles: &[(&Tile, f64)]) -> (f64, Option<f64>) {
    let anchor = token.anchor();
    let mut min_occluding: Option<f64> = None;
    let mut max_clear: Option<f64> = None;

    for &(tile, depth) in fg_tiles {
        if tile_occludes(&tile.rect, anchor) {
            min_occluding = Some(min_occluding.map_or(depth, |m| m.min(depth)));
        } else {
            max_clear = Some(max_clear.map_or(depth, |m| m.max(depth)));
        }
    }

    let base = match (min_occluding, max_clear) {
        (None, None) => 0.0,
        (None, Some(clear)) => clear + 1.0,
        (Some(occ), Some(clear)) if clear < occ => (clear + occ) * 0.5,
        (Some(occ), _) => occ - 1.0,
    };
    (base, min_occluding)
}

/// Heap key for tokens with no ordering constraint left between them
#[derive(Clone, Copy, Debug)]
struct TokenKey {
    base: f64,
    y: f64,
    x: f64,
    index: usize,
}

impl PartialEq for TokenKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TokenKey {}

impl Ord for TokenKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.base
            .total_cmp(&other.base)
            .then(self.y.total_cmp(&other.y))
            .then(self.x.total_cmp(&other.x))
            .then(self.index.cmp(&other.index))
    }
}

impl PartialOrd for TokenKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Back-to-front token order.
///
/// A token that must draw after another is never emitted before it. Among
/// tokens free to go next, the smallest (base depth, y, x, index) wins. The
/// strict origin relation is a dominance order, so the graph is acyclic.
fn order_tokens(tokens: &[Token], base: &[f64]) -> Vec<usize> {
    let n = tokens.len();
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut pending = vec![0usize; n];

    for a in 0..n {
        for b in 0..n {
            if a != b && token_draws_after(tokens[a].origin(), tokens[b].origin()) {
                successors[b].push(a);
                pending[a] += 1;
            }
        }
    }

    let key = |index: usize| {
        let origin = tokens[index].origin();
        TokenKey { base: base[index], y: origin.y, x: origin.x, index }
    };

    let mut ready: BinaryHeap<Reverse<TokenKey>> = (0..n)
        .filter(|&i| pending[i] == 0)
        .map(|i| Reverse(key(i)))
        .collect();

    let mut order = Vec::with_capacity(n);
    while let Some(Reverse(next)) = ready.pop() {
        order.push(next.index);
        for &succ in &successors[next.index] {
            pending[succ] -= 1;
            if pending[succ] == 0 {
                ready.push(Reverse(key(succ)));
            }
        }
    }

    order
}

fn into_sorted(entries: &mut Vec<(DepthEntry, u8, usize)>) -> Vec<DepthEntry> {
    entries.sort_by(|(a, ka, ia), (b, kb, ib)| {
        a.depth.total_cmp(&b.depth).then(ka.cmp(kb)).then(ia.cmp(ib))
    });
    entries.drain(..).map(|(entry, _, _)| entry).collect()
}
