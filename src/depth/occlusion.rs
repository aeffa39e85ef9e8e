//! Occlusion predicates for the south-facing isometric convention.
//!
//! Larger world-y reads as closer to the camera and larger world-x as
//! further away. These predicates are fixed to that facing; other projection
//! presets reuse them unchanged.

use crate::core::types::DVec2;
use crate::math::Rect;
use crate::math::grid::classified_bottom;

/// Tile draws in front of `point`: it starts no further right than the point
/// and its (nudged) bottom edge reaches at least as far south.
pub fn tile_occludes(rect: &Rect, point: DVec2) -> bool {
    rect.x <= point.x && classified_bottom(rect) >= point.y
}

/// Origin `a` would draw in front of origin `b`
fn origin_occludes(a: DVec2, b: DVec2) -> bool {
    a.x <= b.x && a.y >= b.y
}

/// Token at origin `a` must draw after the token at origin `b`: `a` occludes
/// `b` and not the other way round.
pub fn token_draws_after(a: DVec2, b: DVec2) -> bool {
    origin_occludes(a, b) && !origin_occludes(b, a)
}
