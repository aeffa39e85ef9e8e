//! Isoview - isometric depth ordering, occlusion and visibility culling for
//! 2D tabletop scenes

pub mod core;
pub mod math;
pub mod scene;
pub mod depth;
pub mod visibility;
pub mod host;
pub mod render;
