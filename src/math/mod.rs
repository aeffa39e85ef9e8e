//! Mathematical utilities: rectangles, grid classification, projection

pub mod rect;
pub mod grid;
pub mod projection;

pub use rect::{Rect, Segment};
pub use grid::{Grid, GridCell, EDGE_EPSILON};
pub use projection::{Projection, ProjectionAngles, ProjectionPreset};
