//! Depth ordering: tile bands, token interpolation and token refinement

pub mod engine;
pub mod entry;
pub mod occlusion;

pub use engine::{DepthConfig, DepthEngine, DepthPlan, SortOptions};
pub use entry::{DepthEntry, EntrySource, Visibility};
pub use occlusion::{tile_occludes, token_draws_after};
