//! Line-of-sight culling and fog treatment

pub mod culling;
pub mod fog;

pub use culling::{SeenByUpdate, SeenCache, SightQuery, VisibilityFilter};
pub use fog::{ColorMatrix, FOG_MATRIX};
