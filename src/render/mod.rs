//! Draw-layer management: compositing, refresh scheduling and the surface
//! manager that ties the pipeline together

pub mod compositor;
pub mod context;
pub mod scheduler;
pub mod surface;

pub use compositor::Compositor;
pub use context::SceneContext;
pub use scheduler::RefreshScheduler;
pub use surface::RenderSurfaceManager;
