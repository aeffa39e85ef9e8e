//! Per-scene state owned by the surface manager

use std::collections::HashMap;

use crate::core::Result;
use crate::depth::{DepthPlan, EntrySource};
use crate::host::{DrawLayer, LayerKind, SceneHost};
use crate::scene::TokenId;
use crate::visibility::SeenCache;
use super::scheduler::RefreshScheduler;

/// Everything that lives between `CanvasReady` and teardown
pub struct SceneContext<L: DrawLayer> {
    pub background: L,
    pub foreground: L,
    /// Most recently controlled token, the viewer fallback
    pub last_controlled: Option<TokenId>,
    pub seen: SeenCache,
    pub scheduler: RefreshScheduler,
    /// Host sprites hidden behind clones, with the alpha to restore
    pub cloned: HashMap<EntrySource, f64>,
    /// Result of the last refresh
    pub last_plan: Option<DepthPlan>,
}

impl<L: DrawLayer> SceneContext<L> {
    /// Create both draw layers on the host
    pub fn new<H: SceneHost<Layer = L>>(host: &mut H) -> Result<Self> {
        Ok(Self {
            background: host.create_layer(LayerKind::Background)?,
            foreground: host.create_layer(LayerKind::Foreground)?,
            last_controlled: None,
            seen: SeenCache::new(),
            scheduler: RefreshScheduler::new(),
            cloned: HashMap::new(),
            last_plan: None,
        })
    }

    pub fn clear_layers(&mut self) {
        self.background.clear();
        self.foreground.clear();
    }

    /// Give every cloned host sprite its alpha back
    pub fn restore_sources<H: SceneHost<Layer = L>>(&mut self, host: &mut H) {
        for (source, alpha) in self.cloned.drain() {
            host.set_source_alpha(&source, alpha);
        }
    }
}
