//! Scene events: every host lifecycle hook maps onto one variant

use super::config::IsoConfig;
use super::ids::{TileId, TokenId, WallId};

/// A host lifecycle notification
#[derive(Clone, Debug, PartialEq)]
pub enum SceneEvent {
    /// Canvas drawn and ready for layers
    CanvasReady,
    /// Canvas about to be destroyed
    CanvasTeardown,
    /// Active scene switched; the old scene's state must go
    SceneChanged,
    TileCreated(TileId),
    TileUpdated(TileId),
    TileDeleted(TileId),
    TokenCreated(TokenId),
    TokenUpdated(TokenId),
    TokenDeleted(TokenId),
    ControlChanged { token: TokenId, controlled: bool },
    /// Wall moved or door state changed
    WallUpdated(WallId),
    /// Host finished a line-of-sight refresh
    SightRefreshed,
    ConfigChanged(Box<IsoConfig>),
    /// Keybinding: shift global tile opacity
    NudgeTileOpacity(f64),
}

/// What the surface manager does in response to an event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventEffect {
    /// Build the scene context, then refresh
    Setup,
    /// Drop the scene context
    Teardown,
    Refresh,
    /// Refresh after the configured delay, once host geometry settles
    DeferredRefresh,
}

impl SceneEvent {
    pub fn effect(&self) -> EventEffect {
        match self {
            SceneEvent::CanvasReady => EventEffect::Setup,
            SceneEvent::CanvasTeardown | SceneEvent::SceneChanged => EventEffect::Teardown,
            SceneEvent::TileCreated(_) | SceneEvent::TokenCreated(_) => EventEffect::DeferredRefresh,
            SceneEvent::TileUpdated(_)
            | SceneEvent::TileDeleted(_)
            | SceneEvent::TokenUpdated(_)
            | SceneEvent::TokenDeleted(_)
            | SceneEvent::ControlChanged { .. }
            | SceneEvent::WallUpdated(_)
            | SceneEvent::SightRefreshed
            | SceneEvent::ConfigChanged(_)
            | SceneEvent::NudgeTileOpacity(_) => EventEffect::Refresh,
        }
    }
}
