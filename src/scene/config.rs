//! User-facing isometric view settings

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::Result;
use crate::depth::DepthConfig;
use crate::math::{Projection, ProjectionPreset};

/// Step applied by one opacity keybinding press
pub const OPACITY_NUDGE_STEP: f64 = 0.1;

/// Global toggles and tuning for the isometric view
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IsoConfig {
    /// Master on/off
    pub isometric_enabled: bool,
    /// Tile-vs-token occlusion and occlusion fading
    pub occlusion_enabled: bool,
    /// Order tiles within a band by footprint instead of host order
    pub auto_sort: bool,
    /// Line-of-sight culling and fog treatment
    pub culling_enabled: bool,
    pub projection: ProjectionPreset,
    /// Global multiplier on foreground tile alpha (0-1)
    pub tile_opacity: f64,
    /// Delay before refreshing after creation events, in milliseconds
    pub refresh_delay_ms: u64,
    /// Log persistence failures loudly
    pub debug: bool,
    pub depth: DepthConfig,
}

impl Default for IsoConfig {
    fn default() -> Self {
        Self {
            isometric_enabled: true,
            occlusion_enabled: true,
            auto_sort: true,
            culling_enabled: true,
            projection: ProjectionPreset::TrueIsometric,
            tile_opacity: 1.0,
            refresh_delay_ms: 50,
            debug: false,
            depth: DepthConfig::default(),
        }
    }
}

impl IsoConfig {
    /// Load from a JSON file (sync). Missing fields take their defaults.
    pub fn load_sync(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Save to a JSON file (sync)
    pub fn save_sync(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Apply scene-level overrides. Only boolean toggles present in the flag
    /// bag are taken; anything else is ignored.
    pub fn with_scene_flags(mut self, flags: &Value) -> Self {
        let toggle = |key: &str| flags.get(key).and_then(Value::as_bool);
        if let Some(v) = toggle("isometricEnabled") {
            self.isometric_enabled = v;
        }
        if let Some(v) = toggle("occlusionEnabled") {
            self.occlusion_enabled = v;
        }
        if let Some(v) = toggle("autoSort") {
            self.auto_sort = v;
        }
        if let Some(v) = toggle("cullingEnabled") {
            self.culling_enabled = v;
        }
        self
    }

    /// Move the global tile opacity by `delta`, clamped to 0-1. Returns the new value.
    pub fn nudge_tile_opacity(&mut self, delta: f64) -> f64 {
        if delta.is_finite() {
            self.tile_opacity = (self.tile_opacity + delta).clamp(0.0, 1.0);
        }
        self.tile_opacity
    }

    /// Active projection; an invalid custom preset falls back to true isometric
    pub fn projection(&self) -> Projection {
        Projection::from_preset(self.projection).unwrap_or_else(|e| {
            log::warn!("{e}, falling back to true isometric");
            Projection::from_preset(ProjectionPreset::TrueIsometric).unwrap_or_default()
        })
    }

    pub fn refresh_delay(&self) -> Duration {
        Duration::from_millis(self.refresh_delay_ms)
    }
}
