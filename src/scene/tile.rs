//! Tiles: placed rectangular scenery and their typed configuration.
//!
//! Hosts persist tile configuration as a loose JSON flag bag. `TileConfig`
//! is the typed view of that bag; every read goes through
//! [`TileConfig::from_flags`], which normalizes malformed shapes instead of
//! trusting the stored schema.

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::{Error, Result};
use crate::math::Rect;
use super::ids::{TileId, TokenId, WallId};

/// Keys of the persisted tile flag bag
pub mod flag_keys {
    pub const LAYER: &str = "layer";
    /// Legacy boolean superseded by `layer`
    pub const OCCLUDING: &str = "occluding";
    pub const OCCLUSION_OPACITY: &str = "occlusionOpacity";
    pub const LINKED_WALLS: &str = "linkedWallIds";
    pub const HIDE_ON_FOG: &str = "hideOnFog";
    pub const SEEN_BY: &str = "seenBy";
}

/// Which draw layer a tile belongs to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileLayer {
    /// Drawn beneath everything, ordered only by sort band
    Background,
    /// Takes part in occlusion against tokens
    #[default]
    Foreground,
}

impl TileLayer {
    pub fn as_str(&self) -> &'static str {
        match self {
            TileLayer::Background => "background",
            TileLayer::Foreground => "foreground",
        }
    }
}

impl FromStr for TileLayer {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "background" => Ok(TileLayer::Background),
            "foreground" => Ok(TileLayer::Foreground),
            other => Err(Error::Flags(format!("unknown tile layer {other:?}"))),
        }
    }
}

/// Typed per-tile configuration
#[derive(Clone, Debug, PartialEq)]
pub struct TileConfig {
    pub layer: TileLayer,
    /// Alpha multiplier applied while the tile occludes a viewer (0-1)
    pub occlusion_opacity: f64,
    /// Walls whose doors hide this tile and whose segments are sampled for visibility
    pub linked_walls: Vec<WallId>,
    /// Hide instead of fogging once out of sight
    pub hide_on_fog: bool,
    /// Viewers that have seen this tile at least once
    pub seen_by: BTreeSet<TokenId>,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            layer: TileLayer::Foreground,
            occlusion_opacity: 1.0,
            linked_walls: Vec::new(),
            hide_on_fog: false,
            seen_by: BTreeSet::new(),
        }
    }
}

impl TileConfig {
    /// Read a flag bag, normalizing anything malformed.
    ///
    /// A missing `layer` falls back to the legacy `occluding` boolean.
    pub fn from_flags(flags: &Value) -> Self {
        let mut config = Self::default();
        let Some(map) = flags.as_object() else {
            if !flags.is_null() {
                log::warn!("Tile flags are not an object, using defaults: {flags}");
            }
            return config;
        };

        config.layer = match map.get(flag_keys::LAYER) {
            Some(v) => parse_layer(v),
            None => match map.get(flag_keys::OCCLUDING).and_then(Value::as_bool) {
                Some(false) => TileLayer::Background,
                _ => TileLayer::Foreground,
            },
        };

        if let Some(v) = map.get(flag_keys::OCCLUSION_OPACITY) {
            config.occlusion_opacity = parse_opacity(v);
        }

        config.linked_walls = map
            .get(flag_keys::LINKED_WALLS)
            .map(normalize_id_list)
            .unwrap_or_default()
            .into_iter()
            .map(WallId)
            .collect();

        config.hide_on_fog = map
            .get(flag_keys::HIDE_ON_FOG)
            .and_then(Value::as_bool)
            .unwrap_or(false);

        config.seen_by = map
            .get(flag_keys::SEEN_BY)
            .map(normalize_id_list)
            .unwrap_or_default()
            .into_iter()
            .map(TokenId)
            .collect();

        config
    }

    /// Serialize back into the persisted flag bag shape
    pub fn to_flags(&self) -> Value {
        let mut map = Map::new();
        map.insert(flag_keys::LAYER.into(), Value::from(self.layer.as_str()));
        map.insert(flag_keys::OCCLUSION_OPACITY.into(), Value::from(self.occlusion_opacity));
        map.insert(flag_keys::LINKED_WALLS.into(), id_array(self.linked_walls.iter().map(WallId::as_str)));
        map.insert(flag_keys::HIDE_ON_FOG.into(), Value::from(self.hide_on_fog));
        map.insert(flag_keys::SEEN_BY.into(), id_array(self.seen_by.iter().map(TokenId::as_str)));
        Value::Object(map)
    }

    /// True for flag bags still carrying only the legacy `occluding` flag
    pub fn needs_migration(flags: &Value) -> bool {
        flags
            .as_object()
            .is_some_and(|m| m.contains_key(flag_keys::OCCLUDING) && !m.contains_key(flag_keys::LAYER))
    }

    /// Migrated flag bag, or `None` when no migration is needed.
    ///
    /// Unknown keys are preserved; `occluding` is replaced by `layer`.
    pub fn migrate_flags(flags: &Value) -> Option<Value> {
        if !Self::needs_migration(flags) {
            return None;
        }
        let layer = Self::from_flags(flags).layer;
        let mut map: Map<String, Value> = flags.as_object().cloned().unwrap_or_default();
        map.remove(flag_keys::OCCLUDING);
        map.insert(flag_keys::LAYER.to_string(), Value::from(layer.as_str()));
        Some(Value::Object(map))
    }

    pub fn with_layer(mut self, layer: TileLayer) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_occlusion_opacity(mut self, opacity: f64) -> Self {
        self.occlusion_opacity = clamp_opacity(opacity);
        self
    }

    pub fn with_linked_walls(mut self, walls: impl IntoIterator<Item = WallId>) -> Self {
        self.linked_walls = walls.into_iter().collect();
        self
    }

    pub fn with_hide_on_fog(mut self, hide: bool) -> Self {
        self.hide_on_fog = hide;
        self
    }

    pub fn with_seen_by(mut self, viewers: impl IntoIterator<Item = TokenId>) -> Self {
        self.seen_by = viewers.into_iter().collect();
        self
    }
}

/// Tile document as stored by the host
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileRecord {
    pub id: TileId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Sort band
    #[serde(default)]
    pub sort: i32,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    #[serde(default)]
    pub flags: Value,
}

fn default_alpha() -> f64 {
    1.0
}

/// A tile with validated geometry and typed configuration
#[derive(Clone, Debug, PartialEq)]
pub struct Tile {
    pub id: TileId,
    pub rect: Rect,
    /// Sort band: coarse user-controlled ordering bucket
    pub sort: i32,
    /// Base alpha from the host document
    pub alpha: f64,
    pub config: TileConfig,
}

impl Tile {
    /// Create a tile with default configuration
    pub fn new(id: impl Into<TileId>, rect: Rect, sort: i32) -> Result<Self> {
        let id = id.into();
        if !rect.is_valid() {
            return Err(Error::Geometry(format!("tile {id} has invalid bounds {rect:?}")));
        }
        Ok(Self { id, rect, sort, alpha: 1.0, config: TileConfig::default() })
    }

    /// Build from a host record, normalizing its flags
    pub fn from_record(record: &TileRecord) -> Result<Self> {
        let rect = Rect::new(record.x, record.y, record.width, record.height);
        let mut tile = Self::new(record.id.clone(), rect, record.sort)?;
        tile.alpha = clamp_opacity(record.alpha);
        tile.config = TileConfig::from_flags(&record.flags);
        Ok(tile)
    }

    pub fn with_config(mut self, config: TileConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = clamp_opacity(alpha);
        self
    }

    pub fn is_foreground(&self) -> bool {
        self.config.layer == TileLayer::Foreground
    }
}

fn clamp_opacity(v: f64) -> f64 {
    if v.is_nan() { 1.0 } else { v.clamp(0.0, 1.0) }
}

fn id_array<'a>(ids: impl Iterator<Item = &'a str>) -> Value {
    Value::Array(ids.map(Value::from).collect())
}

fn parse_layer(v: &Value) -> TileLayer {
    let parsed = match v.as_str() {
        Some(s) => s.parse::<TileLayer>(),
        None => Err(Error::Flags(format!("layer {v} is not a string"))),
    };
    parsed.unwrap_or_else(|e| {
        log::warn!("{e}, treating as foreground");
        TileLayer::Foreground
    })
}

fn parse_opacity(v: &Value) -> f64 {
    let raw = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    raw.map(clamp_opacity).unwrap_or(1.0)
}

/// Flatten an id list stored as an array, a delimited string, an object, or
/// a scalar into a deduplicated list of non-empty ids.
fn normalize_id_list(v: &Value) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    collect_ids(v, &mut out, 0);
    let mut seen = BTreeSet::new();
    out.retain(|id| seen.insert(id.clone()));
    out
}

fn collect_ids(v: &Value, out: &mut Vec<String>, depth: u32) {
    // Nested containers beyond one level are not a shape any host writes
    if depth > 1 {
        return;
    }
    match v {
        Value::String(s) => out.extend(
            s.split(|c: char| c == ',' || c.is_whitespace())
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
        ),
        Value::Number(n) => out.push(n.to_string()),
        Value::Array(items) => items.iter().for_each(|item| collect_ids(item, out, depth + 1)),
        Value::Object(map) => map.values().for_each(|item| collect_ids(item, out, depth + 1)),
        Value::Null | Value::Bool(_) => {}
    }
}
