//! In-memory host for tests, benchmarks and offline inspection

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::core::{Error, Result};
use crate::core::types::DVec2;
use crate::depth::EntrySource;
use crate::math::Rect;
use crate::scene::{SceneSnapshot, TileId, TileRecord, Token};
use crate::scene::tile::flag_keys;
use crate::visibility::SightQuery;
use super::{DrawLayer, FlagUpdate, LayerKind, SceneHost, SpriteDesc};

/// Canned line-of-sight behaviour
#[derive(Clone, Debug, Default, PartialEq)]
pub enum LineOfSight {
    /// Every point is visible
    #[default]
    Clear,
    /// No point is visible
    Blind,
    /// Only points inside these rectangles are visible
    Windows(Vec<Rect>),
    /// The host has no sight layer
    Unavailable,
    /// Every query errors
    Failing,
}

/// Draw layer that keeps sprites in a vector
#[derive(Clone, Debug, Default)]
pub struct MemoryLayer {
    pub kind: Option<LayerKind>,
    sprites: Vec<SpriteDesc>,
}

impl MemoryLayer {
    pub fn new(kind: LayerKind) -> Self {
        Self { kind: Some(kind), sprites: Vec::new() }
    }

    /// Sprites in insertion order
    pub fn sprites(&self) -> &[SpriteDesc] {
        &self.sprites
    }

    /// Sprites sorted by z-index, the order the host would draw them
    pub fn draw_order(&self) -> Vec<&SpriteDesc> {
        let mut sorted: Vec<&SpriteDesc> = self.sprites.iter().collect();
        sorted.sort_by(|a, b| a.z_index.total_cmp(&b.z_index));
        sorted
    }

    pub fn find(&self, source: &EntrySource) -> Option<&SpriteDesc> {
        self.sprites.iter().find(|s| &s.source == source)
    }
}

impl DrawLayer for MemoryLayer {
    fn clear(&mut self) {
        self.sprites.clear();
    }

    fn insert(&mut self, sprite: SpriteDesc) -> Result<()> {
        if !sprite.rect.is_valid() {
            return Err(Error::Host(format!("no geometry for {:?}", sprite.source)));
        }
        self.sprites.push(sprite);
        Ok(())
    }

    fn len(&self) -> usize {
        self.sprites.len()
    }
}

/// Scene host backed by a [`SceneSnapshot`]. Flag writes are applied to the
/// snapshot so the next cycle reads them back.
#[derive(Clone, Debug, Default)]
pub struct MemoryHost {
    pub scene: Option<SceneSnapshot>,
    pub sight: LineOfSight,
    /// Last alpha set on each host sprite
    pub source_alpha: HashMap<EntrySource, f64>,
    /// Every flag write accepted so far
    pub writes: Vec<FlagUpdate>,
    /// Reject flag writes with a persistence error
    pub fail_writes: bool,
    /// Reject layer creation
    pub fail_layers: bool,
    pub layers_created: usize,
}

impl MemoryHost {
    pub fn new(scene: SceneSnapshot) -> Self {
        Self { scene: Some(scene), ..Default::default() }
    }

    pub fn with_sight(mut self, sight: LineOfSight) -> Self {
        self.sight = sight;
        self
    }

    pub fn scene_mut(&mut self) -> Option<&mut SceneSnapshot> {
        self.scene.as_mut()
    }

    pub fn alpha_of(&self, source: &EntrySource) -> Option<f64> {
        self.source_alpha.get(source).copied()
    }

    fn record_mut(&mut self, id: &TileId) -> Result<&mut TileRecord> {
        self.scene
            .as_mut()
            .and_then(|s| s.tiles.iter_mut().find(|t| &t.id == id))
            .ok_or_else(|| Error::Persistence(format!("tile {id} not found")))
    }
}

impl SightQuery for MemoryHost {
    fn visibility_available(&self) -> bool {
        self.sight != LineOfSight::Unavailable
    }

    fn test_visibility(&self, point: DVec2, viewer: &Token) -> Result<bool> {
        match &self.sight {
            LineOfSight::Clear => Ok(true),
            LineOfSight::Blind => Ok(false),
            LineOfSight::Windows(open) => Ok(open.iter().any(|r| r.contains_point(point))),
            LineOfSight::Unavailable | LineOfSight::Failing => Err(Error::Visibility(format!(
                "no sight polygon for {}",
                viewer.id
            ))),
        }
    }
}

impl SceneHost for MemoryHost {
    type Layer = MemoryLayer;

    fn snapshot(&self) -> Option<SceneSnapshot> {
        self.scene.clone()
    }

    fn create_layer(&mut self, kind: LayerKind) -> Result<MemoryLayer> {
        if self.fail_layers {
            return Err(Error::Host(format!("cannot create {kind:?} layer")));
        }
        self.layers_created += 1;
        Ok(MemoryLayer::new(kind))
    }

    fn set_source_alpha(&mut self, source: &EntrySource, alpha: f64) {
        self.source_alpha.insert(source.clone(), alpha);
    }

    fn write_flags(&mut self, updates: &[FlagUpdate]) -> Result<()> {
        if self.fail_writes {
            return Err(Error::Persistence("document is read-only".into()));
        }

        // Reject the whole batch before touching any record
        for update in updates {
            self.record_mut(update.tile())?;
        }

        for update in updates {
            let record = self.record_mut(update.tile())?;
            match update {
                FlagUpdate::SeenBy { viewers, .. } => {
                    if !record.flags.is_object() {
                        record.flags = Value::Object(Map::new());
                    }
                    if let Value::Object(map) = &mut record.flags {
                        let ids = viewers.iter().map(|v| Value::String(v.to_string())).collect();
                        map.insert(flag_keys::SEEN_BY.into(), Value::Array(ids));
                    }
                }
                FlagUpdate::TileFlags { flags, .. } => record.flags = flags.clone(),
            }
        }

        self.writes.extend_from_slice(updates);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::core::types::DMat2;
    use crate::scene::{Tile, TokenId};
    use serde_json::json;

    fn scene() -> SceneSnapshot {
        SceneSnapshot {
            tiles: vec![TileRecord {
                id: TileId::from("roof"),
                x: 0.0,
                y: 0.0,
                width: 100.0,
                height: 100.0,
                sort: 0,
                alpha: 1.0,
                flags: json!({ "custom": 7 }),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_seen_by_write_round_trips() {
        let mut host = MemoryHost::new(scene());
        let viewers = BTreeSet::from([TokenId::from("hero")]);
        host.write_flags(&[FlagUpdate::SeenBy { tile: TileId::from("roof"), viewers }])
            .unwrap();

        let snapshot = host.snapshot().unwrap();
        let tile = Tile::from_record(&snapshot.tiles[0]).unwrap();
        assert!(tile.config.seen_by.contains(&TokenId::from("hero")));
        assert_eq!(snapshot.tiles[0].flags["custom"], json!(7));
        assert_eq!(host.writes.len(), 1);
    }

    #[test]
    fn test_failing_writes_and_unknown_tiles() {
        let mut host = MemoryHost::new(scene());
        let unknown = FlagUpdate::TileFlags { tile: TileId::from("nope"), flags: json!({}) };
        assert!(host.write_flags(std::slice::from_ref(&unknown)).is_err());

        host.fail_writes = true;
        let known = FlagUpdate::TileFlags { tile: TileId::from("roof"), flags: json!({}) };
        assert!(matches!(host.write_flags(&[known]), Err(Error::Persistence(_))));
        assert!(host.writes.is_empty());
    }

    #[test]
    fn test_batch_with_unknown_tile_applies_nothing() {
        let mut host = MemoryHost::new(scene());
        let batch = [
            FlagUpdate::TileFlags { tile: TileId::from("roof"), flags: json!({ "custom": 9 }) },
            FlagUpdate::TileFlags { tile: TileId::from("nope"), flags: json!({}) },
        ];
        assert!(matches!(host.write_flags(&batch), Err(Error::Persistence(_))));

        let snapshot = host.snapshot().unwrap();
        assert_eq!(snapshot.tiles[0].flags["custom"], json!(7));
        assert!(host.writes.is_empty());
    }

    #[test]
    fn test_layer_rejects_missing_geometry() {
        let mut layer = MemoryLayer::new(LayerKind::Foreground);
        let sprite = SpriteDesc {
            source: EntrySource::Tile(TileId::from("ghost")),
            rect: Rect::new(0.0, 0.0, 0.0, 0.0),
            z_index: 1.0,
            alpha: 1.0,
            filter: None,
            transform: DMat2::IDENTITY,
        };
        assert!(layer.insert(sprite).is_err());
        assert!(layer.is_empty());
    }

    #[test]
    fn test_sight_modes() {
        let viewer = Token::new("hero", Rect::new(0.0, 0.0, 100.0, 100.0));
        let p = DVec2::new(10.0, 10.0);
        assert!(MemoryHost::default().test_visibility(p, &viewer).unwrap());
        let blind = MemoryHost::default().with_sight(LineOfSight::Blind);
        assert!(!blind.test_visibility(p, &viewer).unwrap());
        let failing = MemoryHost::default().with_sight(LineOfSight::Failing);
        assert!(failing.test_visibility(p, &viewer).is_err());
        let unavailable = MemoryHost::default().with_sight(LineOfSight::Unavailable);
        assert!(!unavailable.visibility_available());
    }
}
