//! Render surface manager: owns the draw layers and rebuilds them each cycle.
//!
//! Every host notification goes through [`RenderSurfaceManager::handle`].
//! A refresh reads a fresh snapshot, runs depth assignment, culling and
//! compositing, then clears both layers and re-inserts clones in depth order.
//! Nothing escapes `handle` or `tick`: failures are logged and the cycle
//! carries on with what it has.

use std::collections::HashMap;
use std::time::Instant;

use crate::core::Error;
use crate::core::types::DMat2;
use crate::depth::{DepthEngine, DepthEntry, DepthPlan, EntrySource, SortOptions, Visibility};
use crate::host::{DrawLayer, FlagUpdate, SceneHost, SpriteDesc};
use crate::math::Rect;
use crate::scene::{EventEffect, IsoConfig, SceneEvent, SceneSnapshot, TileConfig, ViewerSet};
use crate::visibility::VisibilityFilter;
use super::compositor::{filter_for, Compositor};
use super::context::SceneContext;

/// Drives the isometric pipeline for one host
pub struct RenderSurfaceManager<H: SceneHost> {
    config: IsoConfig,
    engine: DepthEngine,
    context: Option<SceneContext<H::Layer>>,
}

impl<H: SceneHost> RenderSurfaceManager<H> {
    pub fn new(config: IsoConfig) -> Self {
        let engine = DepthEngine::new(config.depth);
        Self { config, engine, context: None }
    }

    pub fn config(&self) -> &IsoConfig {
        &self.config
    }

    /// Scene state, present between `CanvasReady` and teardown
    pub fn context(&self) -> Option<&SceneContext<H::Layer>> {
        self.context.as_ref()
    }

    /// Depth plan of the last refresh
    pub fn last_plan(&self) -> Option<&DepthPlan> {
        self.context.as_ref().and_then(|c| c.last_plan.as_ref())
    }

    /// Single entry point for host notifications
    pub fn handle(&mut self, event: SceneEvent, host: &mut H, now: Instant) {
        log::trace!("Scene event {event:?}");
        let effect = event.effect();

        match event {
            SceneEvent::ControlChanged { token, controlled } => {
                if let Some(ctx) = self.context.as_mut() {
                    if controlled {
                        ctx.last_controlled = Some(token);
                    }
                }
            }
            SceneEvent::TokenDeleted(id) => {
                if let Some(ctx) = self.context.as_mut() {
                    if ctx.last_controlled.as_ref() == Some(&id) {
                        ctx.last_controlled = None;
                    }
                    ctx.cloned.remove(&EntrySource::Token(id));
                }
            }
            SceneEvent::TileDeleted(id) => {
                if let Some(ctx) = self.context.as_mut() {
                    ctx.seen.remove(&id);
                    ctx.cloned.remove(&EntrySource::Tile(id));
                }
            }
            SceneEvent::ConfigChanged(config) => {
                self.engine = DepthEngine::new(config.depth);
                self.config = *config;
            }
            SceneEvent::NudgeTileOpacity(delta) => {
                let opacity = self.config.nudge_tile_opacity(delta);
                log::info!("Tile opacity {opacity:.1}");
            }
            _ => {}
        }

        match effect {
            EventEffect::Setup => {
                self.setup(host);
                self.refresh(host);
            }
            EventEffect::Teardown => {
                if self.context.take().is_some() {
                    log::debug!("Scene context dropped");
                }
            }
            EventEffect::Refresh => self.refresh(host),
            EventEffect::DeferredRefresh => {
                let delay = self.config.refresh_delay();
                if let Some(ctx) = self.context.as_mut() {
                    ctx.scheduler.request(now, delay);
                }
            }
        }
    }

    /// Run a deferred refresh if one is due. Returns whether it ran.
    pub fn tick(&mut self, host: &mut H, now: Instant) -> bool {
        let due = self.context.as_mut().is_some_and(|ctx| ctx.scheduler.due(now));
        if due {
            self.refresh(host);
        }
        due
    }

    /// Build a fresh scene context and migrate legacy tile flags
    fn setup(&mut self, host: &mut H) {
        self.context = None;
        let ctx = match SceneContext::new(host) {
            Ok(ctx) => ctx,
            Err(e) => {
                log::warn!("Isometric layers unavailable: {e}");
                return;
            }
        };
        self.context = Some(ctx);

        let Some(snapshot) = host.snapshot() else {
            return;
        };
        let migrated: Vec<FlagUpdate> = snapshot
            .tiles
            .iter()
            .filter_map(|record| {
                TileConfig::migrate_flags(&record.flags)
                    .map(|flags| FlagUpdate::TileFlags { tile: record.id.clone(), flags })
            })
            .collect();
        if !migrated.is_empty() {
            log::info!("Migrating legacy flags on {} tiles", migrated.len());
            self.persist(host, &migrated);
        }
    }

    fn persist(&self, host: &mut H, updates: &[FlagUpdate]) {
        if let Err(e) = host.write_flags(updates) {
            self.log_persistence(&e);
        }
    }

    fn log_persistence(&self, e: &Error) {
        if self.config.debug {
            log::warn!("Flag write failed: {e}");
        } else {
            log::trace!("Flag write failed: {e}");
        }
    }

    /// Rebuild both layers from the current scene
    pub fn refresh(&mut self, host: &mut H) {
        let Some(mut ctx) = self.context.take() else {
            return;
        };
        ctx.scheduler.cancel();
        self.refresh_context(&mut ctx, host);
        self.context = Some(ctx);
    }

    fn refresh_context(&self, ctx: &mut SceneContext<H::Layer>, host: &mut H) {
        let Some(snapshot) = host.snapshot() else {
            log::debug!("No scene to draw");
            ctx.clear_layers();
            return;
        };

        let config = self.config.clone().with_scene_flags(&snapshot.flags);
        if !config.isometric_enabled {
            ctx.clear_layers();
            ctx.restore_sources(host);
            ctx.last_plan = None;
            return;
        }

        let tiles = snapshot.typed_tiles();
        let tokens = &snapshot.tokens;
        let viewers = ViewerSet::resolve(tokens, ctx.last_controlled.as_ref());
        let viewer_tokens = viewers.tokens(tokens);

        let options = SortOptions {
            occlusion: config.occlusion_enabled,
            auto_sort: config.auto_sort,
        };
        let mut plan = self.engine.assign(&tiles, tokens, &snapshot.walls, options);

        let seen_updates = VisibilityFilter::new(&*host, viewer_tokens.clone(), snapshot.grid(), &snapshot.walls)
            .with_fog_exploration(snapshot.fog_exploration)
            .with_enabled(config.culling_enabled)
            .apply(&mut plan, &tiles, tokens, &mut ctx.seen);

        Compositor::new(viewer_tokens.iter().map(|t| t.anchor()).collect())
            .with_occlusion(config.occlusion_enabled)
            .with_tile_opacity(config.tile_opacity)
            .apply(&mut plan, &tiles);

        let billboard = config.projection().billboard();
        let inserted = self.rebuild_layers(ctx, &plan, &snapshot, billboard);
        self.hide_sources(ctx, host, &plan, &snapshot);

        if !seen_updates.is_empty() {
            let updates: Vec<FlagUpdate> = seen_updates.into_iter().map(FlagUpdate::from).collect();
            self.persist(host, &updates);
        }

        log::debug!(
            "Refreshed {} sprites ({:?} viewers {}, {} door-hidden)",
            inserted,
            viewers.source(),
            viewers.ids().len(),
            plan.door_hidden.len()
        );
        ctx.last_plan = Some(plan);
    }

    /// Clear both layers and insert every drawn entry. Returns the sprite count.
    fn rebuild_layers(
        &self,
        ctx: &mut SceneContext<H::Layer>,
        plan: &DepthPlan,
        snapshot: &SceneSnapshot,
        billboard: DMat2,
    ) -> usize {
        let rects = footprints(snapshot);
        ctx.clear_layers();

        let mut inserted = 0;
        let layers = [
            (&mut ctx.background, &plan.background),
            (&mut ctx.foreground, &plan.foreground),
        ];
        for (layer, entries) in layers {
            for entry in entries.iter().filter(|e| e.is_drawn()) {
                let Some(sprite) = sprite_for(entry, &rects, billboard) else {
                    log::debug!("No footprint for {:?}", entry.source);
                    continue;
                };
                match layer.insert(sprite) {
                    Ok(()) => inserted += 1,
                    Err(e) => log::debug!("Skipping sprite: {e}"),
                }
            }
        }
        inserted
    }

    /// Zero the host sprite of everything the layers now stand in for
    fn hide_sources(&self, ctx: &mut SceneContext<H::Layer>, host: &mut H, plan: &DepthPlan, snapshot: &SceneSnapshot) {
        let base: HashMap<EntrySource, f64> = snapshot
            .tiles
            .iter()
            .map(|t| (EntrySource::Tile(t.id.clone()), t.alpha))
            .chain(snapshot.tokens.iter().map(|t| (EntrySource::Token(t.id.clone()), t.alpha)))
            .collect();

        let sources = plan
            .background
            .iter()
            .chain(plan.foreground.iter())
            .map(|e| e.source.clone())
            .chain(plan.door_hidden.iter().cloned().map(EntrySource::Tile));

        for source in sources {
            host.set_source_alpha(&source, 0.0);
            let alpha = base.get(&source).copied().unwrap_or(1.0);
            ctx.cloned.insert(source, alpha);
        }
    }
}

/// World footprint of every placeable in the snapshot
fn footprints(snapshot: &SceneSnapshot) -> HashMap<EntrySource, Rect> {
    snapshot
        .tiles
        .iter()
        .map(|t| (EntrySource::Tile(t.id.clone()), Rect::new(t.x, t.y, t.width, t.height)))
        .chain(snapshot.tokens.iter().map(|t| (EntrySource::Token(t.id.clone()), t.rect)))
        .collect()
}

fn sprite_for(entry: &DepthEntry, rects: &HashMap<EntrySource, Rect>, billboard: DMat2) -> Option<SpriteDesc> {
    let rect = *rects.get(&entry.source)?;
    let transform = if entry.source.is_token() { billboard } else { DMat2::IDENTITY };
    Some(SpriteDesc {
        source: entry.source.clone(),
        rect,
        z_index: entry.depth,
        alpha: entry.alpha,
        filter: filter_for(entry),
        transform,
    })
}

/// Count of entries per culling state, for logging and inspection
pub fn visibility_counts(plan: &DepthPlan) -> [(Visibility, usize); 3] {
    let count = |v: Visibility| plan.foreground.iter().filter(|e| e.visibility == v).count();
    [
        (Visibility::Visible, count(Visibility::Visible)),
        (Visibility::Fogged, count(Visibility::Fogged)),
        (Visibility::Hidden, count(Visibility::Hidden)),
    ]
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::host::{LineOfSight, MemoryHost, MemoryLayer};
    use crate::math::Segment;
    use crate::core::types::DVec2;
    use crate::scene::{DoorKind, DoorState, TileId, TileRecord, Token, TokenId, Wall};
    use crate::visibility::FOG_MATRIX;

    fn record(id: &str, x: f64, y: f64, w: f64, h: f64, flags: serde_json::Value) -> TileRecord {
        TileRecord { id: TileId::from(id), x, y, width: w, height: h, sort: 0, alpha: 1.0, flags }
    }

    fn scene() -> SceneSnapshot {
        SceneSnapshot {
            tiles: vec![
                record("floor", 0.0, 0.0, 1000.0, 1000.0, json!({ "layer": "background" })),
                record("roof", 0.0, 0.0, 100.0, 200.0, json!({ "occlusionOpacity": 0.5 })),
                record("crate", 400.0, 0.0, 100.0, 100.0, json!({})),
            ],
            tokens: vec![
                Token::new("hero", Rect::new(0.0, 100.0, 100.0, 100.0)).with_controlled(true),
                Token::new("goblin", Rect::new(600.0, 600.0, 100.0, 100.0)),
            ],
            ..Default::default()
        }
    }

    fn ready(host: &mut MemoryHost) -> (RenderSurfaceManager<MemoryHost>, Instant) {
        let mut manager = RenderSurfaceManager::new(IsoConfig::default());
        let now = Instant::now();
        manager.handle(SceneEvent::CanvasReady, host, now);
        (manager, now)
    }

    fn foreground(manager: &RenderSurfaceManager<MemoryHost>) -> &MemoryLayer {
        &manager.context().unwrap().foreground
    }

    fn tile(id: &str) -> EntrySource {
        EntrySource::Tile(TileId::from(id))
    }

    fn token(id: &str) -> EntrySource {
        EntrySource::Token(TokenId::from(id))
    }

    #[test]
    fn test_setup_fills_layers_in_depth_order() {
        let mut host = MemoryHost::new(scene());
        let (manager, _) = ready(&mut host);
        let ctx = manager.context().unwrap();

        assert_eq!(host.layers_created, 2);
        assert_eq!(ctx.background.len(), 1);
        assert_eq!(ctx.foreground.len(), 4);

        let drawn = ctx.foreground.draw_order();
        let order: Vec<&EntrySource> = drawn.iter().map(|s| &s.source).collect();
        let hero = order.iter().position(|s| **s == token("hero")).unwrap();
        let roof = order.iter().position(|s| **s == tile("roof")).unwrap();
        assert!(hero < roof, "hero stands behind the roof");

        let plan = manager.last_plan().unwrap();
        for sprite in ctx.foreground.sprites() {
            assert_eq!(Some(sprite.z_index), plan.depth_of(&sprite.source));
        }
    }

    #[test]
    fn test_roof_fades_over_viewer_and_host_sprites_hidden() {
        let mut host = MemoryHost::new(scene());
        let (manager, _) = ready(&mut host);
        let layer = foreground(&manager);

        assert_eq!(layer.find(&tile("roof")).map(|s| s.alpha), Some(0.5));
        assert_eq!(layer.find(&tile("crate")).map(|s| s.alpha), Some(1.0));
        for source in [tile("floor"), tile("roof"), tile("crate"), token("hero"), token("goblin")] {
            assert_eq!(host.alpha_of(&source), Some(0.0));
        }
    }

    #[test]
    fn test_tokens_carry_billboard() {
        let mut host = MemoryHost::new(scene());
        let (manager, _) = ready(&mut host);
        let billboard = IsoConfig::default().projection().billboard();
        let layer = foreground(&manager);
        assert_eq!(layer.find(&token("hero")).map(|s| s.transform), Some(billboard));
        assert_eq!(layer.find(&tile("roof")).map(|s| s.transform), Some(DMat2::IDENTITY));
    }

    #[test]
    fn test_events_without_context_are_noops() {
        let mut host = MemoryHost::new(scene());
        let mut manager: RenderSurfaceManager<MemoryHost> = RenderSurfaceManager::new(IsoConfig::default());
        let now = Instant::now();

        manager.handle(SceneEvent::TokenUpdated("hero".into()), &mut host, now);
        manager.handle(SceneEvent::TokenCreated("hero".into()), &mut host, now);
        assert!(!manager.tick(&mut host, now + Duration::from_secs(1)));
        assert!(manager.context().is_none());
        assert!(host.source_alpha.is_empty());
    }

    #[test]
    fn test_teardown_drops_pending_refresh() {
        let mut host = MemoryHost::new(scene());
        let (mut manager, now) = ready(&mut host);

        manager.handle(SceneEvent::TokenCreated("hero".into()), &mut host, now);
        manager.handle(SceneEvent::CanvasTeardown, &mut host, now);
        assert!(manager.context().is_none());
        assert!(!manager.tick(&mut host, now + Duration::from_secs(1)));
    }

    #[test]
    fn test_creation_refresh_is_deferred() {
        let mut host = MemoryHost::new(scene());
        let (mut manager, now) = ready(&mut host);

        if let Some(scene) = host.scene_mut() {
            scene.tokens.push(Token::new("orc", Rect::new(300.0, 300.0, 100.0, 100.0)));
        }
        manager.handle(SceneEvent::TokenCreated("orc".into()), &mut host, now);
        assert!(foreground(&manager).find(&token("orc")).is_none());

        assert!(!manager.tick(&mut host, now + Duration::from_millis(10)));
        assert!(manager.tick(&mut host, now + Duration::from_millis(50)));
        assert!(foreground(&manager).find(&token("orc")).is_some());
    }

    #[test]
    fn test_immediate_refresh_absorbs_deferred_request() {
        let mut host = MemoryHost::new(scene());
        let (mut manager, now) = ready(&mut host);

        if let Some(scene) = host.scene_mut() {
            scene.tokens.push(Token::new("orc", Rect::new(300.0, 300.0, 100.0, 100.0)));
        }
        manager.handle(SceneEvent::TokenCreated("orc".into()), &mut host, now);
        manager.handle(SceneEvent::TokenUpdated("hero".into()), &mut host, now);
        assert!(foreground(&manager).find(&token("orc")).is_some());
        assert!(!manager.context().is_some_and(|ctx| ctx.scheduler.is_pending()));
        assert!(!manager.tick(&mut host, now + Duration::from_secs(1)));
    }

    #[test]
    fn test_last_controlled_token_stays_viewer() {
        let mut host = MemoryHost::new(scene()).with_sight(LineOfSight::Windows(vec![]));
        let (mut manager, now) = ready(&mut host);

        manager.handle(
            SceneEvent::ControlChanged { token: "hero".into(), controlled: true },
            &mut host,
            now,
        );
        if let Some(scene) = host.scene_mut() {
            scene.tokens[0].controlled = false;
        }
        manager.handle(
            SceneEvent::ControlChanged { token: "hero".into(), controlled: false },
            &mut host,
            now,
        );

        // Still the only viewer: hero drawn, goblin culled
        let layer = foreground(&manager);
        assert!(layer.find(&token("hero")).is_some());
        assert!(layer.find(&token("goblin")).is_none());
    }

    #[test]
    fn test_open_door_hides_linked_tile() {
        let mut snapshot = scene();
        snapshot.tiles[1].flags = json!({ "linkedWallIds": "door" });
        snapshot.walls = vec![Wall::new("door", Segment::new(DVec2::new(0.0, 200.0), DVec2::new(100.0, 200.0)))
            .with_door(DoorKind::Door, DoorState::Closed)];
        let mut host = MemoryHost::new(snapshot);
        let (mut manager, now) = ready(&mut host);
        assert!(foreground(&manager).find(&tile("roof")).is_some());

        if let Some(scene) = host.scene_mut() {
            scene.walls[0].state = DoorState::Open;
        }
        manager.handle(SceneEvent::WallUpdated("door".into()), &mut host, now);
        assert!(foreground(&manager).find(&tile("roof")).is_none());
        assert_eq!(host.alpha_of(&tile("roof")), Some(0.0));
        assert_eq!(manager.last_plan().unwrap().door_hidden, vec![TileId::from("roof")]);
    }

    #[test]
    fn test_fogged_tiles_get_filter_and_seen_by_persists() {
        let mut host = MemoryHost::new(SceneSnapshot { fog_exploration: true, ..scene() });
        let (mut manager, now) = ready(&mut host);

        // Clear sight: everything seen by hero and written back
        assert!(host.writes.iter().any(|w| w.tile() == &TileId::from("crate")));

        host.sight = LineOfSight::Blind;
        manager.handle(SceneEvent::SightRefreshed, &mut host, now);
        let layer = foreground(&manager);
        let crate_sprite = layer.find(&tile("crate")).unwrap();
        assert_eq!(crate_sprite.filter, Some(FOG_MATRIX));
        assert_eq!(crate_sprite.alpha, 1.0);
        assert!(layer.find(&token("goblin")).is_none());
    }

    #[test]
    fn test_persistence_failure_does_not_abort_refresh() {
        let mut host = MemoryHost::new(scene());
        host.fail_writes = true;
        let (manager, _) = ready(&mut host);
        assert_eq!(foreground(&manager).len(), 4);
        assert!(host.writes.is_empty());
    }

    #[test]
    fn test_legacy_flags_migrated_on_setup() {
        let mut snapshot = scene();
        snapshot.tiles[2].flags = json!({ "occluding": false, "note": "old" });
        let mut host = MemoryHost::new(snapshot);
        let (manager, _) = ready(&mut host);

        let migrated = &host.scene.as_ref().unwrap().tiles[2].flags;
        assert_eq!(migrated["layer"], json!("background"));
        assert_eq!(migrated["note"], json!("old"));
        assert!(migrated.get("occluding").is_none());
        assert!(manager.context().unwrap().background.find(&tile("crate")).is_some());
    }

    #[test]
    fn test_disabling_isometric_restores_host_sprites() {
        let mut host = MemoryHost::new(scene());
        let (mut manager, now) = ready(&mut host);

        let config = IsoConfig { isometric_enabled: false, ..IsoConfig::default() };
        manager.handle(SceneEvent::ConfigChanged(Box::new(config)), &mut host, now);
        let ctx = manager.context().unwrap();
        assert!(ctx.foreground.is_empty());
        assert!(ctx.background.is_empty());
        assert_eq!(host.alpha_of(&token("hero")), Some(1.0));
        assert_eq!(host.alpha_of(&tile("roof")), Some(1.0));
    }

    #[test]
    fn test_scene_flags_override_config() {
        let mut host = MemoryHost::new(SceneSnapshot {
            flags: json!({ "isometricEnabled": false }),
            ..scene()
        });
        let (manager, _) = ready(&mut host);
        assert!(foreground(&manager).is_empty());
    }

    #[test]
    fn test_nudge_tile_opacity() {
        let mut host = MemoryHost::new(scene());
        let (mut manager, now) = ready(&mut host);
        manager.handle(SceneEvent::NudgeTileOpacity(-0.5), &mut host, now);
        assert_eq!(manager.config().tile_opacity, 0.5);
        assert_eq!(foreground(&manager).find(&tile("crate")).map(|s| s.alpha), Some(0.5));
    }

    #[test]
    fn test_sprite_without_geometry_is_skipped() {
        let mut snapshot = scene();
        snapshot.tokens.push(Token::new("flat", Rect::new(0.0, 0.0, 0.0, 0.0)));
        let mut host = MemoryHost::new(snapshot);
        let (manager, _) = ready(&mut host);
        assert!(foreground(&manager).find(&token("flat")).is_none());
        assert_eq!(foreground(&manager).len(), 4);
    }

    #[test]
    fn test_layer_failure_leaves_no_context() {
        let mut host = MemoryHost::new(scene());
        host.fail_layers = true;
        let (manager, _) = ready(&mut host);
        assert!(manager.context().is_none());
    }

    #[test]
    fn test_visibility_counts() {
        let mut host = MemoryHost::new(scene()).with_sight(LineOfSight::Blind);
        let (manager, _) = ready(&mut host);
        let counts = visibility_counts(manager.last_plan().unwrap());
        assert_eq!(counts[0], (Visibility::Visible, 1));
        assert_eq!(counts[2], (Visibility::Hidden, 3));
    }
}
