//! Print the isometric draw order of a saved scene.
//!
//! Usage: cargo run --bin iso_inspect -- <scene.json> [--config <cfg.json>] [--overlay]

use std::path::PathBuf;
use std::time::Instant;

use isoview::core::{logging, Result};
use isoview::depth::EntrySource;
use isoview::host::MemoryHost;
use isoview::render::RenderSurfaceManager;
use isoview::render::surface::visibility_counts;
use isoview::scene::overlay::{grid_overlay, OverlaySource};
use isoview::scene::{IsoConfig, SceneEvent, SceneSnapshot};

struct Args {
    scene: PathBuf,
    config: Option<PathBuf>,
    overlay: bool,
}

const USAGE: &str = "usage: iso_inspect <scene.json> [--config <cfg.json>] [--overlay]";

fn parse_args() -> Option<Args> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut scene = None;
    let mut config = None;
    let mut overlay = false;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                config = Some(PathBuf::from(args.get(i + 1)?));
                i += 1;
            }
            "--overlay" => overlay = true,
            path if scene.is_none() => scene = Some(PathBuf::from(path)),
            _ => return None,
        }
        i += 1;
    }

    Some(Args { scene: scene?, config, overlay })
}

fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => IsoConfig::load_sync(path)?,
        None => IsoConfig::default(),
    };
    let snapshot = SceneSnapshot::load_sync(&args.scene)?;
    log::info!(
        "Loaded {} tiles, {} tokens, {} walls from {:?}",
        snapshot.tiles.len(),
        snapshot.tokens.len(),
        snapshot.walls.len(),
        args.scene
    );

    let mut host = MemoryHost::new(snapshot.clone());
    let mut manager = RenderSurfaceManager::new(config);
    manager.handle(SceneEvent::CanvasReady, &mut host, Instant::now());

    let Some(plan) = manager.last_plan() else {
        println!("Isometric view disabled for this scene");
        return Ok(());
    };

    println!("{:>14}  {:<6} {:<24} {:<8} {:>5}", "depth", "kind", "id", "state", "alpha");
    for (layer, entries) in [("bg", &plan.background), ("fg", &plan.foreground)] {
        for entry in entries {
            let (kind, id) = match &entry.source {
                EntrySource::Tile(id) => ("tile", id.as_str()),
                EntrySource::Token(id) => ("token", id.as_str()),
            };
            println!(
                "{:>14.4}  {:<6} {:<24} {:<8} {:>5.2}  [{layer}]",
                entry.depth,
                kind,
                id,
                format!("{:?}", entry.visibility),
                entry.alpha
            );
        }
    }
    for id in &plan.door_hidden {
        println!("{:>14}  {:<6} {:<24} {:<8}", "-", "tile", id.as_str(), "Door");
    }

    let counts = visibility_counts(plan);
    println!("{}", counts.map(|(v, n)| format!("{v:?}: {n}")).join(", "));

    if args.overlay {
        println!();
        let grid = snapshot.grid();
        for mark in grid_overlay(&grid, &snapshot.typed_tiles(), &snapshot.tokens) {
            let label = match &mark.source {
                OverlaySource::Tile(id) => format!("tile {id}"),
                OverlaySource::Token(id) => format!("token {id}"),
            };
            println!("({:>4}, {:>4})  {label}", mark.cell.x, mark.cell.y);
        }
    }

    Ok(())
}

fn main() {
    logging::init();

    let Some(args) = parse_args() else {
        eprintln!("{USAGE}");
        std::process::exit(2);
    };
    if let Err(e) = run(args) {
        log::error!("{e}");
        std::process::exit(1);
    }
}
