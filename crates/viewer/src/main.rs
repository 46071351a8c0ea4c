use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use serde_json::json;
use thiserror::Error;
use tilestream::{
    load_tmx_map, run_viewer, AppError, LayerDefinition, MapDefinition, MapLoadError,
    MapOrientation, NodeId, PhysicsHooks, PropertyMap, TileBinding, TileGridError, TileMap,
    Tileset, TilesetImage, Vec2, ViewerConfig, PROP_COLLIDABLE, PROP_COLLISION_TYPE,
    PROP_INTERACTIVE,
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

pub const ROOT_ENV_VAR: &str = "TILESTREAM_ROOT";

const DEMO_MAP_RELATIVE_PATH: &str = "assets/maps/demo.tmx";
const DEMO_MAP_WIDTH: u32 = 64;
const DEMO_MAP_HEIGHT: u32 = 48;

#[derive(Debug, Error)]
enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error(
        "{var} is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or assets/."
    )]
    InvalidEnvRoot { var: &'static str, path: PathBuf },
}

#[derive(Debug, Error)]
enum ViewerError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    MapLoad(#[from] MapLoadError),
    #[error("map data is inconsistent: {0}")]
    MapData(#[from] TileGridError),
    #[error(transparent)]
    App(#[from] AppError),
}

fn main() {
    init_tracing();
    info!("=== Tilestream Viewer Startup ===");

    if let Err(error) = run() {
        error!(error = %error, "startup_failed");
        std::process::exit(1);
    }
}

fn run() -> Result<(), ViewerError> {
    let asset_root = resolve_asset_root()?;
    info!(asset_root = %asset_root.display(), "asset_root_resolved");

    let definition = resolve_map_definition(&asset_root)?;
    let mut map = TileMap::from_definition(definition)?;
    for layer in map.layers_mut() {
        layer.set_physics_hooks(Box::new(LoggingPhysics));
    }

    run_viewer(ViewerConfig::default(), map, asset_root)?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

/// Forwards collision enable/disable to the log so the hook wiring is
/// visible without a physics engine attached.
struct LoggingPhysics;

impl PhysicsHooks for LoggingPhysics {
    fn enable(&mut self, node: NodeId, binding: &TileBinding) {
        debug!(
            node = node.0,
            tile_id = binding.tile_id,
            collision_type = binding.collision_type.as_deref().unwrap_or("unspecified"),
            "collision_enabled"
        );
    }

    fn disable(&mut self, node: NodeId) {
        debug!(node = node.0, "collision_disabled");
    }
}

/// Map selection: an explicit CLI argument wins, then the conventional
/// demo map under the asset root, then the built-in procedural map.
fn resolve_map_definition(asset_root: &Path) -> Result<MapDefinition, ViewerError> {
    if let Some(argument) = env::args().nth(1) {
        let path = PathBuf::from(argument);
        info!(map = %path.display(), "loading_map_from_argument");
        return Ok(load_tmx_map(&path)?);
    }
    let conventional = asset_root.join(DEMO_MAP_RELATIVE_PATH);
    if conventional.is_file() {
        info!(map = %conventional.display(), "loading_map_from_asset_root");
        return Ok(load_tmx_map(&conventional)?);
    }
    info!("no map file found, using the built-in demo map");
    Ok(demo_definition())
}

fn resolve_asset_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let path = PathBuf::from(value);
            if is_root_marker(&path) {
                Ok(path)
            } else {
                Err(StartupError::InvalidEnvRoot {
                    var: ROOT_ENV_VAR,
                    path,
                })
            }
        }
        Err(env::VarError::NotPresent) => {
            if let Ok(exe) = env::current_exe() {
                if let Some(exe_dir) = exe.parent() {
                    for candidate in exe_dir.ancestors() {
                        if is_root_marker(candidate) {
                            return Ok(candidate.to_path_buf());
                        }
                    }
                }
            }
            let fallback = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            warn!(
                asset_root = %fallback.display(),
                "no project root found, falling back to the working directory"
            );
            Ok(fallback)
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_root_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_assets = path.join("assets").is_dir();

    cargo_toml && (has_crates || has_assets)
}

/// A deterministic two-layer map: terrain banding on the ground layer and a
/// sparse scattering of interactive, collidable crates above it. Renders
/// with flat fallback colors when the atlas images are absent.
fn demo_definition() -> MapDefinition {
    let terrain = Tileset {
        name: "terrain".to_string(),
        first_gid: 1,
        tile_count: 8,
        columns: 4,
        tile_width: 32,
        tile_height: 32,
        spacing: 0,
        margin: 0,
        draw_offset: Vec2::ZERO,
        image: TilesetImage {
            path: PathBuf::from("assets/tilesets/terrain.png"),
            width: 128,
            height: 64,
        },
        properties: PropertyMap::new(),
        tile_properties: HashMap::new(),
    };

    let mut crate_properties = PropertyMap::new();
    crate_properties.insert(PROP_INTERACTIVE.to_string(), json!(true));
    crate_properties.insert(PROP_COLLIDABLE.to_string(), json!(true));
    crate_properties.insert(PROP_COLLISION_TYPE.to_string(), json!("solid"));
    let props = Tileset {
        name: "props".to_string(),
        first_gid: 9,
        tile_count: 4,
        columns: 4,
        tile_width: 32,
        tile_height: 32,
        spacing: 0,
        margin: 0,
        draw_offset: Vec2::ZERO,
        image: TilesetImage {
            path: PathBuf::from("assets/tilesets/props.png"),
            width: 128,
            height: 32,
        },
        properties: PropertyMap::new(),
        tile_properties: HashMap::from([(0, crate_properties)]),
    };

    let area = (DEMO_MAP_WIDTH * DEMO_MAP_HEIGHT) as usize;
    let mut ground = Vec::with_capacity(area);
    let mut scatter = Vec::with_capacity(area);
    for y in 0..DEMO_MAP_HEIGHT {
        for x in 0..DEMO_MAP_WIDTH {
            ground.push(1 + (x / 4 + y / 4) % 3);
            let place_crate = x % 7 == 3 && y % 5 == 2;
            scatter.push(if place_crate { 9 } else { 0 });
        }
    }

    MapDefinition {
        orientation: MapOrientation::Orthogonal,
        width: DEMO_MAP_WIDTH,
        height: DEMO_MAP_HEIGHT,
        tile_width: 32,
        tile_height: 32,
        properties: PropertyMap::new(),
        tilesets: vec![terrain, props],
        layers: vec![
            LayerDefinition::new("ground", DEMO_MAP_WIDTH, DEMO_MAP_HEIGHT, ground),
            LayerDefinition::new("props", DEMO_MAP_WIDTH, DEMO_MAP_HEIGHT, scatter),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilestream::TileCoord;

    #[test]
    fn root_marker_requires_cargo_toml() {
        let cwd = env::current_dir().expect("cwd");
        assert!(!is_root_marker(&cwd.join("definitely_not_a_marker")));
    }

    #[test]
    fn demo_map_builds_and_streams() {
        let mut map = TileMap::from_definition(demo_definition()).expect("demo map");
        map.render_tiles(0, 0, 8, 8).expect("render");
        assert!(map.live_node_count() > 64);
        map.pan(32.0, 32.0).expect("pan");
    }

    #[test]
    fn demo_crates_are_interactive_and_collidable() {
        let mut map = TileMap::from_definition(demo_definition()).expect("demo map");
        map.render_tiles(0, 0, 10, 10).expect("render");
        let props_layer = &map.layers()[1];
        let node = props_layer
            .node_at(TileCoord::new(3, 2))
            .expect("crate node");
        let binding = node.binding().expect("bound");
        assert!(binding.interactive);
        assert!(binding.collidable);
        assert_eq!(binding.collision_type.as_deref(), Some("solid"));
    }
}
