mod grid;
mod properties;
mod tileset;
mod tmx;

pub use grid::{TileGrid, TileGridError};
pub use properties::{
    resolve_bool, resolve_property, resolve_rect, resolve_str, PropertyMap, PROP_COLLIDABLE,
    PROP_COLLISION_TYPE, PROP_HIT_AREA, PROP_INTERACTIVE,
};
pub use tileset::{TextureLookupError, TextureRegion, Tileset, TilesetCollection, TilesetImage};
pub use tmx::{load_tmx_map, MapErrorCode, MapLoadError, SourceLocation};

use serde::{Deserialize, Serialize};

use crate::geom::Vec2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapOrientation {
    #[default]
    Orthogonal,
    Isometric,
}

/// One tile layer as loaded from a map file or assembled in code.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerDefinition {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Row-major global tile ids, length = width * height, 0 = empty.
    pub tiles: Vec<u32>,
    pub opacity: f32,
    pub visible: bool,
    pub offset_px: Vec2,
    pub properties: PropertyMap,
}

impl LayerDefinition {
    pub fn new(name: impl Into<String>, width: u32, height: u32, tiles: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            tiles,
            opacity: 1.0,
            visible: true,
            offset_px: Vec2::ZERO,
            properties: PropertyMap::new(),
        }
    }
}

/// Everything needed to build a streaming `TileMap`.
#[derive(Debug, Clone, PartialEq)]
pub struct MapDefinition {
    pub orientation: MapOrientation,
    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub properties: PropertyMap,
    pub tilesets: Vec<Tileset>,
    pub layers: Vec<LayerDefinition>,
}
