use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::properties::PropertyMap;
use crate::geom::Vec2;

/// Source rectangle inside a tileset's atlas image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Reference to the atlas image backing a tileset. The size is the declared
/// size from the map file; the texture store checks it against the decoded
/// image at draw time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilesetImage {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TextureLookupError {
    #[error("gid {gid} is outside the tileset's range [{first}, {last}]")]
    GidOutOfRange { gid: u32, first: u32, last: u32 },
    #[error("tileset declares zero columns; the atlas layout is unusable")]
    NoColumns,
    #[error(
        "tile source rect ({x}, {y}, {width}x{height}) exceeds the declared \
         atlas size {image_width}x{image_height}"
    )]
    RegionOutsideImage {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },
}

/// One tileset: a contiguous range of global tile ids laid out on a regular
/// grid inside a single atlas image.
#[derive(Debug, Clone, PartialEq)]
pub struct Tileset {
    pub name: String,
    pub first_gid: u32,
    pub tile_count: u32,
    pub columns: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub spacing: u32,
    pub margin: u32,
    pub draw_offset: Vec2,
    pub image: TilesetImage,
    pub properties: PropertyMap,
    /// Per-tile properties keyed by local id (gid - first_gid).
    pub tile_properties: HashMap<u32, PropertyMap>,
}

impl Tileset {
    pub fn last_gid(&self) -> u32 {
        self.first_gid + self.tile_count.saturating_sub(1)
    }

    pub fn contains(&self, gid: u32) -> bool {
        self.tile_count > 0 && gid >= self.first_gid && gid <= self.last_gid()
    }

    pub fn tile_texture(&self, gid: u32) -> Result<TextureRegion, TextureLookupError> {
        if !self.contains(gid) {
            return Err(TextureLookupError::GidOutOfRange {
                gid,
                first: self.first_gid,
                last: self.last_gid(),
            });
        }
        if self.columns == 0 {
            return Err(TextureLookupError::NoColumns);
        }
        let local = gid - self.first_gid;
        let column = local % self.columns;
        let row = local / self.columns;
        let x = self.margin + column * (self.tile_width + self.spacing);
        let y = self.margin + row * (self.tile_height + self.spacing);
        if x + self.tile_width > self.image.width || y + self.tile_height > self.image.height {
            return Err(TextureLookupError::RegionOutsideImage {
                x,
                y,
                width: self.tile_width,
                height: self.tile_height,
                image_width: self.image.width,
                image_height: self.image.height,
            });
        }
        Ok(TextureRegion {
            x,
            y,
            width: self.tile_width,
            height: self.tile_height,
        })
    }

    pub fn tile_properties(&self, gid: u32) -> Option<&PropertyMap> {
        if !self.contains(gid) {
            return None;
        }
        self.tile_properties.get(&(gid - self.first_gid))
    }
}

/// All tilesets of a map, kept sorted by `first_gid` so gid resolution is a
/// reverse scan for the last range that starts at or below the id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TilesetCollection {
    tilesets: Vec<Tileset>,
}

impl TilesetCollection {
    pub fn new(mut tilesets: Vec<Tileset>) -> Self {
        tilesets.sort_by_key(|tileset| tileset.first_gid);
        Self { tilesets }
    }

    pub fn tilesets(&self) -> &[Tileset] {
        &self.tilesets
    }

    pub fn is_empty(&self) -> bool {
        self.tilesets.is_empty()
    }

    /// Resolves a global tile id. Returns `None` for id 0 (empty) and for
    /// ids no tileset covers.
    pub fn tileset_for(&self, gid: u32) -> Option<&Tileset> {
        self.tileset_with_index(gid).map(|(_, tileset)| tileset)
    }

    pub fn tileset_with_index(&self, gid: u32) -> Option<(usize, &Tileset)> {
        if gid == 0 {
            return None;
        }
        self.tilesets
            .iter()
            .enumerate()
            .rev()
            .find(|(_, tileset)| tileset.first_gid <= gid)
            .filter(|(_, tileset)| tileset.contains(gid))
    }
}
