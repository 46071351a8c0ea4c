use crate::geom::Vec2;
use crate::map::{MapOrientation, Tileset};

/// Per-binding tileset metrics the projection needs: the art cell size and
/// the tileset's draw offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TilesetMetrics {
    pub tile_width: f32,
    pub tile_height: f32,
    pub offset: Vec2,
}

impl TilesetMetrics {
    pub fn of(tileset: &Tileset) -> Self {
        Self {
            tile_width: tileset.tile_width as f32,
            tile_height: tileset.tile_height as f32,
            offset: tileset.draw_offset,
        }
    }
}

/// Maps tile coordinates to pixel positions. The orientation is resolved
/// into a strategy function once, at construction; the per-tile call does
/// not branch on it.
#[derive(Debug, Clone, Copy)]
pub struct CoordinateProjector {
    tile_width: f32,
    tile_height: f32,
    project: fn(&CoordinateProjector, i32, i32, &TilesetMetrics) -> Vec2,
}

impl CoordinateProjector {
    pub fn for_orientation(orientation: MapOrientation, tile_width: u32, tile_height: u32) -> Self {
        let project = match orientation {
            MapOrientation::Orthogonal => project_orthogonal,
            MapOrientation::Isometric => project_isometric,
        };
        Self {
            tile_width: tile_width as f32,
            tile_height: tile_height as f32,
            project,
        }
    }

    pub fn project(&self, x: i32, y: i32, art: &TilesetMetrics) -> Vec2 {
        (self.project)(self, x, y, art)
    }

    pub fn tile_width(&self) -> f32 {
        self.tile_width
    }

    pub fn tile_height(&self) -> f32 {
        self.tile_height
    }
}

fn project_orthogonal(
    projector: &CoordinateProjector,
    x: i32,
    y: i32,
    art: &TilesetMetrics,
) -> Vec2 {
    Vec2 {
        x: x as f32 * projector.tile_width + art.offset.x,
        y: y as f32 * projector.tile_height + art.offset.y,
    }
}

/// Diamond projection. The `(layer cell - art cell)` correction aligns art
/// smaller than the grid cell to the cell's anchor corner.
fn project_isometric(
    projector: &CoordinateProjector,
    x: i32,
    y: i32,
    art: &TilesetMetrics,
) -> Vec2 {
    Vec2 {
        x: (x - y) as f32 * (projector.tile_width * 0.5)
            + (projector.tile_width - art.tile_width)
            + art.offset.x,
        y: (x + y) as f32 * (projector.tile_height * 0.5)
            + (projector.tile_height - art.tile_height)
            + art.offset.y,
    }
}
