use crate::geom::Vec2;
use crate::layer::{TileCoord, TileLayer, TileNode};
use crate::map::TextureRegion;

use super::texture::{LoadedImage, TextureStore};

/// Flat colors used for tiles whose atlas image is unavailable, picked by
/// tile id so adjacent ids stay distinguishable.
const FALLBACK_PALETTE: [[u8; 4]; 6] = [
    [74, 112, 56, 255],
    [112, 83, 58, 255],
    [68, 74, 62, 255],
    [58, 90, 112, 255],
    [104, 66, 98, 255],
    [120, 112, 64, 255],
];

/// Draws every live node of a visible layer into an RGBA frame. Nodes are
/// drawn in coordinate order (rows top to bottom) so isometric diamonds
/// overlap correctly.
pub fn draw_layer(
    frame: &mut [u8],
    frame_width: u32,
    frame_height: u32,
    layer: &TileLayer,
    scroll_px: Vec2,
    store: &mut TextureStore,
) {
    if frame_width == 0 || frame_height == 0 || !layer.is_visible() {
        return;
    }
    let opacity = layer.opacity().clamp(0.0, 1.0);
    if opacity <= 0.0 {
        return;
    }

    let mut nodes: Vec<(TileCoord, &TileNode)> = layer.live_nodes().collect();
    nodes.sort_by_key(|(coord, _)| (coord.y, coord.x));

    for (_, node) in nodes {
        if !node.is_visible() {
            continue;
        }
        let Some(binding) = node.binding() else {
            continue;
        };
        let dest_x = (binding.position_px.x - scroll_px.x).round() as i32;
        let dest_y = (binding.position_px.y - scroll_px.y).round() as i32;
        let image = layer
            .tilesets()
            .tilesets()
            .get(binding.tileset_index)
            .and_then(|tileset| store.image_for(tileset));
        match image {
            Some(image) => blit_region(
                frame,
                frame_width,
                frame_height,
                image,
                binding.texture,
                dest_x,
                dest_y,
                opacity,
            ),
            None => draw_fallback_tile(
                frame,
                frame_width,
                frame_height,
                dest_x,
                dest_y,
                binding.texture,
                binding.tile_id,
                opacity,
            ),
        }
    }
}

pub fn clear_frame(frame: &mut [u8], color: [u8; 4]) {
    for chunk in frame.chunks_exact_mut(4) {
        chunk.copy_from_slice(&color);
    }
}

fn blit_region(
    frame: &mut [u8],
    frame_width: u32,
    frame_height: u32,
    image: &LoadedImage,
    region: TextureRegion,
    dest_x: i32,
    dest_y: i32,
    opacity: f32,
) {
    // The region was validated against the declared atlas size; the decoded
    // image may still be smaller, so clamp the copy to what exists.
    if region.x >= image.width || region.y >= image.height {
        return;
    }
    let copy_width = region.width.min(image.width - region.x) as i32;
    let copy_height = region.height.min(image.height - region.y) as i32;

    for row in 0..copy_height {
        let out_y = dest_y + row;
        if out_y < 0 || out_y >= frame_height as i32 {
            continue;
        }
        let src_row = (region.y as i32 + row) as usize;
        for col in 0..copy_width {
            let out_x = dest_x + col;
            if out_x < 0 || out_x >= frame_width as i32 {
                continue;
            }
            let src_col = (region.x as i32 + col) as usize;
            let src_offset = (src_row * image.width as usize + src_col) * 4;
            let alpha = image.rgba[src_offset + 3];
            if alpha == 0 {
                continue;
            }
            let color = [
                image.rgba[src_offset],
                image.rgba[src_offset + 1],
                image.rgba[src_offset + 2],
                alpha,
            ];
            write_pixel_blended(frame, frame_width as usize, out_x, out_y, color, opacity);
        }
    }
}

fn draw_fallback_tile(
    frame: &mut [u8],
    frame_width: u32,
    frame_height: u32,
    dest_x: i32,
    dest_y: i32,
    region: TextureRegion,
    tile_id: u32,
    opacity: f32,
) {
    let color = FALLBACK_PALETTE[tile_id as usize % FALLBACK_PALETTE.len()];
    for row in 0..region.height as i32 {
        let out_y = dest_y + row;
        if out_y < 0 || out_y >= frame_height as i32 {
            continue;
        }
        for col in 0..region.width as i32 {
            let out_x = dest_x + col;
            if out_x < 0 || out_x >= frame_width as i32 {
                continue;
            }
            write_pixel_blended(frame, frame_width as usize, out_x, out_y, color, opacity);
        }
    }
}

fn write_pixel_blended(
    frame: &mut [u8],
    frame_width: usize,
    x: i32,
    y: i32,
    color: [u8; 4],
    opacity: f32,
) {
    if x < 0 || y < 0 {
        return;
    }
    let Some(pixel_offset) = (y as usize)
        .checked_mul(frame_width)
        .and_then(|row| row.checked_add(x as usize))
    else {
        return;
    };
    let Some(byte_offset) = pixel_offset.checked_mul(4) else {
        return;
    };
    let Some(end) = byte_offset.checked_add(4) else {
        return;
    };
    if end > frame.len() {
        return;
    }
    let coverage = opacity * color[3] as f32 / 255.0;
    if coverage >= 1.0 {
        frame[byte_offset..end].copy_from_slice(&color);
        return;
    }
    for channel in 0..3 {
        let src = color[channel] as f32;
        let dst = frame[byte_offset + channel] as f32;
        frame[byte_offset + channel] = (src * coverage + dst * (1.0 - coverage)).round() as u8;
    }
    frame[byte_offset + 3] = 255;
}
