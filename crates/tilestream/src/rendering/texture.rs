use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use image::ImageReader;
use tracing::warn;

use crate::map::Tileset;

pub struct LoadedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Decoded tileset atlases keyed by their map-relative image path. A failed
/// load is cached as a miss and warned about once; the blitter falls back
/// to flat tile colors for that tileset.
pub struct TextureStore {
    asset_root: PathBuf,
    images: HashMap<PathBuf, Option<LoadedImage>>,
    warned_missing: HashSet<PathBuf>,
}

impl TextureStore {
    pub fn new(asset_root: PathBuf) -> Self {
        Self {
            asset_root,
            images: HashMap::new(),
            warned_missing: HashSet::new(),
        }
    }

    pub fn image_for(&mut self, tileset: &Tileset) -> Option<&LoadedImage> {
        let key = tileset.image.path.clone();
        if !self.images.contains_key(&key) {
            let resolved = self.asset_root.join(&key);
            let loaded = match load_image_rgba(&resolved) {
                Ok(image) => Some(image),
                Err(reason) => {
                    if self.warned_missing.insert(key.clone()) {
                        warn!(
                            tileset = %tileset.name,
                            path = %resolved.display(),
                            reason = reason.as_str(),
                            "tileset_image_load_failed_using_fallback"
                        );
                    }
                    None
                }
            };
            self.images.insert(key.clone(), loaded);
        }
        self.images.get(&key).and_then(Option::as_ref)
    }
}

fn load_image_rgba(path: &Path) -> Result<LoadedImage, String> {
    let reader = ImageReader::open(path).map_err(|error| format!("file_open_failed:{error}"))?;
    let decoded = reader
        .decode()
        .map_err(|error| format!("decode_failed:{error}"))?;
    let image = decoded.to_rgba8();
    Ok(LoadedImage {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Vec2;
    use crate::map::{PropertyMap, TilesetImage};
    use tempfile::TempDir;

    fn tileset_with_image(path: PathBuf) -> Tileset {
        Tileset {
            name: "terrain".to_string(),
            first_gid: 1,
            tile_count: 4,
            columns: 2,
            tile_width: 2,
            tile_height: 2,
            spacing: 0,
            margin: 0,
            draw_offset: Vec2::ZERO,
            image: TilesetImage {
                path,
                width: 4,
                height: 4,
            },
            properties: PropertyMap::new(),
            tile_properties: std::collections::HashMap::new(),
        }
    }

    #[test]
    fn loads_and_caches_a_png_atlas() {
        let dir = TempDir::new().expect("tempdir");
        let image_path = dir.path().join("terrain.png");
        image::RgbaImage::from_pixel(4, 4, image::Rgba([10, 20, 30, 255]))
            .save(&image_path)
            .expect("write png");

        let mut store = TextureStore::new(dir.path().to_path_buf());
        let tileset = tileset_with_image(PathBuf::from("terrain.png"));
        let loaded = store.image_for(&tileset).expect("image loads");
        assert_eq!((loaded.width, loaded.height), (4, 4));
        assert_eq!(&loaded.rgba[0..4], &[10, 20, 30, 255]);
        assert!(store.image_for(&tileset).is_some());
    }

    #[test]
    fn a_missing_atlas_is_a_cached_miss() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = TextureStore::new(dir.path().to_path_buf());
        let tileset = tileset_with_image(PathBuf::from("absent.png"));
        assert!(store.image_for(&tileset).is_none());
        assert!(store.image_for(&tileset).is_none());
        assert_eq!(store.images.len(), 1);
    }
}
