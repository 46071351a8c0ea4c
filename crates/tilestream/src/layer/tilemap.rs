use std::sync::Arc;

use crate::geom::Vec2;
use crate::map::{
    MapDefinition, MapOrientation, PropertyMap, TileGridError, TilesetCollection,
};

use super::events::{PointerSample, TileInteraction};
use super::streaming::{LayerError, TileLayer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerId(pub usize);

/// Owns a map's layers, tileset collection and map-level properties, and is
/// the sink for the interaction events its layers emit.
pub struct TileMap {
    orientation: MapOrientation,
    tile_width: u32,
    tile_height: u32,
    properties: Arc<PropertyMap>,
    tilesets: Arc<TilesetCollection>,
    layers: Vec<TileLayer>,
}

impl TileMap {
    pub fn from_definition(definition: MapDefinition) -> Result<Self, TileGridError> {
        let tilesets = Arc::new(TilesetCollection::new(definition.tilesets));
        let properties = Arc::new(definition.properties);
        let layers = definition
            .layers
            .into_iter()
            .map(|layer| {
                TileLayer::from_definition(
                    layer,
                    definition.orientation,
                    definition.tile_width,
                    definition.tile_height,
                    Arc::clone(&tilesets),
                    Arc::clone(&properties),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            orientation: definition.orientation,
            tile_width: definition.tile_width,
            tile_height: definition.tile_height,
            properties,
            tilesets,
            layers,
        })
    }

    pub fn orientation(&self) -> MapOrientation {
        self.orientation
    }

    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    pub fn tile_height(&self) -> u32 {
        self.tile_height
    }

    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    pub fn tilesets(&self) -> &TilesetCollection {
        &self.tilesets
    }

    pub fn layers(&self) -> &[TileLayer] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [TileLayer] {
        &mut self.layers
    }

    pub fn layer(&self, id: LayerId) -> Option<&TileLayer> {
        self.layers.get(id.0)
    }

    /// Rebuilds every layer's window. The first layer error is returned
    /// after all layers have been processed.
    pub fn render_tiles(
        &mut self,
        start_x: i32,
        start_y: i32,
        tiles_x: i32,
        tiles_y: i32,
    ) -> Result<(), LayerError> {
        let mut first_error = None;
        for layer in &mut self.layers {
            if let Err(error) = layer.render_tiles(start_x, start_y, tiles_x, tiles_y) {
                first_error.get_or_insert(error);
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Pans every rendered layer by the camera delta.
    pub fn pan(&mut self, dx: f32, dy: f32) -> Result<(), LayerError> {
        let mut first_error = None;
        for layer in &mut self.layers {
            if let Err(error) = layer.pan(dx, dy) {
                first_error.get_or_insert(error);
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Routes one frame of pointer state to every visible layer.
    pub fn route_pointer(&mut self, sample: PointerSample) {
        for layer in &mut self.layers {
            if layer.is_visible() {
                layer.route_pointer(sample);
            }
        }
    }

    /// Collects the interaction events every layer emitted since the last
    /// poll, tagged with the emitting layer.
    pub fn poll_interactions(&mut self) -> Vec<(LayerId, TileInteraction)> {
        let mut events = Vec::new();
        for (index, layer) in self.layers.iter_mut().enumerate() {
            for event in layer.drain_interactions() {
                events.push((LayerId(index), event));
            }
        }
        events
    }

    /// Total live nodes across layers, mainly for host-side diagnostics.
    pub fn live_node_count(&self) -> usize {
        self.layers.iter().map(TileLayer::live_count).sum()
    }

    pub fn camera_px(&self) -> Vec2 {
        self.layers
            .first()
            .map(TileLayer::camera_px)
            .unwrap_or(Vec2::ZERO)
    }
}
