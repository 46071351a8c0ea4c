use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use crate::geom::{RectPx, Vec2};
use crate::map::{
    resolve_bool, resolve_rect, resolve_str, LayerDefinition, MapOrientation, PropertyMap,
    TextureLookupError, TileGrid, TileGridError, TilesetCollection, PROP_COLLIDABLE,
    PROP_COLLISION_TYPE, PROP_HIT_AREA, PROP_INTERACTIVE,
};

use super::events::{
    InteractionRouter, PhysicsHooks, PointerHit, PointerSample, TileInteraction,
};
use super::pool::{NodeId, NodePool, TileBinding, TileNode};
use super::projection::{CoordinateProjector, TilesetMetrics};
use super::window::{Edge, TileCoord, TileWindow};

#[derive(Debug, Error)]
pub enum LayerError {
    /// The tile id resolved to a tileset but the texture lookup failed.
    /// This is broken asset wiring, not sparse data, and is always surfaced.
    #[error(
        "tile {tile_id} at ({x}, {y}) resolved to tileset '{tileset}' \
         but its texture lookup failed: {source}"
    )]
    TextureLookup {
        tile_id: u32,
        x: i32,
        y: i32,
        tileset: String,
        #[source]
        source: TextureLookupError,
    },
    /// `pan` was called before any `render_tiles`; nothing was applied.
    #[error("pan called before render_tiles established a window")]
    WindowNotRendered,
}

/// One streaming tile layer: keeps a minimal, exact set of visual nodes for
/// the window of tiles the camera can see, shifts that set incrementally as
/// the camera pans, and recycles nodes through a pool instead of allocating
/// per frame.
pub struct TileLayer {
    name: String,
    grid: TileGrid,
    tilesets: Arc<TilesetCollection>,
    projector: CoordinateProjector,
    offset_px: Vec2,
    opacity: f32,
    visible: bool,
    properties: PropertyMap,
    map_properties: Arc<PropertyMap>,
    /// `None` until the first successful `render_tiles`.
    window: Option<TileWindow>,
    pool: NodePool,
    live: HashMap<TileCoord, NodeId>,
    router: InteractionRouter,
    physics: Option<Box<dyn PhysicsHooks>>,
    camera_px: Vec2,
    unresolved_warned: HashSet<u32>,
    pan_rejected_warned: bool,
}

impl TileLayer {
    pub fn from_definition(
        definition: LayerDefinition,
        orientation: MapOrientation,
        tile_width: u32,
        tile_height: u32,
        tilesets: Arc<TilesetCollection>,
        map_properties: Arc<PropertyMap>,
    ) -> Result<Self, TileGridError> {
        let grid = TileGrid::new(definition.width, definition.height, definition.tiles)?;
        Ok(Self {
            name: definition.name,
            grid,
            tilesets,
            projector: CoordinateProjector::for_orientation(orientation, tile_width, tile_height),
            offset_px: definition.offset_px,
            opacity: definition.opacity,
            visible: definition.visible,
            properties: definition.properties,
            map_properties,
            window: None,
            pool: NodePool::default(),
            live: HashMap::new(),
            router: InteractionRouter::default(),
            physics: None,
            camera_px: Vec2::ZERO,
            unresolved_warned: HashSet::new(),
            pan_rejected_warned: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn is_rendered(&self) -> bool {
        self.window.is_some()
    }

    pub fn window(&self) -> Option<&TileWindow> {
        self.window.as_ref()
    }

    pub fn tilesets(&self) -> &TilesetCollection {
        &self.tilesets
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    pub fn camera_px(&self) -> Vec2 {
        self.camera_px
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn pooled_count(&self) -> usize {
        self.pool.pooled_count()
    }

    pub fn created_count(&self) -> usize {
        self.pool.created_count()
    }

    pub fn node_at(&self, coord: TileCoord) -> Option<&TileNode> {
        self.live
            .get(&coord)
            .and_then(|&id| self.pool.node(id))
    }

    pub fn live_nodes(&self) -> impl Iterator<Item = (TileCoord, &TileNode)> {
        self.live
            .iter()
            .filter_map(|(&coord, &id)| self.pool.node(id).map(|node| (coord, node)))
    }

    pub fn set_physics_hooks(&mut self, hooks: Box<dyn PhysicsHooks>) {
        self.physics = Some(hooks);
    }

    /// Full (re)build of the live window. Every live node is drained back to
    /// the pool before any coordinate of the clamped rectangle is bound, so
    /// no node is ever forgotten across a resize and a repeated call with
    /// identical arguments is a no-op for pool and grid alike.
    ///
    /// The pan accumulator restarts at the camera's sub-tile remainder and
    /// all four edge buffers re-arm.
    pub fn render_tiles(
        &mut self,
        start_x: i32,
        start_y: i32,
        tiles_x: i32,
        tiles_y: i32,
    ) -> Result<(), LayerError> {
        let mut window = TileWindow::clamped(
            start_x,
            start_y,
            tiles_x,
            tiles_y,
            self.grid.width(),
            self.grid.height(),
        );
        let tile_width = self.projector.tile_width();
        let tile_height = self.projector.tile_height();
        window.set_pan(
            if tile_width > 0.0 {
                self.camera_px.x.rem_euclid(tile_width)
            } else {
                0.0
            },
            if tile_height > 0.0 {
                self.camera_px.y.rem_euclid(tile_height)
            } else {
                0.0
            },
        );

        self.release_all();
        let mut first_error = None;
        let coords: Vec<TileCoord> = window.coords().collect();
        self.bind_coords(&coords, &mut first_error);
        self.window = Some(window);
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Incremental shift for an arbitrary signed pixel delta, typically once
    /// per frame. Accumulates the delta, pre-renders at most one buffered
    /// edge per call (horizontal before vertical), then performs whole-tile
    /// window shifts while either accumulator exceeds a tile. Cost is
    /// proportional to the tiles entering and leaving the window.
    pub fn pan(&mut self, dx: f32, dy: f32) -> Result<(), LayerError> {
        let Some(mut window) = self.window.take() else {
            if !self.pan_rejected_warned {
                warn!(layer = %self.name, "pan_before_render_rejected");
                self.pan_rejected_warned = true;
            }
            return Err(LayerError::WindowNotRendered);
        };

        self.camera_px.x += dx;
        self.camera_px.y += dy;
        window.accumulate(dx, dy);
        let mut first_error = None;

        if let Some(edge) = window.next_buffer_edge(dx, dy) {
            // The flag is set even when the window is pinned at the map
            // bound; there is nothing to pre-render there and re-testing
            // every frame would not change that.
            window.mark_buffered(edge);
            if let Some(exposed) = window.grow(edge) {
                let coords: Vec<TileCoord> = match edge {
                    Edge::Left | Edge::Right => window.column(exposed).collect(),
                    Edge::Top | Edge::Bottom => window.row(exposed).collect(),
                };
                self.bind_coords(&coords, &mut first_error);
            }
        }

        let tile_width = self.projector.tile_width();
        let tile_height = self.projector.tile_height();

        // Guards against a degenerate zero tile size; the threshold loops
        // would otherwise never drain the accumulator.
        if tile_width > 0.0 {
            while window.pan_x() >= tile_width {
                window.consume_pan_x(tile_width);
                if let Some(shift) = window.shift_right() {
                    self.shift_columns(&window, shift.released, shift.exposed, &mut first_error);
                }
            }
            while window.pan_x() <= -tile_width {
                window.consume_pan_x(-tile_width);
                if let Some(shift) = window.shift_left() {
                    self.shift_columns(&window, shift.released, shift.exposed, &mut first_error);
                }
            }
        }
        if tile_height > 0.0 {
            while window.pan_y() >= tile_height {
                window.consume_pan_y(tile_height);
                if let Some(shift) = window.shift_down() {
                    self.shift_rows(&window, shift.released, shift.exposed, &mut first_error);
                }
            }
            while window.pan_y() <= -tile_height {
                window.consume_pan_y(-tile_height);
                if let Some(shift) = window.shift_up() {
                    self.shift_rows(&window, shift.released, shift.exposed, &mut first_error);
                }
            }
        }

        self.window = Some(window);
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Routes one frame of pointer state to the interactive nodes.
    pub fn route_pointer(&mut self, sample: PointerSample) {
        let hit = sample.position_px.and_then(|point| self.hit_test(point));
        self.router.route(sample, hit);
    }

    /// Topmost live interactive node under the point, if any.
    pub fn hit_test(&self, point_px: Vec2) -> Option<PointerHit> {
        let mut best: Option<PointerHit> = None;
        for (coord, node) in self.live_nodes() {
            let Some(binding) = node.binding() else {
                continue;
            };
            if !binding.interactive {
                continue;
            }
            if !binding
                .hit_area
                .translated(binding.position_px)
                .contains(point_px)
            {
                continue;
            }
            let replaces = match best {
                Some(current) => (coord.y, coord.x) > (current.coord.y, current.coord.x),
                None => true,
            };
            if replaces {
                best = Some(PointerHit {
                    node: node.id(),
                    coord,
                    tile_id: binding.tile_id,
                });
            }
        }
        best
    }

    pub fn drain_interactions(&mut self) -> Vec<TileInteraction> {
        self.router.drain()
    }

    fn shift_columns(
        &mut self,
        window: &TileWindow,
        released: i32,
        exposed: i32,
        first_error: &mut Option<LayerError>,
    ) {
        let released: Vec<TileCoord> = window.column(released).collect();
        for coord in released {
            self.release_at(coord);
        }
        let exposed: Vec<TileCoord> = window.column(exposed).collect();
        self.bind_coords(&exposed, first_error);
    }

    fn shift_rows(
        &mut self,
        window: &TileWindow,
        released: i32,
        exposed: i32,
        first_error: &mut Option<LayerError>,
    ) {
        let released: Vec<TileCoord> = window.row(released).collect();
        for coord in released {
            self.release_at(coord);
        }
        let exposed: Vec<TileCoord> = window.row(exposed).collect();
        self.bind_coords(&exposed, first_error);
    }

    fn bind_coords(&mut self, coords: &[TileCoord], first_error: &mut Option<LayerError>) {
        for &coord in coords {
            if let Err(error) = self.bind_tile(coord) {
                if first_error.is_none() {
                    *first_error = Some(error);
                }
            }
        }
    }

    /// Binds the node for one coordinate from its tile id. An id outside
    /// every tileset is sparse data: the cell stays empty. A texture lookup
    /// failure on a resolved tileset is broken content and is returned; the
    /// cell is left empty and no node is lost to either fault.
    fn bind_tile(&mut self, coord: TileCoord) -> Result<(), LayerError> {
        let tilesets = Arc::clone(&self.tilesets);
        let Some(gid) = self.grid.tile_at(coord.x, coord.y) else {
            self.release_at(coord);
            return Ok(());
        };
        if gid == 0 {
            self.release_at(coord);
            return Ok(());
        }
        let Some((tileset_index, tileset)) = tilesets.tileset_with_index(gid) else {
            if self.unresolved_warned.insert(gid) {
                warn!(
                    layer = %self.name,
                    tile_id = gid,
                    x = coord.x,
                    y = coord.y,
                    "tile_id_has_no_tileset_treating_as_empty"
                );
            }
            self.release_at(coord);
            return Ok(());
        };

        let texture = match tileset.tile_texture(gid) {
            Ok(texture) => texture,
            Err(source) => {
                self.release_at(coord);
                return Err(LayerError::TextureLookup {
                    tile_id: gid,
                    x: coord.x,
                    y: coord.y,
                    tileset: tileset.name.clone(),
                    source,
                });
            }
        };

        let art = TilesetMetrics::of(tileset);
        let position_px = self.offset_px + self.projector.project(coord.x, coord.y, &art);
        let sources = [
            tileset.tile_properties(gid),
            Some(&tileset.properties),
            Some(&self.properties),
            Some(self.map_properties.as_ref()),
        ];
        let binding = TileBinding {
            tile_id: gid,
            coord,
            tileset_index,
            texture,
            position_px,
            interactive: resolve_bool(PROP_INTERACTIVE, &sources).unwrap_or(false),
            hit_area: resolve_rect(PROP_HIT_AREA, &sources)
                .unwrap_or_else(|| RectPx::new(0.0, 0.0, art.tile_width, art.tile_height)),
            collidable: resolve_bool(PROP_COLLIDABLE, &sources).unwrap_or(false),
            collision_type: resolve_str(PROP_COLLISION_TYPE, &sources).map(str::to_owned),
        };
        self.place_binding(coord, binding);
        Ok(())
    }

    fn place_binding(&mut self, coord: TileCoord, binding: TileBinding) {
        self.release_at(coord);
        let id = self.pool.acquire();
        if binding.interactive {
            self.router.subscribe(id);
        }
        let mut physics_enabled = false;
        if binding.collidable {
            if let Some(physics) = self.physics.as_mut() {
                physics.enable(id, &binding);
                physics_enabled = true;
            }
        }
        if let Some(node) = self.pool.node_mut(id) {
            node.bind(binding);
            node.set_physics_enabled(physics_enabled);
        }
        self.live.insert(coord, id);
    }

    fn release_at(&mut self, coord: TileCoord) {
        if let Some(id) = self.live.remove(&coord) {
            self.release_node(id);
        }
    }

    /// Interaction and physics detach before the node re-enters the pool.
    fn release_node(&mut self, id: NodeId) {
        self.router.unsubscribe(id);
        let physics_enabled = self
            .pool
            .node(id)
            .is_some_and(TileNode::physics_enabled);
        if physics_enabled {
            if let Some(physics) = self.physics.as_mut() {
                physics.disable(id);
            }
            if let Some(node) = self.pool.node_mut(id) {
                node.set_physics_enabled(false);
            }
        }
        self.pool.release(id);
    }

    fn release_all(&mut self) {
        let drained: Vec<NodeId> = self.live.drain().map(|(_, id)| id).collect();
        for id in drained {
            self.release_node(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::events::PointerEventKind;
    use crate::map::{Tileset, TilesetImage};
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::Mutex;

    const TILE: f32 = 32.0;

    fn test_tileset(first_gid: u32, tile_count: u32) -> Tileset {
        Tileset {
            name: "terrain".to_string(),
            first_gid,
            tile_count,
            columns: 8,
            tile_width: 32,
            tile_height: 32,
            spacing: 0,
            margin: 0,
            draw_offset: Vec2::ZERO,
            image: TilesetImage {
                path: PathBuf::from("terrain.png"),
                width: 1024,
                height: 1024,
            },
            properties: PropertyMap::new(),
            tile_properties: std::collections::HashMap::new(),
        }
    }

    fn layer_with(
        width: u32,
        height: u32,
        tiles: Vec<u32>,
        tilesets: Vec<Tileset>,
    ) -> TileLayer {
        TileLayer::from_definition(
            LayerDefinition::new("ground", width, height, tiles),
            MapOrientation::Orthogonal,
            32,
            32,
            Arc::new(TilesetCollection::new(tilesets)),
            Arc::new(PropertyMap::new()),
        )
        .expect("layer")
    }

    fn filled_layer(width: u32, height: u32) -> TileLayer {
        let tiles = vec![1; width as usize * height as usize];
        layer_with(width, height, tiles, vec![test_tileset(1, 64)])
    }

    fn assert_invariants(layer: &TileLayer) {
        let window = layer.window().expect("window");
        assert_eq!(layer.live_count() + layer.pooled_count(), layer.created_count());
        for (coord, node) in layer.live_nodes() {
            assert!(window.contains(coord), "{coord:?} outside window");
            let binding = node.binding().expect("live node is bound");
            assert_eq!(binding.coord, coord);
        }
        assert!(window.left() >= 0 && window.top() >= 0);
        assert!(window.right() <= layer.grid().width() as i32);
        assert!(window.bottom() <= layer.grid().height() as i32);
    }

    #[test]
    fn render_binds_each_coordinate_to_exactly_one_node() {
        let width = 6u32;
        let tiles: Vec<u32> = (0..width * 6).map(|index| 1 + index % 48).collect();
        let mut layer = layer_with(width, 6, tiles, vec![test_tileset(1, 64)]);
        layer.render_tiles(0, 0, 6, 6).expect("render");

        assert_eq!(layer.live_count(), 36);
        let mut seen = HashSet::new();
        for (coord, node) in layer.live_nodes() {
            assert!(seen.insert(node.id()), "node bound under two coordinates");
            let binding = node.binding().expect("bound");
            assert_eq!(binding.tile_id, 1 + (coord.x + coord.y * width as i32) as u32 % 48);
        }
        assert_invariants(&layer);
    }

    #[test]
    fn scenario_a_orthogonal_positions() {
        let mut layer = filled_layer(4, 4);
        layer.render_tiles(0, 0, 2, 2).expect("render");
        assert_eq!(layer.live_count(), 4);
        let expected = [
            (TileCoord::new(0, 0), Vec2::new(0.0, 0.0)),
            (TileCoord::new(1, 0), Vec2::new(32.0, 0.0)),
            (TileCoord::new(0, 1), Vec2::new(0.0, 32.0)),
            (TileCoord::new(1, 1), Vec2::new(32.0, 32.0)),
        ];
        for (coord, position) in expected {
            let node = layer.node_at(coord).expect("node");
            assert_eq!(node.binding().expect("bound").position_px, position);
        }
    }

    #[test]
    fn render_is_idempotent() {
        let mut layer = filled_layer(8, 8);
        layer.render_tiles(1, 1, 4, 4).expect("render");
        let live = layer.live_count();
        let pooled = layer.pooled_count();
        let created = layer.created_count();
        let coords: HashSet<TileCoord> = layer.live_nodes().map(|(coord, _)| coord).collect();

        layer.render_tiles(1, 1, 4, 4).expect("render again");
        assert_eq!(layer.live_count(), live);
        assert_eq!(layer.pooled_count(), pooled);
        assert_eq!(layer.created_count(), created);
        let coords_again: HashSet<TileCoord> =
            layer.live_nodes().map(|(coord, _)| coord).collect();
        assert_eq!(coords, coords_again);
        assert_invariants(&layer);
    }

    #[test]
    fn render_clamps_to_map_bounds() {
        let mut layer = filled_layer(4, 10);
        layer.render_tiles(-5, 0, 8, 8).expect("render");
        let window = layer.window().expect("window");
        assert_eq!((window.x(), window.y()), (0, 0));
        assert_eq!((window.width(), window.height()), (4, 8));
        assert_eq!(layer.live_count(), 32);
        assert_invariants(&layer);
    }

    #[test]
    fn resize_drains_the_previous_window_first() {
        let mut layer = filled_layer(12, 12);
        layer.render_tiles(0, 0, 6, 6).expect("render");
        assert_eq!(layer.created_count(), 36);

        layer.render_tiles(4, 4, 3, 3).expect("resize");
        assert_eq!(layer.live_count(), 9);
        // The shrink reuses pooled nodes; nothing new is created, nothing lost.
        assert_eq!(layer.created_count(), 36);
        assert_eq!(layer.pooled_count(), 27);
        assert_invariants(&layer);
    }

    #[test]
    fn pan_before_render_is_rejected_without_side_effects() {
        let mut layer = filled_layer(4, 4);
        let result = layer.pan(10.0, 0.0);
        assert!(matches!(result, Err(LayerError::WindowNotRendered)));
        assert!(!layer.is_rendered());
        assert_eq!(layer.created_count(), 0);
        assert_eq!(layer.camera_px(), Vec2::ZERO);
    }

    #[test]
    fn scenario_b_single_shift_leaves_remainder() {
        let mut layer = filled_layer(20, 10);
        layer.render_tiles(0, 0, 8, 8).expect("render");
        layer.pan(33.0, 0.0).expect("pan");
        let window = layer.window().expect("window");
        assert_eq!(window.x(), 1);
        assert_eq!(window.pan_x(), 1.0);
        assert_eq!(layer.live_count(), window.area());
        assert_invariants(&layer);
    }

    #[test]
    fn round_trip_ten_whole_tile_pans() {
        let mut layer = filled_layer(30, 12);
        layer.render_tiles(0, 0, 10, 10).expect("render");
        for _ in 0..10 {
            layer.pan(32.0, 0.0).expect("pan");
            assert_eq!(layer.window().expect("window").pan_x(), 0.0);
        }
        let window = layer.window().expect("window");
        assert_eq!(window.x(), 10);
        assert_eq!(window.width(), 10);
        assert_invariants(&layer);
    }

    #[test]
    fn first_pan_buffers_one_edge_only() {
        let mut layer = filled_layer(10, 10);
        layer.render_tiles(2, 2, 3, 3).expect("render");
        assert_eq!(layer.live_count(), 9);

        layer.pan(1.0, 1.0).expect("pan");
        let window = layer.window().expect("window");
        assert!(window.buffered().left);
        assert!(!window.buffered().top);
        assert_eq!((window.x(), window.width()), (1, 4));
        assert_eq!(layer.live_count(), 12);

        // Same direction again: the edge stays buffered, no second growth.
        layer.pan(1.0, 1.0).expect("pan");
        let window = layer.window().expect("window");
        assert!(window.buffered().top);
        assert_eq!(layer.live_count(), 16);
        layer.pan(1.0, 1.0).expect("pan");
        assert_eq!(layer.live_count(), 16);
        assert_invariants(&layer);
    }

    #[test]
    fn buffering_at_the_map_bound_sets_the_flag_without_nodes() {
        let mut layer = filled_layer(8, 8);
        layer.render_tiles(0, 0, 4, 4).expect("render");
        layer.pan(1.0, 0.0).expect("pan");
        let window = layer.window().expect("window");
        assert!(window.buffered().left);
        assert_eq!(window.x(), 0);
        assert_eq!(layer.live_count(), 16);
    }

    #[test]
    fn large_pan_consumes_the_accumulator_at_the_map_edge() {
        let mut layer = filled_layer(10, 10);
        layer.render_tiles(0, 0, 5, 5).expect("render");
        // A hundred tiles worth of delta toward a side the window is
        // already pinned against: terminates, stays in bounds, and the
        // remainder is a sub-tile amount.
        layer.pan(-3200.0, 0.0).expect("pan");
        let window = layer.window().expect("window");
        assert_eq!(window.x(), 0);
        assert_eq!(window.right(), 6);
        assert!(window.pan_x() > -TILE && window.pan_x() <= 0.0);
        assert_invariants(&layer);
    }

    #[test]
    fn render_resets_the_accumulator_to_the_camera_remainder() {
        let mut layer = filled_layer(20, 20);
        layer.render_tiles(0, 0, 6, 6).expect("render");
        layer.pan(7.0, 13.0).expect("pan");
        layer.pan(32.0, 0.0).expect("pan");

        layer.render_tiles(1, 0, 6, 6).expect("rebuild");
        let window = layer.window().expect("window");
        assert_eq!(window.pan_x(), (7.0f32 + 32.0).rem_euclid(TILE));
        assert_eq!(window.pan_y(), 13.0);
        assert_eq!(window.buffered(), Default::default());
    }

    #[test]
    fn unresolvable_tile_id_is_an_invisible_gap() {
        let tiles = vec![1, 99, 1, 1];
        let mut layer = layer_with(2, 2, tiles, vec![test_tileset(1, 8)]);
        layer.render_tiles(0, 0, 2, 2).expect("render succeeds");
        assert_eq!(layer.live_count(), 3);
        assert!(layer.node_at(TileCoord::new(1, 0)).is_none());
        assert_invariants(&layer);
    }

    #[test]
    fn broken_texture_wiring_surfaces_with_context() {
        let mut broken = test_tileset(1, 64);
        // Declared atlas far too small for the upper tile rows.
        broken.image.height = 32;
        let tiles = vec![1, 60, 1, 1];
        let mut layer = layer_with(2, 2, tiles, vec![broken]);

        let error = layer.render_tiles(0, 0, 2, 2).expect_err("must surface");
        match error {
            LayerError::TextureLookup { tile_id, x, y, .. } => {
                assert_eq!(tile_id, 60);
                assert_eq!((x, y), (1, 0));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // The rest of the window still rendered and nothing leaked.
        assert_eq!(layer.live_count(), 3);
        assert_invariants(&layer);
    }

    #[test]
    fn interactive_nodes_route_pointer_events_until_released() {
        let mut tileset = test_tileset(1, 8);
        tileset
            .tile_properties
            .insert(1, [(PROP_INTERACTIVE.to_string(), json!(true))].into());
        let tiles = vec![2, 2, 2, 2, 2, 2, 2, 2, 2];
        let mut layer = layer_with(3, 3, tiles, vec![tileset]);
        layer.render_tiles(0, 0, 3, 3).expect("render");

        let press = PointerSample {
            position_px: Some(Vec2::new(40.0, 8.0)),
            pressed: true,
            released: false,
        };
        let release = PointerSample {
            position_px: Some(Vec2::new(40.0, 8.0)),
            pressed: false,
            released: true,
        };
        layer.route_pointer(press);
        layer.route_pointer(release);
        let events = layer.drain_interactions();
        let kinds: Vec<_> = events.iter().map(|event| event.kind).collect();
        assert!(kinds.contains(&PointerEventKind::Tap));
        assert!(events
            .iter()
            .all(|event| event.coord == TileCoord::new(1, 0) && event.tile_id == 2));

        // Scroll the window away: the node is released and unsubscribed.
        layer.render_tiles(10, 10, 2, 2).expect("rebuild elsewhere");
        layer.route_pointer(press);
        layer.route_pointer(release);
        assert!(layer.drain_interactions().is_empty());
    }

    #[test]
    fn non_interactive_tiles_never_hit() {
        let mut layer = filled_layer(3, 3);
        layer.render_tiles(0, 0, 3, 3).expect("render");
        assert!(layer.hit_test(Vec2::new(16.0, 16.0)).is_none());
    }

    struct RecordingPhysics {
        log: Arc<Mutex<Vec<(&'static str, NodeId)>>>,
    }

    impl PhysicsHooks for RecordingPhysics {
        fn enable(&mut self, node: NodeId, binding: &TileBinding) {
            assert!(binding.collidable);
            self.log.lock().expect("lock").push(("enable", node));
        }

        fn disable(&mut self, node: NodeId) {
            self.log.lock().expect("lock").push(("disable", node));
        }
    }

    #[test]
    fn physics_hooks_pair_enable_with_disable() {
        let mut tileset = test_tileset(1, 8);
        tileset.tile_properties.insert(
            0,
            [
                (PROP_COLLIDABLE.to_string(), json!(true)),
                (PROP_COLLISION_TYPE.to_string(), json!("solid")),
            ]
            .into(),
        );
        let mut layer = layer_with(2, 1, vec![1, 2], vec![tileset]);
        let log = Arc::new(Mutex::new(Vec::new()));
        layer.set_physics_hooks(Box::new(RecordingPhysics {
            log: Arc::clone(&log),
        }));

        layer.render_tiles(0, 0, 2, 1).expect("render");
        {
            let entries = log.lock().expect("lock");
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].0, "enable");
        }
        let binding = layer
            .node_at(TileCoord::new(0, 0))
            .and_then(TileNode::binding)
            .expect("bound");
        assert_eq!(binding.collision_type.as_deref(), Some("solid"));

        layer.render_tiles(1, 0, 1, 1).expect("rebuild");
        let entries = log.lock().expect("lock");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].0, "disable");
        assert_eq!(entries[0].1, entries[1].1);
    }

    #[test]
    fn layer_properties_fall_back_for_every_binding() {
        let mut definition = LayerDefinition::new("props", 2, 1, vec![1, 1]);
        definition
            .properties
            .insert(PROP_INTERACTIVE.to_string(), json!(true));
        let mut layer = TileLayer::from_definition(
            definition,
            MapOrientation::Orthogonal,
            32,
            32,
            Arc::new(TilesetCollection::new(vec![test_tileset(1, 8)])),
            Arc::new(PropertyMap::new()),
        )
        .expect("layer");
        layer.render_tiles(0, 0, 2, 1).expect("render");
        for (_, node) in layer.live_nodes() {
            assert!(node.binding().expect("bound").interactive);
        }
    }
}
