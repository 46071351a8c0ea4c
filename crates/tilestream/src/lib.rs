pub mod app;
pub mod geom;
pub mod layer;
pub mod map;
pub mod rendering;

pub use app::{run_viewer, AppError, ViewerConfig};
pub use geom::{RectPx, Vec2};
pub use layer::{
    CoordinateProjector, Edge, EdgeFlags, InteractionRouter, LayerError, LayerId, LineShift,
    NodeId, NodePool, PhysicsHooks, PointerEventKind, PointerHit, PointerSample, TileBinding,
    TileCoord, TileInteraction, TileLayer, TileMap, TileNode, TileWindow, TilesetMetrics,
};
pub use map::{
    load_tmx_map, resolve_bool, resolve_property, resolve_rect, resolve_str, LayerDefinition,
    MapDefinition, MapErrorCode, MapLoadError, MapOrientation, PropertyMap, SourceLocation,
    TextureLookupError, TextureRegion, TileGrid, TileGridError, Tileset, TilesetCollection,
    TilesetImage, PROP_COLLIDABLE, PROP_COLLISION_TYPE, PROP_HIT_AREA, PROP_INTERACTIVE,
};
pub use rendering::{clear_frame, draw_layer, LoadedImage, TextureStore};
