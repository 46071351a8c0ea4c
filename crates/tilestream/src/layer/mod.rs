mod events;
mod pool;
mod projection;
mod streaming;
mod tilemap;
mod window;

pub use events::{
    InteractionRouter, PhysicsHooks, PointerEventKind, PointerHit, PointerSample, TileInteraction,
};
pub use pool::{NodeId, NodePool, TileBinding, TileNode};
pub use projection::{CoordinateProjector, TilesetMetrics};
pub use streaming::{LayerError, TileLayer};
pub use tilemap::{LayerId, TileMap};
pub use window::{Edge, EdgeFlags, LineShift, TileCoord, TileWindow};
