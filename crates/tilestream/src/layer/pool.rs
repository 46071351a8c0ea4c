use crate::geom::{RectPx, Vec2};
use crate::map::TextureRegion;

use super::window::TileCoord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

/// Everything applied to a node when it is acquired for a coordinate. A
/// rebind replaces the whole tuple; nothing from the previous tile survives.
#[derive(Debug, Clone, PartialEq)]
pub struct TileBinding {
    pub tile_id: u32,
    pub coord: TileCoord,
    /// Index into the owning map's tileset collection.
    pub tileset_index: usize,
    pub texture: TextureRegion,
    pub position_px: Vec2,
    pub interactive: bool,
    /// Hit rectangle relative to `position_px`.
    pub hit_area: RectPx,
    pub collidable: bool,
    pub collision_type: Option<String>,
}

/// A visual tile object. Bound/unbound is explicit: a pooled node carries no
/// binding, so a stale texture or hit area can never leak into reuse.
#[derive(Debug, Clone)]
pub struct TileNode {
    id: NodeId,
    binding: Option<TileBinding>,
    visible: bool,
    physics_enabled: bool,
}

impl TileNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn binding(&self) -> Option<&TileBinding> {
        self.binding.as_ref()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn physics_enabled(&self) -> bool {
        self.physics_enabled
    }

    pub(crate) fn bind(&mut self, binding: TileBinding) {
        self.binding = Some(binding);
        self.visible = true;
    }

    pub(crate) fn set_physics_enabled(&mut self, enabled: bool) {
        self.physics_enabled = enabled;
    }

    pub(crate) fn clear(&mut self) {
        self.binding = None;
        self.visible = false;
    }
}

/// Arena of every node ever created plus the free list of released ones.
/// Nodes are never destroyed while the pool lives; live + pooled always
/// equals created.
#[derive(Debug, Default)]
pub struct NodePool {
    nodes: Vec<TileNode>,
    free: Vec<NodeId>,
}

impl NodePool {
    /// Pops a released node, or creates one when the free list is empty.
    /// The returned node is unbound; the caller rebinds it in full.
    pub fn acquire(&mut self) -> NodeId {
        if let Some(id) = self.free.pop() {
            return id;
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(TileNode {
            id,
            binding: None,
            visible: false,
            physics_enabled: false,
        });
        id
    }

    /// Hides the node, drops its binding and returns it to the free list.
    pub fn release(&mut self, id: NodeId) {
        debug_assert!(
            !self.free.contains(&id),
            "node released while already pooled"
        );
        if let Some(node) = self.node_mut(id) {
            node.clear();
        }
        self.free.push(id);
    }

    pub fn node(&self, id: NodeId) -> Option<&TileNode> {
        self.nodes.get(id.0 as usize)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut TileNode> {
        self.nodes.get_mut(id.0 as usize)
    }

    pub fn created_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn pooled_count(&self) -> usize {
        self.free.len()
    }

    pub fn live_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding_for(coord: TileCoord, tile_id: u32) -> TileBinding {
        TileBinding {
            tile_id,
            coord,
            tileset_index: 0,
            texture: TextureRegion {
                x: 0,
                y: 0,
                width: 32,
                height: 32,
            },
            position_px: Vec2::ZERO,
            interactive: false,
            hit_area: RectPx::new(0.0, 0.0, 32.0, 32.0),
            collidable: false,
            collision_type: None,
        }
    }

    #[test]
    fn acquire_creates_only_when_the_pool_is_dry() {
        let mut pool = NodePool::default();
        let first = pool.acquire();
        let second = pool.acquire();
        assert_ne!(first, second);
        assert_eq!(pool.created_count(), 2);

        pool.release(first);
        let reused = pool.acquire();
        assert_eq!(reused, first);
        assert_eq!(pool.created_count(), 2);
    }

    #[test]
    fn conservation_holds_under_churn() {
        let mut pool = NodePool::default();
        let mut live = Vec::new();
        for _ in 0..8 {
            live.push(pool.acquire());
        }
        for id in live.drain(3..) {
            pool.release(id);
        }
        for _ in 0..2 {
            live.push(pool.acquire());
        }
        assert_eq!(pool.live_count(), live.len());
        assert_eq!(pool.live_count() + pool.pooled_count(), pool.created_count());
        assert_eq!(pool.created_count(), 8);
    }

    #[test]
    fn release_clears_binding_and_hides() {
        let mut pool = NodePool::default();
        let id = pool.acquire();
        pool.node_mut(id)
            .expect("node")
            .bind(binding_for(TileCoord::new(2, 3), 7));
        assert!(pool.node(id).expect("node").is_visible());

        pool.release(id);
        let node = pool.node(id).expect("node");
        assert!(node.binding().is_none());
        assert!(!node.is_visible());
    }

    #[test]
    fn rebind_replaces_the_whole_binding() {
        let mut pool = NodePool::default();
        let id = pool.acquire();
        pool.node_mut(id)
            .expect("node")
            .bind(binding_for(TileCoord::new(0, 0), 1));
        pool.release(id);

        let reused = pool.acquire();
        assert_eq!(reused, id);
        assert!(pool.node(reused).expect("node").binding().is_none());
        pool.node_mut(reused)
            .expect("node")
            .bind(binding_for(TileCoord::new(5, 5), 9));
        let binding = pool.node(reused).expect("node").binding().expect("bound");
        assert_eq!(binding.tile_id, 9);
        assert_eq!(binding.coord, TileCoord::new(5, 5));
    }
}
