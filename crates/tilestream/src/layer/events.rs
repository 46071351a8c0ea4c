use std::collections::HashSet;

use crate::geom::Vec2;

use super::pool::{NodeId, TileBinding};
use super::window::TileCoord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEventKind {
    Press,
    Release,
    Move,
    Enter,
    Leave,
    ReleaseOutside,
    /// Primary action: press and release on the same node.
    Tap,
}

/// One frame of pointer state as sampled by the host. `position_px` is in
/// the same pixel space as node positions; `None` means the pointer left
/// the surface.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerSample {
    pub position_px: Option<Vec2>,
    pub pressed: bool,
    pub released: bool,
}

/// A live node the pointer currently rests on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerHit {
    pub node: NodeId,
    pub coord: TileCoord,
    pub tile_id: u32,
}

/// Outward interaction event, drained by the owning map.
#[derive(Debug, Clone, PartialEq)]
pub struct TileInteraction {
    pub kind: PointerEventKind,
    pub node: NodeId,
    pub coord: TileCoord,
    pub tile_id: u32,
    pub pointer_px: Vec2,
}

/// Collaborator hook for nodes whose binding is collidable: enabled when
/// such a binding is applied, disabled at release.
pub trait PhysicsHooks {
    fn enable(&mut self, node: NodeId, binding: &TileBinding);
    fn disable(&mut self, node: NodeId);
}

/// Owns the pointer-subscription lifetime of live nodes. A node receives
/// events only between subscribe (acquire with an interactive binding) and
/// unsubscribe (release); unsubscribing also forgets any hover/press state
/// pointing at the node, so a reused node cannot fire for its previous
/// tile.
#[derive(Debug, Default)]
pub struct InteractionRouter {
    subscribed: HashSet<NodeId>,
    hovered: Option<PointerHit>,
    pressed: Option<PointerHit>,
    last_position_px: Vec2,
    outbox: Vec<TileInteraction>,
}

impl InteractionRouter {
    pub fn subscribe(&mut self, node: NodeId) {
        self.subscribed.insert(node);
    }

    pub fn unsubscribe(&mut self, node: NodeId) {
        self.subscribed.remove(&node);
        if self.hovered.map(|hit| hit.node) == Some(node) {
            self.hovered = None;
        }
        if self.pressed.map(|hit| hit.node) == Some(node) {
            self.pressed = None;
        }
    }

    pub fn is_subscribed(&self, node: NodeId) -> bool {
        self.subscribed.contains(&node)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribed.len()
    }

    pub fn route(&mut self, sample: PointerSample, hit: Option<PointerHit>) {
        let over = hit.filter(|hit| self.subscribed.contains(&hit.node));
        let previous_position = self.last_position_px;
        if let Some(position) = sample.position_px {
            self.last_position_px = position;
        }
        let position = self.last_position_px;

        if over.map(|hit| hit.node) != self.hovered.map(|hit| hit.node) {
            if let Some(previous) = self.hovered {
                self.emit(PointerEventKind::Leave, previous, position);
            }
            if let Some(next) = over {
                self.emit(PointerEventKind::Enter, next, position);
            }
            self.hovered = over;
        }

        let moved = sample
            .position_px
            .is_some_and(|current| current != previous_position);
        if moved {
            if let Some(current) = over {
                self.emit(PointerEventKind::Move, current, position);
            }
        }

        if sample.pressed {
            if let Some(current) = over {
                self.emit(PointerEventKind::Press, current, position);
                self.pressed = Some(current);
            }
        }

        if sample.released {
            if let Some(pressed) = self.pressed.take() {
                if over.map(|hit| hit.node) == Some(pressed.node) {
                    self.emit(PointerEventKind::Release, pressed, position);
                    self.emit(PointerEventKind::Tap, pressed, position);
                } else {
                    self.emit(PointerEventKind::ReleaseOutside, pressed, position);
                }
            } else if let Some(current) = over {
                self.emit(PointerEventKind::Release, current, position);
            }
        }
    }

    pub fn drain(&mut self) -> Vec<TileInteraction> {
        std::mem::take(&mut self.outbox)
    }

    fn emit(&mut self, kind: PointerEventKind, hit: PointerHit, pointer_px: Vec2) {
        self.outbox.push(TileInteraction {
            kind,
            node: hit.node,
            coord: hit.coord,
            tile_id: hit.tile_id,
            pointer_px,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(node: u32) -> PointerHit {
        PointerHit {
            node: NodeId(node),
            coord: TileCoord::new(node as i32, 0),
            tile_id: node + 1,
        }
    }

    fn move_to(x: f32, y: f32) -> PointerSample {
        PointerSample {
            position_px: Some(Vec2::new(x, y)),
            pressed: false,
            released: false,
        }
    }

    fn kinds(events: &[TileInteraction]) -> Vec<PointerEventKind> {
        events.iter().map(|event| event.kind).collect()
    }

    #[test]
    fn unsubscribed_nodes_receive_nothing() {
        let mut router = InteractionRouter::default();
        router.route(move_to(5.0, 5.0), Some(hit(0)));
        assert!(router.drain().is_empty());
    }

    #[test]
    fn enter_move_leave_lifecycle() {
        let mut router = InteractionRouter::default();
        router.subscribe(NodeId(0));

        router.route(move_to(5.0, 5.0), Some(hit(0)));
        assert_eq!(
            kinds(&router.drain()),
            vec![PointerEventKind::Enter, PointerEventKind::Move]
        );

        router.route(move_to(6.0, 5.0), Some(hit(0)));
        assert_eq!(kinds(&router.drain()), vec![PointerEventKind::Move]);

        router.route(move_to(90.0, 5.0), None);
        assert_eq!(kinds(&router.drain()), vec![PointerEventKind::Leave]);
    }

    #[test]
    fn tap_requires_release_over_the_pressed_node() {
        let mut router = InteractionRouter::default();
        router.subscribe(NodeId(0));

        router.route(
            PointerSample {
                position_px: Some(Vec2::new(1.0, 1.0)),
                pressed: true,
                released: false,
            },
            Some(hit(0)),
        );
        router.route(
            PointerSample {
                position_px: Some(Vec2::new(1.0, 1.0)),
                pressed: false,
                released: true,
            },
            Some(hit(0)),
        );
        let events = router.drain();
        assert_eq!(
            kinds(&events),
            vec![
                PointerEventKind::Enter,
                PointerEventKind::Move,
                PointerEventKind::Press,
                PointerEventKind::Release,
                PointerEventKind::Tap
            ]
        );
        assert!(events.iter().all(|event| event.node == NodeId(0)));
    }

    #[test]
    fn release_away_from_the_pressed_node_is_release_outside() {
        let mut router = InteractionRouter::default();
        router.subscribe(NodeId(0));

        router.route(
            PointerSample {
                position_px: Some(Vec2::new(1.0, 1.0)),
                pressed: true,
                released: false,
            },
            Some(hit(0)),
        );
        router.drain();
        router.route(
            PointerSample {
                position_px: Some(Vec2::new(80.0, 1.0)),
                pressed: false,
                released: true,
            },
            None,
        );
        let events = router.drain();
        assert_eq!(
            kinds(&events),
            vec![PointerEventKind::Leave, PointerEventKind::ReleaseOutside]
        );
        assert_eq!(events[1].node, NodeId(0));
    }

    #[test]
    fn unsubscribe_forgets_hover_and_press_state() {
        let mut router = InteractionRouter::default();
        router.subscribe(NodeId(0));
        router.route(
            PointerSample {
                position_px: Some(Vec2::new(1.0, 1.0)),
                pressed: true,
                released: false,
            },
            Some(hit(0)),
        );
        router.drain();

        // Node released (e.g. scrolled out of the window) and recycled.
        router.unsubscribe(NodeId(0));
        router.route(
            PointerSample {
                position_px: Some(Vec2::new(1.0, 1.0)),
                pressed: false,
                released: true,
            },
            Some(hit(0)),
        );
        assert!(router.drain().is_empty());
    }
}
