#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}

impl TileCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeFlags {
    pub left: bool,
    pub right: bool,
    pub top: bool,
    pub bottom: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Left,
    Right,
    Top,
    Bottom,
}

/// Result of moving the window one tile along an axis: the column/row index
/// whose nodes leave the window, and the index newly exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineShift {
    pub released: i32,
    pub exposed: i32,
}

/// The rectangle of tile coordinates currently backed by live nodes, plus
/// the sub-tile pixel pan accumulator and the per-edge buffered flags.
///
/// The rectangle always lies inside the map: `0 <= x`, `0 <= y`,
/// `x + width <= map_width`, `y + height <= map_height`. Every mutation
/// preserves that.
#[derive(Debug, Clone, PartialEq)]
pub struct TileWindow {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    map_width: i32,
    map_height: i32,
    pan_x: f32,
    pan_y: f32,
    buffered: EdgeFlags,
}

impl TileWindow {
    /// Builds a window from a requested rectangle, clamping the start into
    /// the map and the extent so the window never exceeds map bounds.
    pub fn clamped(
        start_x: i32,
        start_y: i32,
        tiles_x: i32,
        tiles_y: i32,
        map_width: u32,
        map_height: u32,
    ) -> Self {
        let map_width = map_width as i32;
        let map_height = map_height as i32;
        let x = start_x.clamp(0, map_width);
        let y = start_y.clamp(0, map_height);
        let width = tiles_x.max(0).min(map_width - x);
        let height = tiles_y.max(0).min(map_height - y);
        Self {
            x,
            y,
            width,
            height,
            map_width,
            map_height,
            pan_x: 0.0,
            pan_y: 0.0,
            buffered: EdgeFlags::default(),
        }
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn y(&self) -> i32 {
        self.y
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn left(&self) -> i32 {
        self.x
    }

    /// One past the last column.
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn top(&self) -> i32 {
        self.y
    }

    /// One past the last row.
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn contains(&self, coord: TileCoord) -> bool {
        coord.x >= self.x && coord.x < self.right() && coord.y >= self.y && coord.y < self.bottom()
    }

    pub fn coords(&self) -> impl Iterator<Item = TileCoord> {
        let (x0, x1, y0, y1) = (self.x, self.right(), self.y, self.bottom());
        (y0..y1).flat_map(move |y| (x0..x1).map(move |x| TileCoord { x, y }))
    }

    /// All coordinates of one column at the window's current row span. The
    /// column index is not required to lie inside the window, so callers can
    /// enumerate a column that just left it.
    pub fn column(&self, x: i32) -> impl Iterator<Item = TileCoord> {
        (self.y..self.bottom()).map(move |y| TileCoord { x, y })
    }

    pub fn row(&self, y: i32) -> impl Iterator<Item = TileCoord> {
        (self.x..self.right()).map(move |x| TileCoord { x, y })
    }

    pub fn pan_x(&self) -> f32 {
        self.pan_x
    }

    pub fn pan_y(&self) -> f32 {
        self.pan_y
    }

    pub fn set_pan(&mut self, pan_x: f32, pan_y: f32) {
        self.pan_x = pan_x;
        self.pan_y = pan_y;
    }

    pub fn accumulate(&mut self, dx: f32, dy: f32) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    pub fn consume_pan_x(&mut self, amount: f32) {
        self.pan_x -= amount;
    }

    pub fn consume_pan_y(&mut self, amount: f32) {
        self.pan_y -= amount;
    }

    pub fn buffered(&self) -> EdgeFlags {
        self.buffered
    }

    /// Picks the edge to pre-render for this pan delta, if any. At most one
    /// edge per call, horizontal before vertical, first unmet condition
    /// wins; a diagonal delta therefore buffers only its horizontal axis on
    /// the call that first sees it.
    pub fn next_buffer_edge(&self, dx: f32, dy: f32) -> Option<Edge> {
        if dx > 0.0 && !self.buffered.left {
            Some(Edge::Left)
        } else if dx < 0.0 && !self.buffered.right {
            Some(Edge::Right)
        } else if dy > 0.0 && !self.buffered.top {
            Some(Edge::Top)
        } else if dy < 0.0 && !self.buffered.bottom {
            Some(Edge::Bottom)
        } else {
            None
        }
    }

    pub fn mark_buffered(&mut self, edge: Edge) {
        match edge {
            Edge::Left => self.buffered.left = true,
            Edge::Right => self.buffered.right = true,
            Edge::Top => self.buffered.top = true,
            Edge::Bottom => self.buffered.bottom = true,
        }
    }

    /// Expands the window one tile past `edge`. Returns the index of the
    /// newly exposed column/row, or `None` when the window is already
    /// pinned at the map bound on that side.
    pub fn grow(&mut self, edge: Edge) -> Option<i32> {
        match edge {
            Edge::Left if self.x > 0 => {
                self.x -= 1;
                self.width += 1;
                Some(self.x)
            }
            Edge::Right if self.right() < self.map_width => {
                self.width += 1;
                Some(self.right() - 1)
            }
            Edge::Top if self.y > 0 => {
                self.y -= 1;
                self.height += 1;
                Some(self.y)
            }
            Edge::Bottom if self.bottom() < self.map_height => {
                self.height += 1;
                Some(self.bottom() - 1)
            }
            _ => None,
        }
    }

    pub fn shift_right(&mut self) -> Option<LineShift> {
        if self.width <= 0 || self.right() >= self.map_width {
            return None;
        }
        let released = self.x;
        self.x += 1;
        Some(LineShift {
            released,
            exposed: self.right() - 1,
        })
    }

    pub fn shift_left(&mut self) -> Option<LineShift> {
        if self.width <= 0 || self.x <= 0 {
            return None;
        }
        let released = self.right() - 1;
        self.x -= 1;
        Some(LineShift {
            released,
            exposed: self.x,
        })
    }

    pub fn shift_down(&mut self) -> Option<LineShift> {
        if self.height <= 0 || self.bottom() >= self.map_height {
            return None;
        }
        let released = self.y;
        self.y += 1;
        Some(LineShift {
            released,
            exposed: self.bottom() - 1,
        })
    }

    pub fn shift_up(&mut self) -> Option<LineShift> {
        if self.height <= 0 || self.y <= 0 {
            return None;
        }
        let released = self.bottom() - 1;
        self.y -= 1;
        Some(LineShift {
            released,
            exposed: self.y,
        })
    }
}
