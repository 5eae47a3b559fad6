use crate::position::Position;

/// An axis-aligned box of blocks. Both corners are inclusive.
///
/// The only constructor normalizes its inputs, so `lesser <= greater` holds on
/// every axis no matter what order the corners arrive in.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Boundary {
    lesser: Position,
    greater: Position,
}

impl Boundary {
    pub fn new(a: Position, b: Position) -> Self {
        Self {
            lesser: a.min(b),
            greater: a.max(b),
        }
    }

    pub fn lesser(&self) -> Position {
        self.lesser
    }

    pub fn greater(&self) -> Position {
        self.greater
    }

    /// With `include_border` a point on any face counts as inside; without it
    /// only strictly interior points do.
    pub fn contains(&self, pos: Position, include_border: bool) -> bool {
        if include_border {
            self.lesser.x <= pos.x
                && pos.x <= self.greater.x
                && self.lesser.y <= pos.y
                && pos.y <= self.greater.y
                && self.lesser.z <= pos.z
                && pos.z <= self.greater.z
        } else {
            self.lesser.x < pos.x
                && pos.x < self.greater.x
                && self.lesser.y < pos.y
                && pos.y < self.greater.y
                && self.lesser.z < pos.z
                && pos.z < self.greater.z
        }
    }

    /// True when the two boxes share at least one block.
    pub fn intersects(&self, other: &Boundary) -> bool {
        self.lesser.x <= other.greater.x
            && other.lesser.x <= self.greater.x
            && self.lesser.y <= other.greater.y
            && other.lesser.y <= self.greater.y
            && self.lesser.z <= other.greater.z
            && other.lesser.z <= self.greater.z
    }

    /// True when `other` lies entirely within this box, faces included.
    pub fn encloses(&self, other: &Boundary) -> bool {
        self.contains(other.lesser, true) && self.contains(other.greater, true)
    }

    pub fn width(&self) -> u64 {
        (i64::from(self.greater.x) - i64::from(self.lesser.x) + 1) as u64
    }

    pub fn height(&self) -> u64 {
        (i64::from(self.greater.y) - i64::from(self.lesser.y) + 1) as u64
    }

    pub fn length(&self) -> u64 {
        (i64::from(self.greater.z) - i64::from(self.lesser.z) + 1) as u64
    }

    /// Horizontal footprint in blocks; what claim-block accounting charges.
    pub fn area(&self) -> u64 {
        self.width().saturating_mul(self.length())
    }

    pub fn volume(&self) -> u64 {
        self.area().saturating_mul(self.height())
    }

    /// How many chunk columns the box touches.
    pub fn chunk_span(&self) -> u64 {
        let (min_cx, min_cz) = self.lesser.chunk();
        let (max_cx, max_cz) = self.greater.chunk();
        let columns = (i64::from(max_cx) - i64::from(min_cx) + 1) as u64;
        let rows = (i64::from(max_cz) - i64::from(min_cz) + 1) as u64;
        columns.saturating_mul(rows)
    }

    /// Every chunk column the box touches, in x-major order.
    pub fn chunks(&self) -> impl Iterator<Item = (i32, i32)> + use<> {
        let (min_cx, min_cz) = self.lesser.chunk();
        let (max_cx, max_cz) = self.greater.chunk();
        (min_cx..=max_cx).flat_map(move |cx| (min_cz..=max_cz).map(move |cz| (cx, cz)))
    }
}
