use glam::Vec2;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Side length, in world pixels, of one grid cell unless a world asks for another.
pub const DEFAULT_CELL_SIZE: u32 = 500;

/// Unique identifier for an object in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub Uuid);

impl ObjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, for logs and overlays.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.short())
    }
}

/// A row/column cell coordinate. Rows run along world Y, columns along world X.
///
/// Coordinates are signed: a position left of or above the world origin maps
/// to a negative cell, which no grid contains.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct CellCoord {
    pub row: i32,
    pub column: i32,
}

impl CellCoord {
    pub fn new(row: i32, column: i32) -> Self {
        Self { row, column }
    }

    /// Cell containing a world position, flooring toward negative infinity.
    ///
    /// Non-finite positions map to `i32::MIN` on both axes so they never land
    /// inside a grid.
    pub fn from_position(position: Vec2, cell_size: u32) -> Self {
        if !position.is_finite() {
            return Self::new(i32::MIN, i32::MIN);
        }
        let size = cell_size as f32;
        Self {
            row: (position.y / size).floor() as i32,
            column: (position.x / size).floor() as i32,
        }
    }

    /// Chebyshev distance: 1 for all eight neighbors.
    pub fn chebyshev(&self, other: CellCoord) -> u32 {
        let dr = (self.row as i64 - other.row as i64).unsigned_abs();
        let dc = (self.column as i64 - other.column as i64).unsigned_abs();
        dr.max(dc) as u32
    }
}

impl std::fmt::Display for CellCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// Pixel extent of a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldBounds {
    pub width: u32,
    pub height: u32,
}

impl WorldBounds {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, position: Vec2) -> bool {
        position.x >= 0.0
            && position.y >= 0.0
            && position.x < self.width as f32
            && position.y < self.height as f32
    }
}

/// Anything with a position in the world.
///
/// The chunking layer only ever sees objects through this trait: an id to put
/// in buckets and queues, and a position to bucket by.
pub trait WorldObject {
    fn id(&self) -> ObjectId;

    fn position(&self) -> Vec2;

    /// Cell this object occupies for the given cell size.
    fn cell(&self, cell_size: u32) -> CellCoord {
        CellCoord::from_position(self.position(), cell_size)
    }
}
