//! Shared value types for the planeworks engine.

mod types;

pub use types::{CellCoord, DEFAULT_CELL_SIZE, ObjectId, WorldBounds, WorldObject};
