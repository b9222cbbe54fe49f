use planeworks_common::{CellCoord, ObjectId};

/// One fixed-size bucket of the grid.
///
/// The coordinate and neighbor list are set when the grid is built and never
/// change afterward. The object bucket is cleared and refilled on every
/// partition pass.
#[derive(Debug, Clone)]
pub struct GridCell {
    coord: CellCoord,
    neighbors: Vec<CellCoord>,
    objects: Vec<ObjectId>,
}

impl GridCell {
    pub(crate) fn new(coord: CellCoord, neighbors: Vec<CellCoord>) -> Self {
        Self {
            coord,
            neighbors,
            objects: Vec::new(),
        }
    }

    pub fn coord(&self) -> CellCoord {
        self.coord
    }

    pub fn row(&self) -> i32 {
        self.coord.row
    }

    pub fn column(&self) -> i32 {
        self.coord.column
    }

    /// Empty the per-tick bucket. Neighbors are untouched.
    pub fn clear(&mut self) {
        self.objects.clear();
    }

    /// Append an object. The caller has already decided it belongs here.
    pub fn add_object(&mut self, id: ObjectId) {
        self.objects.push(id);
    }

    /// Drop one occurrence of `id` from the bucket. Returns whether it was present.
    pub(crate) fn remove_object(&mut self, id: ObjectId) -> bool {
        match self.objects.iter().position(|o| *o == id) {
            Some(i) => {
                self.objects.swap_remove(i);
                true
            }
            None => false,
        }
    }

    pub fn neighbors(&self) -> &[CellCoord] {
        &self.neighbors
    }

    pub fn objects(&self) -> &[ObjectId] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// Neighbors of `(row, column)` in a `rows` x `columns` grid, omitting
/// directions that fall outside it.
pub(crate) fn neighbor_coords(row: i32, column: i32, rows: i32, columns: i32) -> Vec<CellCoord> {
    let has_up = row > 0;
    let has_down = row + 1 < rows;
    let has_left = column > 0;
    let has_right = column + 1 < columns;

    let mut out = Vec::with_capacity(8);
    if has_up {
        out.push(CellCoord::new(row - 1, column));
        if has_left {
            out.push(CellCoord::new(row - 1, column - 1));
        }
        if has_right {
            out.push(CellCoord::new(row - 1, column + 1));
        }
    }
    if has_down {
        out.push(CellCoord::new(row + 1, column));
        if has_left {
            out.push(CellCoord::new(row + 1, column - 1));
        }
        if has_right {
            out.push(CellCoord::new(row + 1, column + 1));
        }
    }
    if has_left {
        out.push(CellCoord::new(row, column - 1));
    }
    if has_right {
        out.push(CellCoord::new(row, column + 1));
    }
    out
}
