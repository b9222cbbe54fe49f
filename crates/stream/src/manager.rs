use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use glam::Vec2;
use planeworks_common::{CellCoord, ObjectId, WorldBounds, WorldObject};
use serde::Serialize;

use crate::cell::{GridCell, neighbor_coords};
use crate::queue::{LifecycleAction, LifecycleQueues, PendingQueue, RenderQueues};
use crate::viewport::Viewport;

/// Errors from grid construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("world must have non-zero extent, got {width}x{height}")]
    DegenerateWorld { width: u32, height: u32 },
    #[error("cell size must be positive")]
    ZeroCellSize,
    #[error("grid of {rows}x{columns} cells is too large")]
    TooLarge { rows: u32, columns: u32 },
}

/// Result of one partition pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PartitionStats {
    pub placed: usize,
    pub out_of_grid: usize,
}

/// Cells that entered and left the visible set during one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanDiff {
    pub shown: Vec<CellCoord>,
    pub hidden: Vec<CellCoord>,
}

impl ScanDiff {
    pub fn is_empty(&self) -> bool {
        self.shown.is_empty() && self.hidden.is_empty()
    }
}

/// Statistics from the last scan, for instrumentation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanStats {
    pub cells_shown: usize,
    pub cells_hidden: usize,
    pub visible_cells: usize,
    pub objects_allocated: usize,
    pub objects_released: usize,
    pub scan_time: Duration,
}

/// Owns the grid of a chunked world and its visibility lifecycle.
///
/// Every tick the world hands its objects to [`ChunkManager::partition`],
/// which buckets each one into exactly one cell, then calls
/// [`ChunkManager::scan`] with the active viewport. The scan diffs the new
/// visible set against the previous one and queues the objects of cells that
/// changed state. The render thread drains those queues through
/// [`ChunkManager::render_queues`].
#[derive(Debug)]
pub struct ChunkManager {
    cell_size: u32,
    rows: i32,
    columns: i32,
    cells: Vec<GridCell>,
    visible: BTreeSet<CellCoord>,
    queues: LifecycleQueues,
    last_partition: PartitionStats,
    stats: ScanStats,
}

impl ChunkManager {
    /// Create an empty manager. Call [`ChunkManager::initialize`] before use.
    pub fn new(cell_size: u32) -> Self {
        Self {
            cell_size,
            rows: 0,
            columns: 0,
            cells: Vec::new(),
            visible: BTreeSet::new(),
            queues: LifecycleQueues::new(),
            last_partition: PartitionStats::default(),
            stats: ScanStats::default(),
        }
    }

    /// Create and initialize in one step.
    pub fn with_bounds(bounds: WorldBounds, cell_size: u32) -> Result<Self, GridError> {
        let mut manager = Self::new(cell_size);
        manager.initialize(bounds)?;
        Ok(manager)
    }

    /// Build the grid and neighbor graph for a world of the given size.
    ///
    /// Calling this again discards the previous grid, the visible set and
    /// anything still queued, and rebuilds an identical grid.
    pub fn initialize(&mut self, bounds: WorldBounds) -> Result<(), GridError> {
        if self.cell_size == 0 {
            return Err(GridError::ZeroCellSize);
        }
        if bounds.width == 0 || bounds.height == 0 {
            return Err(GridError::DegenerateWorld {
                width: bounds.width,
                height: bounds.height,
            });
        }

        let rows_u = bounds.height.div_ceil(self.cell_size);
        let columns_u = bounds.width.div_ceil(self.cell_size);
        let too_large = GridError::TooLarge {
            rows: rows_u,
            columns: columns_u,
        };
        let rows = i32::try_from(rows_u).map_err(|_| too_large.clone())?;
        let columns = i32::try_from(columns_u).map_err(|_| too_large.clone())?;
        let count = (rows_u as usize)
            .checked_mul(columns_u as usize)
            .ok_or_else(|| too_large.clone())?;

        let mut cells = Vec::new();
        cells.try_reserve_exact(count).map_err(|_| too_large)?;
        for row in 0..rows {
            for column in 0..columns {
                cells.push(GridCell::new(
                    CellCoord::new(row, column),
                    neighbor_coords(row, column, rows, columns),
                ));
            }
        }

        self.rows = rows;
        self.columns = columns;
        self.cells = cells;
        self.visible.clear();
        let dropped = self.queues.clear();
        self.last_partition = PartitionStats::default();
        self.stats = ScanStats::default();

        tracing::debug!(
            rows,
            columns,
            cell_size = self.cell_size,
            dropped,
            "chunk grid initialized"
        );
        Ok(())
    }

    pub fn cell_size(&self) -> u32 {
        self.cell_size
    }

    pub fn rows(&self) -> usize {
        self.rows as usize
    }

    pub fn columns(&self) -> usize {
        self.columns as usize
    }

    fn index_of(&self, coord: CellCoord) -> Option<usize> {
        if coord.row < 0
            || coord.column < 0
            || coord.row >= self.rows
            || coord.column >= self.columns
        {
            return None;
        }
        Some(coord.row as usize * self.columns as usize + coord.column as usize)
    }

    pub fn contains(&self, coord: CellCoord) -> bool {
        self.index_of(coord).is_some()
    }

    pub fn cell(&self, coord: CellCoord) -> Option<&GridCell> {
        self.index_of(coord).map(|i| &self.cells[i])
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    /// Grid cell containing `position`, if it lies inside the grid.
    pub fn cell_of(&self, position: Vec2) -> Option<CellCoord> {
        let coord = CellCoord::from_position(position, self.cell_size);
        self.contains(coord).then_some(coord)
    }

    /// Rebucket every object into the cell its position falls in.
    ///
    /// Objects whose cell lies outside the grid go into no bucket and are
    /// queued for release. Calling this twice without movement in between
    /// yields the same buckets.
    pub fn partition<'a, O, I>(&mut self, objects: I) -> PartitionStats
    where
        O: WorldObject + ?Sized + 'a,
        I: IntoIterator<Item = &'a O>,
    {
        let _span = tracing::info_span!("partition").entered();

        for cell in &mut self.cells {
            cell.clear();
        }

        let mut stats = PartitionStats::default();
        for object in objects {
            let id = object.id();
            let coord = object.cell(self.cell_size);
            match self.index_of(coord) {
                Some(i) => {
                    self.cells[i].add_object(id);
                    stats.placed += 1;
                }
                None => {
                    tracing::warn!(
                        object = %id,
                        cell = %coord,
                        rows = self.rows,
                        columns = self.columns,
                        "object outside grid, queueing release"
                    );
                    self.queues.push(LifecycleAction::Release, id);
                    stats.out_of_grid += 1;
                }
            }
        }

        tracing::trace!(
            placed = stats.placed,
            out_of_grid = stats.out_of_grid,
            "partition complete"
        );
        self.last_partition = stats;
        stats
    }

    /// Recompute the visible set for `viewport` and queue lifecycle work for
    /// the cells that changed.
    ///
    /// Objects of cells that left the set are queued for release, objects of
    /// cells that entered it for allocation. Cells visible both before and
    /// after queue nothing.
    pub fn scan(&mut self, viewport: &Viewport) -> ScanDiff {
        let _span = tracing::info_span!("scan").entered();
        let scan_start = Instant::now();

        let next = self.visible_in(viewport);

        let hidden: Vec<CellCoord> = self.visible.difference(&next).copied().collect();
        let shown: Vec<CellCoord> = next.difference(&self.visible).copied().collect();

        let mut released = 0;
        for coord in &hidden {
            self.visible.remove(coord);
            if let Some(cell) = self.cell(*coord) {
                for id in cell.objects() {
                    self.queues.push(LifecycleAction::Release, *id);
                }
                released += cell.len();
            }
            tracing::debug!(cell = %coord, "cell hidden");
        }

        let mut allocated = 0;
        for coord in &shown {
            self.visible.insert(*coord);
            if let Some(cell) = self.cell(*coord) {
                for id in cell.objects() {
                    self.queues.push(LifecycleAction::Allocate, *id);
                }
                allocated += cell.len();
            }
            tracing::debug!(cell = %coord, "cell shown");
        }

        self.stats = ScanStats {
            cells_shown: shown.len(),
            cells_hidden: hidden.len(),
            visible_cells: self.visible.len(),
            objects_allocated: allocated,
            objects_released: released,
            scan_time: scan_start.elapsed(),
        };

        tracing::trace!(
            shown = shown.len(),
            hidden = hidden.len(),
            visible = self.visible.len(),
            "scan complete"
        );

        ScanDiff { shown, hidden }
    }

    /// Grid cells overlapped by `viewport`. Cells beyond the grid are skipped.
    fn visible_in(&self, viewport: &Viewport) -> BTreeSet<CellCoord> {
        let rows = viewport.row_range(self.cell_size);
        let columns = viewport.column_range(self.cell_size);

        let row_from = (*rows.start()).max(0);
        let row_to = (*rows.end()).min(self.rows - 1);
        let column_from = (*columns.start()).max(0);
        let column_to = (*columns.end()).min(self.columns - 1);

        let mut out = BTreeSet::new();
        for row in row_from..=row_to {
            for column in column_from..=column_to {
                out.insert(CellCoord::new(row, column));
            }
        }
        out
    }

    /// Queue `id` for allocation outside the regular scan.
    pub fn flag_for_allocation(&self, id: ObjectId) {
        tracing::debug!(object = %id, "flagged for allocation");
        self.queues.push(LifecycleAction::Allocate, id);
    }

    /// Queue `id` for release outside the regular scan.
    pub fn flag_for_release(&self, id: ObjectId) {
        tracing::debug!(object = %id, "flagged for release");
        self.queues.push(LifecycleAction::Release, id);
    }

    pub fn pending_allocations(&self) -> &PendingQueue {
        self.queues.allocations()
    }

    pub fn pending_releases(&self) -> &PendingQueue {
        self.queues.releases()
    }

    /// Consumer handle for the render thread.
    pub fn render_queues(&self) -> RenderQueues {
        self.queues.render_handle()
    }

    pub fn is_visible(&self, coord: CellCoord) -> bool {
        self.visible.contains(&coord)
    }

    /// Whether `position` lies in a currently visible cell.
    pub fn is_position_visible(&self, position: Vec2) -> bool {
        self.cell_of(position).is_some_and(|c| self.is_visible(c))
    }

    /// Snapshot of the visible cells, in row-major order.
    pub fn visible_cells(&self) -> impl Iterator<Item = &GridCell> + '_ {
        self.visible.iter().filter_map(|c| self.cell(*c))
    }

    pub fn visible_coords(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.visible.iter().copied()
    }

    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }

    /// Put a newly added object into the bucket for `position`.
    ///
    /// Returns the cell it went into, or `None` if the position is outside
    /// the grid.
    pub fn insert_object(&mut self, id: ObjectId, position: Vec2) -> Option<CellCoord> {
        let coord = self.cell_of(position)?;
        let i = self.index_of(coord)?;
        self.cells[i].add_object(id);
        Some(coord)
    }

    /// Take an object out of its bucket.
    ///
    /// Looks in the cell for `position` first. An object that moved since the
    /// last partition still sits in its old bucket, so fall back to a full
    /// search. Returns the cell it was removed from.
    pub fn remove_object(&mut self, id: ObjectId, position: Vec2) -> Option<CellCoord> {
        if let Some(i) = self.cell_of(position).and_then(|c| self.index_of(c)) {
            if self.cells[i].remove_object(id) {
                return Some(self.cells[i].coord());
            }
        }
        self.cells
            .iter_mut()
            .find_map(|cell| cell.remove_object(id).then(|| cell.coord()))
    }

    /// Total objects across all buckets.
    pub fn total_placements(&self) -> usize {
        self.cells.iter().map(GridCell::len).sum()
    }

    pub fn last_partition(&self) -> PartitionStats {
        self.last_partition
    }

    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }
}
