use planeworks_common::CellCoord;
use planeworks_stream::ChunkManager;

/// ASCII map of the chunk grid for HUD and CLI output.
///
/// One character per cell, one line per row:
/// `#` visible with objects, `+` visible and empty, `.` hidden with objects,
/// space for hidden and empty. Grids larger than the limits are cropped to
/// the top-left corner.
#[derive(Debug, Clone, Copy)]
pub struct GridOverlay {
    pub max_rows: usize,
    pub max_columns: usize,
}

impl Default for GridOverlay {
    fn default() -> Self {
        Self {
            max_rows: 48,
            max_columns: 96,
        }
    }
}

impl GridOverlay {
    pub fn render(&self, chunks: &ChunkManager) -> String {
        let rows = chunks.rows().min(self.max_rows);
        let columns = chunks.columns().min(self.max_columns);

        let mut out = String::with_capacity((columns + 3) * (rows + 2));
        let border = format!("+{}+\n", "-".repeat(columns));
        out.push_str(&border);
        for row in 0..rows {
            out.push('|');
            for column in 0..columns {
                let coord = CellCoord::new(row as i32, column as i32);
                let populated = chunks.cell(coord).is_some_and(|c| !c.is_empty());
                let glyph = match (chunks.is_visible(coord), populated) {
                    (true, true) => '#',
                    (true, false) => '+',
                    (false, true) => '.',
                    (false, false) => ' ',
                };
                out.push(glyph);
            }
            out.push_str("|\n");
        }
        out.push_str(&border);

        if rows < chunks.rows() || columns < chunks.columns() {
            out.push_str(&format!(
                "(cropped to {rows}x{columns} of {}x{})\n",
                chunks.rows(),
                chunks.columns()
            ));
        }
        out
    }
}

/// Render `chunks` with the default [`GridOverlay`] limits.
pub fn grid_overlay(chunks: &ChunkManager) -> String {
    GridOverlay::default().render(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use planeworks_common::{ObjectId, WorldBounds, WorldObject};
    use planeworks_stream::Viewport;

    struct Pin(ObjectId, Vec2);

    impl WorldObject for Pin {
        fn id(&self) -> ObjectId {
            self.0
        }

        fn position(&self) -> Vec2 {
            self.1
        }
    }

    #[test]
    fn overlay_marks_visibility_and_population() {
        let mut chunks = ChunkManager::with_bounds(WorldBounds::new(1500, 1000), 500).unwrap();
        let pins = vec![
            Pin(ObjectId::new(), Vec2::new(10.0, 10.0)),
            Pin(ObjectId::new(), Vec2::new(1200.0, 800.0)),
        ];
        chunks.partition(&pins);
        chunks.scan(&Viewport::unzoomed(Vec2::ZERO, Vec2::new(1000.0, 500.0)).unwrap());

        let text = grid_overlay(&chunks);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["+---+", "|#+ |", "|  .|", "+---+"]);
    }

    #[test]
    fn overlay_crops_large_grids() {
        let chunks = ChunkManager::with_bounds(WorldBounds::new(10_000, 10_000), 100).unwrap();
        let overlay = GridOverlay {
            max_rows: 4,
            max_columns: 8,
        };
        let text = overlay.render(&chunks);
        assert_eq!(text.lines().count(), 4 + 2 + 1);
        assert!(text.contains("cropped to 4x8 of 100x100"));
    }
}
