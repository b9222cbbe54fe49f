use planeworks_common::{CellCoord, ObjectId, WorldObject};
use planeworks_kernel::World;
use serde::Serialize;

/// Plane inspector for developer tooling.
///
/// Read-only queries against the world and its chunk manager for debugging,
/// profiling and HUD overlays.
pub struct PlaneInspector;

impl PlaneInspector {
    /// Produce a summary of the world state.
    pub fn summary(world: &World) -> PlaneSummary {
        let bounds = world.bounds();
        let mut summary = PlaneSummary {
            tick: world.tick(),
            width: bounds.width,
            height: bounds.height,
            object_count: world.object_count(),
            staged: world.staged().len(),
            grid: None,
        };
        if let Some(chunks) = world.chunks() {
            summary.grid = Some(GridSummary {
                rows: chunks.rows(),
                columns: chunks.columns(),
                cell_size: chunks.cell_size(),
                visible_cells: chunks.visible_count(),
                placed_objects: chunks.total_placements(),
                pending_allocations: chunks.pending_allocations().len(),
                pending_releases: chunks.pending_releases().len(),
            });
        }
        summary
    }

    /// Look up one object, including the grid cell it maps to.
    pub fn inspect_object(world: &World, id: ObjectId) -> Option<ObjectInfo> {
        world.get(id).map(|object| {
            let p = object.position();
            let cell = world.chunks().and_then(|c| c.cell_of(p));
            ObjectInfo {
                id,
                name: object.name.clone(),
                position: [p.x, p.y],
                velocity: [object.velocity.x, object.velocity.y],
                cell,
                visible: cell
                    .zip(world.chunks())
                    .is_some_and(|(c, chunks)| chunks.is_visible(c)),
            }
        })
    }

    /// List all object ids in the world.
    pub fn list_objects(world: &World) -> Vec<ObjectId> {
        world.objects().keys().copied().collect()
    }
}

/// Grid part of a [`PlaneSummary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridSummary {
    pub rows: usize,
    pub columns: usize,
    pub cell_size: u32,
    pub visible_cells: usize,
    pub placed_objects: usize,
    pub pending_allocations: usize,
    pub pending_releases: usize,
}

/// Summary of world state for the inspector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaneSummary {
    pub tick: u64,
    pub width: u32,
    pub height: u32,
    pub object_count: usize,
    pub staged: usize,
    /// `None` for unchunked worlds.
    pub grid: Option<GridSummary>,
}

impl std::fmt::Display for PlaneSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Plane: tick={} size={}x{} objects={} staged={}",
            self.tick, self.width, self.height, self.object_count, self.staged
        )?;
        match &self.grid {
            Some(g) => write!(
                f,
                " grid={}x{}@{} visible={} pending_alloc={} pending_release={}",
                g.rows,
                g.columns,
                g.cell_size,
                g.visible_cells,
                g.pending_allocations,
                g.pending_releases
            ),
            None => write!(f, " unchunked"),
        }
    }
}

/// Detailed info about a single object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectInfo {
    pub id: ObjectId,
    pub name: String,
    pub position: [f32; 2],
    pub velocity: [f32; 2],
    pub cell: Option<CellCoord>,
    pub visible: bool,
}

impl std::fmt::Display for ObjectInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Object [{}] {} pos=({:.2}, {:.2}) vel=({:.2}, {:.2})",
            self.id,
            self.name,
            self.position[0],
            self.position[1],
            self.velocity[0],
            self.velocity[1],
        )?;
        match self.cell {
            Some(c) if self.visible => write!(f, " cell={c} visible"),
            Some(c) => write!(f, " cell={c}"),
            None => write!(f, " off-grid"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use planeworks_common::WorldBounds;
    use planeworks_kernel::GameObject;
    use planeworks_stream::Viewport;

    #[test]
    fn summary_unchunked_world() {
        let world = World::new(WorldBounds::new(800, 600));
        let summary = PlaneInspector::summary(&world);
        assert_eq!(summary.tick, 0);
        assert_eq!(summary.object_count, 0);
        assert!(summary.grid.is_none());
        assert!(summary.to_string().contains("unchunked"));
    }

    #[test]
    fn summary_chunked_world() {
        let mut world = World::chunked(WorldBounds::new(1500, 1000), 500).unwrap();
        world.add_object(GameObject::new("a", Vec2::new(10.0, 10.0)));
        world.add_object(GameObject::new("b", Vec2::new(1200.0, 900.0)));
        world.step(&Viewport::unzoomed(Vec2::ZERO, Vec2::new(500.0, 500.0)).unwrap());

        let summary = PlaneInspector::summary(&world);
        let grid = summary.grid.clone().unwrap();
        assert_eq!((grid.rows, grid.columns), (2, 3));
        assert_eq!(grid.visible_cells, 1);
        assert_eq!(grid.placed_objects, 2);
        assert_eq!(grid.pending_allocations, 1);
        assert_eq!(summary.staged, 1);

        let s = summary.to_string();
        assert!(s.contains("tick=1"));
        assert!(s.contains("grid=2x3@500"));

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["grid"]["rows"], 2);
    }

    #[test]
    fn inspect_object_reports_cell_and_visibility() {
        let mut world = World::chunked(WorldBounds::new(1000, 1000), 500).unwrap();
        let id = world.add_object(GameObject::new("crate", Vec2::new(600.0, 100.0)));
        world.step(&Viewport::unzoomed(Vec2::ZERO, Vec2::new(1000.0, 500.0)).unwrap());

        let info = PlaneInspector::inspect_object(&world, id).unwrap();
        assert_eq!(info.position, [600.0, 100.0]);
        assert_eq!(info.cell, Some(CellCoord::new(0, 1)));
        assert!(info.visible);
        assert!(info.to_string().contains("visible"));
    }

    #[test]
    fn inspect_object_not_found() {
        let world = World::new(WorldBounds::new(10, 10));
        assert!(PlaneInspector::inspect_object(&world, ObjectId::new()).is_none());
    }

    #[test]
    fn list_objects() {
        let mut world = World::new(WorldBounds::new(100, 100));
        let id1 = world.add_object(GameObject::new("a", Vec2::ZERO));
        let id2 = world.add_object(GameObject::new("b", Vec2::ONE));

        let ids = PlaneInspector::list_objects(&world);
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&id1));
        assert!(ids.contains(&id2));
    }
}
