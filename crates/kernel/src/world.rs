use std::collections::BTreeMap;

use glam::Vec2;
use planeworks_common::{ObjectId, WorldBounds, WorldObject};
use planeworks_stream::{ChunkManager, GridError, PartitionStats, Viewport};
use serde::Serialize;

use crate::object::GameObject;

/// Errors from world operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("chunk grid error: {0}")]
    Grid(#[from] GridError),
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),
}

/// An object handed to the render pipeline for the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StagedObject {
    pub id: ObjectId,
    pub position: Vec2,
}

/// What one call to [`World::step`] did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub updated: usize,
    pub staged: usize,
    /// `None` for worlds without a chunk manager.
    pub partition: Option<PartitionStats>,
    pub cells_shown: usize,
    pub cells_hidden: usize,
}

/// The playable plane: all objects plus, optionally, a chunk manager.
///
/// With a chunk manager attached, each tick only objects in cells visible
/// through the viewport are updated and staged. Objects off camera do not
/// tick. Without one, every object is updated and staged.
///
/// Objects are kept in a BTreeMap for deterministic iteration order.
#[derive(Debug)]
pub struct World {
    bounds: WorldBounds,
    objects: BTreeMap<ObjectId, GameObject>,
    tick: u64,
    chunks: Option<ChunkManager>,
    staged: Vec<StagedObject>,
}

impl World {
    /// Create an empty world without chunking.
    pub fn new(bounds: WorldBounds) -> Self {
        Self {
            bounds,
            objects: BTreeMap::new(),
            tick: 0,
            chunks: None,
            staged: Vec::new(),
        }
    }

    /// Create an empty world with a chunk manager of the given cell size.
    pub fn chunked(bounds: WorldBounds, cell_size: u32) -> Result<Self, WorldError> {
        let mut world = Self::new(bounds);
        world.attach_chunk_manager(cell_size)?;
        Ok(world)
    }

    /// Attach a freshly initialized chunk manager and bucket the existing
    /// objects into it. Replaces any manager already attached.
    pub fn attach_chunk_manager(&mut self, cell_size: u32) -> Result<(), WorldError> {
        let mut manager = ChunkManager::with_bounds(self.bounds, cell_size)?;
        manager.partition(self.objects.values());
        tracing::info!(
            rows = manager.rows(),
            columns = manager.columns(),
            cell_size,
            "chunk manager attached"
        );
        self.chunks = Some(manager);
        Ok(())
    }

    /// Detach the chunk manager, turning this into an unchunked world.
    pub fn detach_chunk_manager(&mut self) -> Option<ChunkManager> {
        self.chunks.take()
    }

    pub fn is_chunked(&self) -> bool {
        self.chunks.is_some()
    }

    pub fn chunks(&self) -> Option<&ChunkManager> {
        self.chunks.as_ref()
    }

    pub fn bounds(&self) -> WorldBounds {
        self.bounds
    }

    /// Current simulation tick.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn objects(&self) -> &BTreeMap<ObjectId, GameObject> {
        &self.objects
    }

    pub fn get(&self, id: ObjectId) -> Option<&GameObject> {
        self.objects.get(&id)
    }

    /// Add an object and bucket it right away.
    ///
    /// An object landing in a visible cell is flagged for allocation, since
    /// no scan will report that cell as newly visible. Adding an object whose
    /// id is already present replaces it, and the old copy leaves its bucket.
    pub fn add_object(&mut self, object: GameObject) -> ObjectId {
        let id = object.id();
        let position = object.position();
        let previous = self.objects.insert(id, object);

        if let Some(chunks) = &mut self.chunks {
            let was_visible = match &previous {
                Some(old) => {
                    chunks.remove_object(id, old.position());
                    chunks.is_position_visible(old.position())
                }
                None => false,
            };
            if chunks.insert_object(id, position).is_none() {
                tracing::warn!(object = %id, ?position, "object added outside grid");
            }
            flag_crossing(chunks, id, was_visible, chunks.is_position_visible(position));
        }
        id
    }

    /// Remove an object from the world and its bucket, flagging its GPU
    /// resources for release.
    pub fn remove_object(&mut self, id: ObjectId) -> Option<GameObject> {
        let object = self.objects.remove(&id)?;
        if let Some(chunks) = &mut self.chunks {
            chunks.remove_object(id, object.position());
            chunks.flag_for_release(id);
        }
        Some(object)
    }

    /// Move an object by `delta`. Returns its new position.
    pub fn move_object(&mut self, id: ObjectId, delta: Vec2) -> Result<Vec2, WorldError> {
        let current = self
            .objects
            .get(&id)
            .ok_or(WorldError::ObjectNotFound(id))?
            .position();
        self.set_position(id, current + delta)
    }

    /// Place an object at `position`.
    ///
    /// If that takes it from a visible cell to a hidden one (or the reverse)
    /// it is flagged right away instead of waiting for the next scan. Buckets
    /// are left alone until the next partition.
    pub fn set_position(&mut self, id: ObjectId, position: Vec2) -> Result<Vec2, WorldError> {
        let object = self
            .objects
            .get_mut(&id)
            .ok_or(WorldError::ObjectNotFound(id))?;
        relocate(self.chunks.as_ref(), object, position);
        Ok(position)
    }

    /// Advance the simulation by one tick.
    ///
    /// Chunked worlds run partition, then scan against `viewport`, then update
    /// and stage the objects of every visible cell. Unchunked worlds update
    /// and stage every object and ignore the viewport.
    pub fn step(&mut self, viewport: &Viewport) -> TickReport {
        self.tick += 1;
        let _span = tracing::info_span!("world_step", tick = self.tick).entered();

        let mut report = TickReport {
            tick: self.tick,
            ..TickReport::default()
        };

        let active: Vec<ObjectId> = match &mut self.chunks {
            Some(chunks) => {
                report.partition = Some(chunks.partition(self.objects.values()));
                let diff = chunks.scan(viewport);
                report.cells_shown = diff.shown.len();
                report.cells_hidden = diff.hidden.len();
                chunks
                    .visible_cells()
                    .flat_map(|cell| cell.objects().iter().copied())
                    .collect()
            }
            None => self.objects.keys().copied().collect(),
        };

        for id in &active {
            let Some(object) = self.objects.get_mut(id) else {
                continue;
            };
            if object.velocity != Vec2::ZERO {
                let next = object.position() + object.velocity;
                relocate(self.chunks.as_ref(), object, next);
            }
        }
        report.updated = active.len();

        for id in &active {
            let Some(object) = self.objects.get(id) else {
                continue;
            };
            // skip objects that walked off camera during their update
            let on_camera = self
                .chunks
                .as_ref()
                .is_none_or(|chunks| chunks.is_position_visible(object.position()));
            if on_camera {
                self.staged.push(StagedObject {
                    id: *id,
                    position: object.position(),
                });
                report.staged += 1;
            }
        }

        tracing::trace!(
            updated = report.updated,
            staged = report.staged,
            shown = report.cells_shown,
            hidden = report.cells_hidden,
            "tick complete"
        );
        report
    }

    /// Take everything staged since the last call.
    pub fn drain_staged(&mut self) -> Vec<StagedObject> {
        std::mem::take(&mut self.staged)
    }

    pub fn staged(&self) -> &[StagedObject] {
        &self.staged
    }

    /// Spawn `count` objects at deterministic pseudo-random positions inside
    /// the world, each drifting at up to `max_speed` pixels per tick.
    pub fn scatter_objects(&mut self, count: usize, max_speed: f32, seed: u64) -> Vec<ObjectId> {
        let mut state = seed;
        let mut next_unit = || {
            state = splitmix64(state);
            (state >> 40) as f32 / (1u64 << 24) as f32
        };

        let mut ids = Vec::with_capacity(count);
        for i in 0..count {
            let position = Vec2::new(
                next_unit() * self.bounds.width as f32,
                next_unit() * self.bounds.height as f32,
            );
            let velocity = Vec2::new(next_unit() * 2.0 - 1.0, next_unit() * 2.0 - 1.0) * max_speed;
            let object = GameObject::new(format!("object-{i}"), position).with_velocity(velocity);
            ids.push(self.add_object(object));
        }
        ids
    }
}

/// Move `object` to `position`, flagging it if that crosses between a
/// visible and a hidden cell. Buckets are left for the next partition.
fn relocate(chunks: Option<&ChunkManager>, object: &mut GameObject, position: Vec2) {
    let old = object.position();
    object.set_position(position);
    if let Some(chunks) = chunks {
        flag_crossing(
            chunks,
            object.id(),
            chunks.is_position_visible(old),
            chunks.is_position_visible(position),
        );
    }
}

fn flag_crossing(chunks: &ChunkManager, id: ObjectId, was_visible: bool, now_visible: bool) {
    match (was_visible, now_visible) {
        (false, true) => chunks.flag_for_allocation(id),
        (true, false) => chunks.flag_for_release(id),
        _ => {}
    }
}

/// Splitmix64 step, used for reproducible object placement.
fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use planeworks_common::CellCoord;

    fn bounds() -> WorldBounds {
        WorldBounds::new(1500, 1500)
    }

    fn viewport(x: f32, y: f32, w: f32, h: f32) -> Viewport {
        Viewport::unzoomed(Vec2::new(x, y), Vec2::new(w, h)).unwrap()
    }

    fn chunks(world: &World) -> &ChunkManager {
        world.chunks().unwrap()
    }

    #[test]
    fn world_starts_empty() {
        let w = World::new(bounds());
        assert_eq!(w.tick(), 0);
        assert_eq!(w.object_count(), 0);
        assert!(!w.is_chunked());
    }

    #[test]
    fn chunked_world_rejects_degenerate_bounds() {
        let err = World::chunked(WorldBounds::new(0, 10), 500).unwrap_err();
        assert!(matches!(err, WorldError::Grid(GridError::DegenerateWorld { .. })));
    }

    #[test]
    fn add_and_remove_keep_buckets_in_sync() {
        let mut w = World::chunked(bounds(), 500).unwrap();
        let a = w.add_object(GameObject::new("a", Vec2::new(10.0, 10.0)));
        let b = w.add_object(GameObject::new("b", Vec2::new(700.0, 1200.0)));

        assert_eq!(chunks(&w).total_placements(), 2);
        assert_eq!(chunks(&w).cell(CellCoord::new(2, 1)).unwrap().objects(), &[b]);

        let removed = w.remove_object(a).unwrap();
        assert_eq!(removed.name, "a");
        assert_eq!(w.object_count(), 1);
        assert_eq!(chunks(&w).total_placements(), 1);
        assert_eq!(chunks(&w).pending_releases().drain(), vec![a]);
        assert!(w.remove_object(a).is_none());
    }

    #[test]
    fn re_adding_same_id_replaces_without_duplicate_bucket_entry() {
        let mut w = World::chunked(bounds(), 500).unwrap();
        let original = GameObject::new("twin", Vec2::new(10.0, 10.0));
        let mut moved = original.clone();
        moved.set_position(Vec2::new(1200.0, 1200.0));

        let id = w.add_object(original.clone());
        assert_eq!(w.add_object(original), id);
        assert_eq!(w.object_count(), 1);
        assert_eq!(chunks(&w).total_placements(), 1);

        // a replacement at another position leaves the old bucket
        w.add_object(moved);
        assert_eq!(chunks(&w).total_placements(), 1);
        assert!(chunks(&w).cell(CellCoord::new(0, 0)).unwrap().is_empty());
        assert_eq!(chunks(&w).cell(CellCoord::new(2, 2)).unwrap().objects(), &[id]);

        w.remove_object(id).unwrap();
        assert_eq!(chunks(&w).total_placements(), 0);
    }

    #[test]
    fn re_adding_visible_object_does_not_reallocate() {
        let mut w = World::chunked(bounds(), 500).unwrap();
        w.step(&viewport(0.0, 0.0, 500.0, 500.0));
        let object = GameObject::new("seen", Vec2::new(100.0, 100.0));
        let id = w.add_object(object.clone());
        w.add_object(object);
        assert_eq!(chunks(&w).pending_allocations().drain(), vec![id]);
    }

    #[test]
    fn add_into_visible_cell_flags_allocation() {
        let mut w = World::chunked(bounds(), 500).unwrap();
        w.step(&viewport(0.0, 0.0, 500.0, 500.0));

        let seen = w.add_object(GameObject::new("seen", Vec2::new(100.0, 100.0)));
        w.add_object(GameObject::new("unseen", Vec2::new(1000.0, 1000.0)));
        assert_eq!(chunks(&w).pending_allocations().drain(), vec![seen]);
    }

    #[test]
    fn step_scans_and_queues_visible_objects() {
        let mut w = World::chunked(bounds(), 500).unwrap();
        let near = w.add_object(GameObject::new("near", Vec2::new(100.0, 100.0)));
        let far = w.add_object(GameObject::new("far", Vec2::new(1400.0, 1400.0)));

        let report = w.step(&viewport(0.0, 0.0, 500.0, 500.0));
        assert_eq!(report.tick, 1);
        assert_eq!(report.cells_shown, 1);
        assert_eq!(report.partition, Some(PartitionStats { placed: 2, out_of_grid: 0 }));
        assert_eq!(chunks(&w).pending_allocations().drain(), vec![near]);

        let report = w.step(&viewport(1000.0, 1000.0, 500.0, 500.0));
        assert_eq!(report.cells_shown, 1);
        assert_eq!(report.cells_hidden, 1);
        assert_eq!(chunks(&w).pending_allocations().drain(), vec![far]);
        assert_eq!(chunks(&w).pending_releases().drain(), vec![near]);
    }

    #[test]
    fn only_visible_objects_tick() {
        let mut w = World::chunked(bounds(), 500).unwrap();
        let v = Vec2::new(1.0, 0.0);
        let on = w.add_object(GameObject::new("on", Vec2::new(100.0, 100.0)).with_velocity(v));
        let off = w.add_object(GameObject::new("off", Vec2::new(1100.0, 1100.0)).with_velocity(v));

        let report = w.step(&viewport(0.0, 0.0, 500.0, 500.0));
        assert_eq!(report.updated, 1);
        assert_eq!(report.staged, 1);
        assert_eq!(w.get(on).unwrap().position(), Vec2::new(101.0, 100.0));
        assert_eq!(w.get(off).unwrap().position(), Vec2::new(1100.0, 1100.0));

        let staged = w.drain_staged();
        assert_eq!(staged, vec![StagedObject { id: on, position: Vec2::new(101.0, 100.0) }]);
        assert!(w.staged().is_empty());
    }

    #[test]
    fn unchunked_world_ticks_everything() {
        let mut w = World::new(bounds());
        let v = Vec2::new(0.0, 2.0);
        w.add_object(GameObject::new("a", Vec2::new(100.0, 100.0)).with_velocity(v));
        w.add_object(GameObject::new("b", Vec2::new(1400.0, 1400.0)).with_velocity(v));

        let report = w.step(&viewport(0.0, 0.0, 10.0, 10.0));
        assert_eq!(report.updated, 2);
        assert_eq!(report.staged, 2);
        assert!(report.partition.is_none());
    }

    #[test]
    fn moving_out_of_view_flags_release_immediately() {
        let mut w = World::chunked(bounds(), 500).unwrap();
        let id = w.add_object(GameObject::new("runner", Vec2::new(490.0, 10.0)));
        w.step(&viewport(0.0, 0.0, 500.0, 500.0));
        chunks(&w).pending_allocations().drain();

        assert_eq!(w.move_object(id, Vec2::new(20.0, 0.0)).unwrap(), Vec2::new(510.0, 10.0));
        assert_eq!(chunks(&w).pending_releases().drain(), vec![id]);

        w.move_object(id, Vec2::new(-20.0, 0.0)).unwrap();
        assert_eq!(chunks(&w).pending_allocations().drain(), vec![id]);

        // staying inside the visible cell flags nothing
        w.move_object(id, Vec2::new(-100.0, 0.0)).unwrap();
        assert!(chunks(&w).pending_allocations().is_empty());
        assert!(chunks(&w).pending_releases().is_empty());
    }

    #[test]
    fn object_walking_off_camera_is_not_staged() {
        let mut w = World::chunked(bounds(), 500).unwrap();
        let id = w.add_object(
            GameObject::new("runner", Vec2::new(495.0, 10.0)).with_velocity(Vec2::new(10.0, 0.0)),
        );
        let report = w.step(&viewport(0.0, 0.0, 500.0, 500.0));
        assert_eq!(report.updated, 1);
        assert_eq!(report.staged, 0);

        let allocated = chunks(&w).pending_allocations().drain();
        let released = chunks(&w).pending_releases().drain();
        assert_eq!(allocated, vec![id]);
        assert_eq!(released, vec![id]);
    }

    #[test]
    fn move_unknown_object_errors() {
        let mut w = World::new(bounds());
        let ghost = ObjectId::new();
        assert!(matches!(
            w.move_object(ghost, Vec2::ONE),
            Err(WorldError::ObjectNotFound(id)) if id == ghost
        ));
    }

    #[test]
    fn object_leaving_grid_is_released_on_next_partition() {
        let mut w = World::chunked(bounds(), 500).unwrap();
        let id = w.add_object(GameObject::new("edge", Vec2::new(5.0, 5.0)));
        w.set_position(id, Vec2::new(-1.0, -1.0)).unwrap();

        let report = w.step(&viewport(0.0, 0.0, 500.0, 500.0));
        assert_eq!(report.partition.unwrap().out_of_grid, 1);
        assert!(chunks(&w).cell(CellCoord::new(0, 0)).unwrap().is_empty());
        assert_eq!(chunks(&w).pending_releases().drain(), vec![id]);
    }

    #[test]
    fn attach_and_detach_chunk_manager() {
        let mut w = World::new(bounds());
        w.add_object(GameObject::new("a", Vec2::new(10.0, 10.0)));
        w.attach_chunk_manager(500).unwrap();
        assert!(w.is_chunked());
        assert_eq!(chunks(&w).total_placements(), 1);

        let manager = w.detach_chunk_manager().unwrap();
        assert_eq!(manager.rows(), 3);
        assert!(!w.is_chunked());
    }

    #[test]
    fn scatter_is_deterministic_and_in_bounds() {
        let mut w1 = World::new(bounds());
        let mut w2 = World::new(bounds());
        let ids1 = w1.scatter_objects(50, 4.0, 42);
        let ids2 = w2.scatter_objects(50, 4.0, 42);

        let p1: Vec<Vec2> = ids1.iter().map(|id| w1.get(*id).unwrap().position()).collect();
        let p2: Vec<Vec2> = ids2.iter().map(|id| w2.get(*id).unwrap().position()).collect();
        assert_eq!(p1, p2);
        for p in p1 {
            assert!(w1.bounds().contains(p));
        }
    }
}
