use std::collections::BTreeSet;

use planeworks_common::ObjectId;
use planeworks_stream::ResourceBackend;
use serde::Serialize;

/// Counters kept by [`HeadlessBackend`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackendStats {
    pub allocations: usize,
    pub releases: usize,
    pub redundant_allocations: usize,
    pub redundant_releases: usize,
}

/// Resource backend without a GPU.
///
/// Tracks which objects currently hold resources. Allocating a resident
/// object or releasing one that holds nothing is a counted no-op.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    resident: BTreeSet<ObjectId>,
    stats: BackendStats,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_resident(&self, id: ObjectId) -> bool {
        self.resident.contains(&id)
    }

    pub fn resident(&self) -> &BTreeSet<ObjectId> {
        &self.resident
    }

    pub fn resident_count(&self) -> usize {
        self.resident.len()
    }

    pub fn stats(&self) -> BackendStats {
        self.stats
    }
}

impl ResourceBackend for HeadlessBackend {
    fn allocate(&mut self, id: ObjectId) {
        if self.resident.insert(id) {
            self.stats.allocations += 1;
        } else {
            self.stats.redundant_allocations += 1;
            tracing::trace!(object = %id, "redundant allocation ignored");
        }
    }

    fn release(&mut self, id: ObjectId) {
        if self.resident.remove(&id) {
            self.stats.releases += 1;
        } else {
            self.stats.redundant_releases += 1;
            tracing::trace!(object = %id, "redundant release ignored");
        }
    }
}
