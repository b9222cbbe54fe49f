//! Streaming: grid chunking, viewport visibility, GPU lifecycle queues.
//!
//! # Invariants
//! - Grid and neighbor graph are fixed after `initialize`; only cell buckets change.
//! - After a partition, every in-grid object sits in exactly one bucket.
//! - A scan queues only the objects of cells whose visibility changed.
//! - Objects leave a queue only when the render side drains it.

mod cell;
mod manager;
mod queue;
mod viewport;

pub use cell::GridCell;
pub use manager::{ChunkManager, GridError, PartitionStats, ScanDiff, ScanStats};
pub use queue::{
    DrainSummary, LifecycleAction, PendingQueue, QueuedObject, RenderQueues, ResourceBackend,
};
pub use viewport::{SharedZoom, Viewport, ViewportError};

pub fn crate_info() -> &'static str {
    "planeworks-stream v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("stream"));
    }
}
