//! Pending GPU lifecycle work, handed from the simulation thread to the
//! render thread.
//!
//! Two FIFO queues carry object ids: one for objects that need GPU resources
//! allocated, one for objects whose resources should be released. Each entry
//! carries a sequence number from a counter shared by both queues, so a
//! consumer that drains both can apply the actions in the order they were
//! issued. That ordering holds as long as a single thread produces entries,
//! which is the simulation thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender};
use planeworks_common::ObjectId;

/// What the render side should do with a queued object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleAction {
    Allocate,
    Release,
}

/// One queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuedObject {
    pub id: ObjectId,
    pub seq: u64,
}

/// Render-side owner of GPU resources.
///
/// Implementations must treat a second `allocate` of a resident object, or a
/// `release` of an object that holds nothing, as a no-op. The queues do not
/// deduplicate.
pub trait ResourceBackend {
    fn allocate(&mut self, id: ObjectId);
    fn release(&mut self, id: ObjectId);
}

/// A single drainable FIFO queue.
#[derive(Debug)]
pub struct PendingQueue {
    tx: Sender<QueuedObject>,
    rx: Receiver<QueuedObject>,
}

impl PendingQueue {
    fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    fn push(&self, entry: QueuedObject) {
        // Both ends live in `self`, so the channel cannot be disconnected.
        let _ = self.tx.send(entry);
    }

    /// Remove and return every queued id in FIFO order.
    pub fn drain(&self) -> Vec<ObjectId> {
        self.rx.try_iter().map(|e| e.id).collect()
    }

    /// Like [`PendingQueue::drain`], keeping sequence numbers.
    pub fn drain_entries(&self) -> Vec<QueuedObject> {
        self.rx.try_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Discard everything queued. Returns how many entries were dropped.
    fn clear(&self) -> usize {
        self.rx.try_iter().count()
    }
}

/// Allocation and release queues plus their shared sequence counter.
#[derive(Debug)]
pub(crate) struct LifecycleQueues {
    allocations: PendingQueue,
    releases: PendingQueue,
    seq: Arc<AtomicU64>,
}

impl LifecycleQueues {
    pub(crate) fn new() -> Self {
        Self {
            allocations: PendingQueue::new(),
            releases: PendingQueue::new(),
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::AcqRel)
    }

    pub(crate) fn push(&self, action: LifecycleAction, id: ObjectId) {
        let entry = QueuedObject {
            id,
            seq: self.next_seq(),
        };
        match action {
            LifecycleAction::Allocate => self.allocations.push(entry),
            LifecycleAction::Release => self.releases.push(entry),
        }
    }

    pub(crate) fn allocations(&self) -> &PendingQueue {
        &self.allocations
    }

    pub(crate) fn releases(&self) -> &PendingQueue {
        &self.releases
    }

    pub(crate) fn clear(&self) -> usize {
        self.allocations.clear() + self.releases.clear()
    }

    pub(crate) fn render_handle(&self) -> RenderQueues {
        RenderQueues {
            allocations: self.allocations.rx.clone(),
            releases: self.releases.rx.clone(),
            seq: Arc::clone(&self.seq),
            carry: Vec::new(),
        }
    }
}

/// Counts from one [`RenderQueues::drain_into`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    pub allocated: usize,
    pub released: usize,
    /// Entries held back because their sequence number was issued after the
    /// drain started.
    pub deferred: usize,
}

/// Consumer end of both queues, meant to be moved onto the render thread.
///
/// Clones share the underlying channels; entries go to whichever clone pops
/// them first, so keep a single consuming handle per render context. Entries
/// deferred by one handle stay with it and are not copied into clones.
#[derive(Debug)]
pub struct RenderQueues {
    allocations: Receiver<QueuedObject>,
    releases: Receiver<QueuedObject>,
    seq: Arc<AtomicU64>,
    carry: Vec<(LifecycleAction, QueuedObject)>,
}

impl Clone for RenderQueues {
    fn clone(&self) -> Self {
        Self {
            allocations: self.allocations.clone(),
            releases: self.releases.clone(),
            seq: Arc::clone(&self.seq),
            carry: Vec::new(),
        }
    }
}

impl RenderQueues {
    pub fn drain_allocations(&self) -> Vec<ObjectId> {
        self.allocations.try_iter().map(|e| e.id).collect()
    }

    pub fn drain_releases(&self) -> Vec<ObjectId> {
        self.releases.try_iter().map(|e| e.id).collect()
    }

    /// Entries waiting in (allocation, release) order, not counting deferred ones.
    pub fn pending(&self) -> (usize, usize) {
        (self.allocations.len(), self.releases.len())
    }

    /// Drain both queues and apply every entry to `backend` in issue order.
    ///
    /// Only entries numbered before the drain started are applied; anything
    /// newer is kept for the next call so an allocate/release pair for the
    /// same object is never applied backwards.
    pub fn drain_into<B: ResourceBackend + ?Sized>(&mut self, backend: &mut B) -> DrainSummary {
        let horizon = self.seq.load(Ordering::Acquire);

        let mut batch = std::mem::take(&mut self.carry);
        batch.extend(
            self.allocations
                .try_iter()
                .map(|e| (LifecycleAction::Allocate, e)),
        );
        batch.extend(
            self.releases
                .try_iter()
                .map(|e| (LifecycleAction::Release, e)),
        );
        batch.sort_by_key(|(_, e)| e.seq);

        let mut summary = DrainSummary::default();
        for (action, entry) in batch {
            if entry.seq >= horizon {
                self.carry.push((action, entry));
                continue;
            }
            match action {
                LifecycleAction::Allocate => {
                    backend.allocate(entry.id);
                    summary.allocated += 1;
                }
                LifecycleAction::Release => {
                    backend.release(entry.id);
                    summary.released += 1;
                }
            }
        }
        summary.deferred = self.carry.len();

        if summary.allocated + summary.released > 0 {
            tracing::trace!(
                allocated = summary.allocated,
                released = summary.released,
                deferred = summary.deferred,
                "drained lifecycle queues"
            );
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        log: Vec<(LifecycleAction, ObjectId)>,
    }

    impl ResourceBackend for Recorder {
        fn allocate(&mut self, id: ObjectId) {
            self.log.push((LifecycleAction::Allocate, id));
        }

        fn release(&mut self, id: ObjectId) {
            self.log.push((LifecycleAction::Release, id));
        }
    }

    #[test]
    fn pending_queue_is_fifo() {
        let queues = LifecycleQueues::new();
        let ids: Vec<ObjectId> = (0..4).map(|_| ObjectId::new()).collect();
        for id in &ids {
            queues.push(LifecycleAction::Allocate, *id);
        }
        assert_eq!(queues.allocations().len(), 4);
        assert_eq!(queues.allocations().drain(), ids);
        assert!(queues.allocations().is_empty());
    }

    #[test]
    fn duplicates_are_not_collapsed() {
        let queues = LifecycleQueues::new();
        let id = ObjectId::new();
        queues.push(LifecycleAction::Release, id);
        queues.push(LifecycleAction::Release, id);
        assert_eq!(queues.releases().drain(), vec![id, id]);
    }

    #[test]
    fn drain_into_replays_in_issue_order() {
        let queues = LifecycleQueues::new();
        let mut handle = queues.render_handle();
        let a = ObjectId::new();
        let b = ObjectId::new();

        // a cell flickers out and back in before the render thread runs
        queues.push(LifecycleAction::Allocate, b);
        queues.push(LifecycleAction::Release, a);
        queues.push(LifecycleAction::Allocate, a);

        let mut backend = Recorder::default();
        let summary = handle.drain_into(&mut backend);

        assert_eq!(summary.allocated, 2);
        assert_eq!(summary.released, 1);
        assert_eq!(summary.deferred, 0);
        assert_eq!(
            backend.log,
            vec![
                (LifecycleAction::Allocate, b),
                (LifecycleAction::Release, a),
                (LifecycleAction::Allocate, a),
            ]
        );
        assert_eq!(handle.pending(), (0, 0));
    }

    #[test]
    fn clone_does_not_copy_deferred_entries() {
        let queues = LifecycleQueues::new();
        let mut handle = queues.render_handle();
        let id = ObjectId::new();
        queues.push(LifecycleAction::Allocate, id);
        // popped from the channel but held back by this handle
        handle.carry.extend(
            handle
                .allocations
                .try_iter()
                .map(|e| (LifecycleAction::Allocate, e)),
        );

        let mut twin = handle.clone();
        assert!(twin.carry.is_empty());

        let mut backend = Recorder::default();
        twin.drain_into(&mut backend);
        handle.drain_into(&mut backend);
        assert_eq!(backend.log, vec![(LifecycleAction::Allocate, id)]);
    }

    #[test]
    fn render_handle_works_across_threads() {
        let queues = LifecycleQueues::new();
        let handle = queues.render_handle();
        let id = ObjectId::new();
        queues.push(LifecycleAction::Allocate, id);

        let drained = std::thread::spawn(move || handle.drain_allocations())
            .join()
            .unwrap();
        assert_eq!(drained, vec![id]);
        assert!(queues.allocations().is_empty());
    }

    #[test]
    fn clear_drops_everything() {
        let queues = LifecycleQueues::new();
        queues.push(LifecycleAction::Allocate, ObjectId::new());
        queues.push(LifecycleAction::Release, ObjectId::new());
        assert_eq!(queues.clear(), 2);
        assert!(queues.allocations().is_empty());
        assert!(queues.releases().is_empty());
    }
}
