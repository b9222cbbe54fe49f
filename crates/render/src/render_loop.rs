use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use planeworks_stream::{RenderQueues, ResourceBackend};
use serde::Serialize;

const MAX_FLUSH_PASSES: u32 = 4;

/// Errors from the render thread.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to spawn render thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("render thread panicked")]
    ThreadPanicked,
}

/// Totals accumulated by a [`RenderLoop`] over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RenderLoopStats {
    pub frames: u64,
    pub allocated: usize,
    pub released: usize,
}

/// A render thread that owns a resource backend and drains the lifecycle
/// queues once per frame.
///
/// This stands in for the graphics context's own event loop: resource
/// creation and destruction happen only on this thread.
pub struct RenderLoop<B> {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<(B, RenderLoopStats)>>,
}

impl<B> RenderLoop<B>
where
    B: ResourceBackend + Send + 'static,
{
    pub fn spawn(
        mut queues: RenderQueues,
        mut backend: B,
        frame_interval: Duration,
    ) -> Result<Self, RenderError> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);

        let handle = std::thread::Builder::new()
            .name("render".into())
            .spawn(move || {
                let mut stats = RenderLoopStats::default();
                let mut flush_passes = 0;
                loop {
                    let stopping = thread_stop.load(Ordering::Acquire);
                    let summary = queues.drain_into(&mut backend);
                    stats.frames += 1;
                    stats.allocated += summary.allocated;
                    stats.released += summary.released;

                    if stopping {
                        // One more pass picks up entries deferred by the last one.
                        let flushed = summary.deferred == 0 && queues.pending() == (0, 0);
                        if flushed || flush_passes >= MAX_FLUSH_PASSES {
                            break;
                        }
                        flush_passes += 1;
                        continue;
                    }
                    std::thread::sleep(frame_interval);
                }
                tracing::debug!(
                    frames = stats.frames,
                    allocated = stats.allocated,
                    released = stats.released,
                    "render loop stopped"
                );
                (backend, stats)
            })?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Stop the thread after a final drain and hand back the backend.
    ///
    /// Call this once the simulation has stopped producing queue entries.
    pub fn shutdown(mut self) -> Result<(B, RenderLoopStats), RenderError> {
        self.stop.store(true, Ordering::Release);
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| RenderError::ThreadPanicked),
            None => Err(RenderError::ThreadPanicked),
        }
    }
}

impl<B> Drop for RenderLoop<B> {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HeadlessBackend;
    use glam::Vec2;
    use planeworks_common::WorldBounds;
    use planeworks_kernel::{GameObject, World};
    use planeworks_stream::Viewport;

    #[test]
    fn render_loop_drains_world_queues() {
        let mut world = World::chunked(WorldBounds::new(1500, 1500), 500).unwrap();
        let near = world.add_object(GameObject::new("near", Vec2::new(100.0, 100.0)));
        let far = world.add_object(GameObject::new("far", Vec2::new(1400.0, 1400.0)));
        let queues = world.chunks().unwrap().render_queues();

        let render = RenderLoop::spawn(queues, HeadlessBackend::new(), Duration::from_millis(1))
            .unwrap();

        let mut viewport = Viewport::unzoomed(Vec2::ZERO, Vec2::new(500.0, 500.0)).unwrap();
        world.step(&viewport);
        viewport.set_origin(Vec2::new(1000.0, 1000.0)).unwrap();
        world.step(&viewport);

        let (backend, stats) = render.shutdown().unwrap();
        assert!(!backend.is_resident(near));
        assert!(backend.is_resident(far));
        assert_eq!(stats.allocated, 2);
        assert_eq!(stats.released, 1);
        assert!(stats.frames >= 1);
    }

    #[test]
    fn shutdown_without_work() {
        let world = World::chunked(WorldBounds::new(500, 500), 500).unwrap();
        let render = RenderLoop::spawn(
            world.chunks().unwrap().render_queues(),
            HeadlessBackend::new(),
            Duration::from_millis(1),
        )
        .unwrap();
        let (backend, stats) = render.shutdown().unwrap();
        assert_eq!(backend.resident_count(), 0);
        assert_eq!(stats.allocated + stats.released, 0);
    }
}
