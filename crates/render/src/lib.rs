//! Rendering Adapter: frame renderers and the render-side end of the GPU
//! lifecycle queues.
//!
//! # Invariants
//! - Renderers cannot mutate world truth.
//! - Resources are created and destroyed only on the render thread.
//! - A duplicate allocate or release is a no-op.

mod backend;
mod render_loop;
mod renderer;

pub use backend::{BackendStats, HeadlessBackend};
pub use render_loop::{RenderError, RenderLoop, RenderLoopStats};
pub use renderer::{DebugTextRenderer, Frame, Renderer};

pub fn crate_info() -> &'static str {
    "planeworks-render v0.1.0"
}
