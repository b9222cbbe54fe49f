//! Developer Tooling: plane inspector, grid HUD overlay, tick timing.
//!
//! # Invariants
//! - Tools only read world and grid state.

mod inspector;
mod overlay;
mod timer;

pub use inspector::{GridSummary, ObjectInfo, PlaneInspector, PlaneSummary};
pub use overlay::{GridOverlay, grid_overlay};
pub use timer::TickTimer;

pub fn crate_info() -> &'static str {
    "planeworks-tools v0.1.0"
}
