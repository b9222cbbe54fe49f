//! World Kernel: the plane, its objects, and the per-tick driver.
//!
//! # Invariants
//! - Every object in the world sits in exactly one cell bucket while the grid is current.
//! - Only objects in visible cells are updated and staged on chunked worlds.
//! - Object positions change only through world operations.

pub mod config;
pub mod object;
pub mod world;

pub use config::{ConfigError, PlaneConfig, ViewportConfig};
pub use object::GameObject;
pub use world::{StagedObject, TickReport, World, WorldError};
