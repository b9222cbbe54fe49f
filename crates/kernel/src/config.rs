//! YAML-backed plane configuration.
//!
//! Every field has a default, so a config file only needs the keys it
//! changes:
//!
//! ```yaml
//! world_width: 8000
//! world_height: 6000
//! viewport:
//!   width: 1280
//!   height: 720
//!   zoom: 0.5
//! ```

use std::path::Path;

use glam::Vec2;
use planeworks_common::{DEFAULT_CELL_SIZE, WorldBounds};
use planeworks_stream::{SharedZoom, Viewport, ViewportError};
use serde::{Deserialize, Serialize};

use crate::world::{World, WorldError};

/// Errors from loading or applying a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid viewport: {0}")]
    Viewport(#[from] ViewportError),
    #[error("invalid world: {0}")]
    World(#[from] WorldError),
}

/// Initial camera rectangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub zoom: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1920.0,
            height: 1080.0,
            zoom: 1.0,
        }
    }
}

/// Settings for building and driving a plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaneConfig {
    pub world_width: u32,
    pub world_height: u32,
    pub cell_size: u32,
    /// Attach a chunk manager. Unchunked planes update every object every tick.
    pub chunked: bool,
    pub viewport: ViewportConfig,
    /// Objects scattered at startup.
    pub objects: usize,
    /// Upper bound on object speed, in pixels per tick.
    pub object_speed: f32,
    pub ticks: u64,
    pub seed: u64,
}

impl Default for PlaneConfig {
    fn default() -> Self {
        Self {
            world_width: 10_000,
            world_height: 10_000,
            cell_size: DEFAULT_CELL_SIZE,
            chunked: true,
            viewport: ViewportConfig::default(),
            objects: 1_000,
            object_speed: 4.0,
            ticks: 120,
            seed: 42,
        }
    }
}

impl PlaneConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml_str(&text)?;
        tracing::debug!(path = %path.as_ref().display(), "loaded plane config");
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn bounds(&self) -> WorldBounds {
        WorldBounds::new(self.world_width, self.world_height)
    }

    /// Viewport with its own zoom handle, to be shared with a camera.
    pub fn viewport(&self) -> Result<Viewport, ConfigError> {
        let v = &self.viewport;
        let zoom = SharedZoom::new(v.zoom)?;
        Ok(Viewport::new(
            Vec2::new(v.x, v.y),
            Vec2::new(v.width, v.height),
            zoom,
        )?)
    }

    /// Build a world and scatter the configured objects into it.
    pub fn build_world(&self) -> Result<World, ConfigError> {
        let mut world = if self.chunked {
            World::chunked(self.bounds(), self.cell_size)?
        } else {
            World::new(self.bounds())
        };
        world.scatter_objects(self.objects, self.object_speed, self.seed);
        Ok(world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let c = PlaneConfig::default();
        assert_eq!(c.cell_size, DEFAULT_CELL_SIZE);
        assert!(c.chunked);
        assert_eq!(c.viewport.zoom, 1.0);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let c = PlaneConfig::from_yaml_str("world_width: 3000\nviewport:\n  zoom: 2.0\n").unwrap();
        assert_eq!(c.world_width, 3000);
        assert_eq!(c.world_height, 10_000);
        assert_eq!(c.viewport.zoom, 2.0);
        assert_eq!(c.viewport.width, 1920.0);
    }

    #[test]
    fn yaml_roundtrip_through_file() {
        let c = PlaneConfig {
            objects: 7,
            chunked: false,
            ..PlaneConfig::default()
        };
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(c.to_yaml_string().unwrap().as_bytes()).unwrap();

        let loaded = PlaneConfig::load(file.path()).unwrap();
        assert_eq!(loaded, c);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = PlaneConfig::load("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn bad_zoom_is_rejected() {
        let c = PlaneConfig::from_yaml_str("viewport:\n  zoom: 0.0\n").unwrap();
        assert!(matches!(c.viewport(), Err(ConfigError::Viewport(_))));
    }

    #[test]
    fn build_world_respects_chunked_flag() {
        let c = PlaneConfig {
            world_width: 2000,
            world_height: 1000,
            objects: 10,
            ..PlaneConfig::default()
        };
        let world = c.build_world().unwrap();
        assert!(world.is_chunked());
        assert_eq!(world.object_count(), 10);
        assert_eq!(world.chunks().unwrap().columns(), 4);

        let flat = PlaneConfig { chunked: false, ..c }.build_world().unwrap();
        assert!(!flat.is_chunked());
    }

    #[test]
    fn zero_cell_size_is_a_world_error() {
        let c = PlaneConfig {
            cell_size: 0,
            ..PlaneConfig::default()
        };
        assert!(matches!(c.build_world(), Err(ConfigError::World(_))));
    }
}
