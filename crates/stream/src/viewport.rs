use std::ops::RangeInclusive;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use glam::Vec2;

/// Errors from viewport construction and zoom updates.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ViewportError {
    #[error("zoom must be finite and positive, got {0}")]
    InvalidZoom(f32),
    #[error("viewport size must be finite and non-negative, got {width}x{height}")]
    InvalidSize { width: f32, height: f32 },
    #[error("viewport origin must be finite, got ({x}, {y})")]
    InvalidOrigin { x: f32, y: f32 },
}

/// Zoom factor shared between a camera and the viewports attached to it.
///
/// Clones observe the same value. Stored as `f32` bits so the camera can
/// change it from any thread without a lock.
#[derive(Debug, Clone)]
pub struct SharedZoom(Arc<AtomicU32>);

impl SharedZoom {
    pub fn new(zoom: f32) -> Result<Self, ViewportError> {
        validate_zoom(zoom)?;
        Ok(Self(Arc::new(AtomicU32::new(zoom.to_bits()))))
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, zoom: f32) -> Result<(), ViewportError> {
        validate_zoom(zoom)?;
        self.0.store(zoom.to_bits(), Ordering::Relaxed);
        Ok(())
    }
}

impl Default for SharedZoom {
    fn default() -> Self {
        Self(Arc::new(AtomicU32::new(1.0_f32.to_bits())))
    }
}

fn validate_zoom(zoom: f32) -> Result<(), ViewportError> {
    if zoom.is_finite() && zoom > 0.0 {
        Ok(())
    } else {
        Err(ViewportError::InvalidZoom(zoom))
    }
}

/// Camera-attached rectangle in world space.
///
/// `size` is in screen pixels; the world-space extent is `size / zoom`, so a
/// zoom above 1 shows less of the world.
#[derive(Debug, Clone)]
pub struct Viewport {
    origin: Vec2,
    size: Vec2,
    zoom: SharedZoom,
}

impl Viewport {
    pub fn new(origin: Vec2, size: Vec2, zoom: SharedZoom) -> Result<Self, ViewportError> {
        validate_origin(origin)?;
        validate_size(size)?;
        Ok(Self { origin, size, zoom })
    }

    /// Viewport at zoom 1 with its own zoom handle.
    pub fn unzoomed(origin: Vec2, size: Vec2) -> Result<Self, ViewportError> {
        Self::new(origin, size, SharedZoom::default())
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn zoom(&self) -> f32 {
        self.zoom.get()
    }

    pub fn zoom_handle(&self) -> &SharedZoom {
        &self.zoom
    }

    pub fn set_origin(&mut self, origin: Vec2) -> Result<(), ViewportError> {
        validate_origin(origin)?;
        self.origin = origin;
        Ok(())
    }

    /// Shift the origin by `delta`. A move that would leave the origin
    /// non-finite is rejected and the viewport stays put.
    pub fn translate(&mut self, delta: Vec2) -> Result<(), ViewportError> {
        self.set_origin(self.origin + delta)
    }

    pub fn set_size(&mut self, size: Vec2) -> Result<(), ViewportError> {
        validate_size(size)?;
        self.size = size;
        Ok(())
    }

    /// World-space extent after zoom.
    pub fn world_extent(&self) -> Vec2 {
        self.size / self.zoom.get()
    }

    /// Far corner in world space.
    pub fn far_edge(&self) -> Vec2 {
        self.origin + self.world_extent()
    }

    pub fn closest_row(&self, cell_size: u32) -> i32 {
        floor_index(self.origin.y, cell_size)
    }

    pub fn closest_column(&self, cell_size: u32) -> i32 {
        floor_index(self.origin.x, cell_size)
    }

    pub fn furthest_row(&self, cell_size: u32) -> i32 {
        furthest_index(self.far_edge().y, cell_size)
    }

    pub fn furthest_column(&self, cell_size: u32) -> i32 {
        furthest_index(self.far_edge().x, cell_size)
    }

    /// Rows the viewport overlaps. Empty when the viewport has no height.
    pub fn row_range(&self, cell_size: u32) -> RangeInclusive<i32> {
        self.closest_row(cell_size)..=self.furthest_row(cell_size)
    }

    pub fn column_range(&self, cell_size: u32) -> RangeInclusive<i32> {
        self.closest_column(cell_size)..=self.furthest_column(cell_size)
    }
}

fn validate_origin(origin: Vec2) -> Result<(), ViewportError> {
    if origin.is_finite() {
        Ok(())
    } else {
        Err(ViewportError::InvalidOrigin {
            x: origin.x,
            y: origin.y,
        })
    }
}

fn validate_size(size: Vec2) -> Result<(), ViewportError> {
    if size.is_finite() && size.x >= 0.0 && size.y >= 0.0 {
        Ok(())
    } else {
        Err(ViewportError::InvalidSize {
            width: size.x,
            height: size.y,
        })
    }
}

fn floor_index(coord: f32, cell_size: u32) -> i32 {
    (coord / cell_size as f32).floor() as i32
}

/// Index of the last cell painted by a far edge at `edge`.
///
/// An edge sitting exactly on a cell boundary only touches the next cell at
/// zero width, so that cell is excluded. With a floor toward negative
/// infinity this is a single decrement for either sign of `edge`.
fn furthest_index(edge: f32, cell_size: u32) -> i32 {
    let size = cell_size as f32;
    let index = floor_index(edge, cell_size);
    if edge.rem_euclid(size) == 0.0 {
        index.saturating_sub(1)
    } else {
        index
    }
}
