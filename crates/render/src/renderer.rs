use planeworks_kernel::{StagedObject, World};
use planeworks_stream::Viewport;

/// Everything a renderer gets for one frame.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub tick: u64,
    pub viewport: &'a Viewport,
    pub objects: &'a [StagedObject],
}

impl<'a> Frame<'a> {
    pub fn new(world: &World, viewport: &'a Viewport, objects: &'a [StagedObject]) -> Self {
        Self {
            tick: world.tick(),
            viewport,
            objects,
        }
    }
}

/// Renderer-agnostic interface. All renderers implement this trait.
///
/// A renderer only sees staged objects and the viewport. It never mutates
/// the world.
pub trait Renderer {
    /// The output type produced by this renderer.
    type Output;

    /// Render one frame.
    fn render(&self, frame: &Frame<'_>) -> Self::Output;
}

/// Text renderer for CLI output, logging and tests.
#[derive(Debug, Default)]
pub struct DebugTextRenderer {
    /// Stop listing objects after this many. `None` lists all of them.
    pub max_listed: Option<usize>,
}

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(max_listed: usize) -> Self {
        Self {
            max_listed: Some(max_listed),
        }
    }
}

impl Renderer for DebugTextRenderer {
    type Output = String;

    fn render(&self, frame: &Frame<'_>) -> String {
        let mut out = String::new();
        let origin = frame.viewport.origin();
        let extent = frame.viewport.world_extent();
        out.push_str(&format!("=== Frame (tick={}) ===\n", frame.tick));
        out.push_str(&format!(
            "Viewport: origin=({:.1}, {:.1}) extent=({:.1}, {:.1}) zoom={:.2}\n",
            origin.x,
            origin.y,
            extent.x,
            extent.y,
            frame.viewport.zoom()
        ));
        out.push_str(&format!("Staged: {}\n", frame.objects.len()));

        let limit = self.max_listed.unwrap_or(usize::MAX);
        for staged in frame.objects.iter().take(limit) {
            out.push_str(&format!(
                "  [{}] pos=({:.2}, {:.2})\n",
                staged.id, staged.position.x, staged.position.y
            ));
        }
        if frame.objects.len() > limit {
            out.push_str(&format!("  ... {} more\n", frame.objects.len() - limit));
        }

        out
    }
}
