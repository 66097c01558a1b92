use std::cell::RefCell;
use std::rc::Rc;

use super::RenderError;

/// Per-frame inputs to the renderer.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameView {
    /// Eye position in world coordinates.
    pub eye: [f64; 3],
    pub exposure: f32,
    /// Whether the view has input focus.
    pub focused: bool,
}

/// Work counters accumulated since the last read.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct FrameCounters {
    pub bundles_drawn: u64,
    pub vertices_drawn: u64,
}

/// Contract implemented by the graphics backend.
pub trait Renderer {
    /// Draws exactly one frame.
    fn render_one_frame(&mut self, view: &FrameView);

    /// Re-reads the surface geometry; returns `true` if the viewport changed.
    fn check_for_viewport_change(&mut self) -> bool;

    /// Maps a homogeneous world point to clip space.
    fn transform_point_to_screen(&self, point: [f32; 4]) -> [f32; 4];

    fn context_lost(&self) -> bool;

    /// Drains every pending error, including `ContextLost` entries.
    fn take_errors(&mut self) -> Vec<RenderError>;

    /// Returns and resets the work counters.
    fn take_frame_counters(&mut self) -> FrameCounters;

    /// Performs a slice of deferred maintenance (chunk mesh rebuilds).
    fn update_deferred_work(&mut self) {}

    /// Maintenance items still queued.
    fn deferred_work_remaining(&self) -> usize {
        0
    }
}

pub type RendererRef = Rc<RefCell<dyn Renderer>>;
