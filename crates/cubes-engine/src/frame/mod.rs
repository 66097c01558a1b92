//! Per-frame loop: fixed-step simulation plus demand-driven drawing.

mod diagnostics;
mod frame_loop;

pub use diagnostics::RenderDiagnostics;
pub use frame_loop::{FrameControl, FrameDeps, FrameLoop, FrameState};
