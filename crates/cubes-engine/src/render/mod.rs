//! Renderer seam.
//!
//! The engine never draws by itself; it drives an implementation of
//! [`Renderer`] once per drawn frame and reads back its diagnostics.

mod error;
mod project;
mod renderer;

pub use error::{RenderError, RendererInitError};
pub use project::{project_bounds, ScreenBounds};
pub use renderer::{FrameCounters, FrameView, Renderer, RendererRef};
