//! GPU device + surface management, and the `wgpu`-backed [`Renderer`].
//!
//! [`Gpu`] owns the wgpu Instance/Adapter/Device/Queue and the window
//! surface. [`GpuRenderer`] drives it once per frame and translates surface
//! failures into [`RenderError`]s for the frame loop.
//!
//! [`Renderer`]: crate::render::Renderer
//! [`RenderError`]: crate::render::RenderError

mod camera;
mod error;
mod frame;
mod gpu;
mod init;
mod renderer;
mod surface;

pub use camera::{view_projection, Mat4};
pub use error::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use gpu::Gpu;
pub use init::GpuInit;
pub use renderer::GpuRenderer;
