//! Window + runtime loop.
//!
//! Owns the `winit` event loop and window, and pumps the engine's task queue
//! from it.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
