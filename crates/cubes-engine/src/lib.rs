//! Cubes engine crate.
//!
//! Scheduling core for a voxel world viewer: a fixed-timestep simulation
//! clock, a demand-driven draw loop, a cooperative startup sequencer, reactive
//! configuration cells, a persistence pool for worlds and blocksets, and
//! per-frame measuring. The `window` and `device` modules host it on `winit`
//! and `wgpu`.

pub mod backend;
pub mod cell;
pub mod config;
pub mod core;
pub mod device;
pub mod draw;
pub mod engine;
pub mod error;
pub mod frame;
pub mod logging;
pub mod measuring;
pub mod overlay;
pub mod platform;
pub mod render;
pub mod sequence;
pub mod startup;
pub mod storage;
pub mod time;
pub mod window;
pub mod world;

#[cfg(test)]
mod testing;

pub use engine::{Engine, EngineParts};
pub use error::StartupError;
