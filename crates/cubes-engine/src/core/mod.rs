//! Contract between the platform runtime and the application.
//!
//! The runtime owns the window and the task queue; the application receives
//! both once the window exists and is told about window events afterwards.

mod app;

pub use app::{App, AppControl};
