//! Performance measuring.
//!
//! Counters, gauges and timers grouped into reporting windows:
//! - the `second` window is rolled over by a host timer once per second
//! - the `queues` window is rolled over by the frame loop after each draw
//! - cumulative metrics are never reset
//!
//! Measuring is observational only; nothing in here feeds back into the
//! simulation or the renderer.

mod interval;
mod metric;
mod progress;
mod registry;

pub use interval::Interval;
pub use metric::{Counter, Gauge, Metric, Timer};
pub use progress::ProgressTracker;
pub use registry::{Measuring, Scope};
