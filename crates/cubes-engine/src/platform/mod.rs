//! Host scheduling primitives.
//!
//! Everything in the engine runs on one thread. Concurrency is expressed as
//! callbacks handed to the host through two primitives:
//! - `run_after` (minimum-delay timer; sequencer yields, stats rollover)
//! - `next_frame` (run before the next display refresh; frame loop)
//!
//! `TaskQueue` is the cooperative executor behind both the winit runtime and
//! deterministic tests.

mod host;
mod queue;

pub use host::{Host, HostClock, Task};
pub use queue::TaskQueue;
