//! Time subsystem.
//!
//! Provides the monotonic time sources used by the host and the fixed-step
//! simulation clock. Intended usage:
//! - one `TimeSource` per host (wall clock in the app, `ManualClock` in tests)
//! - one `SimulationClock` per frame loop; call `tick(now, ..)` every frame

mod sim_clock;
mod source;

pub use sim_clock::{SimulationClock, DEFAULT_CATCHUP_STEPS};
pub use source::{ManualClock, MonotonicClock, TimeSource};
