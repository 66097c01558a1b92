use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::time::TimeSource;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce()>;

/// Scheduling services supplied by the platform.
///
/// Implementations must never run a task re-entrantly from inside the call
/// that scheduled it.
pub trait Host {
    /// Monotonic time since the host's epoch.
    fn now(&self) -> Duration;

    /// Runs `task` once, no earlier than `delay` from now.
    fn run_after(&self, delay: Duration, task: Task);

    /// Runs `task` once, before the next display refresh.
    fn next_frame(&self, task: Task);

    /// Runs `task` when the host is about to shut down.
    fn on_shutdown(&self, task: Task);
}

/// Reads time from a host, for components that only need a [`TimeSource`].
#[derive(Clone)]
pub struct HostClock(pub Rc<dyn Host>);

impl TimeSource for HostClock {
    fn now(&self) -> Duration {
        self.0.now()
    }
}

impl fmt::Debug for HostClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostClock({:?})", self.0.now())
    }
}
