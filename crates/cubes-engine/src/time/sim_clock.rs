use std::time::Duration;

/// Default catch-up window, in whole steps.
pub const DEFAULT_CATCHUP_STEPS: u32 = 3;

/// Fixed-timestep simulation clock with bounded catch-up.
///
/// Each call to [`SimulationClock::tick`] runs as many whole steps as needed to
/// bring the simulated time up to the wall clock, but never lets the simulated
/// time lag by more than `max_catchup`. Time beyond that window is dropped
/// instead of being simulated, so one tick does at most
/// `max_catchup / step` steps no matter how long the host stalled.
#[derive(Debug, Clone)]
pub struct SimulationClock {
    step: Duration,
    max_catchup: Duration,
    last_step: Option<Duration>,
}

impl SimulationClock {
    /// Creates a clock whose catch-up window is [`DEFAULT_CATCHUP_STEPS`] steps.
    pub fn new(step: Duration) -> Self {
        Self::with_catchup(step, step * DEFAULT_CATCHUP_STEPS)
    }

    pub fn with_catchup(step: Duration, max_catchup: Duration) -> Self {
        debug_assert!(!step.is_zero(), "simulation step must be non-zero");
        debug_assert!(max_catchup >= step);
        Self {
            step,
            max_catchup,
            last_step: None,
        }
    }

    pub fn step_interval(&self) -> Duration {
        self.step
    }

    pub fn max_catchup(&self) -> Duration {
        self.max_catchup
    }

    /// Simulated time reached so far; `None` until the first tick.
    pub fn last_step_time(&self) -> Option<Duration> {
        self.last_step
    }

    /// Forgets the baseline; the next tick re-initializes it.
    pub fn reset(&mut self) {
        self.last_step = None;
    }

    /// Advances simulated time towards `now`, calling `step` once per whole
    /// step. Returns the number of steps run.
    pub fn tick(&mut self, now: Duration, mut step: impl FnMut()) -> u32 {
        let Some(mut last) = self.last_step else {
            self.last_step = Some(now);
            return 0;
        };

        // A clock that went backwards is treated as no elapsed time.
        let lag = now.saturating_sub(last);
        if lag > self.max_catchup {
            last = now - self.max_catchup;
        }

        let mut steps = 0;
        while now.saturating_sub(last) >= self.step {
            step();
            last += self.step;
            steps += 1;
        }

        self.last_step = Some(last);
        steps
    }
}
