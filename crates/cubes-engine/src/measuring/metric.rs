use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use crate::time::TimeSource;

/// Monotonically increasing count within a window.
#[derive(Debug)]
pub struct Counter {
    name: String,
    current: Cell<u64>,
    last: Cell<u64>,
}

impl Counter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            current: Cell::new(0),
            last: Cell::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inc(&self) {
        self.add(1);
    }

    pub fn add(&self, n: u64) {
        self.current.set(self.current.get().saturating_add(n));
    }

    /// Count accumulated in the open window.
    pub fn value(&self) -> u64 {
        self.current.get()
    }

    /// Count of the last closed window.
    pub fn last(&self) -> u64 {
        self.last.get()
    }

    fn close_window(&self) {
        self.last.set(self.current.replace(0));
    }
}

/// Instantaneous level (queue depth and the like); last write wins.
#[derive(Debug)]
pub struct Gauge {
    name: String,
    current: Cell<u64>,
    last: Cell<u64>,
}

impl Gauge {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            current: Cell::new(0),
            last: Cell::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set(&self, n: u64) {
        self.current.set(n);
    }

    pub fn inc(&self, n: u64) {
        self.current.set(self.current.get().saturating_add(n));
    }

    pub fn value(&self) -> u64 {
        self.current.get()
    }

    pub fn last(&self) -> u64 {
        self.last.get()
    }

    fn close_window(&self) {
        self.last.set(self.current.replace(0));
    }
}

/// Accumulates time spent between `start` and `end` marks.
pub struct Timer {
    name: String,
    clock: Rc<dyn TimeSource>,
    started: Cell<Option<Duration>>,
    total: Cell<Duration>,
    count: Cell<u64>,
    last_total: Cell<Duration>,
    last_count: Cell<u64>,
}

impl Timer {
    pub fn new(name: impl Into<String>, clock: Rc<dyn TimeSource>) -> Self {
        Self {
            name: name.into(),
            clock,
            started: Cell::new(None),
            total: Cell::new(Duration::ZERO),
            count: Cell::new(0),
            last_total: Cell::new(Duration::ZERO),
            last_count: Cell::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start(&self) {
        self.started.set(Some(self.clock.now()));
    }

    /// Closes the open measurement. An `end` without `start` is ignored.
    pub fn end(&self) {
        if let Some(started) = self.started.take() {
            let elapsed = self.clock.now().saturating_sub(started);
            self.total.set(self.total.get() + elapsed);
            self.count.set(self.count.get() + 1);
        }
    }

    pub fn is_running(&self) -> bool {
        self.started.get().is_some()
    }

    pub fn total(&self) -> Duration {
        self.total.get()
    }

    pub fn last_total(&self) -> Duration {
        self.last_total.get()
    }

    pub fn last_count(&self) -> u64 {
        self.last_count.get()
    }

    /// Mean duration of the measurements in the last closed window.
    pub fn last_mean(&self) -> Duration {
        match u32::try_from(self.last_count.get()) {
            Ok(0) => Duration::ZERO,
            Ok(n) => self.last_total.get() / n,
            Err(_) => Duration::ZERO,
        }
    }

    // A measurement in flight keeps running into the next window.
    fn close_window(&self) {
        self.last_total.set(self.total.replace(Duration::ZERO));
        self.last_count.set(self.count.replace(0));
    }
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer")
            .field("name", &self.name)
            .field("total", &self.total.get())
            .field("count", &self.count.get())
            .finish()
    }
}

/// Any metric that can be grouped into a window.
#[derive(Debug, Clone)]
pub enum Metric {
    Counter(Rc<Counter>),
    Gauge(Rc<Gauge>),
    Timer(Rc<Timer>),
}

impl Metric {
    pub fn name(&self) -> &str {
        match self {
            Metric::Counter(c) => c.name(),
            Metric::Gauge(g) => g.name(),
            Metric::Timer(t) => t.name(),
        }
    }

    pub(crate) fn close_window(&self) {
        match self {
            Metric::Counter(c) => c.close_window(),
            Metric::Gauge(g) => g.close_window(),
            Metric::Timer(t) => t.close_window(),
        }
    }

    /// One display line for the last closed window of length `window`.
    pub(crate) fn describe_window(&self, window: Duration) -> String {
        let secs = window.as_secs_f64();
        match self {
            Metric::Counter(c) if secs > 0.0 => {
                format!("{}: {:.0}/s", c.name(), c.last() as f64 / secs)
            }
            Metric::Counter(c) => format!("{}: {}", c.name(), c.last()),
            Metric::Gauge(g) => format!("{}: {}", g.name(), g.last()),
            Metric::Timer(t) => format!(
                "{}: {:.2} ms x{}",
                t.name(),
                t.last_mean().as_secs_f64() * 1_000.0,
                t.last_count()
            ),
        }
    }

    /// One display line for a metric that is never windowed.
    pub(crate) fn describe_running(&self) -> String {
        match self {
            Metric::Counter(c) => format!("{}: {}", c.name(), c.value()),
            Metric::Gauge(g) => format!("{}: {}", g.name(), g.value()),
            Metric::Timer(t) => format!(
                "{}: {:.1} ms total",
                t.name(),
                t.total().as_secs_f64() * 1_000.0
            ),
        }
    }
}
