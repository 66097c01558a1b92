use std::cell::RefCell;
use std::rc::Rc;

use crate::time::TimeSource;

use super::{Counter, Gauge, Interval, Metric, Timer};

/// Reporting window a metric belongs to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Scope {
    /// Rolled over once per second; counters display as rates.
    Second,
    /// Rolled over by the frame loop after every draw.
    Frame,
    /// Never reset.
    Cumulative,
}

/// Registry of the engine's metrics.
///
/// The standard entries are public fields so hot paths can reach them without
/// a lookup; extra entries are registered with [`Measuring::counter`],
/// [`Measuring::gauge`] and [`Measuring::timer`].
pub struct Measuring {
    clock: Rc<dyn TimeSource>,
    second: Interval,
    queues: Interval,
    cumulative: RefCell<Vec<Metric>>,

    /// Time spent in simulation steps.
    pub sim: Rc<Timer>,
    pub sim_count: Rc<Counter>,
    /// Time spent drawing.
    pub frame: Rc<Timer>,
    pub frame_count: Rc<Counter>,
    pub bundles: Rc<Counter>,
    pub vertices: Rc<Counter>,
    /// Chunk render queue depth, sampled per drawn frame.
    pub chunk_queue_size: Rc<Gauge>,
    /// Pending persistence writes, sampled per drawn frame.
    pub persistence_queue_size: Rc<Gauge>,
}

impl Measuring {
    pub fn new(clock: Rc<dyn TimeSource>) -> Self {
        let second = Interval::new("second", Rc::clone(&clock));
        let queues = Interval::new("queues", Rc::clone(&clock));

        let sim = Rc::new(Timer::new("sim", Rc::clone(&clock)));
        let frame = Rc::new(Timer::new("frame", Rc::clone(&clock)));
        let sim_count = Rc::new(Counter::new("steps"));
        let frame_count = Rc::new(Counter::new("frames"));
        let bundles = Rc::new(Counter::new("bundles"));
        let vertices = Rc::new(Counter::new("vertices"));
        let chunk_queue_size = Rc::new(Gauge::new("chunk queue"));
        let persistence_queue_size = Rc::new(Gauge::new("save queue"));

        second.add(Metric::Timer(Rc::clone(&sim)));
        second.add(Metric::Counter(Rc::clone(&sim_count)));
        second.add(Metric::Timer(Rc::clone(&frame)));
        second.add(Metric::Counter(Rc::clone(&frame_count)));
        second.add(Metric::Counter(Rc::clone(&bundles)));
        second.add(Metric::Counter(Rc::clone(&vertices)));
        queues.add(Metric::Gauge(Rc::clone(&chunk_queue_size)));
        queues.add(Metric::Gauge(Rc::clone(&persistence_queue_size)));

        Self {
            clock,
            second,
            queues,
            cumulative: RefCell::new(Vec::new()),
            sim,
            sim_count,
            frame,
            frame_count,
            bundles,
            vertices,
            chunk_queue_size,
            persistence_queue_size,
        }
    }

    pub fn counter(&self, name: impl Into<String>, scope: Scope) -> Rc<Counter> {
        let counter = Rc::new(Counter::new(name));
        self.register(Metric::Counter(Rc::clone(&counter)), scope);
        counter
    }

    pub fn gauge(&self, name: impl Into<String>, scope: Scope) -> Rc<Gauge> {
        let gauge = Rc::new(Gauge::new(name));
        self.register(Metric::Gauge(Rc::clone(&gauge)), scope);
        gauge
    }

    pub fn timer(&self, name: impl Into<String>, scope: Scope) -> Rc<Timer> {
        let timer = Rc::new(Timer::new(name, Rc::clone(&self.clock)));
        self.register(Metric::Timer(Rc::clone(&timer)), scope);
        timer
    }

    fn register(&self, metric: Metric, scope: Scope) {
        match scope {
            Scope::Second => self.second.add(metric),
            Scope::Frame => self.queues.add(metric),
            Scope::Cumulative => self.cumulative.borrow_mut().push(metric),
        }
    }

    /// Opens both windows. Call once before the first rollover.
    pub fn start(&self) {
        self.second.start();
        self.queues.start();
    }

    /// Closes the per-second window and opens the next one.
    pub fn rollover_second(&self) {
        self.second.end();
        self.second.start();
    }

    /// Closes the per-frame window and opens the next one.
    pub fn rollover_frame(&self) {
        self.queues.end();
        self.queues.start();
    }

    pub fn second_window(&self) -> &Interval {
        &self.second
    }

    /// Display text, one metric per line.
    pub fn report(&self) -> String {
        let mut lines = self.second.describe(true);
        lines.extend(self.queues.describe(false));
        lines.extend(self.cumulative.borrow().iter().map(Metric::describe_running));
        lines.join("\n")
    }
}

impl std::fmt::Debug for Measuring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Measuring")
            .field("second", &self.second)
            .field("queues", &self.queues)
            .finish_non_exhaustive()
    }
}
