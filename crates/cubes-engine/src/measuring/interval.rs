use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use crate::time::TimeSource;

use super::Metric;

/// A reporting window over a group of metrics.
///
/// `start` opens the window; `end` publishes every member's accumulation as
/// its `last` value and resets it.
pub struct Interval {
    name: String,
    clock: Rc<dyn TimeSource>,
    members: RefCell<Vec<Metric>>,
    opened_at: Cell<Option<Duration>>,
    last_length: Cell<Duration>,
}

impl Interval {
    pub fn new(name: impl Into<String>, clock: Rc<dyn TimeSource>) -> Self {
        Self {
            name: name.into(),
            clock,
            members: RefCell::new(Vec::new()),
            opened_at: Cell::new(None),
            last_length: Cell::new(Duration::ZERO),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add(&self, metric: Metric) {
        self.members.borrow_mut().push(metric);
    }

    pub fn start(&self) {
        self.opened_at.set(Some(self.clock.now()));
    }

    pub fn end(&self) {
        let now = self.clock.now();
        let length = self
            .opened_at
            .take()
            .map(|opened| now.saturating_sub(opened))
            .unwrap_or(Duration::ZERO);
        self.last_length.set(length);

        for metric in self.members.borrow().iter() {
            metric.close_window();
        }
    }

    /// Length of the last closed window.
    pub fn last_length(&self) -> Duration {
        self.last_length.get()
    }

    pub(crate) fn describe(&self, rates: bool) -> Vec<String> {
        let window = if rates { self.last_length() } else { Duration::ZERO };
        self.members
            .borrow()
            .iter()
            .map(|m| m.describe_window(window))
            .collect()
    }
}

impl std::fmt::Debug for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interval")
            .field("name", &self.name)
            .field("members", &self.members.borrow().len())
            .field("last_length", &self.last_length.get())
            .finish()
    }
}
