use std::cell::RefCell;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::time::TimeSource;

use super::{Host, Task};

struct Timer {
    deadline: Duration,
    seq: u64,
    task: Task,
}

impl PartialEq for Timer {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for Timer {}

impl PartialOrd for Timer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timer {
    fn cmp(&self, other: &Self) -> Ordering {
        self.deadline
            .cmp(&other.deadline)
            .then(self.seq.cmp(&other.seq))
    }
}

#[derive(Default)]
struct QueueState {
    timers: BinaryHeap<Reverse<Timer>>,
    frame: Vec<Task>,
    shutdown: Vec<Task>,
    next_seq: u64,
    shut_down: bool,
}

/// Cooperative single-threaded executor.
///
/// Scheduled work is buffered and only runs when the owner pumps the queue
/// (`run_due_timers`, `run_frame`, `shutdown`). Tasks are removed from the
/// queue before they run, so they may freely schedule more work.
pub struct TaskQueue {
    clock: Rc<dyn TimeSource>,
    state: RefCell<QueueState>,
}

impl TaskQueue {
    pub fn new(clock: Rc<dyn TimeSource>) -> Self {
        Self {
            clock,
            state: RefCell::new(QueueState::default()),
        }
    }

    /// Runs every timer due at the time of the call, earliest first.
    ///
    /// Timers scheduled while this runs wait for the next call, even if they
    /// are already due. Returns the number of tasks run.
    pub fn run_due_timers(&self) -> usize {
        let now = self.clock.now();
        let horizon = self.state.borrow().next_seq;
        let mut ran = 0;

        loop {
            let task = {
                let mut state = self.state.borrow_mut();
                let due = matches!(
                    state.timers.peek(),
                    Some(Reverse(t)) if t.deadline <= now && t.seq < horizon
                );
                if due {
                    state.timers.pop().map(|Reverse(t)| t.task)
                } else {
                    None
                }
            };

            let Some(task) = task else { break };
            task();
            ran += 1;
        }

        ran
    }

    /// Runs the tasks queued for this frame.
    ///
    /// Tasks queued by these tasks run on the following frame.
    pub fn run_frame(&self) -> usize {
        let tasks = std::mem::take(&mut self.state.borrow_mut().frame);
        let ran = tasks.len();
        for task in tasks {
            task();
        }
        ran
    }

    /// Runs the shutdown hooks once. Later scheduling is ignored.
    pub fn shutdown(&self) {
        let tasks = {
            let mut state = self.state.borrow_mut();
            if state.shut_down {
                return;
            }
            state.shut_down = true;
            state.timers.clear();
            state.frame.clear();
            std::mem::take(&mut state.shutdown)
        };

        log::debug!("running {} shutdown hook(s)", tasks.len());
        for task in tasks {
            task();
        }
    }

    /// Deadline of the earliest pending timer.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.state
            .borrow()
            .timers
            .peek()
            .map(|Reverse(t)| t.deadline)
    }

    pub fn has_frame_tasks(&self) -> bool {
        !self.state.borrow().frame.is_empty()
    }

    pub fn pending_timers(&self) -> usize {
        self.state.borrow().timers.len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.state.borrow().shut_down
    }
}

impl Host for TaskQueue {
    fn now(&self) -> Duration {
        self.clock.now()
    }

    fn run_after(&self, delay: Duration, task: Task) {
        let deadline = self.clock.now() + delay;
        let mut state = self.state.borrow_mut();
        if state.shut_down {
            return;
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.timers.push(Reverse(Timer {
            deadline,
            seq,
            task,
        }));
    }

    fn next_frame(&self, task: Task) {
        let mut state = self.state.borrow_mut();
        if !state.shut_down {
            state.frame.push(task);
        }
    }

    fn on_shutdown(&self, task: Task) {
        let mut state = self.state.borrow_mut();
        if !state.shut_down {
            state.shutdown.push(task);
        }
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("TaskQueue")
            .field("timers", &state.timers.len())
            .field("frame", &state.frame.len())
            .field("shutdown", &state.shutdown.len())
            .field("shut_down", &state.shut_down)
            .finish()
    }
}
