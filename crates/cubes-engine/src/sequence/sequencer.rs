use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::error::StartupError;
use crate::platform::Host;

use super::{Step, StepOutcome};

/// Receives the first failure of a sequence.
pub type Catcher = Box<dyn FnOnce(StartupError)>;

type MessageSink = Box<dyn FnMut(&str)>;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SequenceState {
    Idle,
    /// Step `i` is executing, or has completed and the next one is queued.
    Running(usize),
    /// Step `i` suspended and is waiting for its continuation.
    Waiting(usize),
    Finished,
    /// Step `i` failed; the catcher has been called.
    Failed(usize),
    /// Step `i` gave up without an error, or dropped its continuation.
    Halted(usize),
}

impl SequenceState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SequenceState::Finished | SequenceState::Failed(_) | SequenceState::Halted(_)
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Token {
    Armed,
    Fired,
    /// The action returned `Completed`; late firings are ignored.
    Spent,
}

struct Inner {
    host: Rc<dyn Host>,
    yield_delay: Duration,
    steps: RefCell<VecDeque<Step>>,
    next_index: Cell<usize>,
    state: Cell<SequenceState>,
    catcher: RefCell<Option<Catcher>>,
    on_message: RefCell<Option<MessageSink>>,
}

/// Single-use runner for a list of startup steps.
#[derive(Clone)]
pub struct Sequencer {
    inner: Rc<Inner>,
}

impl Sequencer {
    pub fn new(host: Rc<dyn Host>, yield_delay: Duration) -> Self {
        Self {
            inner: Rc::new(Inner {
                host,
                yield_delay,
                steps: RefCell::new(VecDeque::new()),
                next_index: Cell::new(0),
                state: Cell::new(SequenceState::Idle),
                catcher: RefCell::new(None),
                on_message: RefCell::new(None),
            }),
        }
    }

    /// Sets the sink for message steps.
    pub fn on_message(&self, f: impl FnMut(&str) + 'static) {
        *self.inner.on_message.borrow_mut() = Some(Box::new(f));
    }

    /// Queues `steps` and schedules the first one.
    ///
    /// Nothing runs synchronously; the first step runs after one yield.
    pub fn start(&self, steps: Vec<Step>, catcher: impl FnOnce(StartupError) + 'static) {
        if self.inner.state.get() != SequenceState::Idle {
            log::warn!("startup sequence already started; ignoring second start");
            return;
        }
        log::debug!("startup sequence: {} steps", steps.len());
        *self.inner.steps.borrow_mut() = steps.into();
        *self.inner.catcher.borrow_mut() = Some(Box::new(catcher));
        self.inner.state.set(SequenceState::Running(0));
        schedule_next(&self.inner);
    }

    pub fn state(&self) -> SequenceState {
        self.inner.state.get()
    }

    /// Steps not yet started.
    pub fn remaining(&self) -> usize {
        self.inner.steps.borrow().len()
    }
}

impl fmt::Debug for Sequencer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequencer")
            .field("state", &self.inner.state.get())
            .field("remaining", &self.inner.steps.borrow().len())
            .finish()
    }
}

fn schedule_next(inner: &Rc<Inner>) {
    let next = Rc::clone(inner);
    inner
        .host
        .run_after(inner.yield_delay, Box::new(move || run_next(&next)));
}

fn run_next(inner: &Rc<Inner>) {
    if inner.state.get().is_terminal() {
        return;
    }

    let step = inner.steps.borrow_mut().pop_front();
    let Some(step) = step else {
        inner.state.set(SequenceState::Finished);
        log::debug!("startup sequence finished");
        return;
    };

    let index = inner.next_index.get();
    inner.next_index.set(index + 1);
    inner.state.set(SequenceState::Running(index));

    match step {
        Step::Message(text) => {
            let sink = inner.on_message.borrow_mut().take();
            if let Some(mut sink) = sink {
                sink(&text);
                let mut slot = inner.on_message.borrow_mut();
                if slot.is_none() {
                    *slot = Some(sink);
                }
            }
            schedule_next(inner);
        }
        Step::Action(action) => {
            let token = Rc::new(Cell::new(Token::Armed));
            let continuation = Continuation {
                seq: Rc::downgrade(inner),
                index,
                token: Rc::clone(&token),
            };

            let result = panic::catch_unwind(AssertUnwindSafe(move || action(continuation)))
                .unwrap_or_else(|payload| {
                    Err(StartupError::Panicked {
                        step: index,
                        message: panic_message(payload.as_ref()),
                    })
                });

            match result {
                Ok(StepOutcome::Completed) => {
                    if token.replace(Token::Spent) == Token::Armed {
                        schedule_next(inner);
                    }
                }
                Ok(StepOutcome::Pending) => {
                    if token.get() != Token::Armed {
                        // Resumed or failed before returning.
                        return;
                    }
                    if Rc::strong_count(&token) == 1 {
                        log::warn!("startup step {index} suspended without keeping its continuation");
                        inner.state.set(SequenceState::Halted(index));
                        return;
                    }
                    inner.state.set(SequenceState::Waiting(index));
                }
                Err(err) => fail(inner, index, err),
            }
        }
    }
}

fn fail(inner: &Rc<Inner>, index: usize, err: StartupError) {
    if inner.state.get().is_terminal() {
        log::warn!("startup step {index} failed after the sequence ended: {err}");
        return;
    }
    inner.state.set(SequenceState::Failed(index));
    inner.steps.borrow_mut().clear();
    log::debug!("startup step {index} failed: {err}");

    let catcher = inner.catcher.borrow_mut().take();
    if let Some(catcher) = catcher {
        catcher(err);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Handle a suspended step uses to report back.
///
/// Each handle fires at most once. Dropping it unfired while its step is
/// waiting halts the sequence.
pub struct Continuation {
    seq: Weak<Inner>,
    index: usize,
    token: Rc<Cell<Token>>,
}

impl Continuation {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Lets the sequence continue with the next step.
    pub fn resume(self) {
        let Some(inner) = self.claim() else { return };
        if inner.state.get().is_terminal() {
            return;
        }
        inner.state.set(SequenceState::Running(self.index));
        schedule_next(&inner);
    }

    /// Fails the sequence from an asynchronous step.
    pub fn fail(self, err: StartupError) {
        if let Some(inner) = self.claim() {
            fail(&inner, self.index, err);
        }
    }

    /// Stops the sequence without an error. The catcher is not called.
    pub fn abandon(self) {
        let Some(inner) = self.claim() else { return };
        if !inner.state.get().is_terminal() {
            log::info!("startup stopped at step {}", self.index);
            inner.state.set(SequenceState::Halted(self.index));
            inner.steps.borrow_mut().clear();
        }
    }

    fn claim(&self) -> Option<Rc<Inner>> {
        match self.token.get() {
            Token::Armed => {
                self.token.set(Token::Fired);
                self.seq.upgrade()
            }
            Token::Fired | Token::Spent => {
                log::warn!(
                    "continuation of startup step {} used after the step finished; ignored",
                    self.index
                );
                None
            }
        }
    }
}

impl Drop for Continuation {
    fn drop(&mut self) {
        if self.token.get() != Token::Armed {
            return;
        }
        let Some(inner) = self.seq.upgrade() else { return };
        if inner.state.get() == SequenceState::Waiting(self.index) {
            log::warn!(
                "startup step {} dropped its continuation; sequence halted",
                self.index
            );
            inner.state.set(SequenceState::Halted(self.index));
        }
    }
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation")
            .field("index", &self.index)
            .field("token", &self.token.get())
            .finish()
    }
}
