use std::borrow::Cow;
use std::fmt;

use crate::error::StartupError;

use super::Continuation;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step is done; the sequencer moves on.
    Completed,
    /// The step continues asynchronously and will fire its continuation.
    Pending,
}

pub type StepResult = Result<StepOutcome, StartupError>;

type Action = Box<dyn FnOnce(Continuation) -> StepResult>;

pub enum Step {
    Message(Cow<'static, str>),
    Action(Action),
}

impl Step {
    pub fn message(text: impl Into<Cow<'static, str>>) -> Self {
        Step::Message(text.into())
    }

    pub fn action(f: impl FnOnce(Continuation) -> StepResult + 'static) -> Self {
        Step::Action(Box::new(f))
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Message(text) => f.debug_tuple("Message").field(text).finish(),
            Step::Action(_) => f.write_str("Action(..)"),
        }
    }
}
