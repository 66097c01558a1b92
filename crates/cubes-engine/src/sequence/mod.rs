//! Startup sequencer.
//!
//! Runs an ordered list of steps, yielding to the host between each one so the
//! UI can paint progress. A step is either a message for the progress display
//! or an action that completes synchronously or suspends until its
//! [`Continuation`] is resumed. The first failure goes to a catcher, exactly
//! once, and nothing after it runs.

mod startup_log;
mod sequencer;
mod step;

pub use startup_log::StartupLog;
pub use sequencer::{Catcher, Continuation, SequenceState, Sequencer};
pub use step::{Step, StepOutcome, StepResult};
