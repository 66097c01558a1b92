//! Draw-request coalescing.

mod scheduler;

pub use scheduler::DrawScheduler;
