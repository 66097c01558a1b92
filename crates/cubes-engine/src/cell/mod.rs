//! Observable state.
//!
//! Provides the single-threaded building blocks used for dirty flags, status
//! counters and "current selection" state:
//! - `ReactiveCell` holds one value and notifies listeners when it changes
//! - `EventFeed` broadcasts events that are not a stored value
//! - `Subscription` is the scoped handle that keeps a listener registered
//!
//! Listener lists are iterated through a snapshot, so a listener may remove
//! itself (or another listener) while a notification is in progress.

mod feed;
mod listeners;
mod reactive;
mod subscription;

pub use feed::EventFeed;
pub use listeners::MAX_NOTIFY_DEPTH;
pub use reactive::{ReactiveCell, ReadOnlyCell};
pub use subscription::Subscription;
