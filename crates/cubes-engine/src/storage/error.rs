use thiserror::Error;

use super::ObjectKind;

/// A stored object could not be turned back into a live one.
///
/// Recoverable: callers log it and fall back to a default or a fresh object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadFailure {
    #[error("nothing is stored under {0:?}")]
    Missing(String),

    #[error("{name:?} could not be read: {reason}")]
    Unreadable { name: String, reason: String },

    #[error("{name:?} is a {found}, expected a {expected}")]
    WrongKind {
        name: String,
        expected: ObjectKind,
        found: ObjectKind,
    },
}
