use crate::cell::{ReadOnlyCell, Subscription};

use super::{LoadFailure, PoolObject};

/// Change notification from a pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolEvent {
    Added(String),
    Deleted(String),
}

/// Named object storage.
pub trait PersistencePool {
    /// Whether writes will survive the session.
    fn available(&self) -> bool;

    fn has(&self, name: &str) -> bool;

    fn get(&self, name: &str) -> Result<PoolObject, LoadFailure>;

    /// Stores `object` under `name`, replacing any previous entry.
    fn persist(&self, object: PoolObject, name: &str);

    fn delete(&self, name: &str) -> bool;

    /// Name under which `object` is stored, if any.
    fn name_of(&self, object: &PoolObject) -> Option<String>;

    fn names(&self) -> Vec<String>;

    /// Writes everything pending before returning.
    fn flush_now(&self);

    /// Starts writing pending changes; completion is observed through `status`.
    fn flush_async(&self);

    /// Number of objects with unwritten changes.
    fn status(&self) -> ReadOnlyCell<usize>;

    fn listen(&self, f: Box<dyn FnMut(&PoolEvent)>) -> Subscription;
}
