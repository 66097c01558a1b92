use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;

use crate::cell::{EventFeed, ReactiveCell, ReadOnlyCell, Subscription};

use super::{LoadFailure, PersistencePool, PoolEvent, PoolObject};

enum Slot {
    Live(PoolObject),
    /// Present but undecodable; `get` reports the reason.
    Unreadable(String),
}

/// In-process pool.
///
/// Writes are tracked as pending until a flush; `flush_async` completes on
/// the next `complete_flush` call so callers can observe the pending count.
pub struct MemoryPool {
    available: bool,
    entries: RefCell<BTreeMap<String, Slot>>,
    dirty: RefCell<Vec<String>>,
    flushing: RefCell<bool>,
    status: ReactiveCell<usize>,
    events: EventFeed<PoolEvent>,
}

impl MemoryPool {
    pub fn new() -> Self {
        Self::with_availability(true)
    }

    /// A pool whose writes are not kept past the session.
    pub fn ephemeral() -> Self {
        Self::with_availability(false)
    }

    fn with_availability(available: bool) -> Self {
        Self {
            available,
            entries: RefCell::new(BTreeMap::new()),
            dirty: RefCell::new(Vec::new()),
            flushing: RefCell::new(false),
            status: ReactiveCell::new("persistence.status", 0),
            events: EventFeed::new("persistence.events"),
        }
    }

    /// Registers an entry that exists but cannot be loaded.
    pub fn insert_unreadable(&self, name: &str, reason: &str) {
        self.entries
            .borrow_mut()
            .insert(name.to_string(), Slot::Unreadable(reason.to_string()));
        self.events.emit(&PoolEvent::Added(name.to_string()));
    }

    /// Finishes an outstanding `flush_async`. Returns `false` if none was running.
    pub fn complete_flush(&self) -> bool {
        if !self.flushing.replace(false) {
            return false;
        }
        self.write_pending();
        true
    }

    fn mark_dirty(&self, name: &str) {
        let count = {
            let mut dirty = self.dirty.borrow_mut();
            if !dirty.iter().any(|n| n == name) {
                dirty.push(name.to_string());
            }
            dirty.len()
        };
        self.status.set(count);
    }

    fn write_pending(&self) {
        let written = std::mem::take(&mut *self.dirty.borrow_mut());
        if !written.is_empty() {
            log::debug!("persisted {} object(s)", written.len());
        }
        self.status.set(0);
    }
}

impl Default for MemoryPool {
    fn default() -> Self {
        Self::new()
    }
}

impl PersistencePool for MemoryPool {
    fn available(&self) -> bool {
        self.available
    }

    fn has(&self, name: &str) -> bool {
        self.entries.borrow().contains_key(name)
    }

    fn get(&self, name: &str) -> Result<PoolObject, LoadFailure> {
        match self.entries.borrow().get(name) {
            Some(Slot::Live(object)) => Ok(object.clone()),
            Some(Slot::Unreadable(reason)) => Err(LoadFailure::Unreadable {
                name: name.to_string(),
                reason: reason.clone(),
            }),
            None => Err(LoadFailure::Missing(name.to_string())),
        }
    }

    fn persist(&self, object: PoolObject, name: &str) {
        let replaced = self
            .entries
            .borrow_mut()
            .insert(name.to_string(), Slot::Live(object))
            .is_some();
        self.mark_dirty(name);
        if !replaced {
            self.events.emit(&PoolEvent::Added(name.to_string()));
        }
    }

    fn delete(&self, name: &str) -> bool {
        let removed = self.entries.borrow_mut().remove(name).is_some();
        if removed {
            self.dirty.borrow_mut().retain(|n| n != name);
            let count = self.dirty.borrow().len();
            self.status.set(count);
            self.events.emit(&PoolEvent::Deleted(name.to_string()));
        }
        removed
    }

    fn name_of(&self, object: &PoolObject) -> Option<String> {
        self.entries
            .borrow()
            .iter()
            .find_map(|(name, slot)| match slot {
                Slot::Live(stored) if stored.same_as(object) => Some(name.clone()),
                _ => None,
            })
    }

    fn names(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }

    fn flush_now(&self) {
        self.flushing.replace(false);
        self.write_pending();
    }

    fn flush_async(&self) {
        if !self.dirty.borrow().is_empty() {
            self.flushing.replace(true);
        }
    }

    fn status(&self) -> ReadOnlyCell<usize> {
        self.status.read_only()
    }

    fn listen(&self, f: Box<dyn FnMut(&PoolEvent)>) -> Subscription {
        self.events.listen(f)
    }
}

impl fmt::Debug for MemoryPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryPool")
            .field("available", &self.available)
            .field("names", &self.names())
            .field("pending", &self.status.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ObjectKind, PoolItem};
    use crate::world::{Blockset, BlocksetRef, World, WorldRef};
    use std::cell::RefCell as StdRefCell;
    use std::rc::Rc;

    struct Tiles;
    impl Blockset for Tiles {
        fn prepare_render_data(&self) {}
    }

    struct Plain(BlocksetRef);
    impl World for Plain {
        fn blockset(&self) -> BlocksetRef {
            Rc::clone(&self.0)
        }
    }

    fn world() -> WorldRef {
        Rc::new(StdRefCell::new(Plain(Rc::new(Tiles))))
    }

    // ── lookup ───────────────────────────────────────────────────────────

    #[test]
    fn persisted_object_is_found_by_name_and_identity() {
        let pool = MemoryPool::new();
        let w = world();
        pool.persist(PoolObject::World(Rc::clone(&w)), "Home");

        assert!(pool.has("Home"));
        let back = WorldRef::from_object("Home", pool.get("Home").unwrap()).unwrap();
        assert!(Rc::ptr_eq(&back, &w));
        assert_eq!(pool.name_of(&PoolObject::World(w)), Some("Home".to_string()));
        assert_eq!(pool.name_of(&PoolObject::World(world())), None);
    }

    #[test]
    fn missing_and_unreadable_entries_fail_to_load() {
        let pool = MemoryPool::new();
        pool.insert_unreadable("Broken", "truncated");

        assert!(matches!(pool.get("Nope"), Err(LoadFailure::Missing(_))));
        assert_eq!(
            pool.get("Broken").unwrap_err(),
            LoadFailure::Unreadable {
                name: "Broken".into(),
                reason: "truncated".into()
            }
        );
    }

    #[test]
    fn wrong_kind_is_a_load_failure() {
        let pool = MemoryPool::new();
        pool.persist(PoolObject::Blockset(Rc::new(Tiles)), "B");
        let Err(err) = WorldRef::from_object("B", pool.get("B").unwrap()) else {
            panic!("a blockset must not load as a world");
        };
        assert_eq!(
            err,
            LoadFailure::WrongKind {
                name: "B".into(),
                expected: ObjectKind::World,
                found: ObjectKind::Blockset
            }
        );
        assert_eq!(err.to_string(), "\"B\" is a blockset, expected a world");
    }

    // ── status / events ──────────────────────────────────────────────────

    #[test]
    fn status_counts_pending_writes_until_flushed() {
        let pool = MemoryPool::new();
        let status = pool.status();
        pool.persist(PoolObject::World(world()), "A");
        pool.persist(PoolObject::World(world()), "B");
        pool.persist(PoolObject::World(world()), "A");
        assert_eq!(status.get(), 2);

        pool.flush_async();
        assert_eq!(status.get(), 2);
        assert!(pool.complete_flush());
        assert_eq!(status.get(), 0);
        assert!(!pool.complete_flush());
    }

    #[test]
    fn flush_now_writes_immediately() {
        let pool = MemoryPool::new();
        pool.persist(PoolObject::World(world()), "A");
        pool.flush_now();
        assert_eq!(pool.status().get(), 0);
    }

    #[test]
    fn events_report_additions_and_deletions() {
        let pool = MemoryPool::new();
        let seen = Rc::new(StdRefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let _sub = pool.listen(Box::new(move |e: &PoolEvent| s.borrow_mut().push(e.clone())));

        pool.persist(PoolObject::World(world()), "A");
        pool.persist(PoolObject::World(world()), "A");
        assert!(pool.delete("A"));
        assert!(!pool.delete("A"));

        assert_eq!(
            *seen.borrow(),
            vec![PoolEvent::Added("A".into()), PoolEvent::Deleted("A".into())]
        );
    }
}
