use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::Subscription;

/// Maximum nesting of notifications triggered from inside listeners.
///
/// A listener that sets another cell (or the same one) starts a nested
/// notification. Rounds nested deeper than this are dropped with a warning.
pub const MAX_NOTIFY_DEPTH: u32 = 32;

type Callback<A> = Box<dyn FnMut(&A) -> bool>;

struct Entry<A> {
    id: u64,
    active: Cell<bool>,
    callback: RefCell<Callback<A>>,
}

/// Ordered listener list shared by cells and feeds.
pub(crate) struct Listeners<A: 'static> {
    entries: RefCell<Vec<Rc<Entry<A>>>>,
    next_id: Cell<u64>,
    depth: Cell<u32>,
}

impl<A: 'static> Listeners<A> {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self {
            entries: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
            depth: Cell::new(0),
        })
    }

    /// Registers `callback`; returning `false` from it removes the entry.
    pub(crate) fn add(self: &Rc<Self>, callback: Callback<A>) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id.wrapping_add(1));

        self.entries.borrow_mut().push(Rc::new(Entry {
            id,
            active: Cell::new(true),
            callback: RefCell::new(callback),
        }));

        let weak = Rc::downgrade(self);
        Subscription::new(move || {
            if let Some(listeners) = weak.upgrade() {
                listeners.remove(id);
            }
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    fn remove(&self, id: u64) {
        self.entries.borrow_mut().retain(|entry| {
            if entry.id == id {
                entry.active.set(false);
                false
            } else {
                true
            }
        });
    }

    /// Invokes every listener registered before this call, in order.
    pub(crate) fn notify(&self, source: &str, value: &A) {
        self.notify_while(source, value, || true);
    }

    /// Like `notify`, but stops delivering once `current` returns `false`.
    pub(crate) fn notify_while(&self, source: &str, value: &A, current: impl Fn() -> bool) {
        if self.depth.get() >= MAX_NOTIFY_DEPTH {
            log::warn!("{source}: notification nested deeper than {MAX_NOTIFY_DEPTH}, dropped");
            return;
        }

        // No borrow is held while callbacks run; they may add or remove entries.
        let snapshot: Vec<Rc<Entry<A>>> = self.entries.borrow().clone();
        let _depth = DepthGuard::enter(&self.depth);

        for entry in snapshot {
            if !current() {
                log::trace!("{source}: round superseded by a nested change");
                break;
            }
            if !entry.active.get() {
                continue;
            }

            let keep = match entry.callback.try_borrow_mut() {
                Ok(mut callback) => callback(value),
                Err(_) => {
                    // Still running further up the stack.
                    log::trace!("{source}: skipping re-entrant listener {}", entry.id);
                    continue;
                }
            };

            if !keep {
                self.remove(entry.id);
            }
        }
    }
}

struct DepthGuard<'a>(&'a Cell<u32>);

impl<'a> DepthGuard<'a> {
    fn enter(depth: &'a Cell<u32>) -> Self {
        depth.set(depth.get() + 1);
        Self(depth)
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}
