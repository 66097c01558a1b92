use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::listeners::Listeners;
use super::Subscription;

struct CellInner<T: 'static> {
    name: Cow<'static, str>,
    value: RefCell<T>,
    /// Bumped on every change; a round stops once it no longer matches.
    version: Cell<u64>,
    same: fn(&T, &T) -> bool,
    listeners: Rc<Listeners<T>>,
}

/// A named observable value.
///
/// `ReactiveCell` is a cheap handle; clones share the same value and listener
/// list. Listeners run synchronously inside [`ReactiveCell::set`], in
/// registration order, before `set` returns.
pub struct ReactiveCell<T: 'static> {
    inner: Rc<CellInner<T>>,
}

impl<T: 'static> Clone for ReactiveCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: PartialEq + 'static> ReactiveCell<T> {
    /// Creates a cell that notifies only when the stored value changes.
    pub fn new(name: impl Into<Cow<'static, str>>, value: T) -> Self {
        Self::with_eq(name, value, |a, b| a == b)
    }
}

impl<T: 'static> ReactiveCell<T> {
    /// Creates a cell that notifies on every `set`, changed or not.
    pub fn always(name: impl Into<Cow<'static, str>>, value: T) -> Self {
        Self::with_eq(name, value, |_, _| false)
    }

    /// Creates a cell with a custom sameness test (e.g. pointer identity).
    pub fn with_eq(name: impl Into<Cow<'static, str>>, value: T, same: fn(&T, &T) -> bool) -> Self {
        Self {
            inner: Rc::new(CellInner {
                name: name.into(),
                value: RefCell::new(value),
                version: Cell::new(0),
                same,
                listeners: Listeners::new(),
            }),
        }
    }

    /// Diagnostic label.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.inner.value.borrow().clone()
    }

    /// Borrows the current value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Stores `value` and notifies listeners if it differs from the old one.
    ///
    /// Listeners may call `set` again (on this or any other cell). A nested
    /// change to this cell ends the outer round, so listeners never see a
    /// value older than the one already delivered to them.
    pub fn set(&self, value: T)
    where
        T: Clone,
    {
        let notify = {
            let mut slot = self.inner.value.borrow_mut();
            let changed = !(self.inner.same)(&slot, &value);
            *slot = value;
            changed.then(|| (*slot).clone())
        };

        if let Some(current) = notify {
            let inner = &self.inner;
            let version = inner.version.get().wrapping_add(1);
            inner.version.set(version);
            inner
                .listeners
                .notify_while(&inner.name, &current, || inner.version.get() == version);
        }
    }

    /// Runs `f` on every subsequent change.
    pub fn when_changed(&self, mut f: impl FnMut(&T) + 'static) -> Subscription {
        self.inner.listeners.add(Box::new(move |v| {
            f(v);
            true
        }))
    }

    /// Runs `f` once with the current value, then on every change.
    pub fn now_and_when_changed(&self, mut f: impl FnMut(&T) + 'static) -> Subscription {
        self.with(|v| f(v));
        self.when_changed(f)
    }

    /// Runs `f` on changes until it returns `false`.
    pub fn listen_while(&self, f: impl FnMut(&T) -> bool + 'static) -> Subscription {
        self.inner.listeners.add(Box::new(f))
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// A view of this cell without `set`.
    pub fn read_only(&self) -> ReadOnlyCell<T> {
        ReadOnlyCell { cell: self.clone() }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for ReactiveCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveCell")
            .field("name", &self.inner.name)
            .field("value", &*self.inner.value.borrow())
            .finish()
    }
}

/// Read-only facet of a [`ReactiveCell`].
pub struct ReadOnlyCell<T: 'static> {
    cell: ReactiveCell<T>,
}

impl<T: 'static> Clone for ReadOnlyCell<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T: 'static> ReadOnlyCell<T> {
    pub fn name(&self) -> &str {
        self.cell.name()
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.cell.get()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.cell.with(f)
    }

    pub fn when_changed(&self, f: impl FnMut(&T) + 'static) -> Subscription {
        self.cell.when_changed(f)
    }

    pub fn now_and_when_changed(&self, f: impl FnMut(&T) + 'static) -> Subscription {
        self.cell.now_and_when_changed(f)
    }

    pub fn listen_while(&self, f: impl FnMut(&T) -> bool + 'static) -> Subscription {
        self.cell.listen_while(f)
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for ReadOnlyCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.cell.fmt(f)
    }
}
