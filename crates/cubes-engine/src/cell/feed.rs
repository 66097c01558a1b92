use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use super::listeners::Listeners;
use super::Subscription;

/// Broadcast channel for notifications that are not a stored value
/// (objects added to a pool, the player switching worlds, ...).
///
/// Delivery follows the same rules as [`ReactiveCell`](super::ReactiveCell):
/// synchronous, in registration order, snapshot iteration.
pub struct EventFeed<E: 'static> {
    name: Rc<Cow<'static, str>>,
    listeners: Rc<Listeners<E>>,
}

impl<E: 'static> Clone for EventFeed<E> {
    fn clone(&self) -> Self {
        Self {
            name: Rc::clone(&self.name),
            listeners: Rc::clone(&self.listeners),
        }
    }
}

impl<E: 'static> EventFeed<E> {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: Rc::new(name.into()),
            listeners: Listeners::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Delivers `event` to every current listener.
    pub fn emit(&self, event: &E) {
        self.listeners.notify(&self.name, event);
    }

    pub fn listen(&self, mut f: impl FnMut(&E) + 'static) -> Subscription {
        self.listeners.add(Box::new(move |e| {
            f(e);
            true
        }))
    }

    /// Listens until `f` returns `false`.
    pub fn listen_while(&self, f: impl FnMut(&E) -> bool + 'static) -> Subscription {
        self.listeners.add(Box::new(f))
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl<E: 'static> fmt::Debug for EventFeed<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventFeed")
            .field("name", &*self.name)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
