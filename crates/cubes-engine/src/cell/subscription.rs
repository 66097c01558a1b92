use std::fmt;

/// Scoped registration handle returned by every `listen`-style call.
///
/// Dropping the handle removes the listener. Call [`Subscription::detach`] to
/// keep the listener registered for as long as its source lives.
#[must_use = "dropping a Subscription immediately removes the listener"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub(crate) fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A handle that owns no listener.
    pub fn empty() -> Self {
        Self { cancel: None }
    }

    /// Removes the listener now.
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    /// Releases the handle without removing the listener.
    pub fn detach(mut self) {
        self.cancel = None;
    }

    /// Returns `true` while this handle still controls a listener.
    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
