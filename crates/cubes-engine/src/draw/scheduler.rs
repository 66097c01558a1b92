use std::cell::Cell;
use std::rc::Rc;

/// Dirty flag shared by every producer of visual change.
///
/// Any number of `request_draw` calls between two frames collapse into one
/// draw. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct DrawScheduler {
    requested: Rc<Cell<bool>>,
}

impl DrawScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the scene dirty. Idempotent.
    pub fn request_draw(&self) {
        self.requested.set(true);
    }

    /// Reads and clears the flag; `true` means a draw should happen now.
    pub fn consume_if_requested(&self) -> bool {
        self.requested.replace(false)
    }

    pub fn is_requested(&self) -> bool {
        self.requested.get()
    }

    /// `request_draw` as a closure, for collaborators that only need to poke the flag.
    pub fn requester(&self) -> impl Fn() + 'static {
        let requested = Rc::clone(&self.requested);
        move || requested.set(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn many_requests_yield_one_draw() {
        let draw = DrawScheduler::new();
        for _ in 0..5 {
            draw.request_draw();
        }

        assert!(draw.consume_if_requested());
        assert!(!draw.consume_if_requested());
        assert!(!draw.consume_if_requested());
    }

    #[test]
    fn starts_clean() {
        assert!(!DrawScheduler::new().consume_if_requested());
    }

    #[test]
    fn clones_and_requesters_share_the_flag() {
        let draw = DrawScheduler::new();
        let producer = draw.clone();
        let poke = draw.requester();

        producer.request_draw();
        assert!(draw.consume_if_requested());

        poke();
        assert!(draw.is_requested());
        assert!(draw.consume_if_requested());
    }
}
