/// Converts a shrinking "work remaining" count into a completion fraction.
///
/// The largest count seen since the queue was last empty is taken as the total.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressTracker {
    max_todo: usize,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the completed fraction in `[0, 1]`, or `None` when nothing is
    /// pending (the indicator should be hidden).
    pub fn update(&mut self, todo: usize) -> Option<f32> {
        if todo == 0 {
            self.max_todo = 0;
            return None;
        }

        self.max_todo = self.max_todo.max(todo);
        Some(1.0 - todo as f32 / self.max_todo as f32)
    }
}
