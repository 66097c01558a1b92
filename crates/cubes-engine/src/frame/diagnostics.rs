use std::fmt::Write as _;

use crate::render::RenderError;

/// Held errors beyond this many are dropped, oldest first.
const MAX_HELD: usize = 64;

/// Builds the scene-info text shown under the view.
///
/// Errors from the latest frame are shown as current; once a frame draws
/// cleanly the last set is kept as "previous" so transient errors stay
/// visible. Errors drained on frames that did not draw are held and shown
/// with the next drawn frame.
#[derive(Debug, Default)]
pub struct RenderDiagnostics {
    held: Vec<RenderError>,
    previous: Vec<RenderError>,
}

impl RenderDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps errors from an undrawn frame for the next `compose`.
    pub fn hold(&mut self, errors: Vec<RenderError>) {
        self.held
            .extend(errors.into_iter().filter(|e| *e != RenderError::ContextLost));
        if self.held.len() > MAX_HELD {
            let excess = self.held.len() - MAX_HELD;
            self.held.drain(..excess);
        }
    }

    /// Errors waiting for the next drawn frame.
    pub fn held(&self) -> &[RenderError] {
        &self.held
    }

    /// Composes the text for one drawn frame, including held errors.
    /// `ContextLost` entries are dropped.
    pub fn compose(&mut self, eye: [f64; 3], errors: Vec<RenderError>) -> String {
        let mut all = std::mem::take(&mut self.held);
        all.extend(errors);
        let errors: Vec<RenderError> = all
            .into_iter()
            .filter(|e| *e != RenderError::ContextLost)
            .collect();

        let mut text = String::new();
        let _ = writeln!(text, "XYZ: {:.2},{:.2},{:.2}", eye[0], eye[1], eye[2]);

        if !errors.is_empty() {
            let _ = writeln!(text, "Render errors: {}", join(&errors));
            self.previous = errors;
        } else if !self.previous.is_empty() {
            let _ = writeln!(text, "Previous render errors: {}", join(&self.previous));
        }
        text
    }
}

fn join(errors: &[RenderError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
