//! UI sink.
//!
//! Everything the engine wants to show the user goes through [`Overlay`].
//! Widgets, layout and styling belong to the implementation.

use std::cell::RefCell;
use std::rc::Rc;

/// Blocking messages shown in place of the scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The platform lacks features the engine needs; startup continues.
    MissingFeatures(String),
    /// The renderer cannot run here; startup stops.
    RendererUnsupported(String),
    /// Startup failed.
    LoadError(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProgressKind {
    Chunks,
    Persistence,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SaveState {
    Saved,
    Unsaved { minutes_since_save: u64 },
}

pub trait Overlay {
    fn startup_message(&mut self, line: &str);

    /// Position readout and render diagnostics, replaced every drawn frame.
    fn scene_info(&mut self, text: &str);

    /// `None` hides the bar.
    fn progress(&mut self, kind: ProgressKind, fraction: Option<f32>);

    fn notice(&mut self, notice: Notice);

    fn stats_visible(&self) -> bool {
        false
    }

    fn show_stats(&mut self, _report: &str) {}

    fn current_world(&mut self, _label: Option<&str>) {}

    fn save_state(&mut self, _state: SaveState) {}
}

pub type OverlayRef = Rc<RefCell<dyn Overlay>>;

/// Overlay that writes to the log.
///
/// Repeated scene info and progress values are suppressed so a steady scene
/// does not flood the log.
#[derive(Debug, Default)]
pub struct LogOverlay {
    show_stats: bool,
    last_scene: String,
    last_progress: [Option<u8>; 2],
    last_save: Option<SaveState>,
}

impl LogOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stats(mut self, show: bool) -> Self {
        self.show_stats = show;
        self
    }

    pub fn set_stats_visible(&mut self, show: bool) {
        self.show_stats = show;
    }
}

impl Overlay for LogOverlay {
    // The engine already logs each startup line at info level.
    fn startup_message(&mut self, _line: &str) {}

    fn scene_info(&mut self, text: &str) {
        if text != self.last_scene {
            log::trace!("{}", text.trim_end());
            self.last_scene = text.to_string();
        }
    }

    fn progress(&mut self, kind: ProgressKind, fraction: Option<f32>) {
        let percent = fraction.map(|f| (f.clamp(0.0, 1.0) * 100.0) as u8);
        let slot = &mut self.last_progress[kind as usize];
        if *slot != percent {
            *slot = percent;
            if let Some(p) = percent {
                log::debug!("{kind:?}: {p}%");
            }
        }
    }

    fn notice(&mut self, notice: Notice) {
        match notice {
            Notice::MissingFeatures(text) => log::warn!("missing features: {text}"),
            Notice::RendererUnsupported(text) => log::error!("renderer unsupported: {text}"),
            Notice::LoadError(text) => log::error!("{text}"),
        }
    }

    fn stats_visible(&self) -> bool {
        self.show_stats
    }

    fn show_stats(&mut self, report: &str) {
        log::debug!("stats:\n{report}");
    }

    fn current_world(&mut self, label: Option<&str>) {
        log::info!("world: {}", label.unwrap_or("(unnamed)"));
    }

    fn save_state(&mut self, state: SaveState) {
        if self.last_save != Some(state) {
            self.last_save = Some(state);
            match state {
                SaveState::Saved => log::debug!("saved"),
                SaveState::Unsaved { minutes_since_save } => {
                    log::debug!("unsaved ({minutes_since_save} min since last save)")
                }
            }
        }
    }
}
