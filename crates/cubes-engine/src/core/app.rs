use std::rc::Rc;
use std::sync::Arc;

use winit::event::WindowEvent;
use winit::window::Window;

use crate::platform::Host;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract implemented by binaries.
pub trait App {
    /// Called once the window exists. `host` schedules timers and frame tasks
    /// on the runtime's queue.
    fn on_start(&mut self, window: Arc<Window>, host: Rc<dyn Host>) -> AppControl;

    /// Called for window events, before the runtime handles them.
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let _ = event;
        AppControl::Continue
    }

    /// Called once when the event loop is about to exit, before the host's
    /// shutdown tasks run.
    fn on_exit(&mut self) {}
}
