use std::rc::Rc;
use std::sync::Arc;

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{App, AppControl};
use crate::platform::{Host, TaskQueue};
use crate::time::MonotonicClock;

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "cubes".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
        }
    }
}

/// Entry point for the runtime.
///
/// Timers run from `about_to_wait`, with the event loop sleeping until the
/// next deadline. Frame tasks run on `RedrawRequested`; a redraw is requested
/// whenever frame tasks are queued.
pub struct Runtime;

impl Runtime {
    pub fn run<A>(config: RuntimeConfig, app: A) -> Result<()>
    where
        A: 'static + App,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;

        let clock = MonotonicClock::new();
        let queue = Rc::new(TaskQueue::new(Rc::new(clock)));
        let mut state = AppState {
            config,
            app,
            clock,
            queue,
            window: None,
            exit_requested: false,
        };

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        Ok(())
    }
}

struct AppState<A>
where
    A: App + 'static,
{
    config: RuntimeConfig,
    app: A,
    clock: MonotonicClock,
    queue: Rc<TaskQueue>,
    window: Option<Arc<Window>>,
    exit_requested: bool,
}

impl<A> AppState<A>
where
    A: App + 'static,
{
    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<Arc<Window>> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        Ok(Arc::new(window))
    }

    fn request_exit(&mut self, event_loop: &ActiveEventLoop) {
        if !self.exit_requested {
            self.exit_requested = true;
            self.app.on_exit();
            self.queue.shutdown();
        }
        event_loop.exit();
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: App + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window = match self.create_window(event_loop) {
            Ok(window) => window,
            Err(e) => {
                log::error!("failed to create initial window: {e:#}");
                self.request_exit(event_loop);
                return;
            }
        };
        self.window = Some(Arc::clone(&window));

        let host: Rc<dyn Host> = self.queue.clone();
        if self.app.on_start(Arc::clone(&window), host) == AppControl::Exit {
            self.request_exit(event_loop);
            return;
        }

        window.request_redraw();
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        self.queue.run_due_timers();

        if self.queue.has_frame_tasks() {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
        }

        let flow = match self.queue.next_deadline() {
            Some(deadline) => ControlFlow::WaitUntil(self.clock.instant_at(deadline)),
            None => ControlFlow::Wait,
        };
        event_loop.set_control_flow(flow);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        if self.app.on_window_event(&event) == AppControl::Exit {
            self.request_exit(event_loop);
            return;
        }

        match event {
            WindowEvent::CloseRequested => self.request_exit(event_loop),
            WindowEvent::RedrawRequested => {
                self.queue.run_frame();
            }
            _ => {}
        }
    }

    fn exiting(&mut self, event_loop: &ActiveEventLoop) {
        self.request_exit(event_loop);
    }
}
