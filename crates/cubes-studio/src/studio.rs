use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use cubes_engine::config::{Config, EngineSettings};
use cubes_engine::core::{App, AppControl};
use cubes_engine::overlay::{LogOverlay, Overlay};
use cubes_engine::platform::Host;
use cubes_engine::storage::MemoryPool;
use cubes_engine::{Engine, EngineParts};
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::keyboard::{Key, KeyCode, ModifiersState, NamedKey, PhysicalKey};
use winit::window::Window;

use crate::demo::{Controls, DemoBackend};

/// Time the in-memory pool takes to "write" an asynchronous save.
const SAVE_LATENCY: Duration = Duration::from_millis(250);

/// Hosts one engine in the runtime window and maps keys onto it.
pub struct Studio {
    engine: Option<Engine>,
    host: Option<Rc<dyn Host>>,
    pool: Rc<MemoryPool>,
    overlay: Rc<RefCell<LogOverlay>>,
    controls: Rc<Controls>,
    modifiers: ModifiersState,
}

impl Studio {
    pub fn new() -> Self {
        Self {
            engine: None,
            host: None,
            pool: Rc::new(MemoryPool::new()),
            overlay: Rc::new(RefCell::new(LogOverlay::new())),
            controls: Rc::new(Controls::default()),
            modifiers: ModifiersState::empty(),
        }
    }

    fn save(&self) {
        let (Some(engine), Some(host)) = (&self.engine, &self.host) else {
            return;
        };
        engine.save();

        let pool = Rc::downgrade(&self.pool);
        host.run_after(
            SAVE_LATENCY,
            Box::new(move || {
                if let Some(pool) = pool.upgrade() {
                    pool.complete_flush();
                }
            }),
        );
    }

    fn on_key(&mut self, event: &KeyEvent) {
        let pressed = event.state == ElementState::Pressed;
        match &event.logical_key {
            Key::Named(NamedKey::ArrowLeft) => self.controls.left.set(pressed),
            Key::Named(NamedKey::ArrowRight) => self.controls.right.set(pressed),
            _ if !pressed || event.repeat => {}
            Key::Named(NamedKey::F2) => {
                let mut overlay = self.overlay.borrow_mut();
                let show = !overlay.stats_visible();
                overlay.set_stats_visible(show);
            }
            Key::Named(NamedKey::F3) => {
                if let Some(engine) = &self.engine {
                    let force = &engine.config().debug_force_render;
                    force.set(!force.get());
                    log::info!("force render: {}", force.get());
                }
            }
            Key::Named(NamedKey::F5) => {
                if let Some(engine) = &self.engine {
                    match engine.regenerate() {
                        Ok(()) => log::info!("world regenerated"),
                        Err(e) => log::warn!("regenerate failed: {e}"),
                    }
                }
            }
            _ if event.physical_key == PhysicalKey::Code(KeyCode::KeyS)
                && self.modifiers.control_key() =>
            {
                self.save()
            }
            _ => {}
        }
    }
}

impl Default for Studio {
    fn default() -> Self {
        Self::new()
    }
}

impl App for Studio {
    fn on_start(&mut self, window: Arc<Window>, host: Rc<dyn Host>) -> AppControl {
        let engine = Engine::new(EngineParts {
            host: Rc::clone(&host),
            backend: Rc::new(DemoBackend::new(window, Rc::clone(&self.controls))),
            pool: self.pool.clone(),
            overlay: self.overlay.clone(),
            config: Config::default(),
            settings: EngineSettings::default(),
        });
        engine.focus().set(true);

        engine.start(|result| match result {
            Ok(()) => log::info!("studio ready"),
            Err(e) => log::error!("startup failed: {e}"),
        });

        self.engine = Some(engine);
        self.host = Some(host);
        AppControl::Continue
    }

    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::Focused(focused) => {
                if let Some(engine) = &self.engine {
                    engine.focus().set(*focused);
                }
                if !focused {
                    self.controls.left.set(false);
                    self.controls.right.set(false);
                }
            }
            WindowEvent::ModifiersChanged(modifiers) => self.modifiers = modifiers.state(),
            WindowEvent::KeyboardInput { event, .. } => self.on_key(event),
            WindowEvent::Resized(_) => {
                if let Some(engine) = &self.engine {
                    engine.draw_scheduler().request_draw();
                }
            }
            _ => {}
        }
        AppControl::Continue
    }

    fn on_exit(&mut self) {
        if let Some(engine) = self.engine.take() {
            engine.shutdown();
        }
    }
}
