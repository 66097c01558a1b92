//! Stand-in world, player and input for running the engine without a real
//! block game behind it.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::f64::consts::TAU;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use cubes_engine::backend::{
    Backend, InputInit, PlayerInit, RendererInit, Resources, ResourcesReady,
};
use cubes_engine::cell::{EventFeed, ReactiveCell};
use cubes_engine::config::Config;
use cubes_engine::device::{GpuInit, GpuRenderer};
use cubes_engine::draw::DrawScheduler;
use cubes_engine::platform::Host;
use cubes_engine::render::{RendererInitError, RendererRef};
use cubes_engine::world::{
    Blockset, BlocksetRef, InputRef, Player, PlayerEvent, PlayerRef, Simulated, World, WorldRef,
};
use winit::window::Window;

/// Orbit speed at full deflection, in radians per second.
const ORBIT_SPEED: f64 = 1.2;
const ORBIT_RADIUS: f64 = 24.0;
const ORBIT_HEIGHT: f64 = 10.0;

/// Keyboard state shared between the studio and the demo input.
#[derive(Debug, Default)]
pub struct Controls {
    pub left: Cell<bool>,
    pub right: Cell<bool>,
}

impl Controls {
    fn steering(&self) -> f64 {
        match (self.left.get(), self.right.get()) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }
}

pub struct DemoBackend {
    window: Arc<Window>,
    controls: Rc<Controls>,
    /// Orbit rate written by the input and read by the player.
    spin: Rc<Cell<f64>>,
    generated: Cell<u32>,
}

impl DemoBackend {
    pub fn new(window: Arc<Window>, controls: Rc<Controls>) -> Self {
        Self {
            window,
            controls,
            spin: Rc::new(Cell::new(0.0)),
            generated: Cell::new(0),
        }
    }
}

impl Backend for DemoBackend {
    fn fetch_resources(&self, host: &Rc<dyn Host>, done: ResourcesReady) {
        host.run_after(
            Duration::ZERO,
            Box::new(move || {
                let mut shaders = BTreeMap::new();
                shaders.insert("sky".to_string(), "// clear only".to_string());
                done(Ok(Resources { shaders }));
            }),
        );
    }

    fn create_renderer(&self, init: RendererInit<'_>) -> Result<RendererRef, RendererInitError> {
        log::debug!("{} shader source(s) available", init.resources.shaders.len());
        let renderer = GpuRenderer::new(Arc::clone(&self.window), GpuInit::default())?;
        Ok(Rc::new(RefCell::new(renderer)))
    }

    fn new_default_blockset(&self, tile_size: u32) -> BlocksetRef {
        Rc::new(DemoBlockset { tile_size })
    }

    fn generate_worlds(&self, config: &Config, blockset: BlocksetRef) -> WorldRef {
        let n = self.generated.get() + 1;
        self.generated.set(n);
        let label = if n == 1 {
            "Demo World".to_string()
        } else {
            format!("{} #{n}", config.generate_name.get())
        };
        Rc::new(RefCell::new(DemoWorld { label, blockset }))
    }

    fn create_player(&self, init: PlayerInit) -> PlayerRef {
        Rc::new(RefCell::new(DemoPlayer {
            world: init.world,
            angle: 0.0,
            spin: Rc::clone(&self.spin),
            draw: init.draw,
            events: EventFeed::new("player.events"),
        }))
    }

    fn create_input(&self, init: InputInit) -> InputRef {
        Rc::new(RefCell::new(DemoInput {
            controls: Rc::clone(&self.controls),
            spin: Rc::clone(&self.spin),
            focus: init.focus,
        }))
    }
}

struct DemoBlockset {
    tile_size: u32,
}

impl Blockset for DemoBlockset {
    fn prepare_render_data(&self) {
        log::debug!("blockset textures prepared ({0}x{0} tiles)", self.tile_size);
    }
}

struct DemoWorld {
    label: String,
    blockset: BlocksetRef,
}

impl World for DemoWorld {
    fn blockset(&self) -> BlocksetRef {
        Rc::clone(&self.blockset)
    }

    fn label(&self) -> Option<String> {
        Some(self.label.clone())
    }
}

/// Circles the origin at a fixed radius.
struct DemoPlayer {
    world: WorldRef,
    angle: f64,
    spin: Rc<Cell<f64>>,
    draw: DrawScheduler,
    events: EventFeed<PlayerEvent>,
}

impl Simulated for DemoPlayer {
    fn step(&mut self, dt: Duration) {
        let spin = self.spin.get();
        if spin != 0.0 {
            self.angle = (self.angle + spin * dt.as_secs_f64()).rem_euclid(TAU);
            self.draw.request_draw();
        }
    }
}

impl Player for DemoPlayer {
    fn position(&self) -> [f64; 3] {
        [
            ORBIT_RADIUS * self.angle.sin(),
            ORBIT_HEIGHT,
            ORBIT_RADIUS * self.angle.cos(),
        ]
    }

    fn world(&self) -> WorldRef {
        Rc::clone(&self.world)
    }

    fn set_world(&mut self, world: WorldRef) {
        self.world = world;
        self.events.emit(&PlayerEvent::ChangedWorld);
    }

    fn events(&self) -> EventFeed<PlayerEvent> {
        self.events.clone()
    }
}

/// Turns held keys into orbit speed; nothing moves without focus.
struct DemoInput {
    controls: Rc<Controls>,
    spin: Rc<Cell<f64>>,
    focus: ReactiveCell<bool>,
}

impl Simulated for DemoInput {
    fn step(&mut self, _dt: Duration) {
        let steering = if self.focus.get() {
            self.controls.steering()
        } else {
            0.0
        };
        self.spin.set(steering * ORBIT_SPEED);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_keys_cancel() {
        let controls = Controls::default();
        controls.left.set(true);
        assert_eq!(controls.steering(), -1.0);
        controls.right.set(true);
        assert_eq!(controls.steering(), 0.0);
        controls.left.set(false);
        assert_eq!(controls.steering(), 1.0);
    }

    #[test]
    fn input_stops_the_orbit_without_focus() {
        let controls = Rc::new(Controls::default());
        controls.right.set(true);
        let spin = Rc::new(Cell::new(0.0));
        let focus = ReactiveCell::new("focus", true);
        let mut input = DemoInput {
            controls,
            spin: Rc::clone(&spin),
            focus: focus.clone(),
        };

        input.step(Duration::from_millis(16));
        assert_eq!(spin.get(), ORBIT_SPEED);

        focus.set(false);
        input.step(Duration::from_millis(16));
        assert_eq!(spin.get(), 0.0);
    }

    #[test]
    fn orbiting_player_requests_draws() {
        let draw = DrawScheduler::new();
        let blockset: BlocksetRef = Rc::new(DemoBlockset { tile_size: 16 });
        let world: WorldRef = Rc::new(RefCell::new(DemoWorld {
            label: "w".into(),
            blockset,
        }));
        let spin = Rc::new(Cell::new(0.0));
        let mut player = DemoPlayer {
            world,
            angle: 0.0,
            spin: Rc::clone(&spin),
            draw: draw.clone(),
            events: EventFeed::new("player.events"),
        };

        player.step(Duration::from_secs(1));
        assert!(!draw.consume_if_requested());

        spin.set(1.0);
        player.step(Duration::from_millis(500));
        assert!(draw.consume_if_requested());
        assert!(player.position()[0] > 0.0);
        assert_eq!(player.position()[1], ORBIT_HEIGHT);
    }
}
