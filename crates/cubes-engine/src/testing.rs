//! Test doubles shared by the engine's unit tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use crate::backend::{Backend, InputInit, PlayerInit, RendererInit, Resources, ResourcesReady};
use crate::cell::EventFeed;
use crate::config::{Config, EngineSettings};
use crate::engine::{Engine, EngineParts};
use crate::overlay::{Notice, Overlay, ProgressKind, SaveState};
use crate::platform::{Host, TaskQueue};
use crate::render::{FrameCounters, FrameView, RenderError, Renderer, RendererInitError, RendererRef};
use crate::sequence::SequenceState;
use crate::storage::MemoryPool;
use crate::time::ManualClock;
use crate::world::{
    Blockset, BlocksetRef, InputRef, Player, PlayerEvent, PlayerRef, Simulated, World, WorldRef,
};

#[derive(Default)]
pub struct FakeRenderer {
    pub frames: u32,
    pub lost: Rc<Cell<bool>>,
    pub errors: Vec<RenderError>,
    pub viewport_changed: bool,
    pub deferred: usize,
    pub last_view: Option<FrameView>,
}

impl Renderer for FakeRenderer {
    fn render_one_frame(&mut self, view: &FrameView) {
        self.frames += 1;
        self.last_view = Some(*view);
    }
    fn check_for_viewport_change(&mut self) -> bool {
        std::mem::take(&mut self.viewport_changed)
    }
    fn transform_point_to_screen(&self, point: [f32; 4]) -> [f32; 4] {
        point
    }
    fn context_lost(&self) -> bool {
        self.lost.get()
    }
    fn take_errors(&mut self) -> Vec<RenderError> {
        std::mem::take(&mut self.errors)
    }
    fn take_frame_counters(&mut self) -> FrameCounters {
        FrameCounters {
            bundles_drawn: 4,
            vertices_drawn: 100,
        }
    }
    fn update_deferred_work(&mut self) {
        self.deferred = self.deferred.saturating_sub(1);
    }
    fn deferred_work_remaining(&self) -> usize {
        self.deferred
    }
}

#[derive(Default)]
pub struct FakeBlockset {
    pub prepared: Cell<u32>,
}

impl Blockset for FakeBlockset {
    fn prepare_render_data(&self) {
        self.prepared.set(self.prepared.get() + 1);
    }
}

pub struct FakeWorld {
    pub name: String,
    pub blockset: BlocksetRef,
}

impl FakeWorld {
    pub fn new(name: &str) -> Self {
        Self::with_blockset(name, Rc::new(FakeBlockset::default()))
    }

    pub fn with_blockset(name: &str, blockset: BlocksetRef) -> Self {
        Self {
            name: name.to_string(),
            blockset,
        }
    }
}

impl World for FakeWorld {
    fn blockset(&self) -> BlocksetRef {
        Rc::clone(&self.blockset)
    }
    fn label(&self) -> Option<String> {
        Some(self.name.clone())
    }
}

pub struct FakePlayer {
    pub steps: u32,
    pub world: WorldRef,
    pub events: EventFeed<PlayerEvent>,
}

impl FakePlayer {
    pub fn new(world: WorldRef) -> Self {
        Self {
            steps: 0,
            world,
            events: EventFeed::new("player.events"),
        }
    }
}

impl Simulated for FakePlayer {
    fn step(&mut self, _dt: Duration) {
        self.steps += 1;
    }
}

impl Player for FakePlayer {
    fn position(&self) -> [f64; 3] {
        [f64::from(self.steps), 0.0, 0.0]
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

#[derive(Default)]
pub struct RecordingOverlay {
    pub messages: Vec<String>,
    pub scene: Vec<String>,
    pub notices: Vec<Notice>,
    pub stats_visible: bool,
    pub stats: Vec<String>,
    pub worlds: Vec<Option<String>>,
    pub saves: Vec<SaveState>,
    pub progress: Vec<(ProgressKind, Option<f32>)>,
}

impl Overlay for RecordingOverlay {
    fn startup_message(&mut self, line: &str) {
        self.messages.push(line.to_string());
    }
    fn scene_info(&mut self, text: &str) {
        self.scene.push(text.to_string());
    }
    fn progress(&mut self, kind: ProgressKind, fraction: Option<f32>) {
        self.progress.push((kind, fraction));
    }
    fn notice(&mut self, notice: Notice) {
        self.notices.push(notice);
    }
    fn stats_visible(&self) -> bool {
        self.stats_visible
    }
    fn show_stats(&mut self, report: &str) {
        self.stats.push(report.to_string());
    }
    fn current_world(&mut self, label: Option<&str>) {
        self.worlds.push(label.map(str::to_string));
    }
    fn save_state(&mut self, state: SaveState) {
        self.saves.push(state);
    }
}

#[derive(Default)]
pub struct FakeInput {
    pub steps: u32,
}

impl Simulated for FakeInput {
    fn step(&mut self, _dt: Duration) {
        self.steps += 1;
    }
}

/// Backend whose resource fetch completes on the next host turn.
#[derive(Default)]
pub struct FakeBackend {
    pub missing: Option<String>,
    pub fetch_error: Option<String>,
    pub renderer_error: RefCell<Option<RendererInitError>>,
    pub renderer: Rc<RefCell<FakeRenderer>>,
    pub player: RefCell<Option<Rc<RefCell<FakePlayer>>>>,
    pub blocksets_made: Cell<u32>,
    pub worlds_made: Cell<u32>,
}

impl Backend for FakeBackend {
    fn missing_platform_features(&self) -> Option<String> {
        self.missing.clone()
    }

    fn fetch_resources(&self, host: &Rc<dyn Host>, done: ResourcesReady) {
        let result = match &self.fetch_error {
            Some(reason) => Err(reason.clone()),
            None => Ok(Resources::default()),
        };
        host.run_after(Duration::ZERO, Box::new(move || done(result)));
    }

    fn create_renderer(&self, _init: RendererInit<'_>) -> Result<RendererRef, RendererInitError> {
        if let Some(err) = self.renderer_error.borrow_mut().take() {
            return Err(err);
        }
        let renderer: RendererRef = self.renderer.clone();
        Ok(renderer)
    }

    fn new_default_blockset(&self, _tile_size: u32) -> BlocksetRef {
        self.blocksets_made.set(self.blocksets_made.get() + 1);
        Rc::new(FakeBlockset::default())
    }

    fn generate_worlds(&self, _config: &Config, blockset: BlocksetRef) -> WorldRef {
        let n = self.worlds_made.get() + 1;
        self.worlds_made.set(n);
        Rc::new(RefCell::new(FakeWorld::with_blockset(
            &format!("generated {n}"),
            blockset,
        )))
    }

    fn create_player(&self, init: PlayerInit) -> PlayerRef {
        let player = Rc::new(RefCell::new(FakePlayer::new(init.world)));
        *self.player.borrow_mut() = Some(Rc::clone(&player));
        player
    }

    fn create_input(&self, _init: InputInit) -> InputRef {
        Rc::new(RefCell::new(FakeInput::default()))
    }
}

/// An engine on a deterministic host.
pub struct EngineRig {
    pub engine: Engine,
    pub queue: Rc<TaskQueue>,
    pub clock: ManualClock,
    pub backend: Rc<FakeBackend>,
    pub pool: Rc<MemoryPool>,
    pub overlay: Rc<RefCell<RecordingOverlay>>,
    pub result: Rc<RefCell<Option<Result<(), String>>>>,
}

impl EngineRig {
    pub fn new() -> Self {
        Self::with(FakeBackend::default(), MemoryPool::new(), Config::default())
    }

    pub fn with(backend: FakeBackend, pool: MemoryPool, config: Config) -> Self {
        let clock = ManualClock::new();
        let queue = Rc::new(TaskQueue::new(Rc::new(clock.clone())));
        let backend = Rc::new(backend);
        let pool = Rc::new(pool);
        let overlay = Rc::new(RefCell::new(RecordingOverlay::default()));

        let engine = Engine::new(EngineParts {
            host: queue.clone(),
            backend: backend.clone(),
            pool: pool.clone(),
            overlay: overlay.clone(),
            config,
            settings: EngineSettings::default(),
        });

        Self {
            engine,
            queue,
            clock,
            backend,
            pool,
            overlay,
            result: Rc::new(RefCell::new(None)),
        }
    }

    pub fn start(&self) {
        let result = Rc::clone(&self.result);
        self.engine
            .start(move |r| *result.borrow_mut() = Some(r.map_err(|e| e.to_string())));
    }

    /// Runs timers a millisecond at a time until startup ends.
    pub fn run_startup(&self) -> SequenceState {
        for _ in 0..1000 {
            let state = self.engine.startup_state();
            if state.is_terminal() {
                return state;
            }
            self.advance(Duration::from_millis(1));
        }
        self.engine.startup_state()
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
        self.queue.run_due_timers();
    }
}
