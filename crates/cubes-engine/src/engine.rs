//! Top-level engine context.
//!
//! `Engine` owns every piece of shared state the scheduling core needs:
//! configuration, the persistence pool, measuring, the draw scheduler, and
//! the collaborators created during startup. Handles are cheap clones of one
//! shared context; callbacks registered with the host hold weak references so
//! dropping the last handle tears everything down.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::backend::{Backend, Resources};
use crate::cell::{ReactiveCell, ReadOnlyCell, Subscription};
use crate::config::{Config, EngineSettings};
use crate::draw::DrawScheduler;
use crate::error::StartupError;
use crate::frame::{FrameControl, FrameState};
use crate::measuring::Measuring;
use crate::overlay::{OverlayRef, SaveState};
use crate::platform::{Host, HostClock};
use crate::render::RendererRef;
use crate::sequence::{SequenceState, Sequencer, StartupLog};
use crate::storage::{PersistencePool, PoolEvent, PoolItem, PoolObject};
use crate::time::TimeSource;
use crate::world::{BlocksetRef, InputRef, PlayerRef, WorldRef};

/// Everything the engine is built from.
pub struct EngineParts {
    pub host: Rc<dyn Host>,
    pub backend: Rc<dyn Backend>,
    pub pool: Rc<dyn PersistencePool>,
    pub overlay: OverlayRef,
    pub config: Config,
    pub settings: EngineSettings,
}

pub(crate) struct EngineInner {
    pub(crate) host: Rc<dyn Host>,
    pub(crate) backend: Rc<dyn Backend>,
    pub(crate) pool: Rc<dyn PersistencePool>,
    pub(crate) overlay: OverlayRef,
    pub(crate) config: Config,
    pub(crate) settings: EngineSettings,

    pub(crate) measuring: Rc<Measuring>,
    pub(crate) draw: DrawScheduler,
    pub(crate) focus: ReactiveCell<bool>,
    top_world: ReactiveCell<Option<WorldRef>>,
    regenerate_ok: ReactiveCell<bool>,
    last_saved: Rc<Cell<Duration>>,

    pub(crate) startup_log: RefCell<StartupLog>,
    pub(crate) step_messages: RefCell<Vec<String>>,
    pub(crate) sequencer: RefCell<Option<Sequencer>>,
    pub(crate) resources: RefCell<Option<Resources>>,
    pub(crate) renderer: RefCell<Option<RendererRef>>,
    pub(crate) player: RefCell<Option<PlayerRef>>,
    pub(crate) input: RefCell<Option<InputRef>>,
    pub(crate) frame: RefCell<Option<FrameControl>>,
    pub(crate) subscriptions: RefCell<Vec<Subscription>>,
}

/// Shared handle to the engine context.
#[derive(Clone)]
pub struct Engine {
    pub(crate) inner: Rc<EngineInner>,
}

/// Non-owning handle, held by callbacks the engine hands out.
#[derive(Clone)]
pub(crate) struct WeakEngine(Weak<EngineInner>);

impl WeakEngine {
    pub(crate) fn upgrade(&self) -> Option<Engine> {
        self.0.upgrade().map(|inner| Engine { inner })
    }
}

fn same_world(a: &Option<WorldRef>, b: &Option<WorldRef>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

impl Engine {
    pub fn new(parts: EngineParts) -> Self {
        let EngineParts {
            host,
            backend,
            pool,
            overlay,
            config,
            settings,
        } = parts;

        let clock: Rc<dyn TimeSource> = Rc::new(HostClock(Rc::clone(&host)));
        let last_saved = Rc::new(Cell::new(host.now()));

        let engine = Self {
            inner: Rc::new(EngineInner {
                measuring: Rc::new(Measuring::new(Rc::clone(&clock))),
                draw: DrawScheduler::new(),
                focus: ReactiveCell::new("focus", false),
                top_world: ReactiveCell::with_eq("top_world", None, same_world),
                regenerate_ok: ReactiveCell::new("regenerate_ok", false),
                last_saved,
                startup_log: RefCell::new(StartupLog::new(clock)),
                step_messages: RefCell::new(Vec::new()),
                sequencer: RefCell::new(None),
                resources: RefCell::new(None),
                renderer: RefCell::new(None),
                player: RefCell::new(None),
                input: RefCell::new(None),
                frame: RefCell::new(None),
                subscriptions: RefCell::new(Vec::new()),
                host,
                backend,
                pool,
                overlay,
                config,
                settings,
            }),
        };

        engine.wire();
        engine.inner.measuring.start();
        engine.schedule_stats_rollover();
        engine
    }

    pub(crate) fn downgrade(&self) -> WeakEngine {
        WeakEngine(Rc::downgrade(&self.inner))
    }

    fn wire(&self) {
        let inner = &self.inner;
        let mut subs = Vec::new();

        let draw = inner.draw.clone();
        subs.push(inner.focus.when_changed(move |_| draw.request_draw()));
        let draw = inner.draw.clone();
        subs.push(
            inner
                .config
                .debug_force_render
                .when_changed(move |_| draw.request_draw()),
        );

        // Regeneration is offered only while nothing is stored under the
        // generated name.
        let pool = Rc::downgrade(&inner.pool);
        let name = inner.config.generate_name.clone();
        let regenerate_ok = inner.regenerate_ok.clone();
        let recompute: Rc<dyn Fn()> = Rc::new(move || {
            if let Some(pool) = pool.upgrade() {
                regenerate_ok.set(!pool.has(&name.get()));
            }
        });
        recompute();
        let r = Rc::clone(&recompute);
        subs.push(inner.config.generate_name.when_changed(move |_| r()));
        subs.push(inner.pool.listen(Box::new(move |_: &PoolEvent| recompute())));

        let host = Rc::clone(&inner.host);
        let overlay = Rc::clone(&inner.overlay);
        let last_saved = Rc::clone(&inner.last_saved);
        subs.push(inner.pool.status().now_and_when_changed(move |&pending| {
            let now = host.now();
            let state = if pending == 0 {
                last_saved.set(now);
                SaveState::Saved
            } else {
                SaveState::Unsaved {
                    minutes_since_save: now.saturating_sub(last_saved.get()).as_secs() / 60,
                }
            };
            overlay.borrow_mut().save_state(state);
        }));

        inner.subscriptions.borrow_mut().extend(subs);
    }

    fn schedule_stats_rollover(&self) {
        let weak = self.downgrade();
        self.inner.host.run_after(
            self.inner.settings.stats_interval,
            Box::new(move || {
                if let Some(engine) = weak.upgrade() {
                    engine.inner.measuring.rollover_second();
                    engine.schedule_stats_rollover();
                }
            }),
        );
    }

    /// Shows a startup progress line and logs it.
    pub fn startup_message(&self, text: &str) {
        let line = self.inner.startup_log.borrow_mut().record(text);
        log::info!("{line}");
        self.inner.overlay.borrow_mut().startup_message(&line);
    }

    // ── world selection ──────────────────────────────────────────────────

    pub fn top_world(&self) -> Option<WorldRef> {
        self.inner.top_world.get()
    }

    /// Makes `world` the one shown, and remembers its name if it is stored.
    pub fn set_top_world(&self, world: WorldRef) {
        let inner = &self.inner;
        inner.top_world.set(Some(Rc::clone(&world)));

        let player = inner.player.borrow().clone();
        if let Some(player) = player {
            player.borrow_mut().set_world(Rc::clone(&world));
        }

        if let Some(name) = inner.pool.name_of(&PoolObject::World(world)) {
            inner.config.current_top_world.set(name);
        }
        inner.draw.request_draw();
    }

    /// Generates a new world from the configured blockset, stores it under
    /// the configured name and shows it.
    pub fn regenerate(&self) -> Result<(), StartupError> {
        let inner = &self.inner;
        let config = &inner.config;

        let blockset_name = config.generate_blockset.get();
        let blockset = BlocksetRef::from_object(&blockset_name, inner.pool.get(&blockset_name)?)?;

        let world = inner.backend.generate_worlds(config, blockset);
        let name = config.generate_name.get();
        log::info!("regenerated world {name:?}");
        inner.pool.persist(PoolObject::World(Rc::clone(&world)), &name);
        self.set_top_world(world);
        Ok(())
    }

    /// Whether `regenerate` would create a new entry rather than replace one.
    pub fn regenerate_ok(&self) -> ReadOnlyCell<bool> {
        self.inner.regenerate_ok.read_only()
    }

    // ── persistence ──────────────────────────────────────────────────────

    pub fn save(&self) {
        self.inner.pool.flush_async();
    }

    /// Writes everything and stops the frame loop.
    pub fn shutdown(&self) {
        log::info!("shutting down");
        self.inner.pool.flush_now();
        if let Some(frame) = self.inner.frame.borrow().as_ref() {
            frame.stop();
        }
    }

    // ── accessors ────────────────────────────────────────────────────────

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.inner.settings
    }

    pub fn draw_scheduler(&self) -> &DrawScheduler {
        &self.inner.draw
    }

    /// Whether the view has input focus. Writable by the window layer.
    pub fn focus(&self) -> &ReactiveCell<bool> {
        &self.inner.focus
    }

    pub fn measuring(&self) -> &Rc<Measuring> {
        &self.inner.measuring
    }

    pub fn pool(&self) -> &Rc<dyn PersistencePool> {
        &self.inner.pool
    }

    pub fn renderer(&self) -> Option<RendererRef> {
        self.inner.renderer.borrow().clone()
    }

    pub fn player(&self) -> Option<PlayerRef> {
        self.inner.player.borrow().clone()
    }

    pub fn input(&self) -> Option<InputRef> {
        self.inner.input.borrow().clone()
    }

    pub fn frame_state(&self) -> FrameState {
        self.inner
            .frame
            .borrow()
            .as_ref()
            .map_or(FrameState::NotStarted, FrameControl::state)
    }

    pub fn frame_control(&self) -> Option<FrameControl> {
        self.inner.frame.borrow().clone()
    }

    pub fn startup_state(&self) -> SequenceState {
        self.inner
            .sequencer
            .borrow()
            .as_ref()
            .map_or(SequenceState::Idle, Sequencer::state)
    }

    /// Texts of the message steps shown so far, without timing prefixes.
    pub fn startup_messages(&self) -> Vec<String> {
        self.inner.step_messages.borrow().clone()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("startup", &self.startup_state())
            .field("frame", &self.frame_state())
            .field("draw_requested", &self.inner.draw.is_requested())
            .finish_non_exhaustive()
    }
}
