//! Startup sequence.
//!
//! Each step is a method on [`Engine`] run through the [`Sequencer`], so the
//! host gets a chance to paint the progress line between steps.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::backend::{InputInit, PlayerInit, RendererInit, Resources};
use crate::engine::{Engine, WeakEngine};
use crate::error::StartupError;
use crate::frame::{FrameDeps, FrameLoop};
use crate::overlay::Notice;
use crate::render::{RendererInitError, RendererRef};
use crate::sequence::{Continuation, Sequencer, Step, StepOutcome, StepResult};
use crate::storage::PoolItem;
use crate::time::SimulationClock;
use crate::world::{PlayerEvent, PlayerRef, WorldRef};

pub const DEFAULT_WORLD_NAME: &str = "Default World";
pub const DEFAULT_BLOCKSET_NAME: &str = "Default Blockset";

type OnDone = Box<dyn FnOnce(Result<(), StartupError>)>;
type DoneSlot = Rc<RefCell<Option<OnDone>>>;

fn engine_step(weak: &WeakEngine, f: fn(&Engine, Continuation) -> StepResult) -> Step {
    let weak = weak.clone();
    Step::action(move |cont| match weak.upgrade() {
        Some(engine) => f(&engine, cont),
        None => {
            cont.abandon();
            Ok(StepOutcome::Pending)
        }
    })
}

fn take_done(done: &DoneSlot) -> Option<OnDone> {
    done.borrow_mut().take()
}

impl Engine {
    /// Runs the startup sequence. `on_done` is called once on success or on
    /// the first failure; it is never called if startup halts because the
    /// renderer is unsupported.
    pub fn start(&self, on_done: impl FnOnce(Result<(), StartupError>) + 'static) {
        if self.inner.sequencer.borrow().is_some() {
            log::warn!("engine already started");
            return;
        }

        let sequencer = Sequencer::new(Rc::clone(&self.inner.host), self.inner.settings.step_yield);

        let weak = self.downgrade();
        sequencer.on_message(move |text| {
            if let Some(engine) = weak.upgrade() {
                engine.inner.step_messages.borrow_mut().push(text.to_string());
                engine.startup_message(text);
            }
        });

        let done: DoneSlot = Rc::new(RefCell::new(Some(Box::new(on_done))));
        let steps = self.startup_steps(Rc::clone(&done));

        let weak = self.downgrade();
        sequencer.start(steps, move |err| {
            log::error!("startup failed: {err}");
            if let Some(engine) = weak.upgrade() {
                let text = err.to_string();
                engine.startup_message(&text);
                engine.inner.overlay.borrow_mut().notice(Notice::LoadError(text));
            }
            if let Some(done) = take_done(&done) {
                done(Err(err));
            }
        });

        *self.inner.sequencer.borrow_mut() = Some(sequencer);
    }

    fn startup_steps(&self, done: DoneSlot) -> Vec<Step> {
        let worlds_message = if self.should_load_worlds() {
            "Loading saved worlds..."
        } else {
            "Creating worlds..."
        };

        let weak = self.downgrade();
        let ready = weak.clone();
        let step = |f: fn(&Engine, Continuation) -> StepResult| engine_step(&weak, f);

        vec![
            step(Engine::check_platform),
            Step::message("Downloading resources..."),
            step(Engine::fetch_resources),
            Step::message("Setting up WebGL..."),
            step(Engine::setup_renderer),
            Step::message(worlds_message),
            step(Engine::create_worlds),
            step(Engine::create_player),
            Step::message("Painting blocks..."),
            step(Engine::paint_blocks),
            Step::message("Finishing..."),
            step(Engine::finish),
            Step::message("Ready!"),
            Step::action(move |_| {
                if let Some(engine) = ready.upgrade() {
                    let total = engine.inner.startup_log.borrow().total();
                    log::info!("startup took {} ms", total.as_millis());
                }
                if let Some(done) = take_done(&done) {
                    done(Ok(()));
                }
                Ok(StepOutcome::Completed)
            }),
        ]
    }

    fn should_load_worlds(&self) -> bool {
        let config = &self.inner.config;
        !config.always_generate_world.get() && self.inner.pool.has(&config.current_top_world.get())
    }

    /// A startup line that is not its own step.
    fn startup_detail(&self, text: &str) {
        self.startup_message(text);
    }

    // ── steps ────────────────────────────────────────────────────────────

    fn check_platform(&self, _: Continuation) -> StepResult {
        if let Some(missing) = self.inner.backend.missing_platform_features() {
            log::warn!("missing platform features: {missing}");
            self.inner
                .overlay
                .borrow_mut()
                .notice(Notice::MissingFeatures(missing));
        }
        Ok(StepOutcome::Completed)
    }

    fn fetch_resources(&self, cont: Continuation) -> StepResult {
        let weak = self.downgrade();
        self.inner.backend.fetch_resources(
            &self.inner.host,
            Box::new(move |result: Result<Resources, String>| match result {
                Ok(resources) => {
                    if let Some(engine) = weak.upgrade() {
                        log::debug!("{} shader source(s) loaded", resources.shaders.len());
                        *engine.inner.resources.borrow_mut() = Some(resources);
                    }
                    cont.resume();
                }
                Err(reason) => cont.fail(StartupError::Resources(reason)),
            }),
        );
        Ok(StepOutcome::Pending)
    }

    fn setup_renderer(&self, cont: Continuation) -> StepResult {
        let created = {
            let stored = self.inner.resources.borrow();
            let Some(resources) = stored.as_ref() else {
                return Err(StartupError::Step("resources were not loaded".into()));
            };
            self.inner.backend.create_renderer(RendererInit {
                config: &self.inner.config,
                resources,
                draw: self.inner.draw.clone(),
            })
        };

        match created {
            Ok(renderer) => {
                *self.inner.renderer.borrow_mut() = Some(renderer);
                self.inner.draw.request_draw();
                Ok(StepOutcome::Completed)
            }
            Err(RendererInitError::Unsupported(reason)) => {
                log::error!("renderer unsupported: {reason}");
                self.inner
                    .overlay
                    .borrow_mut()
                    .notice(Notice::RendererUnsupported(reason));
                cont.abandon();
                Ok(StepOutcome::Pending)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn create_worlds(&self, _: Continuation) -> StepResult {
        let pool = Rc::downgrade(&self.inner.pool);
        self.inner.host.on_shutdown(Box::new(move || {
            if let Some(pool) = pool.upgrade() {
                pool.flush_now();
            }
        }));

        if self.top_world().is_some() {
            log::debug!("top world already chosen; skipping world selection");
            return Ok(StepOutcome::Completed);
        }

        let world = self.select_top_world();
        self.set_top_world(world);
        Ok(StepOutcome::Completed)
    }

    fn create_player(&self, _: Continuation) -> StepResult {
        let renderer = self.require_renderer()?;
        let world = self
            .top_world()
            .ok_or_else(|| StartupError::Step("no world was selected".into()))?;

        let player = self.inner.backend.create_player(PlayerInit {
            config: self.inner.config.clone(),
            world,
            renderer,
            draw: self.inner.draw.clone(),
        });

        let events = player.borrow().events();
        let weak = self.downgrade();
        let sub = events.listen(move |event| {
            if *event == PlayerEvent::ChangedWorld {
                if let Some(engine) = weak.upgrade() {
                    engine.schedule_world_label();
                }
            }
        });
        self.inner.subscriptions.borrow_mut().push(sub);

        *self.inner.player.borrow_mut() = Some(player);
        self.refresh_world_label();
        Ok(StepOutcome::Completed)
    }

    fn paint_blocks(&self, _: Continuation) -> StepResult {
        let player = self.require_player()?;
        let world = player.borrow().world();
        let blockset = world.borrow().blockset();
        blockset.prepare_render_data();
        Ok(StepOutcome::Completed)
    }

    fn finish(&self, _: Continuation) -> StepResult {
        let inner = &self.inner;
        let renderer = self.require_renderer()?;
        let player = self.require_player()?;

        let weak = self.downgrade();
        let input = inner.backend.create_input(InputInit {
            config: inner.config.clone(),
            player: Rc::clone(&player),
            renderer: Rc::clone(&renderer),
            focus: inner.focus.clone(),
            draw: inner.draw.clone(),
            save: Rc::new(move || {
                if let Some(engine) = weak.upgrade() {
                    engine.save();
                }
            }),
        });
        *inner.input.borrow_mut() = Some(Rc::clone(&input));

        let settings = &inner.settings;
        let mut frame_loop = FrameLoop::new(FrameDeps {
            clock: SimulationClock::with_catchup(settings.timestep, settings.max_catchup()),
            renderer,
            player,
            input: Some(input),
            draw: inner.draw.clone(),
            measuring: Rc::clone(&inner.measuring),
            overlay: Rc::clone(&inner.overlay),
            focus: inner.focus.read_only(),
            force_render: inner.config.debug_force_render.read_only(),
            persistence_status: inner.pool.status(),
        });
        frame_loop.mark_ready();
        let control = frame_loop.control();

        let frame_loop = Rc::new(RefCell::new(frame_loop));
        FrameLoop::start(&frame_loop, Rc::clone(&inner.host));
        *inner.frame.borrow_mut() = Some(control);

        inner.draw.request_draw();
        Ok(StepOutcome::Completed)
    }

    // ── world selection ──────────────────────────────────────────────────

    fn select_top_world(&self) -> WorldRef {
        let config = &self.inner.config;
        self.get_or_default_or_make(&config.current_top_world.get(), DEFAULT_WORLD_NAME, || {
            let blockset = self.get_or_default_or_make(
                &config.generate_blockset.get(),
                DEFAULT_BLOCKSET_NAME,
                || {
                    self.startup_detail("  Creating default blockset...");
                    self.inner
                        .backend
                        .new_default_blockset(config.generate_tile_size.get())
                },
            );
            self.startup_detail("  Creating overworld...");
            self.inner.backend.generate_worlds(config, blockset)
        })
    }

    /// Loads `selection`, then `default_name`, then falls back to `make`.
    ///
    /// Unreadable entries are reported and skipped. A freshly made object is
    /// stored under `default_name` unless something is already there, the
    /// pool is not persistent, or generation is forced.
    fn get_or_default_or_make<T: PoolItem>(
        &self,
        selection: &str,
        default_name: &str,
        make: impl FnOnce() -> T,
    ) -> T {
        let pool = &self.inner.pool;
        let regenerate = self.inner.config.always_generate_world.get();

        if !regenerate {
            for (which, name) in [("selected", selection), ("default", default_name)] {
                if !pool.has(name) {
                    continue;
                }
                match pool.get(name).and_then(|object| T::from_object(name, object)) {
                    Ok(item) => return item,
                    Err(err) => {
                        log::warn!("failed to load {which} {}: {err}", T::KIND);
                        self.startup_detail(&format!("  Could not load {name:?}; using a fallback"));
                    }
                }
            }
        }

        let item = make();
        if pool.available() && !regenerate && !pool.has(default_name) {
            pool.persist(item.clone().into_object(), default_name);
        }
        item
    }

    // ── helpers ──────────────────────────────────────────────────────────

    fn require_renderer(&self) -> Result<RendererRef, StartupError> {
        self.renderer()
            .ok_or_else(|| StartupError::Step("renderer was not created".into()))
    }

    fn require_player(&self) -> Result<PlayerRef, StartupError> {
        self.player()
            .ok_or_else(|| StartupError::Step("player was not created".into()))
    }

    fn schedule_world_label(&self) {
        let weak = self.downgrade();
        self.inner.host.run_after(
            Duration::ZERO,
            Box::new(move || {
                if let Some(engine) = weak.upgrade() {
                    engine.refresh_world_label();
                }
            }),
        );
    }

    /// Shows the player's current world. Deferred if the player is mid-update.
    fn refresh_world_label(&self) {
        let Some(player) = self.player() else { return };
        let label = match player.try_borrow() {
            Ok(player) => {
                let world = player.world();
                let label = world.borrow().label();
                label
            }
            Err(_) => {
                self.schedule_world_label();
                return;
            }
        };
        self.inner
            .overlay
            .borrow_mut()
            .current_world(label.as_deref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::frame::FrameState;
    use crate::sequence::SequenceState;
    use crate::storage::{MemoryPool, PersistencePool, PoolObject};
    use crate::testing::{EngineRig, FakeBackend, FakeBlockset, FakeWorld};

    fn saved_world(name: &str) -> WorldRef {
        Rc::new(RefCell::new(FakeWorld::new(name)))
    }

    // ── happy path ───────────────────────────────────────────────────────

    #[test]
    fn empty_pool_startup_shows_six_messages_and_leaves_a_draw_pending() {
        let rig = EngineRig::new();
        rig.start();
        assert_eq!(rig.run_startup(), SequenceState::Finished);

        assert_eq!(
            rig.engine.startup_messages(),
            [
                "Downloading resources...",
                "Setting up WebGL...",
                "Creating worlds...",
                "Painting blocks...",
                "Finishing...",
                "Ready!",
            ]
        );
        assert_eq!(rig.engine.frame_state(), FrameState::Running);
        assert!(rig.engine.draw_scheduler().is_requested());
        assert_eq!(*rig.result.borrow(), Some(Ok(())));
    }

    #[test]
    fn fresh_defaults_are_generated_and_stored() {
        let rig = EngineRig::new();
        rig.start();
        rig.run_startup();

        assert_eq!(rig.backend.blocksets_made.get(), 1);
        assert_eq!(rig.backend.worlds_made.get(), 1);
        assert!(rig.pool.has(DEFAULT_WORLD_NAME));
        assert!(rig.pool.has(DEFAULT_BLOCKSET_NAME));
        assert_eq!(rig.engine.config().current_top_world.get(), DEFAULT_WORLD_NAME);

        let overlay = rig.overlay.borrow();
        assert!(overlay.messages.iter().any(|m| m.ends_with("  Creating default blockset...")));
        assert!(overlay.messages.iter().any(|m| m.ends_with("  Creating overworld...")));
        assert_eq!(overlay.worlds, [Some("generated 1".to_string())]);
    }

    #[test]
    fn first_frame_after_startup_draws() {
        let rig = EngineRig::new();
        rig.start();
        rig.run_startup();

        rig.clock.advance(Duration::from_millis(16));
        rig.queue.run_frame();
        assert_eq!(rig.backend.renderer.borrow().frames, 1);
        assert!(!rig.engine.draw_scheduler().is_requested());
    }

    #[test]
    fn blockset_render_data_is_prepared() {
        let pool = MemoryPool::new();
        let blockset = Rc::new(FakeBlockset::default());
        let world = Rc::new(RefCell::new(FakeWorld::with_blockset("home", blockset.clone())));
        pool.persist(PoolObject::World(world), DEFAULT_WORLD_NAME);

        let rig = EngineRig::with(FakeBackend::default(), pool, Config::default());
        rig.start();
        rig.run_startup();
        assert_eq!(blockset.prepared.get(), 1);
    }

    // ── world selection ──────────────────────────────────────────────────

    #[test]
    fn saved_world_is_loaded() {
        let pool = MemoryPool::new();
        let saved = saved_world("home");
        pool.persist(PoolObject::World(Rc::clone(&saved)), DEFAULT_WORLD_NAME);

        let rig = EngineRig::with(FakeBackend::default(), pool, Config::default());
        rig.start();
        rig.run_startup();

        assert!(rig.engine.startup_messages().contains(&"Loading saved worlds...".to_string()));
        assert_eq!(rig.backend.worlds_made.get(), 0);
        assert!(Rc::ptr_eq(&rig.engine.top_world().unwrap(), &saved));
    }

    #[test]
    fn unreadable_selection_falls_back_to_default() {
        let pool = MemoryPool::new();
        pool.insert_unreadable("Mine", "corrupt");
        let default = saved_world("default");
        pool.persist(PoolObject::World(Rc::clone(&default)), DEFAULT_WORLD_NAME);
        let config = Config::default();
        config.current_top_world.set("Mine".to_string());

        let rig = EngineRig::with(FakeBackend::default(), pool, config);
        rig.start();
        assert_eq!(rig.run_startup(), SequenceState::Finished);

        assert!(Rc::ptr_eq(&rig.engine.top_world().unwrap(), &default));
        assert_eq!(rig.backend.worlds_made.get(), 0);
        assert!(rig
            .overlay
            .borrow()
            .messages
            .iter()
            .any(|m| m.contains("Could not load \"Mine\"")));
    }

    #[test]
    fn unreadable_default_is_not_overwritten() {
        let pool = MemoryPool::new();
        pool.insert_unreadable(DEFAULT_WORLD_NAME, "corrupt");

        let rig = EngineRig::with(FakeBackend::default(), pool, Config::default());
        rig.start();
        assert_eq!(rig.run_startup(), SequenceState::Finished);

        assert_eq!(rig.backend.worlds_made.get(), 1);
        assert!(rig.pool.get(DEFAULT_WORLD_NAME).is_err());
    }

    #[test]
    fn forced_generation_skips_saved_worlds_and_stores_nothing() {
        let pool = MemoryPool::new();
        pool.persist(PoolObject::World(saved_world("home")), DEFAULT_WORLD_NAME);
        let config = Config::default();
        config.always_generate_world.set(true);

        let rig = EngineRig::with(FakeBackend::default(), pool, config);
        rig.start();
        rig.run_startup();

        assert!(rig.engine.startup_messages().contains(&"Creating worlds...".to_string()));
        assert_eq!(rig.backend.worlds_made.get(), 1);
        assert_eq!(rig.pool.names(), [DEFAULT_WORLD_NAME]);
    }

    #[test]
    fn ephemeral_pool_stores_nothing() {
        let rig = EngineRig::with(FakeBackend::default(), MemoryPool::ephemeral(), Config::default());
        rig.start();
        rig.run_startup();
        assert!(rig.pool.names().is_empty());
    }

    #[test]
    fn preset_top_world_is_kept() {
        let rig = EngineRig::new();
        let preset = saved_world("preset");
        rig.engine.set_top_world(Rc::clone(&preset));
        rig.start();
        rig.run_startup();

        assert_eq!(rig.backend.worlds_made.get(), 0);
        assert!(Rc::ptr_eq(&rig.engine.top_world().unwrap(), &preset));
    }

    // ── failures ─────────────────────────────────────────────────────────

    #[test]
    fn fetch_failure_reaches_on_done_and_shows_a_notice() {
        let backend = FakeBackend {
            fetch_error: Some("offline".into()),
            ..FakeBackend::default()
        };
        let rig = EngineRig::with(backend, MemoryPool::new(), Config::default());
        rig.start();

        assert_eq!(rig.run_startup(), SequenceState::Failed(2));
        let expected = "failed to download resources: offline".to_string();
        assert_eq!(*rig.result.borrow(), Some(Err(expected.clone())));
        assert_eq!(rig.overlay.borrow().notices, [Notice::LoadError(expected)]);
        assert_eq!(rig.engine.startup_messages(), ["Downloading resources..."]);
        assert!(rig.engine.renderer().is_none());
        assert_eq!(rig.engine.frame_state(), FrameState::NotStarted);
    }

    #[test]
    fn unsupported_renderer_halts_with_notice() {
        let backend = FakeBackend::default();
        *backend.renderer_error.borrow_mut() =
            Some(RendererInitError::Unsupported("no adapter".into()));
        let rig = EngineRig::with(backend, MemoryPool::new(), Config::default());
        rig.start();

        assert_eq!(rig.run_startup(), SequenceState::Halted(4));
        assert_eq!(*rig.result.borrow(), None);
        assert_eq!(
            rig.overlay.borrow().notices,
            [Notice::RendererUnsupported("no adapter".into())]
        );
    }

    #[test]
    fn renderer_failure_goes_to_on_done() {
        let backend = FakeBackend::default();
        *backend.renderer_error.borrow_mut() =
            Some(RendererInitError::Failed(anyhow::anyhow!("device lost during init")));
        let rig = EngineRig::with(backend, MemoryPool::new(), Config::default());
        rig.start();

        assert_eq!(rig.run_startup(), SequenceState::Failed(4));
        assert_eq!(
            *rig.result.borrow(),
            Some(Err("device lost during init".to_string()))
        );
    }

    #[test]
    fn missing_features_notice_does_not_stop_startup() {
        let backend = FakeBackend {
            missing: Some("float textures".into()),
            ..FakeBackend::default()
        };
        let rig = EngineRig::with(backend, MemoryPool::new(), Config::default());
        rig.start();

        assert_eq!(rig.run_startup(), SequenceState::Finished);
        assert_eq!(
            rig.overlay.borrow().notices,
            [Notice::MissingFeatures("float textures".into())]
        );
    }

    // ── lifecycle ────────────────────────────────────────────────────────

    #[test]
    fn host_shutdown_flushes_the_pool() {
        let rig = EngineRig::new();
        rig.start();
        rig.run_startup();
        assert_eq!(rig.pool.status().get(), 2);

        rig.queue.shutdown();
        assert_eq!(rig.pool.status().get(), 0);
    }

    #[test]
    fn second_start_is_ignored() {
        let rig = EngineRig::new();
        rig.start();
        rig.start();
        rig.run_startup();
        assert_eq!(rig.engine.startup_messages().len(), 6);
    }
}
