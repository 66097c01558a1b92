use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::cell::ReadOnlyCell;
use crate::draw::DrawScheduler;
use crate::measuring::{Measuring, ProgressTracker};
use crate::overlay::{OverlayRef, ProgressKind};
use crate::platform::Host;
use crate::render::{FrameView, RendererRef};
use crate::time::SimulationClock;
use crate::world::{InputRef, PlayerRef};

use super::RenderDiagnostics;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameState {
    NotStarted,
    Running,
    Stopped,
}

/// Everything the loop reads or drives each frame.
pub struct FrameDeps {
    pub clock: SimulationClock,
    pub renderer: RendererRef,
    pub player: PlayerRef,
    pub input: Option<InputRef>,
    pub draw: DrawScheduler,
    pub measuring: Rc<Measuring>,
    pub overlay: OverlayRef,
    pub focus: ReadOnlyCell<bool>,
    pub force_render: ReadOnlyCell<bool>,
    /// Pending persistence writes.
    pub persistence_status: ReadOnlyCell<usize>,
}

struct Shared {
    state: Cell<FrameState>,
    suppressed: Cell<bool>,
    frames_drawn: Cell<u64>,
}

/// Observes and stops a frame loop without borrowing it.
#[derive(Clone)]
pub struct FrameControl {
    shared: Rc<Shared>,
}

impl FrameControl {
    pub fn state(&self) -> FrameState {
        self.shared.state.get()
    }

    /// The loop exits at its next iteration.
    pub fn stop(&self) {
        if self.shared.state.replace(FrameState::Stopped) != FrameState::Stopped {
            log::debug!("frame loop stopping");
        }
    }

    /// Whether draws are currently held back by a lost render context.
    pub fn draws_suppressed(&self) -> bool {
        self.shared.suppressed.get()
    }

    pub fn frames_drawn(&self) -> u64 {
        self.shared.frames_drawn.get()
    }
}

impl fmt::Debug for FrameControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameControl")
            .field("state", &self.state())
            .field("draws_suppressed", &self.draws_suppressed())
            .field("frames_drawn", &self.frames_drawn())
            .finish()
    }
}

/// Steps the simulation at a fixed rate and draws when a draw was requested.
pub struct FrameLoop {
    shared: Rc<Shared>,
    ready: bool,
    deps: FrameDeps,
    diagnostics: RenderDiagnostics,
    chunk_progress: ProgressTracker,
    persistence_progress: ProgressTracker,
}

impl FrameLoop {
    pub fn new(deps: FrameDeps) -> Self {
        Self {
            shared: Rc::new(Shared {
                state: Cell::new(FrameState::NotStarted),
                suppressed: Cell::new(false),
                frames_drawn: Cell::new(0),
            }),
            ready: false,
            deps,
            diagnostics: RenderDiagnostics::new(),
            chunk_progress: ProgressTracker::new(),
            persistence_progress: ProgressTracker::new(),
        }
    }

    /// Allows drawing. Until then frames only step the simulation.
    pub fn mark_ready(&mut self) {
        self.ready = true;
    }

    pub fn control(&self) -> FrameControl {
        FrameControl {
            shared: Rc::clone(&self.shared),
        }
    }

    pub fn state(&self) -> FrameState {
        self.shared.state.get()
    }

    pub fn draws_suppressed(&self) -> bool {
        self.shared.suppressed.get()
    }

    pub fn stop(&self) {
        self.control().stop();
    }

    /// Starts re-arming through `host.next_frame`. Only the first call has an effect.
    pub fn start(this: &Rc<RefCell<Self>>, host: Rc<dyn Host>) {
        {
            let frame_loop = this.borrow();
            if frame_loop.state() != FrameState::NotStarted {
                log::warn!("frame loop already started");
                return;
            }
            frame_loop.shared.state.set(FrameState::Running);
        }
        log::debug!("frame loop started");
        Self::arm(Rc::clone(this), host);
    }

    fn arm(this: Rc<RefCell<Self>>, host: Rc<dyn Host>) {
        let next_host = Rc::clone(&host);
        host.next_frame(Box::new(move || {
            let now = next_host.now();
            let again = this.borrow_mut().iterate(now);
            if again {
                Self::arm(this, next_host);
            }
        }));
    }

    /// Runs one frame at time `now`. Returns whether the loop should continue.
    pub fn iterate(&mut self, now: Duration) -> bool {
        if self.state() == FrameState::Stopped {
            return false;
        }

        let FrameDeps {
            clock,
            player,
            input,
            measuring,
            ..
        } = &mut self.deps;
        let dt = clock.step_interval();
        clock.tick(now, || step_simulation(player, input.as_ref(), measuring, dt));

        if self.deps.renderer.borrow_mut().check_for_viewport_change() {
            self.deps.draw.request_draw();
        }

        let lost = self.deps.renderer.borrow().context_lost();
        self.note_context(lost);

        if self.ready && !lost && self.deps.draw.consume_if_requested() {
            self.draw_frame();
            if self.deps.force_render.get() {
                self.deps.draw.request_draw();
            }
        } else {
            let errors = self.deps.renderer.borrow_mut().take_errors();
            if !errors.is_empty() {
                log::debug!("holding {} render error(s) for the next drawn frame", errors.len());
                self.diagnostics.hold(errors);
            }
        }

        self.refresh_stats();
        self.state() != FrameState::Stopped
    }

    fn note_context(&self, lost: bool) {
        if self.shared.suppressed.replace(lost) != lost {
            if lost {
                log::warn!("render context lost; drawing suspended");
            } else {
                log::info!("render context restored");
            }
        }
    }

    fn draw_frame(&mut self) {
        let deps = &self.deps;

        let view = {
            let player = deps.player.borrow();
            FrameView {
                eye: player.position(),
                exposure: player.exposure(),
                focused: deps.focus.get(),
            }
        };

        let (errors, chunk_todo, counters) = {
            let mut renderer = deps.renderer.borrow_mut();
            renderer.update_deferred_work();

            deps.measuring.frame.start();
            renderer.render_one_frame(&view);
            deps.measuring.frame.end();

            (
                renderer.take_errors(),
                renderer.deferred_work_remaining(),
                renderer.take_frame_counters(),
            )
        };

        let text = self.diagnostics.compose(view.eye, errors);
        let pending_writes = deps.persistence_status.get();
        let chunks = self.chunk_progress.update(chunk_todo);
        let writes = self.persistence_progress.update(pending_writes);

        {
            let mut overlay = deps.overlay.borrow_mut();
            overlay.scene_info(&text);
            overlay.progress(ProgressKind::Chunks, chunks);
            overlay.progress(ProgressKind::Persistence, writes);
        }

        let m = &deps.measuring;
        m.chunk_queue_size.set(chunk_todo as u64);
        m.persistence_queue_size.set(pending_writes as u64);
        m.rollover_frame();
        m.frame_count.inc();
        m.bundles.add(counters.bundles_drawn);
        m.vertices.add(counters.vertices_drawn);

        self.shared
            .frames_drawn
            .set(self.shared.frames_drawn.get() + 1);
    }

    fn refresh_stats(&self) {
        let visible = self.deps.overlay.borrow().stats_visible();
        if visible {
            let report = self.deps.measuring.report();
            self.deps.overlay.borrow_mut().show_stats(&report);
        }
    }
}

fn step_simulation(player: &PlayerRef, input: Option<&InputRef>, m: &Measuring, dt: Duration) {
    m.sim.start();
    player.borrow_mut().step(dt);
    if let Some(input) = input {
        input.borrow_mut().step(dt);
    }
    m.sim.end();
    m.sim_count.inc();
}

impl fmt::Debug for FrameLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameLoop")
            .field("state", &self.state())
            .field("ready", &self.ready)
            .field("clock", &self.deps.clock)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::ReactiveCell;
    use crate::platform::TaskQueue;
    use crate::render::RenderError;
    use crate::testing::{FakePlayer, FakeRenderer, FakeWorld, RecordingOverlay};
    use crate::time::{ManualClock, TimeSource};
    use crate::world::WorldRef;

    const STEP: Duration = Duration::from_millis(10);

    struct Rig {
        frame_loop: FrameLoop,
        renderer: Rc<RefCell<FakeRenderer>>,
        player: Rc<RefCell<FakePlayer>>,
        overlay: Rc<RefCell<RecordingOverlay>>,
        draw: DrawScheduler,
        force: ReactiveCell<bool>,
        pending_writes: ReactiveCell<usize>,
        measuring: Rc<Measuring>,
    }

    fn rig() -> Rig {
        let clock: Rc<dyn TimeSource> = Rc::new(ManualClock::new());
        let renderer = Rc::new(RefCell::new(FakeRenderer::default()));
        let world: WorldRef = Rc::new(RefCell::new(FakeWorld::new("w")));
        let player = Rc::new(RefCell::new(FakePlayer::new(world)));
        let overlay = Rc::new(RefCell::new(RecordingOverlay::default()));
        let draw = DrawScheduler::new();
        let force = ReactiveCell::new("force", false);
        let pending_writes = ReactiveCell::new("pending", 0usize);
        let measuring = Rc::new(Measuring::new(clock));
        measuring.start();

        let frame_loop = FrameLoop::new(FrameDeps {
            clock: SimulationClock::with_catchup(STEP, STEP * 3),
            renderer: renderer.clone(),
            player: player.clone(),
            input: None,
            draw: draw.clone(),
            measuring: Rc::clone(&measuring),
            overlay: overlay.clone(),
            focus: ReactiveCell::new("focus", true).read_only(),
            force_render: force.read_only(),
            persistence_status: pending_writes.read_only(),
        });

        Rig {
            frame_loop,
            renderer,
            player,
            overlay,
            draw,
            force,
            pending_writes,
            measuring,
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    // ── simulation ───────────────────────────────────────────────────────

    #[test]
    fn steady_cadence_runs_one_step_per_frame() {
        let mut r = rig();
        r.frame_loop.iterate(ms(0));
        for i in 1..=5 {
            r.frame_loop.iterate(ms(10 * i));
        }
        assert_eq!(r.player.borrow().steps, 5);
        assert_eq!(r.measuring.sim_count.value(), 5);
    }

    #[test]
    fn stall_runs_at_most_the_catchup_window() {
        let mut r = rig();
        r.frame_loop.iterate(ms(0));
        r.frame_loop.iterate(ms(100));
        assert_eq!(r.player.borrow().steps, 3);

        r.frame_loop.iterate(ms(110));
        assert_eq!(r.player.borrow().steps, 4);
    }

    #[test]
    fn simulation_runs_before_ready() {
        let mut r = rig();
        r.draw.request_draw();
        r.frame_loop.iterate(ms(0));
        r.frame_loop.iterate(ms(10));

        assert_eq!(r.player.borrow().steps, 1);
        assert_eq!(r.renderer.borrow().frames, 0);
        assert!(r.draw.is_requested(), "request survives until drawing is allowed");
    }

    // ── drawing ──────────────────────────────────────────────────────────

    #[test]
    fn draws_once_per_request() {
        let mut r = rig();
        r.frame_loop.mark_ready();
        r.frame_loop.iterate(ms(0));
        assert_eq!(r.renderer.borrow().frames, 0);

        r.draw.request_draw();
        r.draw.request_draw();
        r.frame_loop.iterate(ms(10));
        r.frame_loop.iterate(ms(20));
        assert_eq!(r.renderer.borrow().frames, 1);
        assert_eq!(r.frame_loop.control().frames_drawn(), 1);
        assert_eq!(r.measuring.frame_count.value(), 1);
        assert_eq!(r.measuring.bundles.value(), 4);
    }

    #[test]
    fn force_render_keeps_drawing() {
        let mut r = rig();
        r.frame_loop.mark_ready();
        r.force.set(true);
        r.draw.request_draw();
        for i in 0..4 {
            r.frame_loop.iterate(ms(10 * i));
        }
        assert_eq!(r.renderer.borrow().frames, 4);
        assert!(r.draw.is_requested());
    }

    #[test]
    fn viewport_change_requests_a_draw() {
        let mut r = rig();
        r.frame_loop.mark_ready();
        r.renderer.borrow_mut().viewport_changed = true;
        r.frame_loop.iterate(ms(0));
        assert_eq!(r.renderer.borrow().frames, 1);
    }

    #[test]
    fn frame_view_carries_player_and_focus() {
        let mut r = rig();
        r.frame_loop.mark_ready();
        r.frame_loop.iterate(ms(0));
        r.draw.request_draw();
        r.frame_loop.iterate(ms(10));

        let view = r.renderer.borrow().last_view.unwrap();
        assert_eq!(view.eye, [1.0, 0.0, 0.0]);
        assert!(view.focused);
        assert_eq!(r.overlay.borrow().scene.last().unwrap(), "XYZ: 1.00,0.00,0.00\n");
    }

    #[test]
    fn progress_tracks_deferred_work_and_pending_writes() {
        let mut r = rig();
        r.frame_loop.mark_ready();
        r.renderer.borrow_mut().deferred = 5;
        r.pending_writes.set(2);
        r.draw.request_draw();
        r.frame_loop.iterate(ms(0));

        let progress = r.overlay.borrow().progress.clone();
        assert_eq!(progress[0], (ProgressKind::Chunks, Some(0.0)));
        assert_eq!(progress[1], (ProgressKind::Persistence, Some(0.0)));
        assert_eq!(r.measuring.chunk_queue_size.last(), 4);
        assert_eq!(r.measuring.persistence_queue_size.last(), 2);
    }

    // ── context loss ─────────────────────────────────────────────────────

    #[test]
    fn lost_context_suppresses_draws_until_restored() {
        let mut r = rig();
        r.frame_loop.mark_ready();
        let lost = r.renderer.borrow().lost.clone();

        lost.set(true);
        r.draw.request_draw();
        r.frame_loop.iterate(ms(0));
        r.frame_loop.iterate(ms(10));
        assert_eq!(r.renderer.borrow().frames, 0);
        assert_eq!(r.player.borrow().steps, 1);
        assert!(r.frame_loop.draws_suppressed());
        assert_eq!(r.frame_loop.state(), FrameState::NotStarted);

        lost.set(false);
        r.frame_loop.iterate(ms(20));
        assert_eq!(r.renderer.borrow().frames, 1);
        assert!(!r.frame_loop.draws_suppressed());
    }

    #[test]
    fn errors_are_drained_every_frame() {
        let mut r = rig();
        r.frame_loop.mark_ready();
        r.renderer.borrow_mut().errors = vec![RenderError::Timeout, RenderError::ContextLost];
        r.frame_loop.iterate(ms(0));
        assert!(r.renderer.borrow().errors.is_empty(), "undrawn frame still drains");

        r.renderer.borrow_mut().errors =
            vec![RenderError::InvalidOperation, RenderError::ContextLost];
        r.draw.request_draw();
        r.frame_loop.iterate(ms(10));
        assert!(r.renderer.borrow().errors.is_empty());
        let scene = r.overlay.borrow().scene.last().cloned().unwrap();
        assert!(
            scene.ends_with("Render errors: TIMEOUT INVALID_OPERATION\n"),
            "{scene}"
        );
    }

    #[test]
    fn errors_from_undrawn_frames_reach_the_next_scene_text() {
        let mut r = rig();
        r.frame_loop.mark_ready();
        r.renderer.borrow_mut().errors = vec![RenderError::OutOfMemory];
        r.frame_loop.iterate(ms(0));
        assert_eq!(r.renderer.borrow().frames, 0);
        assert!(r.overlay.borrow().scene.is_empty());

        r.draw.request_draw();
        r.frame_loop.iterate(ms(10));
        let scene = r.overlay.borrow().scene.last().cloned().unwrap();
        assert_eq!(scene, "XYZ: 1.00,0.00,0.00\nRender errors: OUT_OF_MEMORY\n");
    }

    // ── stats ────────────────────────────────────────────────────────────

    #[test]
    fn stats_are_pushed_only_when_visible() {
        let mut r = rig();
        r.frame_loop.iterate(ms(0));
        assert!(r.overlay.borrow().stats.is_empty());

        r.overlay.borrow_mut().stats_visible = true;
        r.frame_loop.iterate(ms(10));
        assert_eq!(r.overlay.borrow().stats.len(), 1);
    }

    // ── lifecycle ────────────────────────────────────────────────────────

    #[test]
    fn start_rearms_through_the_host_until_stopped() {
        let r = rig();
        let clock = ManualClock::new();
        let queue = Rc::new(TaskQueue::new(Rc::new(clock.clone())));
        let player = r.player.clone();

        let frame_loop = Rc::new(RefCell::new(r.frame_loop));
        let control = frame_loop.borrow().control();
        FrameLoop::start(&frame_loop, queue.clone());
        assert_eq!(control.state(), FrameState::Running);

        for _ in 0..3 {
            clock.advance(STEP);
            queue.run_frame();
        }
        assert_eq!(player.borrow().steps, 2);
        assert!(queue.has_frame_tasks());

        control.stop();
        queue.run_frame();
        assert!(!queue.has_frame_tasks());
        assert_eq!(control.state(), FrameState::Stopped);
    }

    #[test]
    fn second_start_is_ignored() {
        let r = rig();
        let queue = Rc::new(TaskQueue::new(Rc::new(ManualClock::new())));
        let frame_loop = Rc::new(RefCell::new(r.frame_loop));
        FrameLoop::start(&frame_loop, queue.clone());
        FrameLoop::start(&frame_loop, queue.clone());
        assert_eq!(queue.run_frame(), 1);
    }
}
