//! Engine configuration.
//!
//! `EngineSettings` holds the fixed scheduling parameters chosen at startup.
//! `Config` holds the user-facing options; each one is a `ReactiveCell` so the
//! engine can react when an option is changed at runtime.

use std::time::Duration;

use crate::cell::ReactiveCell;
use crate::time::DEFAULT_CATCHUP_STEPS;

/// Scheduling parameters.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Length of one simulation step.
    pub timestep: Duration,

    /// Catch-up window, in whole steps.
    ///
    /// After a stall the simulation runs at most this many steps in one frame
    /// and drops the rest of the lost time.
    pub catchup_steps: u32,

    /// Period of the statistics rollover.
    pub stats_interval: Duration,

    /// Delay the startup sequencer yields to the host between steps.
    pub step_yield: Duration,
}

impl EngineSettings {
    pub fn max_catchup(&self) -> Duration {
        self.timestep * self.catchup_steps.max(1)
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            timestep: Duration::from_nanos(16_666_667), // 60 Hz
            catchup_steps: DEFAULT_CATCHUP_STEPS,
            stats_interval: Duration::from_secs(1),
            step_yield: Duration::from_millis(1),
        }
    }
}

/// User options.
///
/// Cloning shares the underlying cells.
#[derive(Debug, Clone)]
pub struct Config {
    /// Redraw every frame even when nothing changed.
    pub debug_force_render: ReactiveCell<bool>,
    /// Ignore saved worlds and generate fresh ones at startup.
    pub always_generate_world: ReactiveCell<bool>,
    /// Name of the world to open at startup.
    pub current_top_world: ReactiveCell<String>,
    /// Blockset used when generating worlds.
    pub generate_blockset: ReactiveCell<String>,
    /// Name under which `regenerate` stores its world.
    pub generate_name: ReactiveCell<String>,
    pub generate_tile_size: ReactiveCell<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug_force_render: ReactiveCell::new("debug_force_render", false),
            always_generate_world: ReactiveCell::new("always_generate_world", false),
            current_top_world: ReactiveCell::new("current_top_world", "Default World".to_string()),
            generate_blockset: ReactiveCell::new(
                "generate_blockset",
                "Default Blockset".to_string(),
            ),
            generate_name: ReactiveCell::new("generate_name", "Generated World".to_string()),
            generate_tile_size: ReactiveCell::new("generate_tile_size", 16),
        }
    }
}
