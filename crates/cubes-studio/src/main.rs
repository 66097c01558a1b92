mod demo;
mod studio;

use cubes_engine::logging::{init_logging, LoggingConfig};
use cubes_engine::window::{Runtime, RuntimeConfig};
use winit::dpi::LogicalSize;

use crate::studio::Studio;

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    log::info!("cubes studio: arrows orbit, F2 stats, F3 force render, F5 regenerate, Ctrl+S save");

    Runtime::run(
        RuntimeConfig {
            title: "Cubes Studio".to_string(),
            initial_size: LogicalSize::new(1024.0, 640.0),
        },
        Studio::new(),
    )
}
