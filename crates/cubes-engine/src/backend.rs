//! Factories for the engine's collaborators.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::cell::ReactiveCell;
use crate::config::Config;
use crate::draw::DrawScheduler;
use crate::platform::Host;
use crate::render::{RendererInitError, RendererRef};
use crate::world::{BlocksetRef, InputRef, PlayerRef, WorldRef};

/// Assets fetched before the renderer is built.
#[derive(Debug, Clone, Default)]
pub struct Resources {
    /// Shader sources by name.
    pub shaders: BTreeMap<String, String>,
}

/// Completion for [`Backend::fetch_resources`].
pub type ResourcesReady = Box<dyn FnOnce(Result<Resources, String>)>;

pub struct RendererInit<'a> {
    pub config: &'a Config,
    pub resources: &'a Resources,
    pub draw: DrawScheduler,
}

pub struct PlayerInit {
    pub config: Config,
    pub world: WorldRef,
    pub renderer: RendererRef,
    pub draw: DrawScheduler,
}

pub struct InputInit {
    pub config: Config,
    pub player: PlayerRef,
    pub renderer: RendererRef,
    pub focus: ReactiveCell<bool>,
    pub draw: DrawScheduler,
    /// Starts an asynchronous save.
    pub save: Rc<dyn Fn()>,
}

pub trait Backend {
    /// Human-readable list of missing platform features, if any.
    fn missing_platform_features(&self) -> Option<String> {
        None
    }

    /// Fetches resources and calls `done` exactly once, possibly later
    /// through `host`.
    fn fetch_resources(&self, host: &Rc<dyn Host>, done: ResourcesReady);

    fn create_renderer(&self, init: RendererInit<'_>) -> Result<RendererRef, RendererInitError>;

    fn new_default_blockset(&self, tile_size: u32) -> BlocksetRef;

    fn generate_worlds(&self, config: &Config, blockset: BlocksetRef) -> WorldRef;

    fn create_player(&self, init: PlayerInit) -> PlayerRef;

    fn create_input(&self, init: InputInit) -> InputRef;
}
