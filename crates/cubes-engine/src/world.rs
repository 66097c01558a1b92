//! World-side collaborators.
//!
//! The engine does not know how worlds are stored or simulated; it holds them
//! through these traits and steps them from the frame loop.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::cell::EventFeed;

/// A block world.
pub trait World {
    fn blockset(&self) -> BlocksetRef;

    /// Short label shown in the world chip; defaults to nothing.
    fn label(&self) -> Option<String> {
        None
    }
}

pub trait Blockset {
    /// Builds the textures and meshes needed to draw this blockset.
    fn prepare_render_data(&self);
}

/// Anything advanced by fixed simulation steps.
pub trait Simulated {
    fn step(&mut self, dt: Duration);
}

/// Notifications from the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    ChangedWorld,
    ChangedTool,
}

/// The viewer. Stepped once per simulation step, before input.
pub trait Player: Simulated {
    fn position(&self) -> [f64; 3];

    fn exposure(&self) -> f32 {
        1.0
    }

    fn world(&self) -> WorldRef;

    fn set_world(&mut self, world: WorldRef);

    fn events(&self) -> EventFeed<PlayerEvent>;
}

pub type WorldRef = Rc<RefCell<dyn World>>;
pub type BlocksetRef = Rc<dyn Blockset>;
pub type PlayerRef = Rc<RefCell<dyn Player>>;
pub type InputRef = Rc<RefCell<dyn Simulated>>;
