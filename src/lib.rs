//! Place an animated solar system on a tracked surface and watch it orbit,
//! rendered into a terminal.

pub mod animation;
pub mod assets;
pub mod composer;
pub mod config;
pub mod error;
pub mod graphics;
pub mod math;
pub mod rotation;
pub mod scene;
pub mod session;
pub mod state;
pub mod vertex;
pub mod widget;

pub use composer::{compose, handle_tap, PlanetDescriptor, SunDescriptor};
pub use error::{SolarError, SolarResult};
pub use rotation::RotationController;
pub use scene::{NodeId, NodeRole, Scene, SceneNode};
pub use state::{MotionKind, SolarSettings};
pub use widget::SolarView;
