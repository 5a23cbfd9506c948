pub mod chrome;
pub mod converter;
pub mod engine;
pub mod renderer;

pub use chrome::ChromeLauncher;
pub use converter::{Converter, LOAD_TIMEOUT};
pub use engine::{Engine, EngineLauncher, Surface, Viewport};
pub use renderer::{LifecycleState, RendererHandle};
