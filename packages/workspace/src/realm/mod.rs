//! The two realms sharing a [`studio_bus::MessageBus`]

mod builder;
mod canvas;

pub use builder::{BuilderRealm, BuilderState};
pub use canvas::{CanvasOptions, CanvasRealm, RectKind};
