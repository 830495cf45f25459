//! # Studio Model
//!
//! Shared data model for the builder and canvas realms.
//!
//! Everything in here crosses the realm boundary or the persistence
//! endpoint as JSON, so the serde shapes are part of the contract:
//!
//! - [`Instance`]: recursive snapshot form of the component tree
//! - [`Breakpoint`] / [`Breakpoints`]: responsive style scopes
//! - [`UserProps`]: authored props per instance
//! - [`StyleValue`] / [`Style`]: breakpoint-scoped style declarations
//! - [`DragData`] / [`DropData`]: transient drag gesture payloads

pub mod breakpoint;
pub mod drag;
pub mod error;
pub mod id_generator;
pub mod instance;
pub mod props;
pub mod style;

pub use breakpoint::{Breakpoint, Breakpoints};
pub use drag::{DragData, DropData, InstanceRef, Point, Position, Rect, SelectedInstance};
pub use error::ModelError;
pub use id_generator::{get_tree_seed, IdGenerator};
pub use instance::{
    create_root_instance, Component, CssRule, Instance, InstanceChild, InstanceId,
};
pub use props::{Prop, PropValue, PropsStore, UserProps};
pub use style::{Style, StyleUpdate, StyleValue};
