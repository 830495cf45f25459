//! # Studio Canvas
//!
//! Pointer-driven placement for the canvas realm: hit-testing a layout,
//! resolving drop targets and tracking the drag gesture in progress.

mod drag;
pub mod drop;
mod layout;

pub use drag::{DragState, Release};
pub use drop::{
    resolve_drop, DropOptions, Edge, RelativePosition, DEFAULT_EDGE_THRESHOLD,
};
pub use layout::{LayoutTree, NodeId, SyntheticLayout};
