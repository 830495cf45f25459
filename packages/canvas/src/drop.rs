//! # Drop Resolver
//!
//! Maps a pointer position to the parent instance and child slot a dragged
//! instance would land in.
//!
//! 1. Hit-test the pointer to find a candidate element
//! 2. Near the candidate's top or bottom edge, target its parent instead so
//!    the drop lands beside the candidate rather than inside it
//! 3. Pick the container's nearest in-flow child
//! 4. Turn the pointer's position relative to that child into an index

use crate::layout::LayoutTree;
use serde::{Deserialize, Serialize};
use studio_model::{DropData, Point, Position, Rect};

/// Default distance from an edge, in pixels, that counts as "on the edge"
pub const DEFAULT_EDGE_THRESHOLD: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropOptions {
    pub edge_threshold: f64,
}

impl Default for DropOptions {
    fn default() -> Self {
        Self {
            edge_threshold: DEFAULT_EDGE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Top,
    Bottom,
}

/// Pointer relative to the nearest child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativePosition {
    Before,
    After,
    Inside,
}

pub fn detect_edge(rect: &Rect, point: Point, threshold: f64) -> Option<Edge> {
    if point.y - rect.top <= threshold {
        Some(Edge::Top)
    } else if rect.bottom() - point.y <= threshold {
        Some(Edge::Bottom)
    } else {
        None
    }
}

pub fn relative_position(rect: &Rect, point: Point) -> RelativePosition {
    if point.y < rect.top {
        RelativePosition::Before
    } else if point.y > rect.bottom() {
        RelativePosition::After
    } else {
        RelativePosition::Inside
    }
}

/// Child slot for a drop next to the child at `index`
pub fn insertion_index(edge: Option<Edge>, relative: RelativePosition, index: usize) -> usize {
    match (edge, relative) {
        (Some(Edge::Bottom), RelativePosition::Inside) => index + 1,
        (_, RelativePosition::Inside) => index,
        (_, RelativePosition::Before) => index.saturating_sub(1),
        (_, RelativePosition::After) => index + 1,
    }
}

/// Index and rect of the in-flow child closest to `point`; first wins ties
pub fn nearest_child<L: LayoutTree>(layout: &L, container: L::Node, point: Point) -> Option<(usize, Rect)> {
    let mut nearest: Option<(usize, Rect, f64)> = None;
    for (index, child) in layout.children(container).into_iter().enumerate() {
        if layout.is_positioned(child) {
            continue;
        }
        let rect = layout.rect(child);
        let distance = rect.distance_to(point);
        if nearest.map_or(true, |(_, _, best)| distance < best) {
            nearest = Some((index, rect, distance));
        }
    }
    nearest.map(|(index, rect, _)| (index, rect))
}

/// Resolve where a drop at `point` would land. `None` means no valid target.
pub fn resolve_drop<L: LayoutTree>(layout: &L, point: Point, options: &DropOptions) -> Option<DropData> {
    let candidate = layout.element_from_point(point)?;

    let mut edge = detect_edge(&layout.rect(candidate), point, options.edge_threshold);
    let mut container = candidate;
    if edge.is_some() {
        match layout.parent(candidate) {
            // Never retarget to the document root; the edge is dropped and the
            // candidate itself is the container
            Some(parent) if !layout.is_document_root(parent) => container = parent,
            _ => edge = None,
        }
    }

    // Walk up to the closest element that renders an instance
    let (container, instance) = loop {
        if let Some(instance) = layout.instance(container) {
            break (container, instance);
        }
        container = layout.parent(container)?;
    };

    let position = match nearest_child(layout, container, point) {
        Some((index, rect)) => {
            Position::Index(insertion_index(edge, relative_position(&rect, point), index))
        }
        None => Position::End,
    };

    tracing::trace!(parent = %instance.id, ?position, ?edge, "Resolved drop");
    Some(DropData { instance, position })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_index_table() {
        use RelativePosition::*;
        assert_eq!(insertion_index(Some(Edge::Top), Inside, 2), 2);
        assert_eq!(insertion_index(Some(Edge::Bottom), Inside, 2), 3);
        assert_eq!(insertion_index(None, Before, 2), 1);
        assert_eq!(insertion_index(None, Before, 0), 0);
        assert_eq!(insertion_index(Some(Edge::Top), After, 2), 3);
        assert_eq!(insertion_index(None, Inside, 2), 2);
    }

    #[test]
    fn test_detect_edge() {
        let rect = Rect::new(0.0, 100.0, 50.0, 100.0);
        assert_eq!(detect_edge(&rect, Point::new(10.0, 103.0), 5.0), Some(Edge::Top));
        assert_eq!(detect_edge(&rect, Point::new(10.0, 196.0), 5.0), Some(Edge::Bottom));
        assert_eq!(detect_edge(&rect, Point::new(10.0, 150.0), 5.0), None);
    }

    #[test]
    fn test_relative_position() {
        let rect = Rect::new(0.0, 100.0, 50.0, 100.0);
        assert_eq!(relative_position(&rect, Point::new(0.0, 50.0)), RelativePosition::Before);
        assert_eq!(relative_position(&rect, Point::new(0.0, 250.0)), RelativePosition::After);
        assert_eq!(relative_position(&rect, Point::new(80.0, 150.0)), RelativePosition::Inside);
    }
}
