//! Geometry the drop resolver works against.
//!
//! In the browser this is the rendered DOM; [`SyntheticLayout`] is a plain
//! rectangle tree used headless and in tests.

use studio_model::{InstanceRef, Point, Rect};

/// Read-only view of laid-out elements
pub trait LayoutTree {
    type Node: Copy + Eq + std::fmt::Debug;

    /// Topmost element under `point`
    fn element_from_point(&self, point: Point) -> Option<Self::Node>;

    fn rect(&self, node: Self::Node) -> Rect;

    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    /// Child elements in document order
    fn children(&self, node: Self::Node) -> Vec<Self::Node>;

    /// Absolutely or fixed positioned, i.e. outside normal flow
    fn is_positioned(&self, node: Self::Node) -> bool;

    /// The `<html>` element or equivalent
    fn is_document_root(&self, node: Self::Node) -> bool;

    /// Instance rendered by this element, if any
    fn instance(&self, node: Self::Node) -> Option<InstanceRef>;
}

pub type NodeId = usize;

#[derive(Debug, Clone)]
struct SyntheticNode {
    rect: Rect,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    positioned: bool,
    instance: Option<InstanceRef>,
}

/// In-memory layout built from explicit rectangles
#[derive(Debug, Clone, Default)]
pub struct SyntheticLayout {
    nodes: Vec<SyntheticNode>,
}

impl SyntheticLayout {
    /// Start a layout whose document root covers `rect`
    pub fn new(rect: Rect) -> Self {
        Self {
            nodes: vec![SyntheticNode {
                rect,
                parent: None,
                children: Vec::new(),
                positioned: false,
                instance: None,
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        0
    }

    /// Append an element under `parent`
    pub fn add(&mut self, parent: NodeId, rect: Rect, instance: Option<InstanceRef>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(SyntheticNode {
            rect,
            parent: Some(parent),
            children: Vec::new(),
            positioned: false,
            instance,
        });
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.push(id);
        }
        id
    }

    pub fn set_positioned(&mut self, node: NodeId, positioned: bool) {
        if let Some(node) = self.nodes.get_mut(node) {
            node.positioned = positioned;
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn hit(&self, node: NodeId, point: Point) -> Option<NodeId> {
        let entry = self.nodes.get(node)?;
        if !entry.rect.contains(point) {
            return None;
        }
        // Later siblings paint on top
        entry
            .children
            .iter()
            .rev()
            .find_map(|child| self.hit(*child, point))
            .or(Some(node))
    }
}

impl LayoutTree for SyntheticLayout {
    type Node = NodeId;

    fn element_from_point(&self, point: Point) -> Option<NodeId> {
        self.hit(self.root(), point)
    }

    fn rect(&self, node: NodeId) -> Rect {
        self.nodes.get(node).map(|n| n.rect).unwrap_or_default()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node)?.parent
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes.get(node).map(|n| n.children.clone()).unwrap_or_default()
    }

    fn is_positioned(&self, node: NodeId) -> bool {
        self.nodes.get(node).is_some_and(|n| n.positioned)
    }

    fn is_document_root(&self, node: NodeId) -> bool {
        node == self.root()
    }

    fn instance(&self, node: NodeId) -> Option<InstanceRef> {
        self.nodes.get(node)?.instance.clone()
    }
}
