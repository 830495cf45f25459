//! Component instances
//!
//! [`Instance`] is the recursive form of the tree: what `loadRootInstance`
//! carries to the builder, what the clipboard holds and what gets inserted
//! on a drop. The store keeps the tree as an arena instead (see the editor
//! crate) and converts at the boundary.

use crate::{Breakpoints, IdGenerator, ModelError, Style};
use serde::{Deserialize, Serialize};

pub type InstanceId = String;

/// The primitives an instance can render as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Component {
    Body,
    Box,
    TextBlock,
    Heading,
    Paragraph,
    Link,
    Button,
    Image,
    Form,
    Input,
    Span,
    Bold,
    Italic,
}

impl Component {
    pub const ALL: [Component; 13] = [
        Component::Body,
        Component::Box,
        Component::TextBlock,
        Component::Heading,
        Component::Paragraph,
        Component::Link,
        Component::Button,
        Component::Image,
        Component::Form,
        Component::Input,
        Component::Span,
        Component::Bold,
        Component::Italic,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Component::Body => "Body",
            Component::Box => "Box",
            Component::TextBlock => "TextBlock",
            Component::Heading => "Heading",
            Component::Paragraph => "Paragraph",
            Component::Link => "Link",
            Component::Button => "Button",
            Component::Image => "Image",
            Component::Form => "Form",
            Component::Input => "Input",
            Component::Span => "Span",
            Component::Bold => "Bold",
            Component::Italic => "Italic",
        }
    }

    /// Whether instances can be dropped into this component
    pub fn accepts_children(self) -> bool {
        !matches!(self, Component::Image | Component::Input)
    }

    /// Text content is edited inline on the canvas
    pub fn is_content_editable(self) -> bool {
        matches!(
            self,
            Component::TextBlock
                | Component::Heading
                | Component::Paragraph
                | Component::Link
                | Component::Button
        )
    }

    /// Formatting wrappers that only live inside content-editable text
    pub fn is_inline(self) -> bool {
        matches!(self, Component::Span | Component::Bold | Component::Italic)
    }
}

/// Child of an instance: a nested instance or literal text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InstanceChild {
    Text(String),
    Instance(Instance),
}

/// Styles scoped to one breakpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CssRule {
    pub breakpoint: String,
    pub style: Style,
}

impl CssRule {
    pub fn new(breakpoint: impl Into<String>) -> Self {
        Self {
            breakpoint: breakpoint.into(),
            style: Style::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub id: InstanceId,
    pub component: Component,
    #[serde(default)]
    pub children: Vec<InstanceChild>,
    #[serde(default)]
    pub css_rules: Vec<CssRule>,
}

impl Instance {
    pub fn new(id: impl Into<InstanceId>, component: Component) -> Self {
        Self {
            id: id.into(),
            component,
            children: Vec::new(),
            css_rules: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: Instance) -> Self {
        self.children.push(InstanceChild::Instance(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(InstanceChild::Text(text.into()));
        self
    }

    pub fn with_rule(mut self, rule: CssRule) -> Self {
        self.css_rules.retain(|r| r.breakpoint != rule.breakpoint);
        self.css_rules.push(rule);
        self
    }

    /// Nested instances, skipping text
    pub fn child_instances(&self) -> impl Iterator<Item = &Instance> {
        self.children.iter().filter_map(|child| match child {
            InstanceChild::Instance(instance) => Some(instance),
            InstanceChild::Text(_) => None,
        })
    }

    /// Every id of the subtree in pre-order
    pub fn ids(&self) -> Vec<InstanceId> {
        let mut ids = Vec::new();
        self.collect_ids(&mut ids);
        ids
    }

    fn collect_ids(&self, ids: &mut Vec<InstanceId>) {
        ids.push(self.id.clone());
        for child in self.child_instances() {
            child.collect_ids(ids);
        }
    }

    /// Number of instances in the subtree, self included
    pub fn size(&self) -> usize {
        1 + self.child_instances().map(Instance::size).sum::<usize>()
    }

    pub fn css_rule(&self, breakpoint: &str) -> Option<&CssRule> {
        self.css_rules.iter().find(|rule| rule.breakpoint == breakpoint)
    }
}

/// Create the `Body` root of a new tree with an empty base-breakpoint rule.
pub fn create_root_instance(
    ids: &mut IdGenerator,
    breakpoints: &Breakpoints,
) -> Result<Instance, ModelError> {
    let base = breakpoints.base()?;
    Ok(Instance::new(ids.new_id(), Component::Body).with_rule(CssRule::new(&base.id)))
}
