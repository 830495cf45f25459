//! # Instance Tree
//!
//! Arena form of the component tree, the `root` container of the store.
//!
//! Nodes live in a map keyed by id and refer to their children by id, so a
//! node can never be reachable from two parents through aliasing: inserting
//! a subtree whose ids already exist is rejected, and duplicates are made
//! with [`clone_instance`], which mints fresh ids.
//!
//! ## Operation semantics
//!
//! ### insert
//! - Splices at a clamped index, or appends for `Position::End`
//! - Returns `Ok(false)` when the parent is missing or cannot hold children
//!
//! ### delete
//! - Removes the node and its whole subtree from the arena
//! - The root has no parent and is never removed
//!
//! ### reparent
//! - Same node, new place: identity is preserved
//! - Refuses to move a node into its own subtree
//!
//! Lookups walk the tree depth-first from the root. Trees are page-sized,
//! so nothing is indexed beyond the arena itself.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use studio_model::{
    Component, CssRule, DropData, IdGenerator, Instance, InstanceChild, InstanceId, Position,
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    #[error("Duplicate instance id: {0}")]
    DuplicateId(String),

    #[error("Root instance missing: {0}")]
    MissingRoot(String),

    #[error("Child reference to missing instance: {0}")]
    MissingChild(String),

    #[error("Instance has more than one parent: {0}")]
    MultipleParents(String),

    #[error("Instance is unreachable from the root: {0}")]
    Unreachable(String),
}

/// Child slot of an arena node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum TreeChild {
    Id(InstanceId),
    Text(String),
}

impl TreeChild {
    pub fn instance_id(&self) -> Option<&str> {
        match self {
            TreeChild::Id(id) => Some(id),
            TreeChild::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: InstanceId,
    pub component: Component,
    pub children: Vec<TreeChild>,
    pub css_rules: Vec<CssRule>,
}

impl TreeNode {
    pub fn child_ids(&self) -> impl Iterator<Item = &str> {
        self.children.iter().filter_map(TreeChild::instance_id)
    }

    pub fn css_rule(&self, breakpoint: &str) -> Option<&CssRule> {
        self.css_rules.iter().find(|rule| rule.breakpoint == breakpoint)
    }

    /// Rule for `breakpoint`, created empty if the node has none yet
    pub fn css_rule_mut(&mut self, breakpoint: &str) -> &mut CssRule {
        let index = match self.css_rules.iter().position(|r| r.breakpoint == breakpoint) {
            Some(index) => index,
            None => {
                self.css_rules.push(CssRule::new(breakpoint));
                self.css_rules.len() - 1
            }
        };
        &mut self.css_rules[index]
    }
}

/// Target of an insert or reparent
#[derive(Debug, Clone, PartialEq)]
pub struct InsertLocation {
    pub parent_id: InstanceId,
    pub position: Position,
}

impl InsertLocation {
    pub fn new(parent_id: impl Into<InstanceId>, position: Position) -> Self {
        Self {
            parent_id: parent_id.into(),
            position,
        }
    }
}

impl From<&DropData> for InsertLocation {
    fn from(drop: &DropData) -> Self {
        Self::new(drop.parent_id(), drop.position)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceTree {
    root_id: InstanceId,
    instances: BTreeMap<InstanceId, TreeNode>,
}

impl InstanceTree {
    /// Build the arena from a recursive instance
    pub fn new(root: Instance) -> Result<Self, TreeError> {
        let mut tree = Self {
            root_id: root.id.clone(),
            instances: BTreeMap::new(),
        };
        tree.check_new_ids(&root)?;
        tree.add_subtree(root);
        Ok(tree)
    }

    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.instances.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&TreeNode> {
        self.instances.get(id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut TreeNode> {
        self.instances.get_mut(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TreeNode> {
        self.instances.values()
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut TreeNode> {
        self.instances.values_mut()
    }

    /// Materialize the subtree rooted at `id`
    pub fn find_by_id(&self, id: &str) -> Option<Instance> {
        let node = self.instances.get(id)?;
        let children = node
            .children
            .iter()
            .filter_map(|child| match child {
                TreeChild::Text(text) => Some(InstanceChild::Text(text.clone())),
                TreeChild::Id(child_id) => self.find_by_id(child_id).map(InstanceChild::Instance),
            })
            .collect();

        Some(Instance {
            id: node.id.clone(),
            component: node.component,
            children,
            css_rules: node.css_rules.clone(),
        })
    }

    /// Snapshot of the whole tree, the `loadRootInstance` payload
    pub fn to_instance(&self) -> Instance {
        self.find_by_id(&self.root_id)
            .unwrap_or_else(|| Instance::new(self.root_id.clone(), Component::Body))
    }

    pub fn find_parent(&self, id: &str) -> Option<&TreeNode> {
        let path = self.find_path(id);
        let index = path.len().checked_sub(2)?;
        path.get(index).copied()
    }

    /// Ancestor chain from the root to `id`, both inclusive.
    /// Empty when `id` is not reachable.
    pub fn find_path(&self, id: &str) -> Vec<&TreeNode> {
        let mut path = Vec::new();
        if self.path_to(&self.root_id, id, &mut path) {
            path
        } else {
            Vec::new()
        }
    }

    fn path_to<'a>(&'a self, current: &str, target: &str, path: &mut Vec<&'a TreeNode>) -> bool {
        let Some(node) = self.instances.get(current) else {
            return false;
        };
        path.push(node);
        if current == target {
            return true;
        }
        for child_id in node.child_ids() {
            if self.path_to(child_id, target, path) {
                return true;
            }
        }
        path.pop();
        false
    }

    /// Next sibling instance of `id` inside `parent_id`, else the previous one
    pub fn find_closest_sibling(&self, parent_id: &str, id: &str) -> Option<&TreeNode> {
        let parent = self.instances.get(parent_id)?;
        let siblings: Vec<&str> = parent.child_ids().collect();
        let index = siblings.iter().position(|sibling| *sibling == id)?;

        siblings
            .get(index + 1)
            .or_else(|| index.checked_sub(1).and_then(|prev| siblings.get(prev)))
            .and_then(|sibling| self.instances.get(*sibling))
    }

    /// Whether `id` is `ancestor_id` or lives in its subtree
    pub fn is_within(&self, id: &str, ancestor_id: &str) -> bool {
        self.find_path(id).iter().any(|node| node.id == ancestor_id)
    }

    /// Insert a recursive instance under `location.parent_id`
    pub fn insert(&mut self, instance: Instance, location: &InsertLocation) -> Result<bool, TreeError> {
        let accepts = self
            .instances
            .get(&location.parent_id)
            .map(|parent| parent.component.accepts_children())
            .unwrap_or(false);
        if !accepts {
            return Ok(false);
        }

        self.check_new_ids(&instance)?;
        let id = instance.id.clone();
        self.add_subtree(instance);
        self.splice_child(&location.parent_id, TreeChild::Id(id), location.position);
        Ok(true)
    }

    /// Remove `id` and its subtree, returning it in recursive form
    pub fn delete(&mut self, id: &str) -> Option<Instance> {
        let parent_id = self.find_parent(id)?.id.clone();
        let removed = self.find_by_id(id)?;

        if let Some(parent) = self.instances.get_mut(&parent_id) {
            if let Some(index) = parent.children.iter().position(|c| c.instance_id() == Some(id)) {
                parent.children.remove(index);
            }
        }
        for removed_id in removed.ids() {
            self.instances.remove(&removed_id);
        }

        Some(removed)
    }

    /// Move `id` under a new parent, keeping its identity.
    ///
    /// The position is interpreted after the node has left its old parent.
    pub fn reparent(&mut self, id: &str, location: &InsertLocation) -> bool {
        if id == self.root_id {
            return false;
        }
        let Some(old_parent_id) = self.find_parent(id).map(|p| p.id.clone()) else {
            return false;
        };
        let accepts = self
            .instances
            .get(&location.parent_id)
            .map(|parent| parent.component.accepts_children())
            .unwrap_or(false);
        if !accepts || self.is_within(&location.parent_id, id) {
            return false;
        }

        if let Some(old_parent) = self.instances.get_mut(&old_parent_id) {
            old_parent.children.retain(|c| c.instance_id() != Some(id));
        }
        self.splice_child(&location.parent_id, TreeChild::Id(id.to_string()), location.position);
        true
    }

    /// Verify the single-parent arborescence invariant
    pub fn check_invariants(&self) -> Result<(), TreeError> {
        if !self.instances.contains_key(&self.root_id) {
            return Err(TreeError::MissingRoot(self.root_id.clone()));
        }

        let mut seen: HashSet<&str> = HashSet::new();
        let mut stack = vec![self.root_id.as_str()];
        seen.insert(&self.root_id);

        while let Some(id) = stack.pop() {
            let node = self
                .instances
                .get(id)
                .ok_or_else(|| TreeError::MissingChild(id.to_string()))?;
            for child_id in node.child_ids() {
                if !seen.insert(child_id) {
                    return Err(TreeError::MultipleParents(child_id.to_string()));
                }
                stack.push(child_id);
            }
        }

        match self.instances.keys().find(|id| !seen.contains(id.as_str())) {
            Some(orphan) => Err(TreeError::Unreachable(orphan.clone())),
            None => Ok(()),
        }
    }

    fn check_new_ids(&self, instance: &Instance) -> Result<(), TreeError> {
        let mut fresh = HashSet::new();
        for id in instance.ids() {
            if self.instances.contains_key(&id) || !fresh.insert(id.clone()) {
                return Err(TreeError::DuplicateId(id));
            }
        }
        Ok(())
    }

    fn add_subtree(&mut self, instance: Instance) {
        let mut children = Vec::with_capacity(instance.children.len());
        for child in instance.children {
            match child {
                InstanceChild::Text(text) => children.push(TreeChild::Text(text)),
                InstanceChild::Instance(nested) => {
                    children.push(TreeChild::Id(nested.id.clone()));
                    self.add_subtree(nested);
                }
            }
        }

        self.instances.insert(
            instance.id.clone(),
            TreeNode {
                id: instance.id,
                component: instance.component,
                children,
                css_rules: instance.css_rules,
            },
        );
    }

    /// Index positions count instance children only, matching the canvas
    /// elements the drop resolver measures; text runs keep their place.
    fn splice_child(&mut self, parent_id: &str, child: TreeChild, position: Position) {
        let Some(parent) = self.instances.get_mut(parent_id) else {
            return;
        };
        let Position::Index(index) = position else {
            parent.children.push(child);
            return;
        };

        let mut slots = parent
            .children
            .iter()
            .enumerate()
            .filter(|(_, c)| matches!(c, TreeChild::Id(_)))
            .map(|(slot, _)| slot);
        let slot = match slots.nth(index) {
            Some(slot) => slot,
            // Past the last instance: directly after it, or at the end
            None => parent
                .children
                .iter()
                .rposition(|c| matches!(c, TreeChild::Id(_)))
                .map_or(parent.children.len(), |last| last + 1),
        };
        parent.children.insert(slot, child);
    }
}

/// Deep copy of `instance` with a fresh id for every node.
///
/// Returns the copy and the `(original, clone)` id pairs, used to duplicate
/// props records alongside.
pub fn clone_instance(
    instance: &Instance,
    ids: &mut IdGenerator,
) -> (Instance, Vec<(InstanceId, InstanceId)>) {
    let mut mapping = Vec::new();
    let cloned = clone_with_mapping(instance, ids, &mut mapping);
    (cloned, mapping)
}

fn clone_with_mapping(
    instance: &Instance,
    ids: &mut IdGenerator,
    mapping: &mut Vec<(InstanceId, InstanceId)>,
) -> Instance {
    let id = ids.new_id();
    mapping.push((instance.id.clone(), id.clone()));

    let children = instance
        .children
        .iter()
        .map(|child| match child {
            InstanceChild::Text(text) => InstanceChild::Text(text.clone()),
            InstanceChild::Instance(nested) => {
                InstanceChild::Instance(clone_with_mapping(nested, ids, mapping))
            }
        })
        .collect();

    Instance {
        id,
        component: instance.component,
        children,
        css_rules: instance.css_rules.clone(),
    }
}

/// Index the `(original, clone)` pairs by original id
pub fn mapping_index(mapping: &[(InstanceId, InstanceId)]) -> HashMap<&str, &str> {
    mapping.iter().map(|(from, to)| (from.as_str(), to.as_str())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> InstanceTree {
        InstanceTree::new(
            Instance::new("root", Component::Body)
                .with_child(
                    Instance::new("a", Component::Box)
                        .with_child(Instance::new("a1", Component::Heading).with_text("Title")),
                )
                .with_child(Instance::new("b", Component::Box))
                .with_child(Instance::new("c", Component::Image)),
        )
        .unwrap()
    }

    fn child_ids(tree: &InstanceTree, id: &str) -> Vec<String> {
        tree.node(id).unwrap().child_ids().map(str::to_string).collect()
    }

    #[test]
    fn test_new_rejects_duplicate_ids() {
        let root = Instance::new("root", Component::Body)
            .with_child(Instance::new("x", Component::Box))
            .with_child(Instance::new("x", Component::Box));
        assert_eq!(InstanceTree::new(root), Err(TreeError::DuplicateId("x".into())));
    }

    #[test]
    fn test_find_path_and_parent() {
        let tree = sample();
        let path: Vec<&str> = tree.find_path("a1").iter().map(|n| n.id.as_str()).collect();
        assert_eq!(path, vec!["root", "a", "a1"]);
        assert_eq!(tree.find_parent("a1").unwrap().id, "a");
        assert!(tree.find_parent("root").is_none());
        assert!(tree.find_path("missing").is_empty());
    }

    #[test]
    fn test_insert_clamps_and_appends() {
        let mut tree = sample();
        assert!(tree
            .insert(Instance::new("x", Component::Box), &InsertLocation::new("b", Position::Index(99)))
            .unwrap());
        assert!(tree
            .insert(Instance::new("y", Component::Box), &InsertLocation::new("root", Position::Index(0)))
            .unwrap());
        assert!(tree
            .insert(Instance::new("z", Component::Box), &InsertLocation::new("root", Position::End))
            .unwrap());

        assert_eq!(child_ids(&tree, "b"), vec!["x"]);
        assert_eq!(child_ids(&tree, "root"), vec!["y", "a", "b", "c", "z"]);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_insert_missing_or_leaf_parent_is_noop() {
        let mut tree = sample();
        let before = tree.clone();
        let missing = InsertLocation::new("nope", Position::End);
        let leaf = InsertLocation::new("c", Position::End);

        assert!(!tree.insert(Instance::new("x", Component::Box), &missing).unwrap());
        assert!(!tree.insert(Instance::new("x", Component::Box), &leaf).unwrap());
        assert_eq!(tree, before);
    }

    #[test]
    fn test_insert_existing_id_is_an_error() {
        let mut tree = sample();
        let result = tree.insert(Instance::new("a1", Component::Box), &InsertLocation::new("b", Position::End));
        assert_eq!(result, Err(TreeError::DuplicateId("a1".into())));
    }

    #[test]
    fn test_delete_removes_subtree() {
        let mut tree = sample();
        let removed = tree.delete("a").unwrap();
        assert_eq!(removed.ids(), vec!["a", "a1"]);
        assert!(!tree.contains("a1"));
        assert_eq!(child_ids(&tree, "root"), vec!["b", "c"]);
        tree.check_invariants().unwrap();

        assert!(tree.delete("a").is_none());
        assert!(tree.delete("root").is_none());
    }

    #[test]
    fn test_reparent_preserves_identity() {
        let mut tree = sample();
        assert!(tree.reparent("a1", &InsertLocation::new("b", Position::End)));
        assert_eq!(child_ids(&tree, "b"), vec!["a1"]);
        assert!(child_ids(&tree, "a").is_empty());
        assert_eq!(tree.node("a1").unwrap().children, vec![TreeChild::Text("Title".into())]);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_reparent_index_is_after_removal() {
        let mut tree = sample();
        assert!(tree.reparent("a", &InsertLocation::new("root", Position::Index(1))));
        assert_eq!(child_ids(&tree, "root"), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_index_skips_text_children() {
        let mut tree = InstanceTree::new(
            Instance::new("root", Component::Body).with_child(
                Instance::new("p", Component::Paragraph)
                    .with_text("Hello ")
                    .with_child(Instance::new("b", Component::Bold).with_text("world")),
            ),
        )
        .unwrap();

        assert!(tree
            .insert(Instance::new("x", Component::Italic), &InsertLocation::new("p", Position::Index(1)))
            .unwrap());
        assert!(tree
            .insert(Instance::new("y", Component::Span), &InsertLocation::new("p", Position::Index(0)))
            .unwrap());

        assert_eq!(
            tree.node("p").unwrap().children,
            vec![
                TreeChild::Text("Hello ".into()),
                TreeChild::Id("y".into()),
                TreeChild::Id("b".into()),
                TreeChild::Id("x".into()),
            ]
        );
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_reparent_into_own_subtree_is_refused() {
        let mut tree = sample();
        let before = tree.clone();
        assert!(!tree.reparent("a", &InsertLocation::new("a1", Position::End)));
        assert!(!tree.reparent("a", &InsertLocation::new("a", Position::End)));
        assert!(!tree.reparent("root", &InsertLocation::new("b", Position::End)));
        assert!(!tree.reparent("missing", &InsertLocation::new("b", Position::End)));
        assert_eq!(tree, before);
    }

    #[test]
    fn test_closest_sibling() {
        let tree = sample();
        assert_eq!(tree.find_closest_sibling("root", "a").unwrap().id, "b");
        assert_eq!(tree.find_closest_sibling("root", "c").unwrap().id, "b");
        assert!(tree.find_closest_sibling("a", "a1").is_none());
        assert!(tree.find_closest_sibling("root", "missing").is_none());
    }

    #[test]
    fn test_clone_mints_fresh_ids() {
        let tree = sample();
        let original = tree.find_by_id("a").unwrap();
        let mut ids = IdGenerator::from_seed("clone");
        let (copy, mapping) = clone_instance(&original, &mut ids);

        assert_eq!(copy.size(), original.size());
        assert_eq!(mapping.len(), 2);
        let original_ids: HashSet<_> = original.ids().into_iter().collect();
        assert!(copy.ids().iter().all(|id| !original_ids.contains(id)));
        assert_eq!(mapping_index(&mapping)["a"], copy.id);
    }

    #[test]
    fn test_to_instance_roundtrip() {
        let tree = sample();
        let rebuilt = InstanceTree::new(tree.to_instance()).unwrap();
        assert_eq!(rebuilt, tree);
    }

    #[test]
    fn test_invariant_violations_detected() {
        let mut tree = sample();
        tree.node_mut("b").unwrap().children.push(TreeChild::Id("a1".into()));
        assert_eq!(tree.check_invariants(), Err(TreeError::MultipleParents("a1".into())));

        let mut tree = sample();
        tree.node_mut("root").unwrap().children.retain(|c| c.instance_id() != Some("b"));
        assert_eq!(tree.check_invariants(), Err(TreeError::Unreachable("b".into())));
    }
}
