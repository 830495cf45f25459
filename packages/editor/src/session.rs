//! # Edit Session
//!
//! One realm's editing state on top of a [`DocumentStore`]: the id
//! generator, the selected and hovered instances, the active breakpoint and
//! any in-flight style previews.

use crate::document::DocumentStore;
use crate::errors::EditorError;
use crate::mutations::{Mutation, MutationContext, MutationResult};
use crate::style::{compute_style, ComputedStyle};
use std::collections::HashMap;
use studio_model::{IdGenerator, InstanceId, SelectedInstance, StyleUpdate};

pub struct EditSession {
    tree_id: String,
    store: DocumentStore,
    ids: IdGenerator,

    selected: Option<InstanceId>,
    hovered: Option<InstanceId>,

    /// Breakpoint styles are edited and computed at
    breakpoint: String,

    /// Uncommitted style overlays, latest preview per instance
    previews: HashMap<InstanceId, Vec<StyleUpdate>>,
}

impl EditSession {
    pub fn new(tree_id: impl Into<String>, store: DocumentStore) -> Self {
        let tree_id = tree_id.into();
        let ids = IdGenerator::for_tree(&tree_id);
        Self::with_ids(tree_id, store, ids)
    }

    pub fn with_ids(tree_id: impl Into<String>, store: DocumentStore, ids: IdGenerator) -> Self {
        let breakpoint = store
            .breakpoints()
            .base()
            .map(|bp| bp.id.clone())
            .unwrap_or_default();

        Self {
            tree_id: tree_id.into(),
            store,
            ids,
            selected: None,
            hovered: None,
            breakpoint,
            previews: HashMap::new(),
        }
    }

    pub fn tree_id(&self) -> &str {
        &self.tree_id
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn ids_mut(&mut self) -> &mut IdGenerator {
        &mut self.ids
    }

    /// Apply a mutation and follow its selection hint
    pub fn apply(&mut self, mutation: &Mutation) -> Result<MutationResult, EditorError> {
        let mut ctx = MutationContext {
            ids: &mut self.ids,
            tree_id: &self.tree_id,
        };
        let result = mutation.apply(&mut self.store, &mut ctx)?;

        if let Mutation::UpdateStyle { id, .. } = mutation {
            self.previews.remove(id);
        }
        if let MutationResult::Applied {
            selection: Some(id),
        } = &result
        {
            self.selected = Some(id.clone());
        }
        self.forget_missing();

        Ok(result)
    }

    pub fn undo(&mut self) -> Result<bool, EditorError> {
        let undone = self.store.undo()?;
        self.forget_missing();
        Ok(undone)
    }

    pub fn redo(&mut self) -> Result<bool, EditorError> {
        let redone = self.store.redo()?;
        self.forget_missing();
        Ok(redone)
    }

    /// Select an instance; unknown ids clear the selection
    pub fn select(&mut self, id: Option<&str>) -> Option<SelectedInstance> {
        self.selected = id.filter(|id| self.store.tree().contains(id)).map(str::to_string);
        self.selected_instance()
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Selection payload with rules and props attached
    pub fn selected_instance(&self) -> Option<SelectedInstance> {
        self.describe(self.selected.as_deref()?)
    }

    /// Hover payload carries only id and component
    pub fn hover(&mut self, id: Option<&str>) -> Option<SelectedInstance> {
        let tree = self.store.tree();
        self.hovered = id.filter(|id| tree.contains(id)).map(str::to_string);
        let node = tree.node(self.hovered.as_deref()?)?;
        Some(SelectedInstance {
            id: node.id.clone(),
            component: node.component,
            css_rules: None,
            props: None,
        })
    }

    pub fn hovered_id(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    pub fn breakpoint(&self) -> &str {
        &self.breakpoint
    }

    /// Switch the active breakpoint. Unknown ids are ignored.
    pub fn set_breakpoint(&mut self, id: &str) -> bool {
        if self.store.breakpoints().get(id).is_none() {
            return false;
        }
        self.breakpoint = id.to_string();
        true
    }

    /// Overlay uncommitted updates on `id`; replaces any previous preview
    pub fn preview_style(&mut self, id: &str, updates: Vec<StyleUpdate>) {
        self.previews.insert(id.to_string(), updates);
    }

    pub fn clear_preview(&mut self, id: &str) {
        self.previews.remove(id);
    }

    pub fn preview(&self, id: &str) -> Option<&[StyleUpdate]> {
        self.previews.get(id).map(Vec::as_slice)
    }

    /// Effective style of `id` at the active breakpoint, preview included
    pub fn computed_style(&self, id: &str) -> ComputedStyle {
        compute_style(
            &self.store.tree(),
            &self.store.breakpoints(),
            id,
            &self.breakpoint,
            self.preview(id),
        )
    }

    fn describe(&self, id: &str) -> Option<SelectedInstance> {
        let tree = self.store.tree();
        let node = tree.node(id)?;
        Some(SelectedInstance {
            id: node.id.clone(),
            component: node.component,
            css_rules: Some(node.css_rules.clone()),
            props: self.store.props().get(id).cloned(),
        })
    }

    fn reset_breakpoint(&mut self) {
        if let Ok(base) = self.store.breakpoints().base() {
            self.breakpoint = base.id.clone();
        }
    }

    /// Drop references to instances that no longer exist
    fn forget_missing(&mut self) {
        let tree = self.store.tree();
        if self.selected.as_deref().is_some_and(|id| !tree.contains(id)) {
            self.selected = None;
        }
        if self.hovered.as_deref().is_some_and(|id| !tree.contains(id)) {
            self.hovered = None;
        }
        self.previews.retain(|id, _| tree.contains(id));

        if self.store.breakpoints().get(&self.breakpoint).is_none() {
            self.reset_breakpoint();
        }
    }
}
