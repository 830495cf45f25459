//! # Mutations
//!
//! Builder-level edits, each run as one store transaction.
//!
//! ## Mutation Semantics
//!
//! ### InsertInstance / PasteInstance
//! - Insert at the resolved drop target
//! - Paste clones with fresh ids first and duplicates the props records
//! - A parent that is missing or cannot hold children is a no-op
//!
//! ### ReparentInstance
//! - Same instance, new place; refuses moves into its own subtree
//!
//! ### DeleteInstance
//! - Removes the subtree and the props of every removed instance
//! - The root is never deleted
//! - Selection moves to the closest sibling, else the parent
//!
//! ### DeleteBreakpoint
//! - Removes the breakpoint and every rule scoped to it
//! - The base breakpoint cannot be deleted

use crate::document::DocumentStore;
use crate::errors::EditorError;
use crate::patch::Namespace;
use crate::style::apply_style_updates;
use crate::tree::{clone_instance, InsertLocation};
use serde::{Deserialize, Serialize};
use studio_model::{
    Breakpoint, DropData, IdGenerator, Instance, InstanceId, PropValue, StyleUpdate,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Mutation {
    /// Insert a new instance at a drop target
    InsertInstance { instance: Instance, drop_data: DropData },

    /// Insert a copy of `instance` with fresh ids
    PasteInstance { instance: Instance, drop_data: DropData },

    /// Move an existing instance
    ReparentInstance { id: InstanceId, drop_data: DropData },

    DeleteInstance { id: InstanceId },

    /// Merge style updates into the rule for `breakpoint`
    UpdateStyle {
        id: InstanceId,
        breakpoint: String,
        updates: Vec<StyleUpdate>,
    },

    /// Set a prop, or remove it when `value` is `None`
    SetProp {
        instance_id: InstanceId,
        name: String,
        value: Option<PropValue>,
    },

    UpsertBreakpoint { breakpoint: Breakpoint },

    DeleteBreakpoint { id: String },
}

/// What a mutation needs besides the store
pub struct MutationContext<'a> {
    pub ids: &'a mut IdGenerator,
    pub tree_id: &'a str,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MutationResult {
    /// Something was committed; `selection` is the instance to select next
    Applied { selection: Option<InstanceId> },

    /// Nothing changed
    Noop,
}

impl MutationResult {
    pub fn is_applied(&self) -> bool {
        matches!(self, MutationResult::Applied { .. })
    }
}

impl Mutation {
    /// Containers the mutation touches
    pub fn namespaces(&self) -> &'static [Namespace] {
        match self {
            Mutation::InsertInstance { .. } | Mutation::ReparentInstance { .. } => &[Namespace::Root],
            Mutation::UpdateStyle { .. } => &[Namespace::Root],
            Mutation::PasteInstance { .. } | Mutation::DeleteInstance { .. } => {
                &[Namespace::Root, Namespace::Props]
            }
            Mutation::SetProp { .. } => &[Namespace::Props],
            Mutation::UpsertBreakpoint { .. } => &[Namespace::Breakpoints],
            Mutation::DeleteBreakpoint { .. } => &[Namespace::Root, Namespace::Breakpoints],
        }
    }

    /// Run the mutation as a single transaction
    pub fn apply(
        &self,
        store: &mut DocumentStore,
        ctx: &mut MutationContext<'_>,
    ) -> Result<MutationResult, EditorError> {
        // Props only exist for instances in the tree
        if let Mutation::SetProp { instance_id, .. } = self {
            if !store.tree().contains(instance_id) {
                return Ok(MutationResult::Noop);
            }
        }

        let outcome = store.try_transaction(self.namespaces(), |draft| -> Result<_, EditorError> {
            match self {
                Mutation::InsertInstance { instance, drop_data } => {
                    let Some(tree) = draft.root.as_mut() else {
                        return Ok(None);
                    };
                    let inserted = tree.insert(instance.clone(), &InsertLocation::from(drop_data))?;
                    Ok(inserted.then(|| instance.id.clone()))
                }

                Mutation::PasteInstance { instance, drop_data } => {
                    let (Some(tree), Some(props)) = (draft.root.as_mut(), draft.props.as_mut()) else {
                        return Ok(None);
                    };
                    let (copy, mapping) = clone_instance(instance, ctx.ids);
                    let id = copy.id.clone();
                    if !tree.insert(copy, &InsertLocation::from(drop_data))? {
                        return Ok(None);
                    }
                    props.duplicate(ctx.ids, mapping.iter().map(|(from, to)| (from, to)));
                    Ok(Some(id))
                }

                Mutation::ReparentInstance { id, drop_data } => {
                    let Some(tree) = draft.root.as_mut() else {
                        return Ok(None);
                    };
                    let moved = tree.reparent(id, &InsertLocation::from(drop_data));
                    Ok(moved.then(|| id.clone()))
                }

                Mutation::DeleteInstance { id } => {
                    let (Some(tree), Some(props)) = (draft.root.as_mut(), draft.props.as_mut()) else {
                        return Ok(None);
                    };
                    if id == tree.root_id() {
                        return Ok(None);
                    }
                    let Some(parent_id) = tree.find_parent(id).map(|p| p.id.clone()) else {
                        return Ok(None);
                    };
                    let next = tree
                        .find_closest_sibling(&parent_id, id)
                        .map(|sibling| sibling.id.clone())
                        .unwrap_or_else(|| parent_id.clone());

                    let Some(removed) = tree.delete(id) else {
                        return Ok(None);
                    };
                    props.remove_instances(&removed.ids());
                    Ok(Some(next))
                }

                Mutation::UpdateStyle { id, breakpoint, updates } => {
                    let Some(tree) = draft.root.as_mut() else {
                        return Ok(None);
                    };
                    apply_style_updates(tree, id, breakpoint, updates);
                    Ok(None)
                }

                Mutation::SetProp { instance_id, name, value } => {
                    let Some(props) = draft.props.as_mut() else {
                        return Ok(None);
                    };
                    match value {
                        Some(value) => {
                            props.set_prop(ctx.ids, ctx.tree_id, instance_id, name, value.clone())
                        }
                        None => {
                            props.remove_prop(instance_id, name);
                        }
                    }
                    Ok(None)
                }

                Mutation::UpsertBreakpoint { breakpoint } => {
                    let Some(breakpoints) = draft.breakpoints.as_mut() else {
                        return Ok(None);
                    };
                    breakpoints.upsert(breakpoint.clone());
                    breakpoints.validate()?;
                    Ok(None)
                }

                Mutation::DeleteBreakpoint { id } => {
                    let (Some(tree), Some(breakpoints)) =
                        (draft.root.as_mut(), draft.breakpoints.as_mut())
                    else {
                        return Ok(None);
                    };
                    breakpoints.remove(id)?;
                    for node in tree.nodes_mut() {
                        node.css_rules.retain(|rule| rule.breakpoint != *id);
                    }
                    Ok(None)
                }
            }
        })?;

        if outcome.is_empty() {
            return Ok(MutationResult::Noop);
        }
        Ok(MutationResult::Applied {
            selection: outcome.output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::InstanceTree;
    use studio_model::{Breakpoints, Component, CssRule, InstanceRef, Position, PropsStore, StyleValue};

    fn store() -> DocumentStore {
        let root = Instance::new("root", Component::Body)
            .with_child(Instance::new("a", Component::Box).with_rule(CssRule::new("tablet")))
            .with_child(Instance::new("b", Component::Box));
        DocumentStore::new(InstanceTree::new(root).unwrap(), PropsStore::new(), Breakpoints::defaults())
    }

    fn drop_into(id: &str, component: Component, position: Position) -> DropData {
        DropData {
            instance: InstanceRef {
                id: id.into(),
                component,
            },
            position,
        }
    }

    #[test]
    fn test_insert_selects_new_instance() {
        let mut store = store();
        let mut ids = IdGenerator::from_seed("t");
        let mut ctx = MutationContext { ids: &mut ids, tree_id: "tree" };

        let result = Mutation::InsertInstance {
            instance: Instance::new("x", Component::Button),
            drop_data: drop_into("b", Component::Box, Position::End),
        }
        .apply(&mut store, &mut ctx)
        .unwrap();

        assert_eq!(result, MutationResult::Applied { selection: Some("x".into()) });
        assert_eq!(store.tree().find_parent("x").unwrap().id, "b");
    }

    #[test]
    fn test_insert_into_missing_parent_is_noop() {
        let mut store = store();
        let mut ids = IdGenerator::from_seed("t");
        let mut ctx = MutationContext { ids: &mut ids, tree_id: "tree" };

        let result = Mutation::InsertInstance {
            instance: Instance::new("x", Component::Box),
            drop_data: drop_into("gone", Component::Box, Position::End),
        }
        .apply(&mut store, &mut ctx)
        .unwrap();

        assert_eq!(result, MutationResult::Noop);
        assert!(!store.can_undo());
    }

    #[test]
    fn test_delete_removes_props_and_selects_sibling() {
        let mut store = store();
        let mut ids = IdGenerator::from_seed("t");
        let mut ctx = MutationContext { ids: &mut ids, tree_id: "tree" };

        Mutation::SetProp {
            instance_id: "a".into(),
            name: "title".into(),
            value: Some(PropValue::String("hi".into())),
        }
        .apply(&mut store, &mut ctx)
        .unwrap();

        let result = Mutation::DeleteInstance { id: "a".into() }
            .apply(&mut store, &mut ctx)
            .unwrap();

        assert_eq!(result, MutationResult::Applied { selection: Some("b".into()) });
        assert!(store.props().get("a").is_none());
        assert_eq!(
            Mutation::DeleteInstance { id: "root".into() }.apply(&mut store, &mut ctx).unwrap(),
            MutationResult::Noop
        );
    }

    #[test]
    fn test_set_prop_on_deleted_instance_is_noop() {
        let mut store = store();
        let mut ids = IdGenerator::from_seed("t");
        let mut ctx = MutationContext { ids: &mut ids, tree_id: "tree" };

        Mutation::DeleteInstance { id: "a".into() }
            .apply(&mut store, &mut ctx)
            .unwrap();
        let pending = store.patch_log().len();

        let result = Mutation::SetProp {
            instance_id: "a".into(),
            name: "title".into(),
            value: Some(PropValue::String("late".into())),
        }
        .apply(&mut store, &mut ctx)
        .unwrap();

        assert_eq!(result, MutationResult::Noop);
        assert!(store.props().get("a").is_none());
        assert_eq!(store.patch_log().len(), pending);
    }

    #[test]
    fn test_paste_clones_props() {
        let mut store = store();
        let mut ids = IdGenerator::from_seed("t");
        let mut ctx = MutationContext { ids: &mut ids, tree_id: "tree" };

        Mutation::SetProp {
            instance_id: "a".into(),
            name: "title".into(),
            value: Some(PropValue::Bool(true)),
        }
        .apply(&mut store, &mut ctx)
        .unwrap();

        let source = store.tree().find_by_id("a").unwrap();
        let result = Mutation::PasteInstance {
            instance: source,
            drop_data: drop_into("b", Component::Box, Position::Index(0)),
        }
        .apply(&mut store, &mut ctx)
        .unwrap();

        let MutationResult::Applied { selection: Some(copy_id) } = result else {
            panic!("paste was not applied");
        };
        assert_ne!(copy_id, "a");
        assert_eq!(store.props().get(&copy_id).unwrap().get("title"), Some(&PropValue::Bool(true)));
        store.tree().check_invariants().unwrap();
    }

    #[test]
    fn test_delete_breakpoint_drops_rules() {
        let mut store = store();
        let mut ids = IdGenerator::from_seed("t");
        let mut ctx = MutationContext { ids: &mut ids, tree_id: "tree" };

        Mutation::DeleteBreakpoint { id: "tablet".into() }
            .apply(&mut store, &mut ctx)
            .unwrap();
        assert!(store.tree().node("a").unwrap().css_rules.is_empty());
        assert!(store.breakpoints().get("tablet").is_none());

        let result = Mutation::DeleteBreakpoint { id: "base".into() }.apply(&mut store, &mut ctx);
        assert!(matches!(result, Err(EditorError::Model(_))));
        assert_eq!(store.breakpoints().len(), 3);
    }

    #[test]
    fn test_update_style_is_undoable() {
        let mut store = store();
        let mut ids = IdGenerator::from_seed("t");
        let mut ctx = MutationContext { ids: &mut ids, tree_id: "tree" };

        Mutation::UpdateStyle {
            id: "b".into(),
            breakpoint: "base".into(),
            updates: vec![StyleUpdate::set("color", StyleValue::keyword("red"))],
        }
        .apply(&mut store, &mut ctx)
        .unwrap();
        assert!(store.tree().node("b").unwrap().css_rule("base").is_some());

        store.undo().unwrap();
        assert!(store.tree().node("b").unwrap().css_rules.is_empty());
    }

    #[test]
    fn test_wire_shape() {
        let json = serde_json::to_value(Mutation::DeleteInstance { id: "a".into() }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "deleteInstance", "id": "a"}));
    }
}
