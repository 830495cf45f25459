//! Style cascade and inheritance
//!
//! Rules cascade mobile-first: an instance's style at a breakpoint is the
//! merge of its rules for every breakpoint up to and including that one.
//! Inheritable properties then flow down from the nearest ancestor that
//! sets them.

use crate::tree::{InstanceTree, TreeNode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use studio_model::{Breakpoints, Style, StyleUpdate, StyleValue};

/// Properties a child picks up from its ancestors
pub const INHERITABLE_PROPERTIES: &[&str] = &[
    "color",
    "cursor",
    "fontFamily",
    "fontSize",
    "fontStyle",
    "fontWeight",
    "letterSpacing",
    "lineHeight",
    "listStyleType",
    "textAlign",
    "textIndent",
    "textTransform",
    "visibility",
    "whiteSpace",
    "wordSpacing",
];

pub fn is_inheritable(property: &str) -> bool {
    INHERITABLE_PROPERTIES.contains(&property)
}

/// Merge of `node`'s rules for every breakpoint up to `breakpoint_id`
pub fn cascaded_style(node: &TreeNode, breakpoints: &Breakpoints, breakpoint_id: &str) -> Style {
    let mut style = Style::new();
    for breakpoint in breakpoints.cascade_for(breakpoint_id) {
        if let Some(rule) = node.css_rule(&breakpoint.id) {
            style.extend(rule.style.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
    }
    style
}

/// Inheritable values reaching `instance_id` from its ancestors.
///
/// Nearest ancestor wins; `inherit` values are skipped so the lookup keeps
/// walking up.
pub fn get_inherited_style(
    tree: &InstanceTree,
    breakpoints: &Breakpoints,
    instance_id: &str,
    breakpoint_id: &str,
) -> Style {
    let mut inherited = Style::new();
    let path = tree.find_path(instance_id);
    let Some((_, ancestors)) = path.split_last() else {
        return inherited;
    };

    for ancestor in ancestors.iter().rev() {
        for (property, value) in cascaded_style(ancestor, breakpoints, breakpoint_id) {
            if is_inheritable(&property) && !value.is_inherit() && !inherited.contains_key(&property) {
                inherited.insert(property, value);
            }
        }
    }
    inherited
}

/// Value that applies for `property`: the own value unless it is
/// `inherit`, in which case the inherited one.
pub fn get_final_value<'a>(
    current: &'a Style,
    inherited: &'a Style,
    property: &str,
) -> Option<&'a StyleValue> {
    match current.get(property) {
        Some(value) if value.is_inherit() => inherited.get(property),
        Some(value) => Some(value),
        None => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StyleSource {
    Own,
    Inherited,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedValue {
    pub value: StyleValue,
    pub source: StyleSource,
}

pub type ComputedStyle = BTreeMap<String, ComputedValue>;

/// Effective style of one instance, with where each value came from.
///
/// `preview` is overlaid on the instance's own cascaded style before
/// inheritance is resolved.
pub fn compute_style(
    tree: &InstanceTree,
    breakpoints: &Breakpoints,
    instance_id: &str,
    breakpoint_id: &str,
    preview: Option<&[StyleUpdate]>,
) -> ComputedStyle {
    let mut computed = ComputedStyle::new();
    let Some(node) = tree.node(instance_id) else {
        return computed;
    };

    let mut own = cascaded_style(node, breakpoints, breakpoint_id);
    if let Some(updates) = preview {
        merge_updates(&mut own, updates);
    }
    let inherited = get_inherited_style(tree, breakpoints, instance_id, breakpoint_id);

    for (property, value) in &inherited {
        if !own.contains_key(property) {
            computed.insert(
                property.clone(),
                ComputedValue {
                    value: value.clone(),
                    source: StyleSource::Inherited,
                },
            );
        }
    }

    for property in own.keys() {
        let source = if own[property].is_inherit() {
            StyleSource::Inherited
        } else {
            StyleSource::Own
        };
        if let Some(value) = get_final_value(&own, &inherited, property) {
            computed.insert(
                property.clone(),
                ComputedValue {
                    value: value.clone(),
                    source,
                },
            );
        }
    }

    computed
}

/// Apply updates to a style map; `None` values remove the property
pub fn merge_updates(style: &mut Style, updates: &[StyleUpdate]) {
    for update in updates {
        match &update.value {
            Some(value) => {
                style.insert(update.property.clone(), value.clone());
            }
            None => {
                style.remove(&update.property);
            }
        }
    }
}

/// Merge `updates` into the rule of `instance_id` for `breakpoint_id`.
///
/// The rule is created if the instance has none for that breakpoint.
/// Returns false when the instance does not exist.
pub fn apply_style_updates(
    tree: &mut InstanceTree,
    instance_id: &str,
    breakpoint_id: &str,
    updates: &[StyleUpdate],
) -> bool {
    let Some(node) = tree.node_mut(instance_id) else {
        return false;
    };
    merge_updates(&mut node.css_rule_mut(breakpoint_id).style, updates);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use studio_model::{Component, CssRule, Instance};

    fn rule(breakpoint: &str, entries: &[(&str, StyleValue)]) -> CssRule {
        let mut rule = CssRule::new(breakpoint);
        for (property, value) in entries {
            rule.style.insert(property.to_string(), value.clone());
        }
        rule
    }

    fn red() -> StyleValue {
        StyleValue::keyword("red")
    }

    fn blue() -> StyleValue {
        StyleValue::keyword("blue")
    }

    fn nested() -> InstanceTree {
        InstanceTree::new(
            Instance::new("a", Component::Body)
                .with_rule(rule("base", &[("color", red()), ("display", StyleValue::keyword("flex"))]))
                .with_child(
                    Instance::new("b", Component::Box)
                        .with_rule(rule("base", &[("color", blue())]))
                        .with_child(Instance::new("c", Component::TextBlock)),
                ),
        )
        .unwrap()
    }

    #[test]
    fn test_nearest_ancestor_wins() {
        let tree = nested();
        let inherited = get_inherited_style(&tree, &Breakpoints::defaults(), "c", "base");
        assert_eq!(inherited.get("color"), Some(&blue()));
        assert!(inherited.get("display").is_none());
    }

    #[test]
    fn test_inherit_keyword_is_skipped() {
        let mut tree = nested();
        apply_style_updates(
            &mut tree,
            "b",
            "base",
            &[StyleUpdate::set("color", StyleValue::keyword("inherit"))],
        );
        let inherited = get_inherited_style(&tree, &Breakpoints::defaults(), "c", "base");
        assert_eq!(inherited.get("color"), Some(&red()));
    }

    #[test]
    fn test_cascade_respects_selected_breakpoint() {
        let tree = InstanceTree::new(
            Instance::new("a", Component::Body)
                .with_rule(rule("base", &[("width", StyleValue::unit(100.0, "%"))]))
                .with_rule(rule("laptop", &[("width", StyleValue::unit(960.0, "px"))])),
        )
        .unwrap();
        let node = tree.node("a").unwrap();
        let bps = Breakpoints::defaults();

        assert_eq!(cascaded_style(node, &bps, "tablet")["width"], StyleValue::unit(100.0, "%"));
        assert_eq!(cascaded_style(node, &bps, "desktop")["width"], StyleValue::unit(960.0, "px"));
    }

    #[test]
    fn test_final_value() {
        let current: Style = [("color".to_string(), StyleValue::keyword("inherit"))].into();
        let inherited: Style = [("color".to_string(), red())].into();
        assert_eq!(get_final_value(&current, &inherited, "color"), Some(&red()));
        assert_eq!(get_final_value(&current, &inherited, "margin"), None);
    }

    #[test]
    fn test_compute_style_sources_and_preview() {
        let tree = nested();
        let bps = Breakpoints::defaults();

        let computed = compute_style(&tree, &bps, "c", "base", None);
        assert_eq!(computed["color"].source, StyleSource::Inherited);
        assert_eq!(computed["color"].value, blue());

        let preview = [StyleUpdate::set("color", red())];
        let computed = compute_style(&tree, &bps, "c", "base", Some(&preview));
        assert_eq!(computed["color"].source, StyleSource::Own);
        assert_eq!(computed["color"].value, red());
    }

    #[test]
    fn test_apply_updates_creates_rule_once() {
        let mut tree = nested();
        assert!(apply_style_updates(
            &mut tree,
            "c",
            "tablet",
            &[StyleUpdate::set("margin", StyleValue::unit(4.0, "px"))]
        ));
        assert!(apply_style_updates(&mut tree, "c", "tablet", &[StyleUpdate::remove("margin")]));

        let node = tree.node("c").unwrap();
        assert_eq!(node.css_rules.len(), 1);
        assert!(node.css_rule("tablet").unwrap().style.is_empty());
        assert!(!apply_style_updates(&mut tree, "missing", "base", &[]));
    }
}
