//! Drop resolution against synthetic layouts

use proptest::prelude::*;
use studio_canvas::{resolve_drop, DropOptions, LayoutTree, NodeId, SyntheticLayout};
use studio_model::{Component, InstanceRef, Point, Position, Rect};

fn instance(id: &str, component: Component) -> Option<InstanceRef> {
    Some(InstanceRef {
        id: id.into(),
        component,
    })
}

/// Body 200 wide with two 100-wide stacked boxes: `[0..50]` and `[50..100]`
fn two_boxes() -> (SyntheticLayout, NodeId, NodeId, NodeId) {
    let mut layout = SyntheticLayout::new(Rect::new(0.0, 0.0, 200.0, 400.0));
    let body = layout.add(layout.root(), Rect::new(0.0, 0.0, 200.0, 400.0), instance("body", Component::Body));
    let first = layout.add(body, Rect::from_edges(0.0, 0.0, 100.0, 50.0), instance("first", Component::Box));
    let second = layout.add(body, Rect::from_edges(0.0, 50.0, 100.0, 100.0), instance("second", Component::Box));
    (layout, body, first, second)
}

#[test]
fn test_pointer_beside_second_box() {
    let (layout, _, _, _) = two_boxes();
    let drop = resolve_drop(&layout, Point::new(150.0, 52.0), &DropOptions::default()).unwrap();

    assert_eq!(drop.instance.id, "body");
    assert_eq!(drop.position, Position::Index(1));
}

#[test]
fn test_edge_retargets_to_parent() {
    let (layout, _, _, _) = two_boxes();

    let top = resolve_drop(&layout, Point::new(50.0, 52.0), &DropOptions::default()).unwrap();
    assert_eq!(top.instance.id, "body");
    assert_eq!(top.position, Position::Index(1));

    let bottom = resolve_drop(&layout, Point::new(50.0, 97.0), &DropOptions::default()).unwrap();
    assert_eq!(bottom.instance.id, "body");
    assert_eq!(bottom.position, Position::Index(2));
}

#[test]
fn test_inside_leaf_box_appends() {
    let (layout, _, _, _) = two_boxes();
    let drop = resolve_drop(&layout, Point::new(50.0, 25.0), &DropOptions::default()).unwrap();
    assert_eq!(drop.instance.id, "first");
    assert_eq!(drop.position, Position::End);
}

#[test]
fn test_edge_below_document_root_is_discarded() {
    let (layout, _, _, _) = two_boxes();
    // On the body's top edge, but the body's parent is the document root
    let drop = resolve_drop(&layout, Point::new(150.0, 2.0), &DropOptions::default()).unwrap();
    assert_eq!(drop.instance.id, "body");
    assert_eq!(drop.position, Position::Index(0));
}

#[test]
fn test_threshold_is_configurable() {
    let (layout, _, _, _) = two_boxes();
    let options = DropOptions { edge_threshold: 0.0 };
    let drop = resolve_drop(&layout, Point::new(50.0, 52.0), &options).unwrap();
    assert_eq!(drop.instance.id, "second");
    assert_eq!(drop.position, Position::End);
}

#[test]
fn test_positioned_children_are_ignored() {
    let (mut layout, _, first, _) = two_boxes();
    layout.set_positioned(first, true);

    let drop = resolve_drop(&layout, Point::new(150.0, 10.0), &DropOptions::default()).unwrap();
    assert_eq!(drop.instance.id, "body");
    assert_eq!(drop.position, Position::Index(0));
}

#[test]
fn test_container_walks_up_to_an_instance() {
    let (mut layout, _, _, second) = two_boxes();
    let wrapper = layout.add(second, Rect::from_edges(0.0, 60.0, 100.0, 90.0), None);
    assert!(layout.instance(wrapper).is_none());

    let drop = resolve_drop(&layout, Point::new(50.0, 75.0), &DropOptions::default()).unwrap();
    assert_eq!(drop.instance.id, "second");
}

#[test]
fn test_miss_and_uninstanced_root_give_no_drop() {
    let (layout, _, _, _) = two_boxes();
    assert!(resolve_drop(&layout, Point::new(500.0, 10.0), &DropOptions::default()).is_none());

    let bare = SyntheticLayout::new(Rect::new(0.0, 0.0, 100.0, 100.0));
    assert!(resolve_drop(&bare, Point::new(50.0, 50.0), &DropOptions::default()).is_none());
}

proptest! {
    #[test]
    fn resolution_is_deterministic_and_in_bounds(x in -50.0f64..250.0, y in -50.0f64..450.0) {
        let (layout, _, _, _) = two_boxes();
        let options = DropOptions::default();
        let point = Point::new(x, y);

        let first = resolve_drop(&layout, point, &options);
        prop_assert_eq!(&first, &resolve_drop(&layout, point, &options));

        if let Some(drop) = first {
            if let Position::Index(index) = drop.position {
                prop_assert!(index <= 2);
            }
        }
    }
}
