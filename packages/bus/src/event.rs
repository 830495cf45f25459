//! Events exchanged between the builder and canvas realms.
//!
//! Every event serializes as `{"type": <name>, "payload": ...}`. Style
//! previews are addressed per instance, so their subscription name is
//! `previewStyle:<id>` rather than the bare type.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use studio_model::{
    Breakpoint, Breakpoints, DragData, DropData, Instance, InstanceId, InstanceRef, PropValue,
    Rect, SelectedInstance, StyleUpdate,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertPayload {
    pub instance: Instance,
    pub drop_data: DropData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReparentPayload {
    pub instance: InstanceRef,
    pub drop_data: DropData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletePayload {
    pub id: InstanceId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StylePayload {
    pub id: InstanceId,
    pub updates: Vec<StyleUpdate>,
    pub breakpoint: String,
}

/// One prop change; `None` removes the prop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropUpdate {
    pub prop: String,
    pub value: Option<PropValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropsPayload {
    pub instance_id: InstanceId,
    pub props: Vec<PropUpdate>,
}

/// Whether the sync queue is working
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Idle,
    Syncing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Event {
    // canvas → builder
    LoadRootInstance(Instance),
    SelectInstance(Option<SelectedInstance>),
    HoverInstance(Option<SelectedInstance>),
    DragStartInstance(Option<DragData>),
    DragInstance(Option<DragData>),
    DragEndInstance(Option<DragData>),
    SelectionRect(Option<Rect>),
    SelectedInstanceRect(Option<Rect>),
    HoveredInstanceRect(Option<Rect>),
    SyncStatus(SyncStatus),

    // builder → canvas
    SelectInstanceById(InstanceId),
    InsertInstance(InsertPayload),
    ReparentInstance(ReparentPayload),
    DeleteInstance(DeletePayload),
    UpdateStyle(StylePayload),
    PreviewStyle(StylePayload),
    UpdateProps(PropsPayload),
    Undo,
    Redo,

    // both ways
    LoadBreakpoints(Breakpoints),
    BreakpointChange(Breakpoint),
    BreakpointDelete(Breakpoint),
}

impl Event {
    /// Name handlers subscribe under
    pub fn name(&self) -> Cow<'static, str> {
        let name = match self {
            Event::PreviewStyle(payload) => return Cow::Owned(preview_style_name(&payload.id)),
            Event::LoadRootInstance(_) => "loadRootInstance",
            Event::SelectInstance(_) => "selectInstance",
            Event::HoverInstance(_) => "hoverInstance",
            Event::DragStartInstance(_) => "dragStartInstance",
            Event::DragInstance(_) => "dragInstance",
            Event::DragEndInstance(_) => "dragEndInstance",
            Event::SelectionRect(_) => "selectionRect",
            Event::SelectedInstanceRect(_) => "selectedInstanceRect",
            Event::HoveredInstanceRect(_) => "hoveredInstanceRect",
            Event::SyncStatus(_) => "syncStatus",
            Event::SelectInstanceById(_) => "selectInstanceById",
            Event::InsertInstance(_) => "insertInstance",
            Event::ReparentInstance(_) => "reparentInstance",
            Event::DeleteInstance(_) => "deleteInstance",
            Event::UpdateStyle(_) => "updateStyle",
            Event::UpdateProps(_) => "updateProps",
            Event::Undo => "undo",
            Event::Redo => "redo",
            Event::LoadBreakpoints(_) => "loadBreakpoints",
            Event::BreakpointChange(_) => "breakpointChange",
            Event::BreakpointDelete(_) => "breakpointDelete",
        };
        Cow::Borrowed(name)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Subscription name of the style preview channel for `id`
pub fn preview_style_name(id: &str) -> String {
    format!("previewStyle:{}", id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use studio_model::StyleValue;

    #[test]
    fn test_wire_shape() {
        let event = Event::DeleteInstance(DeletePayload { id: "a".into() });
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "deleteInstance", "payload": {"id": "a"}})
        );

        let undo: Event = serde_json::from_value(json!({"type": "undo"})).unwrap();
        assert_eq!(undo, Event::Undo);

        let unset: Event = serde_json::from_value(json!({"type": "selectInstance", "payload": null})).unwrap();
        assert_eq!(unset, Event::SelectInstance(None));
    }

    #[test]
    fn test_preview_name_is_per_instance() {
        let event = Event::PreviewStyle(StylePayload {
            id: "box-1".into(),
            updates: vec![StyleUpdate::set("color", StyleValue::keyword("red"))],
            breakpoint: "base".into(),
        });
        assert_eq!(event.name(), "previewStyle:box-1");
        assert_eq!(Event::Redo.name(), "redo");
    }

    #[test]
    fn test_sync_status_lowercase() {
        assert_eq!(serde_json::to_string(&SyncStatus::Syncing).unwrap(), "\"syncing\"");
    }
}
