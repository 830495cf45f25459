//! Drag gesture state on the canvas side.
//!
//! Only the latest pointer position matters, so every move overwrites the
//! previous drop target instead of queueing.

use crate::drop::{resolve_drop, DropOptions};
use crate::layout::LayoutTree;
use studio_model::{DragData, DropData, Instance, Point};

#[derive(Debug, Clone, PartialEq)]
struct Gesture {
    data: DragData,
    target: Option<DropData>,
}

/// Outcome of releasing a drag
#[derive(Debug, Clone, PartialEq)]
pub struct Release {
    pub data: DragData,
    /// `None` when released outside any target
    pub target: Option<DropData>,
}

#[derive(Debug, Default)]
pub struct DragState {
    gesture: Option<Gesture>,
    options: DropOptions,
}

impl DragState {
    pub fn new(options: DropOptions) -> Self {
        Self {
            gesture: None,
            options,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.gesture.is_some()
    }

    /// Begin dragging `instance`; replaces any gesture in progress
    pub fn start(&mut self, instance: Instance, point: Point) -> &DragData {
        let gesture = self.gesture.insert(Gesture {
            data: DragData {
                instance,
                current_offset: point,
            },
            target: None,
        });
        &gesture.data
    }

    /// Record a pointer move and re-resolve the drop target
    pub fn update<L: LayoutTree>(&mut self, layout: &L, point: Point) -> Option<&DragData> {
        let options = self.options;
        let gesture = self.gesture.as_mut()?;
        gesture.data.current_offset = point;
        gesture.target = resolve_drop(layout, point, &options)
            .filter(|target| !dropped_into_itself(&gesture.data.instance, target));
        Some(&gesture.data)
    }

    pub fn data(&self) -> Option<&DragData> {
        self.gesture.as_ref().map(|g| &g.data)
    }

    pub fn target(&self) -> Option<&DropData> {
        self.gesture.as_ref()?.target.as_ref()
    }

    /// End the gesture
    pub fn finish(&mut self) -> Option<Release> {
        self.gesture.take().map(|gesture| Release {
            data: gesture.data,
            target: gesture.target,
        })
    }

    pub fn cancel(&mut self) {
        self.gesture = None;
    }
}

/// A subtree cannot be dropped inside itself
fn dropped_into_itself(instance: &Instance, target: &DropData) -> bool {
    instance.ids().iter().any(|id| *id == target.instance.id)
}
