//! Builder side of the studio.
//!
//! Mirrors what the canvas publishes into a [`BuilderState`] and turns
//! editor commands into bus events. The builder never edits a document
//! itself; it waits for the canvas to answer.

use std::sync::Arc;
use studio_bus::{
    BusError, DeletePayload, Endpoint, Event, InsertPayload, PropUpdate, PropsPayload,
    ReparentPayload, StylePayload, Subscription, SyncStatus,
};
use studio_model::{
    Breakpoint, Breakpoints, DragData, DropData, Instance, InstanceId, InstanceRef, Rect,
    SelectedInstance, StyleUpdate,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Events the builder listens for
const VIEW_EVENTS: &[&str] = &[
    "loadRootInstance",
    "selectInstance",
    "hoverInstance",
    "dragStartInstance",
    "dragInstance",
    "dragEndInstance",
    "selectionRect",
    "selectedInstanceRect",
    "hoveredInstanceRect",
    "syncStatus",
    "loadBreakpoints",
];

/// The builder's view of the canvas
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuilderState {
    pub root: Option<Instance>,
    pub selected: Option<SelectedInstance>,
    pub hovered: Option<SelectedInstance>,
    pub breakpoints: Breakpoints,
    pub sync_status: SyncStatus,
    /// Drag in progress, cleared on `dragEndInstance`
    pub drag: Option<DragData>,
    pub selection_rect: Option<Rect>,
    pub selected_instance_rect: Option<Rect>,
    pub hovered_instance_rect: Option<Rect>,
}

impl BuilderState {
    fn apply(&mut self, event: Event) {
        match event {
            Event::LoadRootInstance(root) => self.root = Some(root),
            Event::SelectInstance(selected) => self.selected = selected,
            Event::HoverInstance(hovered) => self.hovered = hovered,
            Event::DragStartInstance(drag) | Event::DragInstance(drag) => self.drag = drag,
            Event::DragEndInstance(_) => self.drag = None,
            Event::SelectionRect(rect) => self.selection_rect = rect,
            Event::SelectedInstanceRect(rect) => self.selected_instance_rect = rect,
            Event::HoveredInstanceRect(rect) => self.hovered_instance_rect = rect,
            Event::SyncStatus(status) => self.sync_status = status,
            Event::LoadBreakpoints(breakpoints) => self.breakpoints = breakpoints,
            other => tracing::debug!(event = %other, "Builder ignores event"),
        }
    }
}

pub struct BuilderRealm {
    endpoint: Endpoint,
    state: Arc<watch::Sender<BuilderState>>,
    _subscriptions: Vec<Subscription>,
    dispatcher: JoinHandle<()>,
}

impl BuilderRealm {
    pub fn mount(endpoint: Endpoint) -> Result<Self, BusError> {
        let (state, _) = watch::channel(BuilderState::default());
        let state = Arc::new(state);

        let subscriptions = VIEW_EVENTS
            .iter()
            .map(|&name| {
                let state = state.clone();
                endpoint.subscribe(name, move |event| state.send_modify(|s| s.apply(event)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let dispatcher = tokio::spawn(endpoint.mount()?.run());

        Ok(Self {
            endpoint,
            state,
            _subscriptions: subscriptions,
            dispatcher,
        })
    }

    /// Copy of the current view
    pub fn state(&self) -> BuilderState {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<BuilderState> {
        self.state.subscribe()
    }

    /// Wait until the view satisfies `predicate`
    pub async fn wait_for(&self, predicate: impl FnMut(&BuilderState) -> bool) -> BuilderState {
        let mut receiver = self.state.subscribe();
        let state = match receiver.wait_for(predicate).await {
            Ok(state) => state.clone(),
            // The sender lives as long as self
            Err(_) => self.state(),
        };
        state
    }

    pub fn select(&self, id: impl Into<InstanceId>) -> Result<bool, BusError> {
        self.endpoint.publish(Event::SelectInstanceById(id.into()))
    }

    pub fn insert(&self, instance: Instance, drop_data: DropData) -> Result<bool, BusError> {
        self.endpoint
            .publish(Event::InsertInstance(InsertPayload { instance, drop_data }))
    }

    pub fn reparent(&self, instance: InstanceRef, drop_data: DropData) -> Result<bool, BusError> {
        self.endpoint
            .publish(Event::ReparentInstance(ReparentPayload { instance, drop_data }))
    }

    pub fn delete(&self, id: impl Into<InstanceId>) -> Result<bool, BusError> {
        self.endpoint
            .publish(Event::DeleteInstance(DeletePayload { id: id.into() }))
    }

    pub fn update_style(
        &self,
        id: impl Into<InstanceId>,
        breakpoint: impl Into<String>,
        updates: Vec<StyleUpdate>,
    ) -> Result<bool, BusError> {
        self.endpoint.publish(Event::UpdateStyle(StylePayload {
            id: id.into(),
            updates,
            breakpoint: breakpoint.into(),
        }))
    }

    /// Show uncommitted updates on the canvas; only the selected instance
    /// listens for them
    pub fn preview_style(
        &self,
        id: impl Into<InstanceId>,
        breakpoint: impl Into<String>,
        updates: Vec<StyleUpdate>,
    ) -> Result<bool, BusError> {
        self.endpoint.publish(Event::PreviewStyle(StylePayload {
            id: id.into(),
            updates,
            breakpoint: breakpoint.into(),
        }))
    }

    pub fn update_props(
        &self,
        instance_id: impl Into<InstanceId>,
        props: Vec<PropUpdate>,
    ) -> Result<bool, BusError> {
        self.endpoint.publish(Event::UpdateProps(PropsPayload {
            instance_id: instance_id.into(),
            props,
        }))
    }

    pub fn undo(&self) -> Result<bool, BusError> {
        self.endpoint.publish(Event::Undo)
    }

    pub fn redo(&self) -> Result<bool, BusError> {
        self.endpoint.publish(Event::Redo)
    }

    /// Create or edit a breakpoint and make it active
    pub fn change_breakpoint(&self, breakpoint: Breakpoint) -> Result<bool, BusError> {
        self.endpoint.publish(Event::BreakpointChange(breakpoint))
    }

    pub fn delete_breakpoint(&self, breakpoint: Breakpoint) -> Result<bool, BusError> {
        self.endpoint.publish(Event::BreakpointDelete(breakpoint))
    }
}

impl Drop for BuilderRealm {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}
