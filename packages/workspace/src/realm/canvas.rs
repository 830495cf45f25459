//! # Canvas Realm
//!
//! Owns the [`EditSession`] and answers builder commands.
//!
//! ## Event Flow
//!
//! ```text
//! builder command → handler → session edit (one transaction)
//!                                 ↓
//!                      refresh: selectInstance, loadBreakpoints
//!                                 ↓
//!               store version moved → debounced loadRootInstance
//! ```
//!
//! The style preview channel follows the selection: selecting an instance
//! swaps the `previewStyle:<id>` subscription for the new id.
//!
//! Everything here spawns tokio tasks, so the realm must be created and
//! driven from inside a runtime.

use crate::timer::{Debouncer, TimerService};
use std::borrow::Cow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use studio_bus::{preview_style_name, BusError, Endpoint, Event, StylePayload, Subscription, SyncStatus};
use studio_canvas::{DragState, DropOptions, LayoutTree};
use studio_editor::{ComputedStyle, EditSession, EditorError, Mutation};
use studio_model::{Breakpoints, DropData, Point, Rect, SelectedInstance};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Builder commands the canvas subscribes to
const COMMANDS: &[&str] = &[
    "selectInstanceById",
    "insertInstance",
    "reparentInstance",
    "deleteInstance",
    "updateStyle",
    "updateProps",
    "undo",
    "redo",
    "breakpointChange",
    "breakpointDelete",
];

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy)]
pub struct CanvasOptions {
    pub drop: DropOptions,
    /// Quiet period before a changed tree is re-published
    pub snapshot_debounce: Duration,
}

impl Default for CanvasOptions {
    fn default() -> Self {
        Self {
            drop: DropOptions::default(),
            snapshot_debounce: Duration::from_millis(16),
        }
    }
}

/// Which overlay rectangle a host is reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RectKind {
    Selection,
    SelectedInstance,
    HoveredInstance,
}

/// What the builder was last told
#[derive(Default)]
struct Published {
    version: Option<u64>,
    selection: Option<SelectedInstance>,
    breakpoints: Option<Breakpoints>,
}

struct CanvasShared {
    endpoint: Endpoint,
    session: Mutex<EditSession>,
    published: Mutex<Published>,
    drag: Mutex<DragState>,
    preview: Mutex<Option<Subscription>>,
    snapshots: Debouncer,
}

impl CanvasShared {
    fn publish(&self, event: Event) {
        if let Err(e) = self.endpoint.publish(event) {
            tracing::warn!(error = %e, "Failed to publish from canvas");
        }
    }

    /// Run `f` on the session, then bring the builder up to date
    fn edit<F>(self: &Arc<Self>, event: &str, f: F)
    where
        F: FnOnce(&mut EditSession) -> Result<(), EditorError>,
    {
        let result = f(&mut lock(&self.session));
        if let Err(e) = result {
            tracing::warn!(event, error = %e, "Edit failed");
        }
        self.refresh();
    }

    fn refresh(self: &Arc<Self>) {
        let (version, selection, breakpoints) = {
            let session = lock(&self.session);
            (
                session.store().version(),
                session.selected_instance(),
                session.store().breakpoints(),
            )
        };

        let mut events = Vec::new();
        let (selection_moved, schedule_snapshot) = {
            let mut published = lock(&self.published);

            let previous_id = published.selection.as_ref().map(|s| s.id.clone());
            let selection_moved = previous_id.as_deref() != selection.as_ref().map(|s| s.id.as_str());
            if published.selection != selection {
                published.selection = selection.clone();
                events.push(Event::SelectInstance(selection.clone()));
            }

            if published.breakpoints.as_ref() != Some(breakpoints.as_ref()) {
                published.breakpoints = Some(breakpoints.as_ref().clone());
                events.push(Event::LoadBreakpoints(breakpoints.as_ref().clone()));
            }

            let schedule = published.version != Some(version);
            published.version = Some(version);
            (selection_moved, schedule)
        };

        if selection_moved {
            self.watch_preview(selection.as_ref().map(|s| s.id.as_str()));
        }
        for event in events {
            self.publish(event);
        }
        if schedule_snapshot {
            let shared = Arc::downgrade(self);
            self.snapshots.call(move || {
                if let Some(shared) = shared.upgrade() {
                    shared.publish_tree();
                }
            });
        }
    }

    fn publish_tree(&self) {
        let root = lock(&self.session).store().tree().to_instance();
        self.publish(Event::LoadRootInstance(root));
    }

    /// Point the preview channel at `id`
    fn watch_preview(self: &Arc<Self>, id: Option<&str>) {
        let mut preview = lock(&self.preview);
        // Unregister first so the same name can be taken again
        *preview = None;

        let Some(id) = id else {
            return;
        };
        let shared = Arc::downgrade(self);
        let subscription = self.endpoint.subscribe(preview_style_name(id), move |event| {
            if let (Some(shared), Event::PreviewStyle(payload)) = (shared.upgrade(), event) {
                shared.preview(payload);
            }
        });
        match subscription {
            Ok(subscription) => *preview = Some(subscription),
            Err(e) => tracing::warn!(error = %e, "Failed to watch style previews"),
        }
    }

    fn preview(&self, payload: StylePayload) {
        let mut session = lock(&self.session);
        if payload.breakpoint != session.breakpoint() {
            tracing::debug!(
                id = %payload.id,
                breakpoint = %payload.breakpoint,
                "Preview for inactive breakpoint ignored"
            );
            return;
        }
        session.preview_style(&payload.id, payload.updates);
    }
}

fn handle(shared: &Arc<CanvasShared>, event: Event) {
    let name: Cow<'static, str> = event.name();
    shared.edit(&name, |session| match event {
        Event::SelectInstanceById(id) => {
            session.select(Some(&id));
            Ok(())
        }
        Event::InsertInstance(payload) => session
            .apply(&Mutation::InsertInstance {
                instance: payload.instance,
                drop_data: payload.drop_data,
            })
            .map(|_| ()),
        Event::ReparentInstance(payload) => session
            .apply(&Mutation::ReparentInstance {
                id: payload.instance.id,
                drop_data: payload.drop_data,
            })
            .map(|_| ()),
        Event::DeleteInstance(payload) => session
            .apply(&Mutation::DeleteInstance { id: payload.id })
            .map(|_| ()),
        Event::UpdateStyle(payload) => session
            .apply(&Mutation::UpdateStyle {
                id: payload.id,
                breakpoint: payload.breakpoint,
                updates: payload.updates,
            })
            .map(|_| ()),
        Event::UpdateProps(payload) => {
            for update in payload.props {
                session.apply(&Mutation::SetProp {
                    instance_id: payload.instance_id.clone(),
                    name: update.prop,
                    value: update.value,
                })?;
            }
            Ok(())
        }
        Event::Undo => session.undo().map(|_| ()),
        Event::Redo => session.redo().map(|_| ()),
        Event::BreakpointChange(breakpoint) => {
            let id = breakpoint.id.clone();
            session.apply(&Mutation::UpsertBreakpoint { breakpoint })?;
            session.set_breakpoint(&id);
            Ok(())
        }
        Event::BreakpointDelete(breakpoint) => session
            .apply(&Mutation::DeleteBreakpoint { id: breakpoint.id })
            .map(|_| ()),
        other => {
            tracing::debug!(event = %other, "Canvas ignores event");
            Ok(())
        }
    });
}

/// The canvas realm: session owner and bus responder
pub struct CanvasRealm {
    shared: Arc<CanvasShared>,
    _subscriptions: Vec<Subscription>,
    dispatcher: JoinHandle<()>,
    status_forwarder: Option<JoinHandle<()>>,
}

impl CanvasRealm {
    /// Subscribe to builder commands and start dispatching
    pub fn mount(
        endpoint: Endpoint,
        session: EditSession,
        timers: &TimerService,
        options: CanvasOptions,
    ) -> Result<Self, BusError> {
        let shared = Arc::new(CanvasShared {
            endpoint: endpoint.clone(),
            session: Mutex::new(session),
            published: Mutex::new(Published::default()),
            drag: Mutex::new(DragState::new(options.drop)),
            preview: Mutex::new(None),
            snapshots: timers.debouncer(options.snapshot_debounce),
        });

        let subscriptions = COMMANDS
            .iter()
            .map(|&name| {
                let shared = Arc::downgrade(&shared);
                endpoint.subscribe(name, move |event| {
                    if let Some(shared) = shared.upgrade() {
                        handle(&shared, event);
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let dispatcher = tokio::spawn(endpoint.mount()?.run());

        Ok(Self {
            shared,
            _subscriptions: subscriptions,
            dispatcher,
            status_forwarder: None,
        })
    }

    /// Relay sync status changes to the builder as `syncStatus`
    pub fn forward_sync_status(&mut self, mut status: watch::Receiver<SyncStatus>) {
        let endpoint = self.shared.endpoint.clone();
        let task = tokio::spawn(async move {
            while status.changed().await.is_ok() {
                let current = *status.borrow_and_update();
                if let Err(e) = endpoint.publish(Event::SyncStatus(current)) {
                    tracing::warn!(error = %e, "Failed to publish sync status");
                }
            }
        });
        if let Some(previous) = self.status_forwarder.replace(task) {
            previous.abort();
        }
    }

    /// Send the full tree and breakpoints right away
    pub fn publish_snapshot(&self) {
        self.shared.snapshots.cancel();
        self.shared.publish_tree();
        let breakpoints = lock(&self.shared.session).store().breakpoints().as_ref().clone();
        lock(&self.shared.published).breakpoints = Some(breakpoints.clone());
        self.shared.publish(Event::LoadBreakpoints(breakpoints));
    }

    /// Run `f` against the session without editing it
    pub fn with_session<R>(&self, f: impl FnOnce(&EditSession) -> R) -> R {
        f(&lock(&self.shared.session))
    }

    pub fn computed_style(&self, id: &str) -> ComputedStyle {
        lock(&self.shared.session).computed_style(id)
    }

    pub fn hover(&self, id: Option<&str>) {
        let hovered = lock(&self.shared.session).hover(id);
        self.shared.publish(Event::HoverInstance(hovered));
    }

    pub fn publish_rect(&self, kind: RectKind, rect: Option<Rect>) {
        self.shared.publish(match kind {
            RectKind::Selection => Event::SelectionRect(rect),
            RectKind::SelectedInstance => Event::SelectedInstanceRect(rect),
            RectKind::HoveredInstance => Event::HoveredInstanceRect(rect),
        });
    }

    /// Begin dragging an existing instance. Returns false for unknown ids.
    pub fn drag_start(&self, id: &str, point: Point) -> bool {
        let Some(instance) = lock(&self.shared.session).store().tree().find_by_id(id) else {
            return false;
        };
        let data = lock(&self.shared.drag).start(instance, point).clone();
        self.shared.publish(Event::DragStartInstance(Some(data)));
        true
    }

    /// Track the pointer; returns the drop target under it
    pub fn drag_move<L: LayoutTree>(&self, layout: &L, point: Point) -> Option<DropData> {
        let (data, target) = {
            let mut drag = lock(&self.shared.drag);
            let data = drag.update(layout, point)?.clone();
            (data, drag.target().cloned())
        };
        self.shared.publish(Event::DragInstance(Some(data)));
        target
    }

    /// Release the drag, moving the instance to the last resolved target.
    /// Returns true when the tree changed.
    pub fn drag_end(&self) -> bool {
        let Some(release) = lock(&self.shared.drag).finish() else {
            return false;
        };
        self.shared.publish(Event::DragEndInstance(Some(release.data.clone())));

        let Some(drop_data) = release.target else {
            return false;
        };
        let mut moved = false;
        self.shared.edit("dragEndInstance", |session| {
            moved = session
                .apply(&Mutation::ReparentInstance {
                    id: release.data.instance.id,
                    drop_data,
                })?
                .is_applied();
            Ok(())
        });
        moved
    }

    pub fn drag_cancel(&self) {
        let was_dragging = {
            let mut drag = lock(&self.shared.drag);
            let was_dragging = drag.is_dragging();
            drag.cancel();
            was_dragging
        };
        if was_dragging {
            self.shared.publish(Event::DragEndInstance(None));
        }
    }
}

impl Drop for CanvasRealm {
    fn drop(&mut self) {
        self.dispatcher.abort();
        if let Some(task) = &self.status_forwarder {
            task.abort();
        }
        self.shared.snapshots.cancel();
        lock(&self.shared.preview).take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studio_bus::MessageBus;
    use studio_editor::{DocumentStore, InstanceTree};
    use studio_model::{Breakpoints, Component, IdGenerator, Instance, PropsStore, StyleUpdate, StyleValue};

    fn session() -> EditSession {
        let root = Instance::new("root", Component::Body)
            .with_child(Instance::new("a", Component::Box))
            .with_child(Instance::new("b", Component::Box));
        let store = DocumentStore::new(
            InstanceTree::new(root).unwrap(),
            PropsStore::new(),
            Breakpoints::defaults(),
        );
        EditSession::with_ids("t", store, IdGenerator::from_seed("canvas"))
    }

    fn recorder(endpoint: &Endpoint, name: &str) -> (Arc<Mutex<Vec<Event>>>, Subscription) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let subscription = endpoint
            .subscribe(name, move |event| sink.lock().unwrap().push(event))
            .unwrap();
        (events, subscription)
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_publishes_selection_and_debounced_tree() {
        let (builder, canvas) = MessageBus::new();
        let timers = TimerService::new();
        let (selections, _s1) = recorder(&builder, "selectInstance");
        let (trees, _s2) = recorder(&builder, "loadRootInstance");
        let mut inbox = builder.mount().unwrap();

        let realm = CanvasRealm::mount(canvas, session(), &timers, CanvasOptions::default()).unwrap();

        builder.publish(Event::SelectInstanceById("a".into())).unwrap();
        builder
            .publish(Event::DeleteInstance(studio_bus::DeletePayload { id: "a".into() }))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        inbox.dispatch_pending();

        let selections = selections.lock().unwrap();
        let last = selections.last().unwrap();
        assert!(matches!(last, Event::SelectInstance(Some(s)) if s.id == "b"));

        // Two edits inside the debounce window, one snapshot
        let trees = trees.lock().unwrap();
        assert_eq!(trees.len(), 1);
        assert!(realm.with_session(|s| !s.store().tree().contains("a")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_preview_follows_selection() {
        let (builder, canvas) = MessageBus::new();
        let timers = TimerService::new();
        let realm = CanvasRealm::mount(canvas, session(), &timers, CanvasOptions::default()).unwrap();

        builder.publish(Event::SelectInstanceById("a".into())).unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(realm.shared.endpoint.is_subscribed("previewStyle:a"));

        builder
            .publish(Event::PreviewStyle(StylePayload {
                id: "a".into(),
                updates: vec![StyleUpdate::set("color", StyleValue::keyword("red"))],
                breakpoint: "base".into(),
            }))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(realm.computed_style("a")["color"].value, StyleValue::keyword("red"));
        // Previews never reach the store
        assert_eq!(realm.with_session(|s| s.store().version()), 0);

        builder.publish(Event::SelectInstanceById("b".into())).unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(!realm.shared.endpoint.is_subscribed("previewStyle:a"));
        assert!(realm.shared.endpoint.is_subscribed("previewStyle:b"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_outside_target_leaves_tree() {
        let (_builder, canvas) = MessageBus::new();
        let timers = TimerService::new();
        let realm = CanvasRealm::mount(canvas, session(), &timers, CanvasOptions::default()).unwrap();

        assert!(realm.drag_start("a", Point::new(0.0, 0.0)));
        assert!(!realm.drag_end());
        assert!(!realm.drag_start("missing", Point::new(0.0, 0.0)));
        assert_eq!(realm.with_session(|s| s.store().version()), 0);
    }
}
