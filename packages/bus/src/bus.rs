//! Realm-to-realm message passing.
//!
//! Each realm gets an [`Endpoint`]. Publishing serializes the event into an
//! [`Envelope`] and pushes the JSON text into the peer's inbox; nothing is
//! shared between realms except those strings. A realm receives only while
//! mounted: [`Endpoint::mount`] hands out the [`Dispatcher`] that drains the
//! inbox and calls handlers, and dropping it unmounts the realm again.
//!
//! Delivery is at-most-once and ordered per sender. There are no
//! acknowledgements.

use crate::errors::BusError;
use crate::event::Event;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::mpsc;

/// Envelope format version; envelopes with any other version are dropped
pub const PROTOCOL_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Realm {
    Builder,
    Canvas,
}

impl Realm {
    pub fn peer(self) -> Realm {
        match self {
            Realm::Builder => Realm::Canvas,
            Realm::Canvas => Realm::Builder,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Realm::Builder => "builder",
            Realm::Canvas => "canvas",
        }
    }
}

impl fmt::Display for Realm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub version: u32,
    pub sender: Realm,
    pub seq: u64,
    pub event: Event,
}

type Handler = Box<dyn FnMut(Event) + Send>;

struct Registration {
    generation: u64,
    handler: Arc<Mutex<Handler>>,
}

/// Receiving side of one realm
#[derive(Default)]
struct Inbox {
    handlers: Mutex<HashMap<String, Registration>>,
    sender: Mutex<Option<mpsc::UnboundedSender<String>>>,
    generations: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct MessageBus;

impl MessageBus {
    /// Create the two connected endpoints, `(builder, canvas)`
    pub fn new() -> (Endpoint, Endpoint) {
        let builder = Arc::new(Inbox::default());
        let canvas = Arc::new(Inbox::default());

        (
            Endpoint {
                realm: Realm::Builder,
                local: builder.clone(),
                peer: canvas.clone(),
                seq: Arc::new(AtomicU64::new(0)),
            },
            Endpoint {
                realm: Realm::Canvas,
                local: canvas,
                peer: builder,
                seq: Arc::new(AtomicU64::new(0)),
            },
        )
    }
}

/// One realm's handle on the bus. Clones share the same realm.
#[derive(Clone)]
pub struct Endpoint {
    realm: Realm,
    local: Arc<Inbox>,
    peer: Arc<Inbox>,
    seq: Arc<AtomicU64>,
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint").field("realm", &self.realm).finish()
    }
}

impl Endpoint {
    pub fn realm(&self) -> Realm {
        self.realm
    }

    /// Send `event` to the peer realm.
    ///
    /// Returns `Ok(false)` when the peer is not mounted and the event was
    /// dropped.
    pub fn publish(&self, event: Event) -> Result<bool, BusError> {
        let name = event.name();
        let envelope = Envelope {
            version: PROTOCOL_VERSION,
            sender: self.realm,
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            event,
        };
        let text = serde_json::to_string(&envelope)?;

        let delivered = match lock(&self.peer.sender).as_ref() {
            Some(sender) => sender.send(text).is_ok(),
            None => false,
        };
        if !delivered {
            tracing::debug!(
                from = %self.realm,
                event = %name,
                "Dropped event, receiving realm is not mounted"
            );
        }
        Ok(delivered)
    }

    /// Register the handler for `event` in this realm.
    ///
    /// Only one handler may be active per event name; the returned
    /// [`Subscription`] removes it when dropped.
    pub fn subscribe<F>(&self, event: impl Into<String>, handler: F) -> Result<Subscription, BusError>
    where
        F: FnMut(Event) + Send + 'static,
    {
        let event = event.into();
        let mut handlers = lock(&self.local.handlers);
        if handlers.contains_key(&event) {
            return Err(BusError::AlreadySubscribed {
                realm: self.realm,
                event,
            });
        }

        let generation = self.local.generations.fetch_add(1, Ordering::Relaxed);
        handlers.insert(
            event.clone(),
            Registration {
                generation,
                handler: Arc::new(Mutex::new(Box::new(handler))),
            },
        );

        Ok(Subscription {
            inbox: Arc::downgrade(&self.local),
            event,
            generation,
        })
    }

    pub fn is_subscribed(&self, event: &str) -> bool {
        lock(&self.local.handlers).contains_key(event)
    }

    /// Start receiving events for this realm
    pub fn mount(&self) -> Result<Dispatcher, BusError> {
        let mut sender = lock(&self.local.sender);
        if sender.is_some() {
            return Err(BusError::AlreadyMounted(self.realm));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *sender = Some(tx);
        tracing::debug!(realm = %self.realm, "Mounted");

        Ok(Dispatcher {
            realm: self.realm,
            inbox: self.local.clone(),
            receiver: rx,
            last_seq: None,
        })
    }

    pub fn is_mounted(&self) -> bool {
        lock(&self.local.sender).is_some()
    }
}

/// Active handler registration; unregisters on drop
#[must_use = "dropping a Subscription unregisters its handler"]
pub struct Subscription {
    inbox: Weak<Inbox>,
    event: String,
    generation: u64,
}

impl Subscription {
    pub fn event(&self) -> &str {
        &self.event
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("event", &self.event).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(inbox) = self.inbox.upgrade() else {
            return;
        };
        let mut handlers = lock(&inbox.handlers);
        if handlers
            .get(&self.event)
            .is_some_and(|registration| registration.generation == self.generation)
        {
            handlers.remove(&self.event);
        }
    }
}

/// Drains a mounted realm's inbox into its handlers
pub struct Dispatcher {
    realm: Realm,
    inbox: Arc<Inbox>,
    receiver: mpsc::UnboundedReceiver<String>,
    last_seq: Option<u64>,
}

impl Dispatcher {
    pub fn realm(&self) -> Realm {
        self.realm
    }

    /// Dispatch events for as long as the realm stays mounted.
    /// Abort the task running this to stop.
    pub async fn run(mut self) {
        while self.dispatch_next().await {}
    }

    /// Wait for one envelope and dispatch it.
    /// Returns false once the inbox is closed.
    pub async fn dispatch_next(&mut self) -> bool {
        match self.receiver.recv().await {
            Some(text) => {
                self.dispatch(&text);
                true
            }
            None => false,
        }
    }

    /// Dispatch everything already queued without waiting.
    /// Returns the number of envelopes processed.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut count = 0;
        while let Ok(text) = self.receiver.try_recv() {
            self.dispatch(&text);
            count += 1;
        }
        count
    }

    fn dispatch(&mut self, text: &str) {
        let envelope: Envelope = match serde_json::from_str(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(realm = %self.realm, error = %e, "Dropped undecodable envelope");
                return;
            }
        };

        if envelope.version != PROTOCOL_VERSION {
            tracing::warn!(
                realm = %self.realm,
                version = envelope.version,
                "Dropped envelope with unsupported protocol version"
            );
            return;
        }
        if self.last_seq.is_some_and(|last| envelope.seq <= last) {
            tracing::debug!(realm = %self.realm, seq = envelope.seq, "Dropped stale envelope");
            return;
        }
        self.last_seq = Some(envelope.seq);

        let name = envelope.event.name();
        let handler = lock(&self.inbox.handlers)
            .get(name.as_ref())
            .map(|registration| registration.handler.clone());

        match handler {
            Some(handler) => {
                let mut guard = lock(&handler);
                (*guard)(envelope.event)
            }
            None => tracing::debug!(realm = %self.realm, event = %name, "No handler, event dropped"),
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        *lock(&self.inbox.sender) = None;
        tracing::debug!(realm = %self.realm, "Unmounted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{DeletePayload, SyncStatus};

    fn recorder() -> (Arc<Mutex<Vec<Event>>>, impl FnMut(Event) + Send + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |event| sink.lock().unwrap().push(event))
    }

    #[test]
    fn test_publish_to_unmounted_realm_is_dropped() {
        let (builder, canvas) = MessageBus::new();
        let (seen, handler) = recorder();
        let _sub = canvas.subscribe("undo", handler).unwrap();

        assert!(!builder.publish(Event::Undo).unwrap());

        let mut dispatcher = canvas.mount().unwrap();
        assert_eq!(dispatcher.dispatch_pending(), 0);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_delivery_in_order() {
        let (builder, canvas) = MessageBus::new();
        let mut dispatcher = canvas.mount().unwrap();
        let (seen, handler) = recorder();
        let _sub = canvas.subscribe("deleteInstance", handler).unwrap();

        for id in ["a", "b", "c"] {
            builder
                .publish(Event::DeleteInstance(DeletePayload { id: id.into() }))
                .unwrap();
        }
        assert_eq!(dispatcher.dispatch_pending(), 3);

        let ids: Vec<String> = seen
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                Event::DeleteInstance(payload) => Some(payload.id.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_one_handler_per_event() {
        let (_builder, canvas) = MessageBus::new();
        let first = canvas.subscribe("redo", |_| {}).unwrap();
        assert!(matches!(
            canvas.subscribe("redo", |_| {}),
            Err(BusError::AlreadySubscribed { .. })
        ));

        drop(first);
        assert!(!canvas.is_subscribed("redo"));
        let _second = canvas.subscribe("redo", |_| {}).unwrap();
    }

    #[test]
    fn test_unmount_on_dispatcher_drop() {
        let (builder, canvas) = MessageBus::new();
        let dispatcher = canvas.mount().unwrap();
        assert!(matches!(canvas.mount(), Err(BusError::AlreadyMounted(Realm::Canvas))));

        drop(dispatcher);
        assert!(!canvas.is_mounted());
        assert!(!builder.publish(Event::SyncStatus(SyncStatus::Idle)).unwrap());
    }

    #[test]
    fn test_bad_envelopes_are_dropped() {
        let (builder, canvas) = MessageBus::new();
        let mut dispatcher = builder.mount().unwrap();
        let (seen, handler) = recorder();
        let _sub = builder.subscribe("undo", handler).unwrap();

        let future = Envelope {
            version: PROTOCOL_VERSION + 1,
            sender: Realm::Canvas,
            seq: 0,
            event: Event::Undo,
        };
        let sender = lock(&builder.local.sender).clone().unwrap();
        sender.send("not json".into()).unwrap();
        sender.send(serde_json::to_string(&future).unwrap()).unwrap();
        canvas.publish(Event::Undo).unwrap();

        assert_eq!(dispatcher.dispatch_pending(), 3);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_run_until_senders_gone() {
        let (builder, canvas) = MessageBus::new();
        let mut dispatcher = canvas.mount().unwrap();
        let (seen, handler) = recorder();
        let _sub = canvas.subscribe("undo", handler).unwrap();

        builder.publish(Event::Undo).unwrap();
        assert!(dispatcher.dispatch_next().await);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
