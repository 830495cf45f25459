//! # Studio Bus
//!
//! Typed, JSON-serialized events between the builder and canvas realms.
//!
//! ```rust,ignore
//! let (builder, canvas) = MessageBus::new();
//!
//! let dispatcher = canvas.mount()?;
//! let _sub = canvas.subscribe("undo", move |_| session.lock().unwrap().undo())?;
//! tokio::spawn(dispatcher.run());
//!
//! builder.publish(Event::Undo)?;
//! ```

mod bus;
mod errors;
pub mod event;

pub use bus::{Dispatcher, Endpoint, Envelope, MessageBus, Realm, Subscription, PROTOCOL_VERSION};
pub use errors::BusError;
pub use event::{
    preview_style_name, DeletePayload, Event, InsertPayload, PropUpdate, PropsPayload,
    ReparentPayload, StylePayload, SyncStatus,
};
