use crate::bus::Realm;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BusError {
    #[error("{realm} already has a handler for {event}")]
    AlreadySubscribed { realm: Realm, event: String },

    #[error("{0} is already mounted")]
    AlreadyMounted(Realm),

    #[error("Failed to encode envelope: {0}")]
    Encode(#[from] serde_json::Error),
}
