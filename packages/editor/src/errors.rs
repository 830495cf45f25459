//! Error types for the editor

use crate::patch::{Namespace, PatchError};
use crate::tree::TreeError;
use studio_model::ModelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Patch failed on {namespace}: {source}")]
    Patch {
        namespace: Namespace,
        #[source]
        source: PatchError,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Tree invariant violated: {0}")]
    Tree(#[from] TreeError),
}

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}
