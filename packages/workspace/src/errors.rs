//! Error types for syncing and the project store

use studio_editor::{Namespace, PatchError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server responded with status {0}")]
    Status(u16),

    #[error("Batch rejected: {0}")]
    Rejected(String),

    #[error("Sync job panicked")]
    Panicked,

    #[error(transparent)]
    Store(#[from] ProjectStoreError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectStoreError {
    #[error("Tree not found: {project_id}/{tree_id}")]
    TreeNotFound { project_id: String, tree_id: String },

    #[error("Patch failed on {namespace}: {source}")]
    Patch {
        namespace: Namespace,
        #[source]
        source: PatchError,
    },

    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

#[derive(Error, Debug)]
pub enum StudioError {
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Editor(#[from] studio_editor::EditorError),

    #[error(transparent)]
    Bus(#[from] studio_bus::BusError),
}
