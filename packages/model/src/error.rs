//! Error types for the data model

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("No breakpoint with minWidth 0 exists")]
    MissingBaseBreakpoint,

    #[error("The base breakpoint cannot be deleted: {0}")]
    BaseBreakpointDeletion(String),

    #[error("Breakpoint not found: {0}")]
    BreakpointNotFound(String),
}
