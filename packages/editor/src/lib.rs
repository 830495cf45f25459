//! # Studio Editor
//!
//! Document store, tree operations and style resolution shared by the
//! builder and canvas realms.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ session: selection, previews, breakpoint    │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ mutations: one transaction per builder edit │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ document: root / props / breakpoints        │
//! │  - drafts diffed into namespaced patches    │
//! │  - undo/redo by inverse patches             │
//! │  - pending patch log for sync               │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use studio_editor::{DocumentStore, EditSession, InstanceTree, Mutation};
//!
//! let tree = InstanceTree::new(root)?;
//! let store = DocumentStore::new(tree, PropsStore::new(), Breakpoints::defaults());
//! let mut session = EditSession::new("tree-1", store);
//!
//! session.apply(&Mutation::DeleteInstance { id: "box-1".into() })?;
//! session.undo()?;
//! ```

mod document;
mod errors;
mod mutations;
pub mod patch;
mod session;
pub mod style;
mod tree;
mod undo_stack;

pub use document::{Draft, DocumentStore, PatchLog, TransactionOutcome};
pub use errors::{EditorError, StoreError};
pub use mutations::{Mutation, MutationContext, MutationResult};
pub use patch::{Namespace, NamespacedPatches, Patch, PatchError, PatchOp, Transaction};
pub use session::EditSession;
pub use style::{ComputedStyle, ComputedValue, StyleSource};
pub use tree::{clone_instance, mapping_index, InsertLocation, InstanceTree, TreeChild, TreeError, TreeNode};
pub use undo_stack::{PatchBatch, PatchTarget, UndoStack};
