//! # Document Store
//!
//! Named containers edited through transactions.
//!
//! The store holds three containers, each under its own [`Namespace`]:
//!
//! - `root`: the [`InstanceTree`]
//! - `props`: the [`PropsStore`]
//! - `breakpoints`: the [`Breakpoints`] list
//!
//! ## Lifecycle
//!
//! ```text
//! snapshot → draft → mutator → diff → commit → undo stack + patch log
//!    Arc      clone    &mut     JSON    swap
//! ```
//!
//! Snapshots are `Arc`-shared, so readers holding one are never affected by
//! a later commit. A transaction only becomes visible once every draft it
//! touched has been diffed and validated; nothing is committed otherwise.

use crate::errors::StoreError;
use crate::patch::{self, Namespace, NamespacedPatches, Patch, Transaction};
use crate::tree::InstanceTree;
use crate::undo_stack::{PatchBatch, PatchTarget, UndoStack};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use studio_model::{Breakpoints, PropsStore};

/// Mutable copies handed to a transaction's mutator.
///
/// Containers that were not requested are `None`; mutators guard against
/// that and do nothing.
#[derive(Debug, Default)]
pub struct Draft {
    pub root: Option<InstanceTree>,
    pub props: Option<PropsStore>,
    pub breakpoints: Option<Breakpoints>,
}

/// Result of a committed (or empty) transaction
#[derive(Debug)]
pub struct TransactionOutcome<R> {
    /// Whatever the mutator returned
    pub output: R,

    /// Patches that were committed; empty when nothing changed
    pub transaction: Transaction,
}

impl<R> TransactionOutcome<R> {
    pub fn is_empty(&self) -> bool {
        self.transaction.is_empty()
    }
}

/// Committed transactions waiting to be persisted.
///
/// Cloning shares the same log, so the sync harvester can drain it from
/// another task.
#[derive(Debug, Clone, Default)]
pub struct PatchLog {
    pending: Arc<Mutex<Vec<Transaction>>>,
}

impl PatchLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, transaction: Transaction) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(transaction);
    }

    /// Take everything accumulated since the last drain, oldest first
    pub fn drain(&self) -> Vec<Transaction> {
        std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn len(&self) -> usize {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Committed snapshots of every container
#[derive(Debug, Clone)]
struct Containers {
    root: Arc<InstanceTree>,
    props: Arc<PropsStore>,
    breakpoints: Arc<Breakpoints>,
}

fn patched<T: Serialize + DeserializeOwned>(
    value: &T,
    namespace: Namespace,
    patches: &[Patch],
) -> Result<T, StoreError> {
    let mut json = serde_json::to_value(value)?;
    patch::apply(&mut json, patches).map_err(|source| StoreError::Patch { namespace, source })?;
    Ok(serde_json::from_value(json)?)
}

impl PatchTarget for Containers {
    fn apply_transaction(&mut self, transaction: &Transaction) -> Result<(), StoreError> {
        let mut staged = self.clone();

        for entry in transaction {
            match entry.namespace {
                Namespace::Root => {
                    let tree = patched(staged.root.as_ref(), entry.namespace, &entry.patches)?;
                    tree.check_invariants()?;
                    staged.root = Arc::new(tree);
                }
                Namespace::Props => {
                    staged.props =
                        Arc::new(patched(staged.props.as_ref(), entry.namespace, &entry.patches)?);
                }
                Namespace::Breakpoints => {
                    staged.breakpoints = Arc::new(patched(
                        staged.breakpoints.as_ref(),
                        entry.namespace,
                        &entry.patches,
                    )?);
                }
            }
        }

        *self = staged;
        Ok(())
    }
}

fn diff_container<T: Serialize>(
    namespace: Namespace,
    old: &T,
    new: &T,
    changes: &mut Transaction,
    inverse: &mut Transaction,
) -> Result<(), StoreError> {
    let (patches, inverse_patches) =
        patch::diff(&serde_json::to_value(old)?, &serde_json::to_value(new)?);
    if !patches.is_empty() {
        changes.push(NamespacedPatches { namespace, patches });
        inverse.push(NamespacedPatches {
            namespace,
            patches: inverse_patches,
        });
    }
    Ok(())
}

#[derive(Debug)]
pub struct DocumentStore {
    containers: Containers,
    history: UndoStack,
    log: PatchLog,
    /// Increments on every commit, undo and redo
    version: u64,
}

impl DocumentStore {
    pub fn new(root: InstanceTree, props: PropsStore, breakpoints: Breakpoints) -> Self {
        Self {
            containers: Containers {
                root: Arc::new(root),
                props: Arc::new(props),
                breakpoints: Arc::new(breakpoints),
            },
            history: UndoStack::new(),
            log: PatchLog::new(),
            version: 0,
        }
    }

    pub fn with_undo_levels(mut self, levels: usize) -> Self {
        self.history = UndoStack::with_max_levels(levels);
        self
    }

    pub fn tree(&self) -> Arc<InstanceTree> {
        self.containers.root.clone()
    }

    pub fn props(&self) -> Arc<PropsStore> {
        self.containers.props.clone()
    }

    pub fn breakpoints(&self) -> Arc<Breakpoints> {
        self.containers.breakpoints.clone()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Shared handle on the pending patch log
    pub fn patch_log(&self) -> PatchLog {
        self.log.clone()
    }

    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Run `mutator` against drafts of `namespaces` and commit the result.
    pub fn create_transaction<R>(
        &mut self,
        namespaces: &[Namespace],
        mutator: impl FnOnce(&mut Draft) -> R,
    ) -> Result<TransactionOutcome<R>, StoreError> {
        self.try_transaction(namespaces, |draft| Ok::<R, StoreError>(mutator(draft)))
    }

    /// Like [`create_transaction`](Self::create_transaction), but the
    /// mutator can abort: on `Err` every draft is discarded.
    pub fn try_transaction<R, E>(
        &mut self,
        namespaces: &[Namespace],
        mutator: impl FnOnce(&mut Draft) -> Result<R, E>,
    ) -> Result<TransactionOutcome<R>, E>
    where
        E: From<StoreError>,
    {
        let mut draft = Draft::default();
        for namespace in namespaces {
            match namespace {
                Namespace::Root => draft.root = Some(self.containers.root.as_ref().clone()),
                Namespace::Props => draft.props = Some(self.containers.props.as_ref().clone()),
                Namespace::Breakpoints => {
                    draft.breakpoints = Some(self.containers.breakpoints.as_ref().clone())
                }
            }
        }

        let output = mutator(&mut draft)?;

        let mut changes = Transaction::new();
        let mut inverse = Transaction::new();
        let mut staged = self.containers.clone();

        if let Some(tree) = draft.root {
            diff_container(Namespace::Root, staged.root.as_ref(), &tree, &mut changes, &mut inverse)?;
            tree.check_invariants().map_err(StoreError::from)?;
            staged.root = Arc::new(tree);
        }
        if let Some(props) = draft.props {
            diff_container(Namespace::Props, staged.props.as_ref(), &props, &mut changes, &mut inverse)?;
            staged.props = Arc::new(props);
        }
        if let Some(breakpoints) = draft.breakpoints {
            diff_container(
                Namespace::Breakpoints,
                staged.breakpoints.as_ref(),
                &breakpoints,
                &mut changes,
                &mut inverse,
            )?;
            staged.breakpoints = Arc::new(breakpoints);
        }

        if changes.is_empty() {
            return Ok(TransactionOutcome {
                output,
                transaction: changes,
            });
        }

        self.containers = staged;
        self.version += 1;
        self.history.record(PatchBatch::new(changes.clone(), inverse));
        self.log.push(changes.clone());

        tracing::debug!(
            version = self.version,
            namespaces = ?changes.iter().map(|c| c.namespace).collect::<Vec<_>>(),
            "Committed transaction"
        );

        Ok(TransactionOutcome {
            output,
            transaction: changes,
        })
    }

    /// Revert the most recent transaction. Returns false if there was none.
    pub fn undo(&mut self) -> Result<bool, StoreError> {
        match self.history.undo(&mut self.containers)? {
            Some(applied) => {
                self.version += 1;
                self.log.push(applied);
                tracing::debug!(version = self.version, "Undo");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Reapply the most recently undone transaction
    pub fn redo(&mut self) -> Result<bool, StoreError> {
        match self.history.redo(&mut self.containers)? {
            Some(applied) => {
                self.version += 1;
                self.log.push(applied);
                tracing::debug!(version = self.version, "Redo");
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
