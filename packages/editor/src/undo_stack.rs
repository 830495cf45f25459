//! # Undo/Redo Stack
//!
//! Tracks committed transactions and replays their patches.
//!
//! ## Design
//!
//! - Each committed transaction is recorded with its inverse patches
//! - Undo applies the inverse and moves the batch to the redo stack
//! - Redo reapplies the forward patches
//! - Recording a new batch clears the redo stack
//! - A batch spanning several containers is one undo step

use crate::errors::StoreError;
use crate::patch::Transaction;

/// Something patches can be replayed against
pub trait PatchTarget {
    /// Apply every namespace of `transaction`, all or nothing
    fn apply_transaction(&mut self, transaction: &Transaction) -> Result<(), StoreError>;
}

/// One undo step
#[derive(Debug, Clone, PartialEq)]
pub struct PatchBatch {
    pub changes: Transaction,
    pub inverse: Transaction,
}

impl PatchBatch {
    pub fn new(changes: Transaction, inverse: Transaction) -> Self {
        Self { changes, inverse }
    }
}

#[derive(Debug)]
pub struct UndoStack {
    /// Most recent last
    undo_stack: Vec<PatchBatch>,

    /// Most recent last
    redo_stack: Vec<PatchBatch>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,
}

impl UndoStack {
    /// Create a new undo stack with default max levels (100)
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
        }
    }

    /// Record a committed batch. Invalidates everything on the redo stack.
    pub fn record(&mut self, batch: PatchBatch) {
        self.undo_stack.push(batch);

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }

        self.redo_stack.clear();
    }

    /// Revert the most recent batch.
    ///
    /// Returns the patches that were applied, or `None` when there was
    /// nothing to undo. A batch that fails to apply stays where it was.
    pub fn undo<T: PatchTarget>(&mut self, target: &mut T) -> Result<Option<Transaction>, StoreError> {
        let Some(batch) = self.undo_stack.pop() else {
            return Ok(None);
        };

        if let Err(e) = target.apply_transaction(&batch.inverse) {
            self.undo_stack.push(batch);
            return Err(e);
        }

        let applied = batch.inverse.clone();
        self.redo_stack.push(batch);
        Ok(Some(applied))
    }

    /// Reapply the most recently undone batch
    pub fn redo<T: PatchTarget>(&mut self, target: &mut T) -> Result<Option<Transaction>, StoreError> {
        let Some(batch) = self.redo_stack.pop() else {
            return Ok(None);
        };

        if let Err(e) = target.apply_transaction(&batch.changes) {
            self.redo_stack.push(batch);
            return Err(e);
        }

        let applied = batch.changes.clone();
        self.undo_stack.push(batch);
        Ok(Some(applied))
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    /// Clear all undo/redo history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}
