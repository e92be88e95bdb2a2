//! Undo/redo stacks of piece ranges.

use crate::piece::PieceRange;

/// Identifier shared by every entry pushed inside one `group_op` scope.
pub type BatchId = u64;

/// Rune range an edit touched, recorded when the edit was made.
///
/// Inserts record `start..start + inserted_len`; erases record the erased
/// range. Undo and redo hand these back so the caller can restore the
/// selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CursorPos {
    pub start: usize,
    pub end: usize,
}

impl CursorPos {
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// One undoable step: the range to swap back in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct HistoryEntry {
    pub range: PieceRange,
    pub batch: Option<BatchId>,
    pub cursor: CursorPos,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct History {
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    batch: Option<BatchId>,
    batch_depth: usize,
    next_batch: BatchId,
}

impl History {
    /// Record a fresh edit, stamped with the active batch if any.
    pub fn push(&mut self, range: PieceRange, cursor: CursorPos) {
        self.undo_stack.push(HistoryEntry {
            range,
            batch: self.batch,
            cursor,
        });
    }

    pub fn push_undo(&mut self, entry: HistoryEntry) {
        self.undo_stack.push(entry);
    }

    pub fn push_redo(&mut self, entry: HistoryEntry) {
        self.redo_stack.push(entry);
    }

    /// Most recent undo entry, for in-place typing merges.
    pub fn last_undo_mut(&mut self) -> Option<&mut HistoryEntry> {
        self.undo_stack.last_mut()
    }

    /// Pop the top undo step: one entry, or every contiguous entry of its batch.
    pub fn pop_undo(&mut self) -> Vec<HistoryEntry> {
        pop_step(&mut self.undo_stack)
    }

    /// Pop the top redo step.
    pub fn pop_redo(&mut self) -> Vec<HistoryEntry> {
        pop_step(&mut self.redo_stack)
    }

    pub fn clear_redo(&mut self) {
        self.redo_stack.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    #[cfg(test)]
    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    /// Open a batch, or join the one already open.
    pub fn group(&mut self) -> BatchId {
        if self.batch_depth == 0 {
            self.next_batch += 1;
            self.batch = Some(self.next_batch);
        }
        self.batch_depth += 1;
        self.next_batch
    }

    /// Close one level of batching. Extra calls are ignored.
    pub fn ungroup(&mut self) {
        self.batch_depth = self.batch_depth.saturating_sub(1);
        if self.batch_depth == 0 {
            self.batch = None;
        }
    }

    #[cfg(test)]
    pub fn batch_depth(&self) -> usize {
        self.batch_depth
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.batch = None;
        self.batch_depth = 0;
    }
}

fn pop_step(stack: &mut Vec<HistoryEntry>) -> Vec<HistoryEntry> {
    let Some(top) = stack.pop() else {
        return Vec::new();
    };
    let mut step = vec![top];
    if let Some(batch) = top.batch {
        while let Some(&entry) = stack.last() {
            if entry.batch != Some(batch) {
                break;
            }
            stack.pop();
            step.push(entry);
        }
    }
    step
}
