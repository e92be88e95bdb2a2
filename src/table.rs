//! Piece table: the edit engine behind the editor widget.
//!
//! [`PieceTable`] keeps the document as a chain of pieces over two byte
//! stores and records every edit as a [`PieceRange`] that can be swapped
//! back in. Undo and redo never recompute text; they only relink pieces.
//!
//! # Examples
//!
//! ```
//! use piecetable::PieceTable;
//!
//! let table = PieceTable::with_text("hello world");
//! assert!(table.replace(0, 5, "HELLO"));
//! assert_eq!(table.text(), "HELLO world");
//!
//! // Replace is a single undo step.
//! table.undo();
//! assert_eq!(table.text(), "hello world");
//! ```
//!
//! # Locking
//!
//! All state sits behind one `RwLock`. Reads share it; every mutation holds
//! it exclusively for its whole duration. Nothing blocks or does I/O while
//! the lock is held.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::diagnostics::{Diagnostics, LogCallback, LogLevel};
use crate::error::{Error, Result};
use crate::history::{CursorPos, History, HistoryEntry};
use crate::marker::{Anchor, Bias, Marker, MarkerSet, Splice};
use crate::piece::{Piece, PieceId, PieceList, PieceRange};
use crate::reader::Reader;
use crate::store::{ByteStore, DEFAULT_CHECKPOINT_INTERVAL, Source};

/// Construction options for a [`PieceTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PieceTableOptions {
    /// Runes between two rune-index checkpoints in each store.
    pub checkpoint_interval: usize,
    /// Grow the last inserted piece for contiguous single-rune inserts
    /// instead of recording a new undo step per keystroke.
    pub merge_typing: bool,
    /// Log every edit through the table's diagnostics.
    pub debug: bool,
}

impl Default for PieceTableOptions {
    fn default() -> Self {
        Self {
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            merge_typing: true,
            debug: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    None,
    Insert,
    Erase,
}

#[derive(Debug)]
struct Inner {
    original: ByteStore,
    modify: ByteStore,
    pieces: PieceList,
    history: History,
    markers: MarkerSet,
    runes: usize,
    bytes: usize,
    last_action: Action,
    last_action_end: usize,
    last_insert_piece: Option<PieceId>,
    options: PieceTableOptions,
    diagnostics: Diagnostics,
}

/// Piece-table text buffer with undo/redo and markers.
///
/// Positions are rune (Unicode scalar) indices unless a method says
/// otherwise. Edits with invalid arguments return `false` and change
/// nothing.
#[derive(Debug)]
pub struct PieceTable {
    inner: RwLock<Inner>,
    changed: AtomicBool,
}

impl Default for PieceTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PieceTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options("", PieceTableOptions::default())
    }

    /// Create a table holding `text`.
    #[must_use]
    pub fn with_text(text: &str) -> Self {
        Self::with_options(text, PieceTableOptions::default())
    }

    /// Create a table holding `text` with custom options.
    #[must_use]
    pub fn with_options(text: &str, options: PieceTableOptions) -> Self {
        let mut inner = Inner {
            original: ByteStore::new(options.checkpoint_interval),
            modify: ByteStore::new(options.checkpoint_interval),
            pieces: PieceList::new(),
            history: History::default(),
            markers: MarkerSet::default(),
            runes: 0,
            bytes: 0,
            last_action: Action::None,
            last_action_end: 0,
            last_insert_piece: None,
            options,
            diagnostics: Diagnostics::new(options.debug),
        };
        inner.set_text(text);
        Self {
            inner: RwLock::new(inner),
            changed: AtomicBool::new(false),
        }
    }

    /// Create a table from raw bytes, which must be valid UTF-8.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)?;
        Ok(Self::with_text(text))
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn mark_changed(&self, changed: bool) -> bool {
        if changed {
            self.changed.store(true, Ordering::Release);
        }
        changed
    }

    /// Options the table was built with.
    #[must_use]
    pub fn options(&self) -> PieceTableOptions {
        self.read().options
    }

    /// Turn edit logging on or off.
    pub fn set_debug(&self, enabled: bool) {
        let mut inner = self.write();
        inner.options.debug = enabled;
        inner.diagnostics.set_enabled(enabled);
    }

    /// Route diagnostics to `callback` instead of `tracing`.
    pub fn set_log_callback<F>(&self, callback: F)
    where
        F: Fn(LogLevel, &str) + Send + Sync + 'static,
    {
        let callback: LogCallback = Box::new(callback);
        self.write().diagnostics.set_callback(Some(callback));
    }

    /// Number of runes in the document.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().runes
    }

    /// Number of UTF-8 bytes in the document.
    #[must_use]
    pub fn len_bytes(&self) -> usize {
        self.read().bytes
    }

    /// Check if the document is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().runes == 0
    }

    /// Number of live pieces in the chain.
    #[must_use]
    pub fn piece_count(&self) -> usize {
        self.read().pieces.len()
    }

    /// Whether the document changed since the last call. Reading clears it.
    pub fn changed(&self) -> bool {
        self.changed.swap(false, Ordering::AcqRel)
    }

    /// Full document text.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.text_into(&mut out);
        out
    }

    /// Replace the contents of `buf` with the document text.
    pub fn text_into(&self, buf: &mut String) {
        let inner = self.read();
        buf.clear();
        buf.reserve(inner.bytes);
        for (_, piece) in inner.pieces.iter() {
            buf.push_str(inner.piece_text(piece));
        }
    }

    /// Text between two rune indices. The range is ordered and clamped.
    #[must_use]
    pub fn text_range(&self, start: usize, end: usize) -> String {
        let inner = self.read();
        let (start, end) = (start.min(end), start.max(end));
        let from = inner.rune_offset(start);
        let to = inner.rune_offset(end);

        let mut out = String::with_capacity(to - from);
        let mut pos = 0;
        for (_, piece) in inner.pieces.iter() {
            let piece_end = pos + piece.byte_len;
            if piece_end > from && pos < to {
                let lo = from.max(pos) - pos + piece.byte_offset;
                let hi = to.min(piece_end) - pos + piece.byte_offset;
                out.push_str(inner.store(piece.source).slice(lo..hi));
            }
            if piece_end >= to {
                break;
            }
            pos = piece_end;
        }
        out
    }

    /// Reset the document to `text`, dropping history and markers.
    pub fn set_text(&self, text: &str) {
        self.write().set_text(text);
        self.mark_changed(true);
    }

    /// Insert `text` at `rune_index`.
    ///
    /// Returns `false` (and does nothing) if the index is past the end or
    /// `text` is empty.
    pub fn insert(&self, rune_index: usize, text: &str) -> bool {
        let changed = self.write().insert(rune_index, text);
        self.mark_changed(changed)
    }

    /// Erase the runes between `start` and `end`.
    ///
    /// The range is ordered and clamped to the document. Returns `false` if
    /// it is empty.
    pub fn erase(&self, start: usize, end: usize) -> bool {
        let changed = self.write().erase(start, end);
        self.mark_changed(changed)
    }

    /// Replace the runes between `start` and `end` with `text` as one undo
    /// step.
    pub fn replace(&self, start: usize, end: usize, text: &str) -> bool {
        let changed = self.write().replace(start, end, text);
        self.mark_changed(changed)
    }

    /// Undo the last step. Returns the cursor ranges recorded by the undone
    /// edits, latest first, or `None` when there is nothing to undo.
    pub fn undo(&self) -> Option<Vec<CursorPos>> {
        let cursors = self.write().undo();
        self.mark_changed(cursors.is_some());
        cursors
    }

    /// Redo the last undone step. Returns the cursor ranges recorded by the
    /// redone edits, earliest first.
    pub fn redo(&self) -> Option<Vec<CursorPos>> {
        let cursors = self.write().redo();
        self.mark_changed(cursors.is_some());
        cursors
    }

    /// Check if undo is available.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.read().history.can_undo()
    }

    /// Check if redo is available.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.read().history.can_redo()
    }

    /// Start a batch. Edits until the matching [`ungroup_op`](Self::ungroup_op)
    /// undo and redo as one step. Calls nest.
    pub fn group_op(&self) {
        let mut inner = self.write();
        inner.history.group();
        // A typing run never straddles a batch edge.
        inner.reset_action();
    }

    /// Close one level of batching.
    pub fn ungroup_op(&self) {
        let mut inner = self.write();
        inner.history.ungroup();
        inner.reset_action();
    }

    /// Register a marker at `rune_offset`, clamped to the document.
    pub fn create_marker(&self, rune_offset: usize, bias: Bias) -> Marker {
        self.write().create_marker(rune_offset, bias)
    }

    /// Current rune offset of a marker, or `None` once it was removed.
    #[must_use]
    pub fn marker_offset(&self, marker: Marker) -> Option<usize> {
        let inner = self.read();
        inner.markers.get(marker).map(|anchor| inner.anchor_offset(anchor))
    }

    /// Bias a marker was created with.
    #[must_use]
    pub fn marker_bias(&self, marker: Marker) -> Option<Bias> {
        self.read().markers.get(marker).map(|anchor| anchor.bias)
    }

    /// Stop tracking a marker. Returns `false` for unknown handles.
    pub fn remove_marker(&self, marker: Marker) -> bool {
        self.write().markers.remove(marker)
    }

    /// Number of live markers.
    #[must_use]
    pub fn marker_count(&self) -> usize {
        self.read().markers.len()
    }

    /// Copy document bytes starting at `byte_offset` into `buf`.
    ///
    /// Reads spanning several pieces are stitched together. Returns
    /// [`Error::Eof`] when `byte_offset` is at or past the end.
    pub fn read_at(&self, buf: &mut [u8], byte_offset: usize) -> Result<usize> {
        self.read().read_at(buf, byte_offset)
    }

    /// Rune at `rune_offset`, or [`Error::Eof`] past the end.
    pub fn read_rune_at(&self, rune_offset: usize) -> Result<char> {
        self.read().read_rune_at(rune_offset)
    }

    /// Byte offset of `rune_index`, clamped to the document.
    #[must_use]
    pub fn rune_offset(&self, rune_index: usize) -> usize {
        self.read().rune_offset(rune_index)
    }

    /// Rune index of the character containing `byte_offset`.
    #[must_use]
    pub fn byte_to_rune(&self, byte_offset: usize) -> usize {
        self.read().byte_to_rune(byte_offset)
    }

    /// Number of paragraphs: newline-terminated lines plus a trailing
    /// unterminated one. An empty document has none.
    #[must_use]
    pub fn lines(&self) -> usize {
        self.read().lines()
    }

    /// Sequential reader over the document bytes.
    #[must_use]
    pub fn reader(&self) -> Reader<'_> {
        Reader::new(self)
    }
}

impl Inner {
    fn store(&self, source: Source) -> &ByteStore {
        match source {
            Source::Original => &self.original,
            Source::Modify => &self.modify,
        }
    }

    fn piece_text(&self, piece: &Piece) -> &str {
        self.store(piece.source)
            .slice(piece.byte_offset..piece.byte_end())
    }

    fn reset_action(&mut self) {
        self.last_action = Action::None;
        self.last_action_end = 0;
        self.last_insert_piece = None;
    }

    fn set_text(&mut self, text: &str) {
        let interval = self.options.checkpoint_interval;
        self.modify = ByteStore::new(interval);
        self.pieces = PieceList::new();
        self.history.clear();
        self.markers.clear();
        self.reset_action();

        let appended = self.original.set(text);
        if appended.rune_len > 0 {
            self.pieces.push_back(Piece::new(
                Source::Original,
                appended.rune_offset,
                appended.rune_len,
                appended.byte_offset,
                appended.byte_len,
            ));
        }
        self.runes = appended.rune_len;
        self.bytes = appended.byte_len;
        self.diagnostics.emit(LogLevel::Debug, || {
            format!("set_text: {} runes, {} bytes", self.runes, self.bytes)
        });
    }

    /// Split piece `id` at in-piece rune `offset` into two unlinked halves.
    fn split(&self, id: PieceId, offset: usize) -> (Piece, Piece) {
        let piece = *self.pieces.get(id);
        let at = self
            .store(piece.source)
            .rune_offset(piece.rune_offset + offset);
        let left = Piece::new(
            piece.source,
            piece.rune_offset,
            offset,
            piece.byte_offset,
            at - piece.byte_offset,
        );
        let right = Piece::new(
            piece.source,
            piece.rune_offset + offset,
            piece.rune_len - offset,
            at,
            piece.byte_end() - at,
        );
        (left, right)
    }

    /// Swap `incoming` into the chain and carry markers over. Returns the
    /// displaced range.
    fn apply(&mut self, incoming: PieceRange) -> PieceRange {
        let (prev, next) = self.pieces.outer(incoming);
        let displaced = self.pieces.swap(incoming);
        let outgoing = self.pieces.members(displaced);
        let incoming = self.pieces.members(incoming);
        self.markers.remap(
            &self.pieces,
            &Splice {
                prev,
                next,
                outgoing: &outgoing,
                incoming: &incoming,
            },
        );
        displaced
    }

    fn insert(&mut self, rune_index: usize, text: &str) -> bool {
        if text.is_empty() || rune_index > self.runes {
            return false;
        }
        self.history.clear_redo();

        let rune_len = text.chars().count();
        if self.try_merge(rune_index, text, rune_len) {
            return true;
        }

        let appended = self.modify.append(text);
        let inserted = Piece::new(
            Source::Modify,
            appended.rune_offset,
            appended.rune_len,
            appended.byte_offset,
            appended.byte_len,
        );

        let (target, offset) = self.pieces.find_piece(rune_index);
        let incoming = if offset == 0 {
            let prev = self.pieces.prev(target);
            self.pieces.alloc_run(&[inserted], prev, target)
        } else {
            let (left, right) = self.split(target, offset);
            let prev = self.pieces.prev(target);
            let next = self.pieces.next(target);
            self.pieces.alloc_run(&[left, inserted, right], prev, next)
        };
        let inserted_id = if offset == 0 {
            incoming.first
        } else {
            self.pieces.next(incoming.first)
        };

        let displaced = self.apply(incoming);
        self.history
            .push(displaced, CursorPos::new(rune_index, rune_index + rune_len));

        self.runes += rune_len;
        self.bytes += text.len();
        self.last_action = Action::Insert;
        self.last_action_end = rune_index + rune_len;
        self.last_insert_piece = Some(inserted_id);

        self.diagnostics.emit(LogLevel::Debug, || {
            format!(
                "insert {rune_len} runes at {rune_index} ({}): {}",
                if offset == 0 { "boundary" } else { "split" },
                self.pieces.describe()
            )
        });
        true
    }

    /// Grow the last inserted piece in place when this insert continues it.
    fn try_merge(&mut self, rune_index: usize, text: &str, rune_len: usize) -> bool {
        if !self.options.merge_typing
            || rune_len != 1
            || self.last_action != Action::Insert
            || self.last_action_end != rune_index
        {
            return false;
        }
        let Some(id) = self.last_insert_piece else {
            return false;
        };
        let piece = *self.pieces.get(id);
        if piece.source != Source::Modify
            || piece.byte_end() != self.modify.len_bytes()
            || !self.pieces.is_linked(id)
        {
            return false;
        }

        let appended = self.modify.append(text);
        let old_len = piece.rune_len;
        let grown = self.pieces.get_mut(id);
        grown.rune_len += appended.rune_len;
        grown.byte_len += appended.byte_len;
        let new_len = grown.rune_len;

        let next = self.pieces.next(id);
        self.markers.grow(id, next, old_len, new_len);
        if let Some(entry) = self.history.last_undo_mut() {
            entry.cursor.end += rune_len;
        }

        self.runes += rune_len;
        self.bytes += text.len();
        self.last_action_end += rune_len;
        self.diagnostics.emit(LogLevel::Debug, || {
            format!("merge 1 rune at {rune_index} into piece {}", id.index())
        });
        true
    }

    fn erase(&mut self, start: usize, end: usize) -> bool {
        let (start, end) = (start.min(end), start.max(end).min(self.runes));
        if start >= end {
            return false;
        }
        self.history.clear_redo();

        let (first, first_offset) = self.pieces.find_piece(start);
        let mut last = first;
        // Runes from the start of `last` to `end`.
        let mut remaining = first_offset + (end - start);
        loop {
            let len = self.pieces.get(last).rune_len;
            if remaining <= len || last.is_sentinel() {
                break;
            }
            remaining -= len;
            last = self.pieces.next(last);
        }
        let last_offset = remaining;

        let prev = self.pieces.prev(first);
        let next = self.pieces.next(last);
        let mut kept = Vec::with_capacity(2);
        if first_offset > 0 {
            kept.push(self.split(first, first_offset).0);
        }
        if last_offset < self.pieces.get(last).rune_len {
            kept.push(self.split(last, last_offset).1);
        }
        let incoming = self.pieces.alloc_run(&kept, prev, next);

        let displaced = self.apply(incoming);
        let (_, removed_bytes) = self.pieces.range_size(displaced);
        let (_, kept_bytes) = self.pieces.range_size(incoming);
        self.history.push(displaced, CursorPos::new(start, end));

        self.runes -= end - start;
        self.bytes -= removed_bytes - kept_bytes;
        self.last_action = Action::Erase;
        self.last_action_end = start;
        self.last_insert_piece = None;

        self.diagnostics.emit(LogLevel::Debug, || {
            format!("erase {start}..{end}: {}", self.pieces.describe())
        });
        true
    }

    fn replace(&mut self, start: usize, end: usize, text: &str) -> bool {
        let (start, end) = (start.min(end), start.max(end).min(self.runes));
        if text.is_empty() {
            return self.erase(start, end);
        }
        if start >= end {
            return self.insert(start, text);
        }

        self.history.group();
        let erased = self.erase(start, end);
        let inserted = self.insert(start, text);
        self.history.ungroup();
        erased || inserted
    }

    fn undo(&mut self) -> Option<Vec<CursorPos>> {
        let step = self.history.pop_undo();
        if step.is_empty() {
            return None;
        }
        let mut cursors = Vec::with_capacity(step.len());
        for entry in step {
            let restored = self.restore(entry);
            self.history.push_redo(restored);
            cursors.push(entry.cursor);
        }
        self.reset_action();
        self.diagnostics.emit(LogLevel::Debug, || {
            format!("undo {} entries: {}", cursors.len(), self.pieces.describe())
        });
        Some(cursors)
    }

    fn redo(&mut self) -> Option<Vec<CursorPos>> {
        let step = self.history.pop_redo();
        if step.is_empty() {
            return None;
        }
        let mut cursors = Vec::with_capacity(step.len());
        for entry in step {
            let restored = self.restore(entry);
            self.history.push_undo(restored);
            cursors.push(entry.cursor);
        }
        self.reset_action();
        self.diagnostics.emit(LogLevel::Debug, || {
            format!("redo {} entries: {}", cursors.len(), self.pieces.describe())
        });
        Some(cursors)
    }

    /// Swap a history entry back into the chain, returning the entry that
    /// reverses it.
    fn restore(&mut self, entry: HistoryEntry) -> HistoryEntry {
        let (in_runes, in_bytes) = self.pieces.range_size(entry.range);
        let displaced = self.apply(entry.range);
        let (out_runes, out_bytes) = self.pieces.range_size(displaced);

        self.runes = self.runes + in_runes - out_runes;
        self.bytes = self.bytes + in_bytes - out_bytes;
        HistoryEntry {
            range: displaced,
            ..entry
        }
    }

    fn create_marker(&mut self, rune_offset: usize, bias: Bias) -> Marker {
        let rune_offset = rune_offset.min(self.runes);
        let (mut piece, mut offset) = self.pieces.find_piece(rune_offset);
        if piece == PieceId::TAIL && self.runes > 0 {
            piece = self.pieces.last();
            offset = self.pieces.get(piece).rune_len;
        }
        self.markers.insert(Anchor {
            piece,
            offset,
            bias,
        })
    }

    fn anchor_offset(&self, anchor: &Anchor) -> usize {
        let mut pos = 0;
        for (id, piece) in self.pieces.iter() {
            if id == anchor.piece {
                return pos + anchor.offset.min(piece.rune_len);
            }
            pos += piece.rune_len;
        }
        pos
    }

    fn read_at(&self, buf: &mut [u8], byte_offset: usize) -> Result<usize> {
        if byte_offset >= self.bytes {
            return Err(Error::Eof);
        }
        let mut written = 0;
        let mut pos = 0;
        for (_, piece) in self.pieces.iter() {
            if written == buf.len() {
                break;
            }
            let piece_end = pos + piece.byte_len;
            if piece_end <= byte_offset {
                pos = piece_end;
                continue;
            }
            let skip = byte_offset + written - pos;
            let src = self
                .store(piece.source)
                .bytes(piece.byte_offset + skip..piece.byte_end());
            let n = src.len().min(buf.len() - written);
            buf[written..written + n].copy_from_slice(&src[..n]);
            written += n;
            pos = piece_end;
        }
        Ok(written)
    }

    fn read_rune_at(&self, rune_offset: usize) -> Result<char> {
        let (id, offset) = self.pieces.find_piece(rune_offset);
        if id.is_sentinel() {
            return Err(Error::Eof);
        }
        let piece = self.pieces.get(id);
        let store = self.store(piece.source);
        let at = store.rune_offset(piece.rune_offset + offset);
        store.rune_at(at).ok_or(Error::Eof)
    }

    fn rune_offset(&self, rune_index: usize) -> usize {
        let mut runes = 0;
        let mut bytes = 0;
        for (_, piece) in self.pieces.iter() {
            if rune_index < runes + piece.rune_len {
                let store = self.store(piece.source);
                let at = store.rune_offset(piece.rune_offset + rune_index - runes);
                return bytes + at - piece.byte_offset;
            }
            runes += piece.rune_len;
            bytes += piece.byte_len;
        }
        self.bytes
    }

    fn byte_to_rune(&self, byte_offset: usize) -> usize {
        let mut runes = 0;
        let mut bytes = 0;
        for (_, piece) in self.pieces.iter() {
            if byte_offset < bytes + piece.byte_len {
                let store = self.store(piece.source);
                let at = store.byte_to_rune(piece.byte_offset + byte_offset - bytes);
                return runes + at - piece.rune_offset;
            }
            runes += piece.rune_len;
            bytes += piece.byte_len;
        }
        self.runes
    }

    fn lines(&self) -> usize {
        let mut lines = 0;
        // A line fragment may continue across several pieces.
        let mut open = false;
        for (_, piece) in self.pieces.iter() {
            let text = self.piece_text(piece);
            let breaks = text.bytes().filter(|&b| b == b'\n').count();
            lines += breaks;
            if breaks > 0 {
                open = !text.ends_with('\n');
            } else {
                open = open || !text.is_empty();
            }
        }
        lines + usize::from(open)
    }
}
