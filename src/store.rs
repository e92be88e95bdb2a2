//! Append-only byte stores with a sparse rune index.
//!
//! A [`PieceTable`](crate::PieceTable) owns exactly two stores: the
//! *original* store, filled once from the initial document, and the *modify*
//! store, which receives every inserted run for the lifetime of the table.
//! Bytes already written are never moved or rewritten, so pieces can keep
//! plain `(offset, len)` ranges into a store.
//!
//! Mapping a rune index to a byte offset needs a UTF-8 decode from some known
//! position. The store records a checkpoint every `interval` runes while it
//! appends, so a lookup decodes at most `interval - 1` runes.

use std::ops::Range;

/// Default distance, in runes, between two rune-index checkpoints.
pub const DEFAULT_CHECKPOINT_INTERVAL: usize = 50;

/// Which store a piece points into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Source {
    /// Initial document content, written once.
    Original,
    /// Append-only store receiving inserted text.
    Modify,
}

impl Source {
    /// Single-letter tag used in chain dumps.
    #[must_use]
    pub fn tag(self) -> char {
        match self {
            Self::Original => 'O',
            Self::Modify => 'M',
        }
    }
}

/// Location of a run just appended to a store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Appended {
    pub rune_offset: usize,
    pub rune_len: usize,
    pub byte_offset: usize,
    pub byte_len: usize,
}

/// Append-only UTF-8 store with a checkpointed rune index.
#[derive(Clone, Debug)]
pub struct ByteStore {
    text: String,
    rune_len: usize,
    interval: usize,
    /// `checkpoints[i]` is the byte offset of rune `i * interval`.
    checkpoints: Vec<usize>,
}

impl Default for ByteStore {
    fn default() -> Self {
        Self::new(DEFAULT_CHECKPOINT_INTERVAL)
    }
}

impl ByteStore {
    /// Create an empty store. An interval of zero is treated as one.
    #[must_use]
    pub fn new(interval: usize) -> Self {
        Self {
            text: String::new(),
            rune_len: 0,
            interval: interval.max(1),
            checkpoints: vec![0],
        }
    }

    /// Reset the store to exactly `text`.
    pub fn set(&mut self, text: &str) -> Appended {
        *self = Self::new(self.interval);
        self.append(text)
    }

    /// Append `text`, returning where it landed.
    pub fn append(&mut self, text: &str) -> Appended {
        let rune_offset = self.rune_len;
        let byte_offset = self.text.len();

        let mut rune = self.rune_len;
        for (idx, _) in text.char_indices() {
            if rune % self.interval == 0 && rune / self.interval == self.checkpoints.len() {
                self.checkpoints.push(byte_offset + idx);
            }
            rune += 1;
        }

        self.text.push_str(text);
        self.rune_len = rune;

        Appended {
            rune_offset,
            rune_len: rune - rune_offset,
            byte_offset,
            byte_len: text.len(),
        }
    }

    /// Number of runes stored.
    #[must_use]
    pub fn len_runes(&self) -> usize {
        self.rune_len
    }

    /// Number of bytes stored.
    #[must_use]
    pub fn len_bytes(&self) -> usize {
        self.text.len()
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Checkpoint spacing in runes.
    #[must_use]
    pub fn interval(&self) -> usize {
        self.interval
    }

    /// Byte offset of rune `rune_index`. Indices past the end clamp to the
    /// byte length.
    #[must_use]
    pub fn rune_offset(&self, rune_index: usize) -> usize {
        if rune_index >= self.rune_len {
            return self.text.len();
        }
        let slot = rune_index / self.interval;
        let start = self.checkpoints.get(slot).copied().unwrap_or(0);
        let skip = rune_index - slot * self.interval;
        self.text
            .get(start..)
            .and_then(|tail| tail.char_indices().nth(skip))
            .map_or(self.text.len(), |(idx, _)| start + idx)
    }

    /// Rune index of the character containing `byte_offset`.
    #[must_use]
    pub fn byte_to_rune(&self, byte_offset: usize) -> usize {
        let mut byte_offset = byte_offset.min(self.text.len());
        while !self.text.is_char_boundary(byte_offset) {
            byte_offset -= 1;
        }
        let slot = self
            .checkpoints
            .partition_point(|&cp| cp <= byte_offset)
            .saturating_sub(1);
        let start = self.checkpoints.get(slot).copied().unwrap_or(0);
        let counted = self
            .text
            .get(start..byte_offset)
            .map_or(0, |s| s.chars().count());
        slot * self.interval + counted
    }

    /// Text in a byte range. Out-of-range or non-boundary ranges yield `""`.
    #[must_use]
    pub fn slice(&self, range: Range<usize>) -> &str {
        self.text.get(range).unwrap_or("")
    }

    /// Raw bytes in a byte range.
    #[must_use]
    pub fn bytes(&self, range: Range<usize>) -> &[u8] {
        self.text.as_bytes().get(range).unwrap_or(&[])
    }

    /// Decode the rune starting at `byte_offset`.
    #[must_use]
    pub fn rune_at(&self, byte_offset: usize) -> Option<char> {
        self.text.get(byte_offset..)?.chars().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_reports_location() {
        let mut store = ByteStore::default();
        let first = store.append("héllo");
        assert_eq!(
            first,
            Appended {
                rune_offset: 0,
                rune_len: 5,
                byte_offset: 0,
                byte_len: 6,
            }
        );

        let second = store.append("日本");
        assert_eq!(second.rune_offset, 5);
        assert_eq!(second.byte_offset, 6);
        assert_eq!(second.rune_len, 2);
        assert_eq!(second.byte_len, 6);
        assert_eq!(store.len_runes(), 7);
        assert_eq!(store.len_bytes(), 12);
    }

    #[test]
    fn test_rune_offset_matches_char_indices() {
        let text = "aé日😀".repeat(40);
        let mut store = ByteStore::new(7);
        // Append in uneven chunks so checkpoints straddle append boundaries.
        let mut rest = text.as_str();
        while !rest.is_empty() {
            let cut = rest.char_indices().nth(5).map_or(rest.len(), |(i, _)| i);
            store.append(&rest[..cut]);
            rest = &rest[cut..];
        }

        for (rune, (byte, _)) in text.char_indices().enumerate() {
            assert_eq!(store.rune_offset(rune), byte, "rune {rune}");
            assert_eq!(store.byte_to_rune(byte), rune, "byte {byte}");
        }
        assert_eq!(store.rune_offset(store.len_runes()), text.len());
        assert_eq!(store.rune_offset(usize::MAX), text.len());
    }

    #[test]
    fn test_checkpoint_spacing() {
        let mut store = ByteStore::new(50);
        store.append(&"x".repeat(120));
        assert_eq!(store.checkpoints, vec![0, 50, 100]);
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let store = ByteStore::new(0);
        assert_eq!(store.interval(), 1);
    }

    #[test]
    fn test_set_resets_contents() {
        let mut store = ByteStore::default();
        store.append("old text");
        let appended = store.set("new");
        assert_eq!(appended.rune_offset, 0);
        assert_eq!(store.slice(0..3), "new");
        assert_eq!(store.len_runes(), 3);
    }

    #[test]
    fn test_rune_at_and_slice() {
        let mut store = ByteStore::default();
        store.append("a日b");
        assert_eq!(store.rune_at(1), Some('日'));
        assert_eq!(store.rune_at(4), Some('b'));
        assert_eq!(store.rune_at(5), None);
        assert_eq!(store.slice(1..4), "日");
        assert_eq!(store.slice(1..2), "");
        assert_eq!(store.bytes(4..5), b"b");
    }

    #[test]
    fn test_byte_to_rune_inside_multibyte() {
        let mut store = ByteStore::default();
        store.append("a日b");
        assert_eq!(store.byte_to_rune(2), 1);
        assert_eq!(store.byte_to_rune(100), 3);
    }
}
