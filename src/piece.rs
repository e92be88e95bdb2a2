//! Arena-backed piece chain.
//!
//! Pieces live in a `Vec` and link to each other through [`PieceId`]
//! handles, forming a doubly-linked list bounded by two sentinels. Pieces
//! are never freed: a run detached by an edit keeps its outer links, so
//! swapping it back in later restores the chain exactly. Undo and redo are
//! built on that single operation, [`PieceList::swap`].

use std::fmt::Write as _;

use crate::store::Source;

/// Stable handle to a piece in a [`PieceList`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PieceId(usize);

impl PieceId {
    /// Head sentinel. Never carries text.
    pub const HEAD: Self = Self(0);
    /// Tail sentinel. Never carries text.
    pub const TAIL: Self = Self(1);

    /// Whether this is one of the two sentinels.
    #[must_use]
    pub fn is_sentinel(self) -> bool {
        self == Self::HEAD || self == Self::TAIL
    }

    /// Raw arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A contiguous slice of one byte store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Piece {
    pub source: Source,
    pub rune_offset: usize,
    pub rune_len: usize,
    pub byte_offset: usize,
    pub byte_len: usize,
    prev: PieceId,
    next: PieceId,
}

impl Piece {
    /// Create an unlinked piece.
    #[must_use]
    pub fn new(
        source: Source,
        rune_offset: usize,
        rune_len: usize,
        byte_offset: usize,
        byte_len: usize,
    ) -> Self {
        Self {
            source,
            rune_offset,
            rune_len,
            byte_offset,
            byte_len,
            prev: PieceId::HEAD,
            next: PieceId::TAIL,
        }
    }

    fn sentinel() -> Self {
        Self::new(Source::Original, 0, 0, 0, 0)
    }

    /// Store rune offset one past the last rune.
    #[must_use]
    pub fn rune_end(&self) -> usize {
        self.rune_offset + self.rune_len
    }

    /// Store byte offset one past the last byte.
    #[must_use]
    pub fn byte_end(&self) -> usize {
        self.byte_offset + self.byte_len
    }

    /// Whether `rune` (a store offset) lies in `[rune_offset, rune_end]`.
    #[must_use]
    pub fn covers(&self, rune: usize) -> bool {
        self.rune_offset <= rune && rune <= self.rune_end()
    }

    /// Whether one piece's store range contains the other's.
    ///
    /// Split remainders are related to the piece they came from. Distinct
    /// pieces of a live chain never are.
    #[must_use]
    pub fn related(&self, other: &Self) -> bool {
        self.source == other.source
            && ((self.rune_offset <= other.rune_offset && other.rune_end() <= self.rune_end())
                || (other.rune_offset <= self.rune_offset && self.rune_end() <= other.rune_end()))
    }
}

/// A captured run of pieces, or an empty boundary between two pieces.
///
/// For a run, `first.prev` and `last.next` name the splice point. For a
/// boundary, `first` and `last` are the two pieces the empty run sits
/// between.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PieceRange {
    pub first: PieceId,
    pub last: PieceId,
    pub boundary: bool,
}

impl PieceRange {
    /// An empty range between `prev` and `next`.
    #[must_use]
    pub fn boundary(prev: PieceId, next: PieceId) -> Self {
        Self {
            first: prev,
            last: next,
            boundary: true,
        }
    }

    /// A run from `first` to `last` inclusive.
    #[must_use]
    pub fn run(first: PieceId, last: PieceId) -> Self {
        Self {
            first,
            last,
            boundary: false,
        }
    }
}

/// Doubly-linked piece chain with head and tail sentinels.
#[derive(Clone, Debug)]
pub struct PieceList {
    pieces: Vec<Piece>,
}

impl Default for PieceList {
    fn default() -> Self {
        Self::new()
    }
}

impl PieceList {
    /// Create an empty chain: head linked straight to tail.
    #[must_use]
    pub fn new() -> Self {
        let mut head = Piece::sentinel();
        let mut tail = Piece::sentinel();
        head.next = PieceId::TAIL;
        tail.prev = PieceId::HEAD;
        Self {
            pieces: vec![head, tail],
        }
    }

    /// Get a piece. Panics on a handle from another list.
    #[must_use]
    pub fn get(&self, id: PieceId) -> &Piece {
        &self.pieces[id.0]
    }

    pub(crate) fn get_mut(&mut self, id: PieceId) -> &mut Piece {
        &mut self.pieces[id.0]
    }

    #[must_use]
    pub fn prev(&self, id: PieceId) -> PieceId {
        self.get(id).prev
    }

    #[must_use]
    pub fn next(&self, id: PieceId) -> PieceId {
        self.get(id).next
    }

    /// First live piece, or the tail sentinel when empty.
    #[must_use]
    pub fn first(&self) -> PieceId {
        self.next(PieceId::HEAD)
    }

    /// Last live piece, or the head sentinel when empty.
    #[must_use]
    pub fn last(&self) -> PieceId {
        self.prev(PieceId::TAIL)
    }

    /// Whether `id` is currently part of the chain.
    #[must_use]
    pub fn is_linked(&self, id: PieceId) -> bool {
        !id.is_sentinel() && self.next(self.prev(id)) == id
    }

    /// Number of pieces ever allocated, sentinels included.
    #[must_use]
    pub fn arena_len(&self) -> usize {
        self.pieces.len()
    }

    /// Iterate over live pieces in document order.
    pub fn iter(&self) -> impl Iterator<Item = (PieceId, &Piece)> + '_ {
        let mut cur = self.first();
        std::iter::from_fn(move || {
            if cur == PieceId::TAIL {
                return None;
            }
            let id = cur;
            cur = self.next(id);
            Some((id, self.get(id)))
        })
    }

    /// Number of live pieces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Check if the chain holds no pieces.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.first() == PieceId::TAIL
    }

    /// Piece holding `rune_index` and the offset inside it.
    ///
    /// The offset is always strictly inside the piece, so an index on a piece
    /// boundary resolves to the following piece at offset 0. End of document
    /// and beyond resolve to the tail sentinel.
    #[must_use]
    pub fn find_piece(&self, rune_index: usize) -> (PieceId, usize) {
        let mut remaining = rune_index;
        for (id, piece) in self.iter() {
            if remaining < piece.rune_len {
                return (id, remaining);
            }
            remaining -= piece.rune_len;
        }
        (PieceId::TAIL, 0)
    }

    fn alloc(&mut self, piece: Piece) -> PieceId {
        self.pieces.push(piece);
        PieceId(self.pieces.len() - 1)
    }

    fn link(&mut self, a: PieceId, b: PieceId) {
        self.pieces[a.0].next = b;
        self.pieces[b.0].prev = a;
    }

    /// Link `piece` into the chain just before `at`.
    pub fn insert_before(&mut self, at: PieceId, piece: Piece) -> PieceId {
        let prev = self.prev(at);
        let id = self.alloc(piece);
        self.link(prev, id);
        self.link(id, at);
        id
    }

    /// Link `piece` into the chain just after `at`.
    pub fn insert_after(&mut self, at: PieceId, piece: Piece) -> PieceId {
        let next = self.next(at);
        self.insert_before(next, piece)
    }

    /// Append `piece` at the end of the document.
    pub fn push_back(&mut self, piece: Piece) -> PieceId {
        self.insert_before(PieceId::TAIL, piece)
    }

    /// Allocate a detached run whose outer links point at `prev` and `next`.
    ///
    /// The chain itself is untouched until the run is passed to
    /// [`swap`](Self::swap). An empty slice yields a boundary range.
    pub fn alloc_run(&mut self, pieces: &[Piece], prev: PieceId, next: PieceId) -> PieceRange {
        let mut ids = pieces.iter().map(|&p| self.alloc(p)).collect::<Vec<_>>().into_iter();
        let Some(first) = ids.next() else {
            return PieceRange::boundary(prev, next);
        };
        let mut last = first;
        for id in ids {
            self.link(last, id);
            last = id;
        }
        self.pieces[first.0].prev = prev;
        self.pieces[last.0].next = next;
        PieceRange::run(first, last)
    }

    /// The pieces a range sits between.
    #[must_use]
    pub fn outer(&self, range: PieceRange) -> (PieceId, PieceId) {
        if range.boundary {
            (range.first, range.last)
        } else {
            (self.prev(range.first), self.next(range.last))
        }
    }

    /// Splice `range` into the chain at the point its outer links name.
    ///
    /// Whatever currently sits there is detached and returned, keeping its
    /// own outer links, so swapping the returned range puts the chain back
    /// the way it was.
    pub fn swap(&mut self, range: PieceRange) -> PieceRange {
        let (prev, next) = self.outer(range);
        let displaced = if self.next(prev) == next {
            PieceRange::boundary(prev, next)
        } else {
            PieceRange::run(self.next(prev), self.prev(next))
        };

        if range.boundary {
            self.link(prev, next);
        } else {
            self.link(prev, range.first);
            self.link(range.last, next);
        }
        displaced
    }

    /// Ids in a range, in order. Boundaries are empty.
    #[must_use]
    pub fn members(&self, range: PieceRange) -> Vec<PieceId> {
        let mut ids = Vec::new();
        if range.boundary {
            return ids;
        }
        let mut cur = range.first;
        loop {
            ids.push(cur);
            if cur == range.last || cur.is_sentinel() {
                break;
            }
            cur = self.next(cur);
        }
        debug_assert!(!ids.iter().any(|id| id.is_sentinel()), "range crosses a sentinel");
        ids
    }

    /// Total `(runes, bytes)` denoted by a range.
    #[must_use]
    pub fn range_size(&self, range: PieceRange) -> (usize, usize) {
        self.members(range).into_iter().fold((0, 0), |(runes, bytes), id| {
            let piece = self.get(id);
            (runes + piece.rune_len, bytes + piece.byte_len)
        })
    }

    /// Compact dump of the live chain, e.g. `[O 0+5][M 0+3]`.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for (_, piece) in self.iter() {
            let _ = write!(
                out,
                "[{} {}+{}]",
                piece.source.tag(),
                piece.rune_offset,
                piece.rune_len
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn original(rune_offset: usize, rune_len: usize) -> Piece {
        Piece::new(Source::Original, rune_offset, rune_len, rune_offset, rune_len)
    }

    fn modify(rune_offset: usize, rune_len: usize) -> Piece {
        Piece::new(Source::Modify, rune_offset, rune_len, rune_offset, rune_len)
    }

    #[test]
    fn test_empty_list() {
        let list = PieceList::new();
        assert!(list.is_empty());
        assert_eq!(list.first(), PieceId::TAIL);
        assert_eq!(list.last(), PieceId::HEAD);
        assert_eq!(list.find_piece(0), (PieceId::TAIL, 0));
        assert_eq!(list.describe(), "");
    }

    #[test]
    fn test_push_and_insert() {
        let mut list = PieceList::new();
        let a = list.push_back(original(0, 3));
        let c = list.push_back(original(5, 2));
        let b = list.insert_before(c, modify(0, 4));
        let d = list.insert_after(c, modify(4, 1));

        let order: Vec<_> = list.iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec![a, b, c, d]);
        assert_eq!(list.describe(), "[O 0+3][M 0+4][O 5+2][M 4+1]");
        assert_eq!(list.len(), 4);
    }

    #[test]
    fn test_find_piece_boundaries() {
        let mut list = PieceList::new();
        let a = list.push_back(original(0, 3));
        let b = list.push_back(modify(0, 2));

        assert_eq!(list.find_piece(0), (a, 0));
        assert_eq!(list.find_piece(2), (a, 2));
        assert_eq!(list.find_piece(3), (b, 0));
        assert_eq!(list.find_piece(4), (b, 1));
        assert_eq!(list.find_piece(5), (PieceId::TAIL, 0));
        assert_eq!(list.find_piece(50), (PieceId::TAIL, 0));
    }

    #[test]
    fn test_swap_and_restore_run() {
        let mut list = PieceList::new();
        let a = list.push_back(original(0, 5));
        let before = list.describe();

        let run = list.alloc_run(&[original(0, 2), modify(0, 1), original(2, 3)], PieceId::HEAD, PieceId::TAIL);
        assert_eq!(list.describe(), before, "alloc_run must not touch the chain");

        let displaced = list.swap(run);
        assert_eq!(displaced, PieceRange::run(a, a));
        assert_eq!(list.describe(), "[O 0+2][M 0+1][O 2+3]");
        assert!(!list.is_linked(a));

        let back = list.swap(displaced);
        assert_eq!(back, run);
        assert_eq!(list.describe(), before);
        assert!(list.is_linked(a));

        list.swap(back);
        assert_eq!(list.describe(), "[O 0+2][M 0+1][O 2+3]");
    }

    #[test]
    fn test_swap_boundary_insert_and_delete() {
        let mut list = PieceList::new();
        let a = list.push_back(original(0, 2));
        let b = list.push_back(original(2, 2));

        let run = list.alloc_run(&[modify(0, 3)], a, b);
        let displaced = list.swap(run);
        assert_eq!(displaced, PieceRange::boundary(a, b));
        assert_eq!(list.range_size(displaced), (0, 0));
        assert_eq!(list.describe(), "[O 0+2][M 0+3][O 2+2]");

        let removed = list.swap(displaced);
        assert_eq!(removed, run);
        assert_eq!(list.range_size(removed), (3, 3));
        assert_eq!(list.describe(), "[O 0+2][O 2+2]");
    }

    #[test]
    fn test_swap_boundary_removes_everything() {
        let mut list = PieceList::new();
        let a = list.push_back(original(0, 2));
        let b = list.push_back(modify(0, 2));

        let removed = list.swap(PieceRange::boundary(PieceId::HEAD, PieceId::TAIL));
        assert_eq!(removed, PieceRange::run(a, b));
        assert!(list.is_empty());
        assert_eq!(list.members(removed), vec![a, b]);

        list.swap(removed);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_related_pieces() {
        let whole = original(10, 10);
        assert!(whole.related(&original(10, 3)));
        assert!(original(15, 5).related(&whole));
        assert!(!whole.related(&original(5, 10)));
        assert!(!whole.related(&modify(10, 3)));
        assert!(whole.covers(10));
        assert!(whole.covers(20));
        assert!(!whole.covers(21));
    }
}
