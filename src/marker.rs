//! Markers: logical positions that survive edits.
//!
//! A marker is anchored to a `(piece, offset)` pair rather than a plain rune
//! index. Edits that leave its piece alone need no bookkeeping at all; edits
//! that detach its piece re-anchor it into the pieces that replace it.
//!
//! Re-anchoring works on store coordinates. A split remainder covers a
//! sub-range of the store range of the piece it came from, so a marker can
//! follow its text into whichever remainder still holds it. When its text is
//! gone, [`Bias`] picks the nearest surviving boundary.

use crate::piece::{PieceId, PieceList};

/// Tie-break for a marker sitting exactly on an edit boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Bias {
    /// Stay after text inserted at the marker.
    Forward,
    /// Stay before text inserted at the marker.
    Backward,
}

/// Handle to a marker registered with a [`PieceTable`](crate::PieceTable).
///
/// Handles stay valid until removed or until the table is reset with
/// `set_text`. A stale handle never aliases a newer marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Marker {
    slot: u32,
    generation: u32,
}

/// Where a marker currently points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Anchor {
    pub piece: PieceId,
    pub offset: usize,
    pub bias: Bias,
}

#[derive(Clone, Debug, Default)]
struct Slot {
    generation: u32,
    anchor: Option<Anchor>,
}

/// One chain edit: `outgoing` was replaced by `incoming` between `prev` and
/// `next`. Either side may be empty.
pub(crate) struct Splice<'a> {
    pub prev: PieceId,
    pub next: PieceId,
    pub outgoing: &'a [PieceId],
    pub incoming: &'a [PieceId],
}

/// Slot registry of live markers.
#[derive(Clone, Debug, Default)]
pub(crate) struct MarkerSet {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
}

impl MarkerSet {
    pub fn insert(&mut self, anchor: Anchor) -> Marker {
        if let Some(slot) = self.free_list.pop() {
            let entry = &mut self.slots[slot as usize];
            entry.anchor = Some(anchor);
            return Marker {
                slot,
                generation: entry.generation,
            };
        }

        self.slots.push(Slot {
            generation: 0,
            anchor: Some(anchor),
        });
        Marker {
            slot: (self.slots.len() - 1) as u32,
            generation: 0,
        }
    }

    pub fn get(&self, marker: Marker) -> Option<&Anchor> {
        self.slots
            .get(marker.slot as usize)
            .filter(|s| s.generation == marker.generation)
            .and_then(|s| s.anchor.as_ref())
    }

    pub fn remove(&mut self, marker: Marker) -> bool {
        let Some(slot) = self
            .slots
            .get_mut(marker.slot as usize)
            .filter(|s| s.generation == marker.generation && s.anchor.is_some())
        else {
            return false;
        };
        slot.anchor = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(marker.slot);
        true
    }

    /// Drop every marker. Outstanding handles go stale.
    pub fn clear(&mut self) {
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            if slot.anchor.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free_list.push(idx as u32);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.anchor.is_some()).count()
    }

    fn anchors_mut(&mut self) -> impl Iterator<Item = &mut Anchor> {
        self.slots.iter_mut().filter_map(|s| s.anchor.as_mut())
    }

    /// Re-anchor markers after `splice` was applied to `pieces`.
    pub fn remap(&mut self, pieces: &PieceList, splice: &Splice<'_>) {
        if splice.outgoing.is_empty() {
            if let (Some(&first), Some(&last)) = (splice.incoming.first(), splice.incoming.last()) {
                self.shift_at_boundary(pieces, splice.prev, splice.next, first, last);
            }
            return;
        }

        for anchor in self.anchors_mut() {
            if let Some(idx) = splice.outgoing.iter().position(|&id| id == anchor.piece) {
                let (piece, offset) = relocate(pieces, splice, idx, anchor);
                anchor.piece = piece;
                anchor.offset = offset;
            }
        }
    }

    /// Markers on either side of an empty gap that just received
    /// `first..=last`: Forward markers end up after it, Backward before it.
    fn shift_at_boundary(
        &mut self,
        pieces: &PieceList,
        prev: PieceId,
        next: PieceId,
        first: PieceId,
        last: PieceId,
    ) {
        let prev_len = pieces.get(prev).rune_len;
        let last_len = pieces.get(last).rune_len;
        for anchor in self.anchors_mut() {
            if anchor.bias == Bias::Forward
                && anchor.piece == prev
                && !prev.is_sentinel()
                && anchor.offset == prev_len
            {
                anchor.piece = last;
                anchor.offset = last_len;
            } else if anchor.bias == Bias::Backward && anchor.piece == next && anchor.offset == 0 {
                anchor.piece = first;
                anchor.offset = 0;
            }
        }
    }

    /// `piece` grew in place from `old_len` to `new_len` runes at its end.
    pub fn grow(&mut self, piece: PieceId, next: PieceId, old_len: usize, new_len: usize) {
        for anchor in self.anchors_mut() {
            if anchor.bias == Bias::Forward && anchor.piece == piece && anchor.offset == old_len {
                anchor.offset = new_len;
            } else if anchor.bias == Bias::Backward && anchor.piece == next && anchor.offset == 0 {
                anchor.piece = piece;
                anchor.offset = old_len;
            }
        }
    }
}

/// New anchor for a marker sitting in `splice.outgoing[idx]`.
///
/// The marker's own piece is tried first at the marker's store offset; if
/// none of the incoming pieces derived from it still covers that offset,
/// the search walks outward through the outgoing run (backward for
/// [`Bias::Backward`], forward otherwise) looking for the nearest edge that
/// survived. With nothing left it lands on the splice boundary.
fn relocate(pieces: &PieceList, splice: &Splice<'_>, idx: usize, anchor: &Anchor) -> (PieceId, usize) {
    let own = pieces.get(splice.outgoing[idx]);
    let point = own.rune_offset + anchor.offset.min(own.rune_len);

    match anchor.bias {
        Bias::Backward => {
            for (i, &out_id) in splice.outgoing[..=idx].iter().enumerate().rev() {
                let out = pieces.get(out_id);
                let at = if i == idx { point } else { out.rune_end() };
                let mut related = splice
                    .incoming
                    .iter()
                    .copied()
                    .filter(|&id| pieces.get(id).related(out));
                if let Some(id) = related.clone().find(|&id| pieces.get(id).covers(at)) {
                    return (id, at - pieces.get(id).rune_offset);
                }
                if let Some(id) = related.rfind(|&id| pieces.get(id).rune_end() <= at) {
                    return (id, pieces.get(id).rune_len);
                }
            }
            if splice.prev.is_sentinel() {
                (splice.incoming.first().copied().unwrap_or(splice.next), 0)
            } else {
                (splice.prev, pieces.get(splice.prev).rune_len)
            }
        }
        Bias::Forward => {
            for (i, &out_id) in splice.outgoing.iter().enumerate().skip(idx) {
                let out = pieces.get(out_id);
                let at = if i == idx { point } else { out.rune_offset };
                let mut related = splice
                    .incoming
                    .iter()
                    .copied()
                    .filter(|&id| pieces.get(id).related(out));
                if let Some(id) = related.clone().rfind(|&id| pieces.get(id).covers(at)) {
                    return (id, at - pieces.get(id).rune_offset);
                }
                if let Some(id) = related.find(|&id| pieces.get(id).rune_offset >= at) {
                    return (id, 0);
                }
            }
            (splice.next, 0)
        }
    }
}
