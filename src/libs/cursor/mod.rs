use crate::libs::align::{Alignment, GenomeId, SegIndex};
use crate::libs::error::AlignError;
use std::cmp::Ordering;

/// Which segment array of a genome a cursor indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SegKind {
    Top,
    Bottom,
}

/// A cursor into the top or bottom segment array of one genome.
///
/// `start_offset` and `end_offset` clip the underlying segment from its
/// logical start and end; `reversed` flips which genome end is logical.
/// The covered genome interval is `[s+so, s+L-eo)` forward and
/// `[s+eo, s+L-so)` reversed, where `s`/`L` are the segment's start and
/// length. Effective length is always `L - so - eo`.
///
/// Cursors are plain data: every accessor that needs segment coordinates
/// takes the alignment, while ordering ([`SegmentCursor::cmp`]) uses only
/// the cursor state itself.
#[derive(Debug, Clone, Copy)]
pub struct SegmentCursor {
    genome: GenomeId,
    kind: SegKind,
    index: SegIndex,
    start_offset: usize,
    end_offset: usize,
    reversed: bool,
}

impl SegmentCursor {
    /// An unsliced forward cursor at `index`.
    pub fn new(genome: GenomeId, kind: SegKind, index: SegIndex) -> Self {
        Self {
            genome,
            kind,
            index,
            start_offset: 0,
            end_offset: 0,
            reversed: false,
        }
    }

    pub fn genome(&self) -> GenomeId {
        self.genome
    }

    pub fn kind(&self) -> SegKind {
        self.kind
    }

    pub fn is_top(&self) -> bool {
        self.kind == SegKind::Top
    }

    pub fn array_index(&self) -> SegIndex {
        self.index
    }

    pub fn start_offset(&self) -> usize {
        self.start_offset
    }

    pub fn end_offset(&self) -> usize {
        self.end_offset
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    /// (start, length) of the underlying, unsliced segment.
    fn seg_range(&self, aln: &Alignment) -> (usize, usize) {
        let g = aln.genome(self.genome);
        match self.kind {
            SegKind::Top => {
                let s = &g.tops[self.index];
                (s.start, s.length)
            }
            SegKind::Bottom => {
                let s = &g.bottoms[self.index];
                (s.start, s.length)
            }
        }
    }

    /// Effective length after slicing.
    pub fn length(&self, aln: &Alignment) -> usize {
        let (_, len) = self.seg_range(aln);
        len - self.start_offset - self.end_offset
    }

    /// Covered genome interval as a half-open `[lo, hi)` pair.
    pub fn covered(&self, aln: &Alignment) -> (usize, usize) {
        let (s, len) = self.seg_range(aln);
        if self.reversed {
            (s + self.end_offset, s + len - self.start_offset)
        } else {
            (s + self.start_offset, s + len - self.end_offset)
        }
    }

    /// Genome position of the logical first base (the genome-rightmost
    /// base when reversed).
    pub fn start_position(&self, aln: &Alignment) -> usize {
        let (lo, hi) = self.covered(aln);
        if self.reversed {
            hi - 1
        } else {
            lo
        }
    }

    /// Genome position of the logical last base.
    pub fn end_position(&self, aln: &Alignment) -> usize {
        let (lo, hi) = self.covered(aln);
        if self.reversed {
            lo
        } else {
            hi - 1
        }
    }

    /// Index of the sequence containing the cursor's logical start.
    pub fn sequence(&self, aln: &Alignment) -> Option<usize> {
        aln.genome(self.genome).sequence_at(self.start_position(aln))
    }

    /// Re-clip the cursor. Offsets are raw: they always count from the
    /// cursor's logical start and end.
    pub fn slice(&mut self, aln: &Alignment, start_offset: usize, end_offset: usize) {
        let (_, len) = self.seg_range(aln);
        debug_assert!(start_offset + end_offset <= len);
        self.start_offset = start_offset;
        self.end_offset = end_offset;
    }

    /// Flip the strand flag. Offsets keep their logical meaning, so the
    /// covered interval mirrors within the segment; this is the
    /// composition rule for reversed parent/child links, not an in-place
    /// reverse.
    pub fn to_reverse(&mut self) {
        self.reversed = !self.reversed;
    }

    /// Step one segment in the logical direction, clipping the new end
    /// offset so the logical end does not pass `cutoff` (a genome
    /// position). Stepping off the array is a consistency error.
    pub fn to_right(&mut self, aln: &Alignment, cutoff: usize) -> Result<(), AlignError> {
        let g = aln.genome(self.genome);
        let n = match self.kind {
            SegKind::Top => g.tops.len(),
            SegKind::Bottom => g.bottoms.len(),
        };
        self.start_offset = 0;
        self.end_offset = 0;
        if !self.reversed {
            if self.index + 1 >= n {
                return Err(AlignError::Consistency(
                    "to_right stepped past the last segment".to_string(),
                ));
            }
            self.index += 1;
            let (s, len) = self.seg_range(aln);
            if s > cutoff {
                return Err(AlignError::Consistency(
                    "to_right landed beyond its cutoff".to_string(),
                ));
            }
            if s + len > cutoff + 1 {
                self.end_offset = s + len - 1 - cutoff;
            }
        } else {
            if self.index == 0 {
                return Err(AlignError::Consistency(
                    "to_right stepped past the first segment".to_string(),
                ));
            }
            self.index -= 1;
            let (s, len) = self.seg_range(aln);
            if s + len <= cutoff {
                return Err(AlignError::Consistency(
                    "to_right landed beyond its cutoff".to_string(),
                ));
            }
            if s < cutoff {
                self.end_offset = cutoff - s;
            }
        }
        Ok(())
    }

    // --- Tree hops ---

    /// Follow the parent link into a bottom cursor of the parent genome,
    /// or None when the segment is unaligned to its parent. Linked
    /// segments have equal length, so raw offsets carry over; a reversed
    /// link flips the strand flag.
    pub fn parent_cursor(&self, aln: &Alignment) -> Result<Option<SegmentCursor>, AlignError> {
        if self.kind != SegKind::Top {
            return Err(AlignError::NotSupported(
                "parent_cursor on a bottom cursor".to_string(),
            ));
        }
        let g = aln.genome(self.genome);
        let seg = &g.tops[self.index];
        let Some(pi) = seg.parent_index else {
            return Ok(None);
        };
        let parent = g.parent.ok_or_else(|| {
            AlignError::Consistency(format!(
                "genome [{}] has a parent link but no parent",
                g.name
            ))
        })?;
        let mut hop = SegmentCursor {
            genome: parent,
            kind: SegKind::Bottom,
            index: pi,
            start_offset: self.start_offset,
            end_offset: self.end_offset,
            reversed: self.reversed,
        };
        debug_assert_eq!(aln.genome(parent).bottoms[pi].length, seg.length);
        if seg.parent_reversed {
            hop.to_reverse();
        }
        Ok(Some(hop))
    }

    /// Follow the child link for `slot` into a top cursor of that child
    /// genome, or None when the slot is unaligned.
    pub fn child_cursor(
        &self,
        aln: &Alignment,
        slot: usize,
    ) -> Result<Option<SegmentCursor>, AlignError> {
        if self.kind != SegKind::Bottom {
            return Err(AlignError::NotSupported(
                "child_cursor on a top cursor".to_string(),
            ));
        }
        let g = aln.genome(self.genome);
        let seg = &g.bottoms[self.index];
        let link = seg.children.get(slot).ok_or_else(|| {
            AlignError::Consistency(format!(
                "genome [{}] has no child slot {}",
                g.name, slot
            ))
        })?;
        let Some(ti) = link.top_index else {
            return Ok(None);
        };
        let child = g.children[slot];
        let mut hop = SegmentCursor {
            genome: child,
            kind: SegKind::Top,
            index: ti,
            start_offset: self.start_offset,
            end_offset: self.end_offset,
            reversed: self.reversed,
        };
        debug_assert_eq!(aln.genome(child).tops[ti].length, seg.length);
        if link.reversed {
            hop.to_reverse();
        }
        Ok(Some(hop))
    }

    /// Reposition onto the top array of the same genome: the new cursor
    /// starts exactly at this cursor's logical start and covers the
    /// intersection with the containing top segment.
    pub fn parse_up(&self, aln: &Alignment) -> Result<SegmentCursor, AlignError> {
        if self.kind != SegKind::Bottom {
            return Err(AlignError::NotSupported(
                "parse_up on a top cursor".to_string(),
            ));
        }
        let g = aln.genome(self.genome);
        let hint = g.bottoms[self.index].top_parse_index.ok_or_else(|| {
            AlignError::Consistency(format!(
                "bottom segment {} of [{}] has no top parse index",
                self.index, g.name
            ))
        })?;
        self.parse_to(aln, SegKind::Top, hint)
    }

    /// Reposition onto the bottom array of the same genome, symmetric to
    /// [`SegmentCursor::parse_up`].
    pub fn parse_down(&self, aln: &Alignment) -> Result<SegmentCursor, AlignError> {
        if self.kind != SegKind::Top {
            return Err(AlignError::NotSupported(
                "parse_down on a bottom cursor".to_string(),
            ));
        }
        let g = aln.genome(self.genome);
        let hint = g.tops[self.index].bottom_parse_index.ok_or_else(|| {
            AlignError::Consistency(format!(
                "top segment {} of [{}] has no bottom parse index",
                self.index, g.name
            ))
        })?;
        self.parse_to(aln, SegKind::Bottom, hint)
    }

    fn parse_to(
        &self,
        aln: &Alignment,
        kind: SegKind,
        hint: SegIndex,
    ) -> Result<SegmentCursor, AlignError> {
        let g = aln.genome(self.genome);
        let n = match kind {
            SegKind::Top => g.tops.len(),
            SegKind::Bottom => g.bottoms.len(),
        };
        let p0 = self.start_position(aln);
        let (lo, hi) = self.covered(aln);

        // the parse index anchors the segment's start; a sliced cursor may
        // begin further right, so seek forward to the containing segment
        let mut index = hint;
        loop {
            if index >= n {
                return Err(AlignError::Consistency(
                    "parse seek ran off the segment array".to_string(),
                ));
            }
            let probe = SegmentCursor::new(self.genome, kind, index);
            let (s, len) = probe.seg_range(aln);
            if p0 < s {
                return Err(AlignError::Consistency(
                    "parse index overshoots the cursor start".to_string(),
                ));
            }
            if p0 < s + len {
                break;
            }
            index += 1;
        }

        let mut hop = SegmentCursor::new(self.genome, kind, index);
        let (s, len) = hop.seg_range(aln);
        let send = s + len;
        if self.reversed {
            hop.start_offset = send - 1 - p0;
            hop.end_offset = lo.saturating_sub(s);
        } else {
            hop.start_offset = p0 - s;
            hop.end_offset = send.saturating_sub(hi);
        }
        hop.reversed = self.reversed;
        Ok(hop)
    }

    /// Follow the paralogy cycle to the next top segment sharing this
    /// segment's parent, flipping strand when the two paralogs disagree
    /// on parent orientation. None outside a cycle.
    pub fn next_paralogy(&self, aln: &Alignment) -> Result<Option<SegmentCursor>, AlignError> {
        if self.kind != SegKind::Top {
            return Err(AlignError::NotSupported(
                "next_paralogy on a bottom cursor".to_string(),
            ));
        }
        let g = aln.genome(self.genome);
        let seg = &g.tops[self.index];
        let Some(next) = seg.next_paralogy_index else {
            return Ok(None);
        };
        if next >= g.tops.len() {
            return Err(AlignError::Consistency(format!(
                "paralogy index {} out of range in [{}]",
                next, g.name
            )));
        }
        let mut hop = *self;
        hop.index = next;
        debug_assert_eq!(g.tops[next].length, seg.length);
        if g.tops[next].parent_reversed != seg.parent_reversed {
            hop.to_reverse();
        }
        Ok(Some(hop))
    }

    pub fn has_next_paralogy(&self, aln: &Alignment) -> bool {
        self.kind == SegKind::Top
            && aln.genome(self.genome).tops[self.index]
                .next_paralogy_index
                .is_some()
    }

    /// Offsets as seen from the forward strand; the comparison key of the
    /// disk-free total order.
    fn effective_offsets(&self) -> (usize, usize) {
        if self.reversed {
            (self.end_offset, self.start_offset)
        } else {
            (self.start_offset, self.end_offset)
        }
    }
}

/// Disk-free ordering: (genome, kind, array index, effective start
/// offset, then descending effective end offset). Never touches segment
/// data, so it is usable as an ordered-set key during traversal.
impl Ord for SegmentCursor {
    fn cmp(&self, other: &Self) -> Ordering {
        let (so1, eo1) = self.effective_offsets();
        let (so2, eo2) = other.effective_offsets();
        self.genome
            .cmp(&other.genome)
            .then_with(|| self.kind.cmp(&other.kind))
            .then_with(|| self.index.cmp(&other.index))
            .then_with(|| so1.cmp(&so2))
            .then_with(|| eo2.cmp(&eo1))
    }
}

impl PartialOrd for SegmentCursor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// equality must agree with the comparator: a reversed cursor covering the
// same sub-range is the same set key
impl PartialEq for SegmentCursor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SegmentCursor {}
