use crate::libs::align::{Alignment, GenomeId, SegIndex};
use crate::libs::cursor::{SegKind, SegmentCursor};
use crate::libs::error::AlignError;
use std::cmp::Ordering;

/// A homology between two equal-length sliced segments.
///
/// `source` is where a projection started and never changes genome;
/// `target` is its current position somewhere along the traversal. All
/// positional accessors delegate to the target.
#[derive(Debug, Clone, Copy)]
pub struct MappedSegment {
    source: SegmentCursor,
    target: SegmentCursor,
}

impl MappedSegment {
    pub fn new(
        aln: &Alignment,
        source: SegmentCursor,
        target: SegmentCursor,
    ) -> Result<Self, AlignError> {
        if source.length(aln) != target.length(aln) {
            return Err(AlignError::InvalidInput(format!(
                "mapped segment length mismatch: source {} vs target {}",
                source.length(aln),
                target.length(aln)
            )));
        }
        Ok(Self { source, target })
    }

    /// The read-only sliced view of where the projection started.
    pub fn source(&self) -> &SegmentCursor {
        &self.source
    }

    pub fn target(&self) -> &SegmentCursor {
        &self.target
    }

    // --- Delegation to target ---

    pub fn genome(&self) -> GenomeId {
        self.target.genome()
    }

    pub fn is_top(&self) -> bool {
        self.target.is_top()
    }

    pub fn kind(&self) -> SegKind {
        self.target.kind()
    }

    pub fn array_index(&self) -> SegIndex {
        self.target.array_index()
    }

    pub fn is_reversed(&self) -> bool {
        self.target.is_reversed()
    }

    pub fn start_position(&self, aln: &Alignment) -> usize {
        self.target.start_position(aln)
    }

    pub fn end_position(&self, aln: &Alignment) -> usize {
        self.target.end_position(aln)
    }

    pub fn length(&self, aln: &Alignment) -> usize {
        self.target.length(aln)
    }

    /// Index of the sequence containing the target's logical start.
    pub fn sequence(&self, aln: &Alignment) -> Option<usize> {
        self.target.sequence(aln)
    }

    /// Coordinates are derived from the two cursors; re-slicing the pair
    /// directly is not defined.
    pub fn slice(&mut self, _start_offset: usize, _end_offset: usize) -> Result<(), AlignError> {
        Err(AlignError::NotSupported(
            "slice on a mapped segment".to_string(),
        ))
    }

    /// See [`MappedSegment::slice`].
    pub fn set_coordinates(&mut self, _start: usize, _length: usize) -> Result<(), AlignError> {
        Err(AlignError::NotSupported(
            "set_coordinates on a mapped segment".to_string(),
        ))
    }
}

/// Set ordering: source first, then target, each by the cursor's
/// disk-free comparator.
impl Ord for MappedSegment {
    fn cmp(&self, other: &Self) -> Ordering {
        self.source
            .cmp(&other.source)
            .then_with(|| self.target.cmp(&other.target))
    }
}

impl PartialOrd for MappedSegment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for MappedSegment {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MappedSegment {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::align::SequenceDims;

    fn one_genome() -> (Alignment, GenomeId) {
        let mut aln = Alignment::new();
        aln.add_root_genome("R").unwrap();
        let a = aln.add_leaf_genome("A", "R", 1.0).unwrap();
        aln.set_dimensions(
            a,
            &[SequenceDims {
                name: "chr1".to_string(),
                length: 100,
                num_top: 2,
                num_bot: 0,
            }],
        )
        .unwrap();
        let g = aln.genome_mut(a);
        g.tops[0].start = 0;
        g.tops[0].length = 60;
        g.tops[1].start = 60;
        g.tops[1].length = 40;
        (aln, a)
    }

    #[test]
    fn test_equal_length_invariant() {
        let (aln, a) = one_genome();
        let c0 = aln.top_cursor(a, 0);
        let mut short = aln.top_cursor(a, 1);
        short.slice(&aln, 0, 10);

        assert!(MappedSegment::new(&aln, c0, c0).is_ok());
        assert!(matches!(
            MappedSegment::new(&aln, c0, short),
            Err(AlignError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_slicing_not_supported() {
        let (aln, a) = one_genome();
        let c0 = aln.top_cursor(a, 0);
        let mut m = MappedSegment::new(&aln, c0, c0).unwrap();
        assert!(matches!(m.slice(0, 0), Err(AlignError::NotSupported(_))));
        assert!(matches!(
            m.set_coordinates(0, 10),
            Err(AlignError::NotSupported(_))
        ));
    }

    #[test]
    fn test_set_ordering() {
        let (aln, a) = one_genome();
        let c0 = aln.top_cursor(a, 0);
        let c1 = aln.top_cursor(a, 1);
        let mut src40 = c0;
        src40.slice(&aln, 0, 20);
        let mut c1s = c1;
        c1s.slice(&aln, 5, 0);
        let mut src35 = c0;
        src35.slice(&aln, 0, 25);

        let m00 = MappedSegment::new(&aln, c0, c0).unwrap();
        let m01 = MappedSegment::new(&aln, src40, c1).unwrap();
        let m01s = MappedSegment::new(&aln, src35, c1s).unwrap();

        // source compares first; a narrower source has the larger end
        // offset and sorts before a wider one
        assert!(m01 < m00);
        assert!(m01s < m01);

        let mut set = std::collections::BTreeSet::new();
        set.insert(m01);
        set.insert(m00);
        set.insert(m01);
        assert_eq!(set.len(), 2);
    }
}
