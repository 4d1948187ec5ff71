use super::segment::{BottomSegment, TopSegment};
use crate::libs::error::AlignError;

/// GenomeId is an index into the Alignment's genome vector.
/// It is lightweight (Copy) and safe (no pointers).
pub type GenomeId = usize;

/// A contiguous named coordinate space within a genome.
/// Sequences are disjoint and concatenated in order, so `start` is the
/// sequence's offset in the genome-wide coordinate space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceInfo {
    pub name: String,
    pub start: usize,
    pub length: usize,
}

/// Per-sequence dimensioning for `set_dimensions`.
#[derive(Debug, Clone)]
pub struct SequenceDims {
    pub name: String,
    pub length: usize,
    pub num_top: usize,
    pub num_bot: usize,
}

/// Per-sequence bottom-count update for `update_bottom_dimensions`.
#[derive(Debug, Clone)]
pub struct BottomDims {
    pub name: String,
    pub num_bot: usize,
}

/// A node of the rooted genome tree.
///
/// Invariant: a genome has bottom segments iff it has at least one child,
/// and top segments iff it has a parent.
#[derive(Debug, Clone, Default)]
pub struct Genome {
    pub name: String,
    pub parent: Option<GenomeId>,
    pub children: Vec<GenomeId>,
    /// Branch length to parent (None for the root).
    pub branch_length: Option<f64>,
    pub sequences: Vec<SequenceInfo>,
    pub tops: Vec<TopSegment>,
    pub bottoms: Vec<BottomSegment>,
}

impl Genome {
    /// Total length of the genome's coordinate space.
    pub fn length(&self) -> usize {
        self.sequences.last().map_or(0, |s| s.start + s.length)
    }

    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    /// Index of the sequence with the given name.
    pub fn sequence_by_name(&self, name: &str) -> Option<usize> {
        self.sequences.iter().position(|s| s.name == name)
    }

    /// Index of the sequence containing the genome position `pos`.
    pub fn sequence_at(&self, pos: usize) -> Option<usize> {
        // sequences are sorted by start, so partition_point gives the
        // first sequence starting after pos
        let idx = self.sequences.partition_point(|s| s.start <= pos);
        if idx == 0 {
            return None;
        }
        let s = &self.sequences[idx - 1];
        (pos < s.start + s.length).then_some(idx - 1)
    }

    /// Child slot occupied by the given genome, if it is a child.
    pub fn child_slot(&self, id: GenomeId) -> Option<usize> {
        self.children.iter().position(|&c| c == id)
    }

    /// Replace the sequence layout and allocate zeroed segment arrays.
    pub(super) fn apply_dimensions(&mut self, dims: &[SequenceDims]) -> Result<(), AlignError> {
        if !self.tops.is_empty() || !self.bottoms.is_empty() {
            return Err(AlignError::Structural(format!(
                "genome [{}] already has segments",
                self.name
            )));
        }
        let mut start = 0;
        let mut num_top = 0;
        let mut num_bot = 0;
        self.sequences.clear();
        for d in dims {
            self.sequences.push(SequenceInfo {
                name: d.name.clone(),
                start,
                length: d.length,
            });
            start += d.length;
            num_top += d.num_top;
            num_bot += d.num_bot;
        }
        self.tops = vec![TopSegment::default(); num_top];
        let slots = self.children.len();
        self.bottoms = vec![BottomSegment::with_children(slots); num_bot];
        Ok(())
    }

    /// Reallocate only the bottom array of an existing internal node.
    pub(super) fn apply_bottom_dimensions(
        &mut self,
        updates: &[BottomDims],
    ) -> Result<(), AlignError> {
        let mut num_bot = 0;
        for u in updates {
            if self.sequence_by_name(&u.name).is_none() {
                return Err(AlignError::Structural(format!(
                    "genome [{}] has no sequence [{}]",
                    self.name, u.name
                )));
            }
            num_bot += u.num_bot;
        }
        let slots = self.children.len();
        self.bottoms = vec![BottomSegment::with_children(slots); num_bot];
        Ok(())
    }
}
