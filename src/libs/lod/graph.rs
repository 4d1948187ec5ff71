//! Block graph summarizing the homologies between a parent genome and
//! its children at a sampling step.

use crate::libs::align::{Alignment, GenomeId};
use crate::libs::error::AlignError;
use indexmap::IndexMap;
use itertools::Itertools;
use std::collections::BTreeSet;

/// Index of a segment within the graph's arena.
pub type LodSegmentId = usize;

/// A sampled sub-interval of one input sequence.
///
/// `left_pos` is a genome coordinate; the containing sequence index is
/// carried alongside. `array_index` is written back during
/// materialization so later passes can cross-reference the output
/// segment arrays.
#[derive(Debug, Clone)]
pub struct LodSegment {
    pub genome: GenomeId,
    pub sequence: usize,
    pub left_pos: usize,
    pub length: usize,
    pub flipped: bool,
    pub array_index: Option<usize>,
    telomere: bool,
}

impl LodSegment {
    fn new(genome: GenomeId, sequence: usize, left_pos: usize, length: usize, flipped: bool) -> Self {
        Self {
            genome,
            sequence,
            left_pos,
            length,
            flipped,
            array_index: None,
            telomere: false,
        }
    }

    /// Synthetic head/tail markers bracketing a sequence's segment set.
    pub fn is_telomere(&self) -> bool {
        self.telomere
    }
}

/// An unordered collection of segments declared homologous. A genome may
/// appear more than once: multiple segments of the same genome in one
/// block are paralogs.
#[derive(Debug, Clone, Default)]
pub struct LodBlock {
    pub segments: Vec<LodSegmentId>,
}

impl LodBlock {
    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }
}

/// The per-internal-node sampling structure consumed by the extractor:
/// homology blocks plus, per input sequence, its segments ordered by
/// `left_pos` and bracketed by telomere sentinels.
#[derive(Debug, Default)]
pub struct LodGraph {
    segments: Vec<LodSegment>,
    blocks: Vec<LodBlock>,
    seq_sets: IndexMap<(GenomeId, usize), Vec<LodSegmentId>>,
}

impl LodGraph {
    /// Sample the homologies between `parent` and `children` at `step`.
    ///
    /// Every bottom segment of the parent is cut into step-sized pieces;
    /// each piece becomes a block holding the parent piece plus the
    /// homologous piece of every linked child (mirrored, with `flipped`
    /// set, under a reversed link). Child top segments with no parent
    /// link are cut into child-only blocks, so each sequence is fully
    /// represented.
    pub fn build(
        aln: &Alignment,
        parent: GenomeId,
        children: &[GenomeId],
        step: usize,
    ) -> Result<LodGraph, AlignError> {
        if step == 0 {
            return Err(AlignError::InvalidInput(
                "sampling step must be positive".to_string(),
            ));
        }

        let mut graph = LodGraph::default();
        for &g in std::iter::once(&parent).chain(children.iter()) {
            for si in 0..aln.genome(g).sequences.len() {
                graph.seq_sets.insert((g, si), Vec::new());
            }
        }

        let pg = aln.genome(parent);
        let child_set: BTreeSet<GenomeId> = children.iter().copied().collect();

        for bseg in &pg.bottoms {
            let mut off = 0;
            while off < bseg.length {
                let clen = step.min(bseg.length - off);
                let mut block = LodBlock::default();

                let left = bseg.start + off;
                block
                    .segments
                    .push(graph.push_segment(aln, parent, left, clen, false)?);

                for (slot, link) in bseg.children.iter().enumerate() {
                    let child = pg.children[slot];
                    if !child_set.contains(&child) {
                        continue;
                    }
                    let Some(ti) = link.top_index else {
                        continue;
                    };
                    let ct = &aln.genome(child).tops[ti];
                    let cleft = if link.reversed {
                        ct.start + bseg.length - off - clen
                    } else {
                        ct.start + off
                    };
                    block
                        .segments
                        .push(graph.push_segment(aln, child, cleft, clen, link.reversed)?);
                }

                graph.blocks.push(block);
                off += clen;
            }
        }

        // unaligned child material still has to appear in the output
        for &child in children {
            let cg = aln.genome(child);
            for tseg in &cg.tops {
                if tseg.parent_index.is_some() {
                    continue;
                }
                let mut off = 0;
                while off < tseg.length {
                    let clen = step.min(tseg.length - off);
                    let sid = graph.push_segment(aln, child, tseg.start + off, clen, false)?;
                    graph.blocks.push(LodBlock {
                        segments: vec![sid],
                    });
                    off += clen;
                }
            }
        }

        graph.seal(aln);
        Ok(graph)
    }

    fn push_segment(
        &mut self,
        aln: &Alignment,
        genome: GenomeId,
        left_pos: usize,
        length: usize,
        flipped: bool,
    ) -> Result<LodSegmentId, AlignError> {
        let sequence = aln.genome(genome).sequence_at(left_pos).ok_or_else(|| {
            AlignError::Consistency(format!(
                "graph segment at {} lies outside every sequence of [{}]",
                left_pos,
                aln.genome(genome).name
            ))
        })?;
        let id = self.segments.len();
        self.segments
            .push(LodSegment::new(genome, sequence, left_pos, length, flipped));
        self.seq_sets
            .entry((genome, sequence))
            .or_default()
            .push(id);
        Ok(id)
    }

    // Order each sequence set and bracket it with telomere sentinels.
    fn seal(&mut self, aln: &Alignment) {
        let keys: Vec<(GenomeId, usize)> = self.seq_sets.keys().copied().collect();
        for key in keys {
            let (genome, si) = key;
            let seq = &aln.genome(genome).sequences[si];

            let mut left = LodSegment::new(genome, si, seq.start, 0, false);
            left.telomere = true;
            let mut right = LodSegment::new(genome, si, seq.start + seq.length, 0, false);
            right.telomere = true;

            let left_id = self.segments.len();
            self.segments.push(left);
            let right_id = self.segments.len();
            self.segments.push(right);

            let segments = &self.segments;
            if let Some(set) = self.seq_sets.get_mut(&key) {
                set.sort_by_key(|&id| segments[id].left_pos);
                set.insert(0, left_id);
                set.push(right_id);
            }
        }
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    pub fn block(&self, idx: usize) -> &LodBlock {
        &self.blocks[idx]
    }

    pub fn segment(&self, id: LodSegmentId) -> &LodSegment {
        &self.segments[id]
    }

    pub fn segment_mut(&mut self, id: LodSegmentId) -> &mut LodSegment {
        &mut self.segments[id]
    }

    /// The ordered segment set of one input sequence, telomeres included
    /// at the extremes.
    pub fn segment_set(&self, genome: GenomeId, sequence: usize) -> Option<&[LodSegmentId]> {
        self.seq_sets.get(&(genome, sequence)).map(|v| v.as_slice())
    }

    /// Validate the invariants the extractor consumes: equal lengths
    /// within every block, ascending disjoint segments per sequence set.
    pub fn check(&self, aln: &Alignment) -> Result<(), AlignError> {
        for (idx, block) in self.blocks.iter().enumerate() {
            if block.segments.is_empty() {
                return Err(AlignError::Consistency(format!("block {} is empty", idx)));
            }
            if !block
                .segments
                .iter()
                .map(|&id| self.segments[id].length)
                .all_equal()
            {
                return Err(AlignError::Consistency(format!(
                    "block {} mixes segment lengths",
                    idx
                )));
            }
        }

        for (key, set) in &self.seq_sets {
            let (genome, si) = *key;
            let seq = &aln.genome(genome).sequences[si];
            for (&x, &y) in set.iter().tuple_windows() {
                let (a, b) = (&self.segments[x], &self.segments[y]);
                if a.left_pos + a.length > b.left_pos {
                    return Err(AlignError::Consistency(format!(
                        "overlapping segments in sequence [{}]",
                        seq.name
                    )));
                }
            }
            for &id in set {
                let s = &self.segments[id];
                if s.left_pos < seq.start || s.left_pos + s.length > seq.start + seq.length {
                    return Err(AlignError::Consistency(format!(
                        "segment outside sequence [{}]",
                        seq.name
                    )));
                }
            }
        }
        Ok(())
    }
}
