//! Cross-genome projection: walk a sliced segment up and down the genome
//! tree, emitting every homologous placement on the target genome.

use super::mapped::MappedSegment;
use crate::libs::align::{Alignment, GenomeId};
use crate::libs::cursor::SegmentCursor;
use crate::libs::error::AlignError;
use std::collections::{BTreeMap, BTreeSet};

/// Project `source` into all homologous intervals on `tgt_genome`,
/// traversing only genomes in `path` (plus the target itself). Results
/// are appended to the ordered set; the count of newly projected
/// segments is returned.
///
/// With `include_duplications`, the working set is expanded along
/// paralogy cycles before every descent and before termination, so
/// in-genome duplications multiply the output.
pub fn map_segment(
    aln: &Alignment,
    source: &SegmentCursor,
    results: &mut BTreeSet<MappedSegment>,
    tgt_genome: GenomeId,
    path: &BTreeSet<GenomeId>,
    include_duplications: bool,
) -> Result<usize, AlignError> {
    if source.length(aln) == 0 {
        return Err(AlignError::InvalidInput(
            "cannot map a zero-length cursor".to_string(),
        ));
    }

    let seed = MappedSegment::new(aln, *source, *source)?;
    let mut working = BTreeSet::new();
    cut_against_set(seed, results, &mut working);

    // Flattened tree walk: one frame of (current genome, working set,
    // previous genome), stepping until no eligible neighbor remains.
    // Entry counts bound every genome to two visits, which keeps the
    // walk finite on any path set.
    let mut prev: Option<GenomeId> = None;
    let mut visits: BTreeMap<GenomeId, u32> = BTreeMap::new();
    visits.insert(source.genome(), 1);

    loop {
        let Some(first) = working.iter().next() else {
            break;
        };
        let genome = first.genome();
        debug_assert!(working.iter().all(|m| m.genome() == genome));

        let g = aln.genome(genome);
        let eligible = |cand: GenomeId| {
            (cand == tgt_genome || path.contains(&cand))
                && visits.get(&cand).copied().unwrap_or(0) < 2
                // never bounce straight back, except to land on the target
                && (Some(cand) != prev || cand == tgt_genome)
        };

        // prefer the parent, else the first matching child
        let mut next: Option<(GenomeId, Option<usize>)> = None;
        if let Some(parent) = g.parent {
            if eligible(parent) {
                next = Some((parent, None));
            }
        }
        if next.is_none() {
            for (slot, &child) in g.children.iter().enumerate() {
                if eligible(child) {
                    next = Some((child, Some(slot)));
                    break;
                }
            }
        }

        // unroll duplications before descending or terminating
        let going_up = matches!(next, Some((_, None)));
        if include_duplications && !going_up {
            let mut dupes = BTreeSet::new();
            for m in &working {
                map_self(aln, m, &mut dupes)?;
            }
            working.extend(dupes);
        }

        let Some((next_genome, slot)) = next else {
            break;
        };
        let mut hopped = BTreeSet::new();
        match slot {
            None => {
                for m in &working {
                    map_up(aln, m, &mut hopped)?;
                }
            }
            Some(slot) => {
                for m in &working {
                    map_down(aln, m, slot, &mut hopped)?;
                }
            }
        }
        working = hopped;
        prev = Some(genome);
        *visits.entry(next_genome).or_insert(0) += 1;
    }

    let added = working.len();
    results.extend(working);
    Ok(added)
}

/// Reserved hook for suppressing projections already present in
/// `results`. The current contract is pass-through.
fn cut_against_set(
    seed: MappedSegment,
    _results: &BTreeSet<MappedSegment>,
    input: &mut BTreeSet<MappedSegment>,
) {
    input.insert(seed);
}

/// Hop one mapped segment toward the parent genome. A top target follows
/// its parent link directly (or is dropped when unaligned); a bottom
/// target first expands across the covering top parse segments.
fn map_up(
    aln: &Alignment,
    m: &MappedSegment,
    results: &mut BTreeSet<MappedSegment>,
) -> Result<usize, AlignError> {
    let mut added = 0;
    if m.is_top() {
        if let Some(bottom) = m.target().parent_cursor(aln)? {
            results.insert(MappedSegment::new(aln, *m.source(), bottom)?);
            added += 1;
        }
    } else {
        added += parse_expand(aln, m, &mut |aln: &Alignment, piece: MappedSegment| {
            map_up(aln, &piece, results)
        })?;
    }
    Ok(added)
}

/// Hop one mapped segment into the child genome at `slot`; the mirror of
/// [`map_up`].
fn map_down(
    aln: &Alignment,
    m: &MappedSegment,
    slot: usize,
    results: &mut BTreeSet<MappedSegment>,
) -> Result<usize, AlignError> {
    let mut added = 0;
    if !m.is_top() {
        if let Some(top) = m.target().child_cursor(aln, slot)? {
            results.insert(MappedSegment::new(aln, *m.source(), top)?);
            added += 1;
        }
    } else {
        added += parse_expand(aln, m, &mut |aln: &Alignment, piece: MappedSegment| {
            map_down(aln, &piece, slot, results)
        })?;
    }
    Ok(added)
}

/// Emit every paralog of a top-positioned target by walking its cycle
/// until the starting array index reappears. A bottom target in a
/// non-root genome is first expanded across its covering tops.
fn map_self(
    aln: &Alignment,
    m: &MappedSegment,
    results: &mut BTreeSet<MappedSegment>,
) -> Result<usize, AlignError> {
    let mut added = 0;
    if m.is_top() {
        let start = m.target().array_index();
        let cap = aln.genome(m.genome()).tops.len();
        let mut steps = 0;
        let mut walker = *m.target();
        while let Some(next) = walker.next_paralogy(aln)? {
            if next.array_index() == start {
                break;
            }
            results.insert(MappedSegment::new(aln, *m.source(), next)?);
            added += 1;
            walker = next;
            steps += 1;
            if steps > cap {
                return Err(AlignError::Consistency(
                    "paralogy cycle does not close".to_string(),
                ));
            }
        }
    } else if aln.genome(m.genome()).parent.is_some() {
        added += parse_expand(aln, m, &mut |aln: &Alignment, piece: MappedSegment| {
            map_self(aln, &piece, results)
        })?;
    }
    Ok(added)
}

/// Walk the opposite-array parse segments covering the target's bounded
/// range and hand each piece to `emit`.
///
/// A parse segment can be wider than the target range; mapping the piece
/// back onto the target's array reads off how much each end tightened,
/// and the source is narrowed by the same deltas so that source and
/// target lengths stay in lockstep.
fn parse_expand(
    aln: &Alignment,
    m: &MappedSegment,
    emit: &mut dyn FnMut(&Alignment, MappedSegment) -> Result<usize, AlignError>,
) -> Result<usize, AlignError> {
    let target = m.target();
    let cutoff = target.end_position(aln);
    let (t_so, t_eo) = (target.start_offset(), target.end_offset());

    let mut walk = if target.is_top() {
        target.parse_down(aln)?
    } else {
        target.parse_up(aln)?
    };

    let mut added = 0;
    loop {
        let piece = walk;
        let back = if piece.is_top() {
            piece.parse_down(aln)?
        } else {
            piece.parse_up(aln)?
        };
        debug_assert_eq!(back.array_index(), target.array_index());

        let widened = || {
            AlignError::Consistency("parse walk widened the mapped range".to_string())
        };
        let start_delta = back.start_offset().checked_sub(t_so).ok_or_else(widened)?;
        let end_delta = back.end_offset().checked_sub(t_eo).ok_or_else(widened)?;

        let mut source = *m.source();
        if source.length(aln) <= start_delta + end_delta {
            return Err(AlignError::Consistency(
                "parse slice leaves an empty source".to_string(),
            ));
        }
        source.slice(
            aln,
            source.start_offset() + start_delta,
            source.end_offset() + end_delta,
        );
        added += emit(aln, MappedSegment::new(aln, source, piece)?)?;

        if walk.end_position(aln) == cutoff {
            break;
        }
        walk.to_right(aln, cutoff)?;
    }
    Ok(added)
}
