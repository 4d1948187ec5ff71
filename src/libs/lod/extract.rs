//! Builds a reduced, level-of-detail alignment: the output tree is laid
//! down from a Newick string, then every internal node is converted by
//! sampling the input alignment into a block graph and materializing it
//! as fresh segment arrays.

use super::graph::LodGraph;
use crate::libs::align::{Alignment, BottomDims, ChildLink, GenomeId, SequenceDims};
use crate::libs::error::AlignError;
use crate::libs::phylo::Tree;
use indexmap::IndexMap;
use std::collections::{BTreeMap, VecDeque};

/// Branch lengths above this are undefined markers and clamp to 1.0.
const BRANCH_LENGTH_CAP: f64 = 1e10;

/// Write into `out_aln` a reduced rendition of `in_aln` sampled at
/// `step`. `tree` overrides the alignment's own Newick tree; every name
/// in it must resolve in the input alignment.
///
/// The output alignment must be empty. On error, partially written
/// output is left for inspection but is not promised to be consistent.
pub fn create_interpolated_alignment(
    in_aln: &Alignment,
    out_aln: &mut Alignment,
    step: usize,
    tree: Option<&str>,
) -> Result<(), AlignError> {
    let newick = match tree {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => in_aln.to_newick(),
    };
    create_tree(in_aln, out_aln, &newick)?;

    let Some(root_name) = out_aln.root_name().map(str::to_string) else {
        return Ok(());
    };
    let mut queue = VecDeque::new();
    queue.push_back(root_name);
    while let Some(name) = queue.pop_front() {
        let child_names = out_aln.child_names(&name)?;
        if !child_names.is_empty() {
            convert_internal_node(in_aln, out_aln, &name, step)?;
            queue.extend(child_names);
        }
    }
    Ok(())
}

/// Mirror the Newick tree into the empty output alignment, checking
/// every label against the input.
fn create_tree(
    in_aln: &Alignment,
    out_aln: &mut Alignment,
    newick: &str,
) -> Result<(), AlignError> {
    if out_aln.num_genomes() != 0 {
        return Err(AlignError::Structural(
            "output alignment not empty".to_string(),
        ));
    }

    let tree = Tree::from_newick(newick)?;
    let Some(root) = tree.get_root() else {
        return Ok(());
    };
    for id in tree.levelorder(root) {
        let Some(node) = tree.get_node(id) else {
            continue;
        };
        let name = node.name.clone().ok_or_else(|| AlignError::Parse {
            message: "unlabeled node in tree".to_string(),
            line: 0,
            column: 0,
            snippet: newick.chars().take(50).collect(),
        })?;
        in_aln.open(&name)?;

        match node.parent {
            None => {
                out_aln.add_root_genome(&name)?;
            }
            Some(pid) => {
                let parent_name = tree
                    .get_node(pid)
                    .and_then(|p| p.name.clone())
                    .ok_or_else(|| AlignError::Parse {
                        message: "unlabeled node in tree".to_string(),
                        line: 0,
                        column: 0,
                        snippet: newick.chars().take(50).collect(),
                    })?;
                // clamp undefined branch lengths to 1. for now
                let mut branch_length = node.length.unwrap_or(1.0);
                if branch_length > BRANCH_LENGTH_CAP {
                    branch_length = 1.0;
                }
                out_aln.add_leaf_genome(&name, &parent_name, branch_length)?;
            }
        }
    }
    Ok(())
}

/// Run the extraction passes for one internal node of the output tree.
fn convert_internal_node(
    in_aln: &Alignment,
    out_aln: &mut Alignment,
    name: &str,
    step: usize,
) -> Result<(), AlignError> {
    let parent = in_aln.open(name)?;
    let child_names = out_aln.child_names(name)?;
    let children = child_names
        .iter()
        .map(|n| in_aln.open(n))
        .collect::<Result<Vec<GenomeId>, AlignError>>()?;

    let mut graph = LodGraph::build(in_aln, parent, &children, step)?;

    let counts = count_segments_in_graph(&graph);
    write_dimensions(in_aln, out_aln, &counts, parent)?;
    write_segments(in_aln, out_aln, &mut graph, parent, &children)?;
    write_homologies(in_aln, out_aln, &graph, parent)?;

    let out_parent = out_aln.open(name)?;
    write_parse_info(out_aln, out_parent)?;

    // the graph for this node can be large; drop it before moving on
    drop(graph);
    Ok(())
}

/// Tally how many graph segments each input sequence carries.
fn count_segments_in_graph(graph: &LodGraph) -> BTreeMap<(GenomeId, usize), usize> {
    let mut counts = BTreeMap::new();
    for idx in 0..graph.num_blocks() {
        for &sid in &graph.block(idx).segments {
            let seg = graph.segment(sid);
            *counts.entry((seg.genome, seg.sequence)).or_insert(0) += 1;
        }
    }
    counts
}

/// Dimension the output genomes: bottom counts for the parent, top
/// counts for each child. The root and fresh leaves are dimensioned
/// outright; a re-entrant internal node already owns its tops and only
/// its bottom counts change.
fn write_dimensions(
    in_aln: &Alignment,
    out_aln: &mut Alignment,
    counts: &BTreeMap<(GenomeId, usize), usize>,
    parent: GenomeId,
) -> Result<(), AlignError> {
    let mut dim_map: BTreeMap<GenomeId, Vec<SequenceDims>> = BTreeMap::new();
    for (&(genome, si), &count) in counts {
        let info = &in_aln.genome(genome).sequences[si];
        let is_parent = genome == parent;
        dim_map.entry(genome).or_default().push(SequenceDims {
            name: info.name.clone(),
            length: info.length,
            num_top: if is_parent { 0 } else { count },
            num_bot: if is_parent { count } else { 0 },
        });
    }

    for (genome, dims) in &dim_map {
        let name = &in_aln.genome(*genome).name;
        let out_id = out_aln.open(name)?;
        if out_aln.root() == Some(out_id) || *genome != parent {
            out_aln.set_dimensions(out_id, dims)?;
        } else {
            let updates: Vec<BottomDims> = dims
                .iter()
                .map(|d| BottomDims {
                    name: d.name.clone(),
                    num_bot: d.num_bot,
                })
                .collect();
            out_aln.update_bottom_dimensions(out_id, &updates)?;
        }
    }
    Ok(())
}

/// Materialize graph segments as output segment coordinates, writing the
/// assigned array index back onto each graph segment for the later
/// passes.
fn write_segments(
    in_aln: &Alignment,
    out_aln: &mut Alignment,
    graph: &mut LodGraph,
    parent: GenomeId,
    children: &[GenomeId],
) -> Result<(), AlignError> {
    let mut genomes: Vec<GenomeId> = children.to_vec();
    genomes.push(parent);

    for genome in genomes {
        let in_g = in_aln.genome(genome);
        let out_id = out_aln.open(&in_g.name)?;
        let is_parent = genome == parent;
        let mut cursor = 0;

        let out_seqs: Vec<(String, usize)> = out_aln
            .genome(out_id)
            .sequences
            .iter()
            .map(|s| (s.name.clone(), s.start))
            .collect();

        for (seq_name, out_start) in out_seqs {
            let in_si = in_g.sequence_by_name(&seq_name).ok_or_else(|| {
                AlignError::Consistency(format!(
                    "output sequence [{}] missing from input genome [{}]",
                    seq_name, in_g.name
                ))
            })?;
            let in_start = in_g.sequences[in_si].start;
            let set = graph.segment_set(genome, in_si).ok_or_else(|| {
                AlignError::Consistency(format!(
                    "sequence [{}] of [{}] has no segment set",
                    seq_name, in_g.name
                ))
            })?;

            // skip the two telomere sentinels
            let interior: Vec<_> = set[1..set.len() - 1].to_vec();
            for sid in interior {
                graph.segment_mut(sid).array_index = Some(cursor);
                let (left_pos, length) = {
                    let seg = graph.segment(sid);
                    (seg.left_pos, seg.length)
                };
                let start = out_start + (left_pos - in_start);
                let out_g = out_aln.genome_mut(out_id);
                if is_parent {
                    let b = out_g.bottoms.get_mut(cursor).ok_or_else(|| {
                        AlignError::Consistency(
                            "more graph segments than dimensioned bottoms".to_string(),
                        )
                    })?;
                    b.start = start;
                    b.length = length;
                } else {
                    let t = out_g.tops.get_mut(cursor).ok_or_else(|| {
                        AlignError::Consistency(
                            "more graph segments than dimensioned tops".to_string(),
                        )
                    })?;
                    t.start = start;
                    t.length = length;
                }
                cursor += 1;
            }
        }
    }
    Ok(())
}

/// Wire up the homology edges of every block: the block's first parent
/// segment becomes the canonical parent of all child segments, and the
/// child segments of each genome are chained into a paralogy cycle.
fn write_homologies(
    in_aln: &Alignment,
    out_aln: &mut Alignment,
    graph: &LodGraph,
    parent: GenomeId,
) -> Result<(), AlignError> {
    let out_parent = out_aln.open(&in_aln.genome(parent).name)?;

    for idx in 0..graph.num_blocks() {
        let block = graph.block(idx);
        let mut buckets: IndexMap<GenomeId, Vec<usize>> = IndexMap::new();
        for &sid in &block.segments {
            buckets
                .entry(graph.segment(sid).genome)
                .or_default()
                .push(sid);
        }
        update_block_edges(in_aln, out_aln, graph, parent, out_parent, &buckets)?;
    }
    Ok(())
}

fn update_block_edges(
    in_aln: &Alignment,
    out_aln: &mut Alignment,
    graph: &LodGraph,
    in_parent: GenomeId,
    out_parent: GenomeId,
    buckets: &IndexMap<GenomeId, Vec<usize>>,
) -> Result<(), AlignError> {
    let materialized = |sid: usize| {
        graph.segment(sid).array_index.ok_or_else(|| {
            AlignError::Consistency("graph segment was never materialized".to_string())
        })
    };

    // zap all links of the covered parent segments, then designate the
    // first one as the canonical parent of the whole block
    let mut root_info: Option<(usize, bool)> = None;
    if let Some(set) = buckets.get(&in_parent) {
        for &sid in set {
            let ai = materialized(sid)?;
            let og = out_aln.genome_mut(out_parent);
            for link in og.bottoms[ai].children.iter_mut() {
                *link = ChildLink::default();
            }
            og.bottoms[ai].top_parse_index = None;
        }
        let first = set[0];
        root_info = Some((materialized(first)?, graph.segment(first).flipped));
    }

    for (&genome, set) in buckets {
        if genome == in_parent {
            continue;
        }
        let out_child = out_aln.open(&in_aln.genome(genome).name)?;
        let child_slot = out_aln
            .genome(out_parent)
            .child_slot(out_child)
            .ok_or_else(|| {
                AlignError::Consistency(format!(
                    "genome [{}] is not a child of [{}] in the output",
                    in_aln.genome(genome).name,
                    in_aln.genome(in_parent).name
                ))
            })?;

        for (i, &sid) in set.iter().enumerate() {
            let ai = materialized(sid)?;
            let flipped = graph.segment(sid).flipped;

            let next_paralogy = if set.len() == 1 {
                None
            } else {
                Some(materialized(set[(i + 1) % set.len()])?)
            };

            let og = out_aln.genome_mut(out_child);
            let top = &mut og.tops[ai];
            top.bottom_parse_index = None;
            top.next_paralogy_index = next_paralogy;
            match root_info {
                Some((canonical, root_flipped)) => {
                    top.parent_index = Some(canonical);
                    top.parent_reversed = flipped == root_flipped;
                }
                None => {
                    top.parent_index = None;
                }
            }

            // the first child segment carries the reverse edge
            if i == 0 {
                if let Some((canonical, root_flipped)) = root_info {
                    let reversed = flipped == root_flipped;
                    let og = out_aln.genome_mut(out_parent);
                    og.bottoms[canonical].children[child_slot] = ChildLink {
                        top_index: Some(ai),
                        reversed,
                    };
                }
            }
        }
    }
    Ok(())
}

/// Co-walk the top and bottom arrays of an internal non-root genome,
/// recording for each segment the opposite-type segment containing its
/// start. Each iteration advances at least one cursor, so the walk is
/// linear in the two array lengths.
fn write_parse_info(out_aln: &mut Alignment, genome: GenomeId) -> Result<(), AlignError> {
    let g = out_aln.genome_mut(genome);
    if g.parent.is_none() || g.children.is_empty() {
        return Ok(());
    }

    let mut bi = 0;
    let mut ti = 0;
    while bi < g.bottoms.len() && ti < g.tops.len() {
        let bstart = g.bottoms[bi].start;
        let bend = bstart + g.bottoms[bi].length;
        let tstart = g.tops[ti].start;
        let tend = tstart + g.tops[ti].length;

        if bstart >= tstart && bstart < tend {
            g.bottoms[bi].top_parse_index = Some(ti);
        }
        let bright = bend <= tend || bstart == bend;

        if tstart >= bstart && tstart < bend {
            g.tops[ti].bottom_parse_index = Some(bi);
        }
        let tright = tend <= bend || tstart == tend;

        if !bright && !tright {
            return Err(AlignError::Consistency(
                "parse co-walk stalled".to_string(),
            ));
        }
        if bright {
            bi += 1;
        }
        if tright {
            ti += 1;
        }
    }
    Ok(())
}
