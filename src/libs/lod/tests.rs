use super::*;
use crate::libs::align::{Alignment, ChildLink, GenomeId, SequenceDims};
use crate::libs::mapping::map_segment;
use std::collections::BTreeSet;

fn seq(name: &str, length: usize, num_top: usize, num_bot: usize) -> SequenceDims {
    SequenceDims {
        name: name.to_string(),
        length,
        num_top,
        num_bot,
    }
}

// R with children A and B, one 1000-base sequence each, one homology
// block spanning everything; B's orientation is configurable.
fn trio(b_reversed: bool) -> (Alignment, GenomeId, GenomeId, GenomeId) {
    let mut aln = Alignment::new();
    let r = aln.add_root_genome("R").unwrap();
    let a = aln.add_leaf_genome("A", "R", 1.0).unwrap();
    let b = aln.add_leaf_genome("B", "R", 1.0).unwrap();
    aln.set_dimensions(r, &[seq("chr1", 1000, 0, 1)]).unwrap();
    aln.set_dimensions(a, &[seq("chr1", 1000, 1, 0)]).unwrap();
    aln.set_dimensions(b, &[seq("chr1", 1000, 1, 0)]).unwrap();

    let rg = aln.genome_mut(r);
    rg.bottoms[0].length = 1000;
    rg.bottoms[0].children[0] = ChildLink {
        top_index: Some(0),
        reversed: false,
    };
    rg.bottoms[0].children[1] = ChildLink {
        top_index: Some(0),
        reversed: b_reversed,
    };
    let ag = aln.genome_mut(a);
    ag.tops[0].length = 1000;
    ag.tops[0].parent_index = Some(0);
    let bg = aln.genome_mut(b);
    bg.tops[0].length = 1000;
    bg.tops[0].parent_index = Some(0);
    bg.tops[0].parent_reversed = b_reversed;

    (aln, r, a, b)
}

#[test]
fn test_extraction_basics() {
    let (in_aln, _, _, _) = trio(false);
    let mut out = Alignment::new();
    create_interpolated_alignment(&in_aln, &mut out, 100, None).unwrap();

    assert_eq!(out.to_newick(), in_aln.to_newick());

    let r = out.open("R").unwrap();
    let a = out.open("A").unwrap();
    let b = out.open("B").unwrap();
    assert_eq!(out.genome(r).bottoms.len(), 10);
    assert_eq!(out.genome(a).tops.len(), 10);
    assert_eq!(out.genome(b).tops.len(), 10);

    for k in 0..10 {
        let bot = &out.genome(r).bottoms[k];
        assert_eq!((bot.start, bot.length), (k * 100, 100));

        // the block's first (parent) segment is canonical: both children
        // point back at it, and it carries the reverse edges
        assert_eq!(bot.children[0].top_index, Some(k));
        assert_eq!(bot.children[1].top_index, Some(k));

        for g in [a, b] {
            let top = &out.genome(g).tops[k];
            assert_eq!((top.start, top.length), (k * 100, 100));
            assert_eq!(top.parent_index, Some(k));
            // equal flipped flags on both ends of the homology
            assert!(top.parent_reversed);
            // one segment per genome per block: no paralogy cycle
            assert_eq!(top.next_paralogy_index, None);
        }
    }
}

#[test]
fn test_extraction_reversed_child() {
    let (in_aln, _, _, _) = trio(true);
    let mut out = Alignment::new();
    create_interpolated_alignment(&in_aln, &mut out, 100, None).unwrap();

    let r = out.open("R").unwrap();
    let b = out.open("B").unwrap();

    for k in 0..10 {
        // B's sampled pieces mirror, so block k materializes as B's
        // array entry 9-k
        let bi = 9 - k;
        let top = &out.genome(b).tops[bi];
        assert_eq!((top.start, top.length), (bi * 100, 100));
        assert_eq!(top.parent_index, Some(k));
        // flipped differs from the canonical parent segment
        assert!(!top.parent_reversed);
        assert_eq!(
            out.genome(r).bottoms[k].children[1].top_index,
            Some(bi)
        );
        assert!(!out.genome(r).bottoms[k].children[1].reversed);
    }
}

#[test]
fn test_extraction_with_explicit_tree() {
    let (in_aln, _, _, _) = trio(false);
    let mut out = Alignment::new();
    create_interpolated_alignment(&in_aln, &mut out, 100, Some("(B:3,A:4)R;")).unwrap();

    assert_eq!(out.to_newick(), "(B:3,A:4)R;");
    let r = out.open("R").unwrap();
    let b = out.open("B").unwrap();
    // B now occupies child slot 0
    assert_eq!(out.genome(r).child_slot(b), Some(0));
    assert_eq!(out.genome(r).bottoms[0].children[0].top_index, Some(0));
}

#[test]
fn test_round_trip_through_extracted_alignment() {
    let (in_aln, _, _, _) = trio(false);
    let mut out = Alignment::new();
    create_interpolated_alignment(&in_aln, &mut out, 100, None).unwrap();

    let r = out.open("R").unwrap();
    let a = out.open("A").unwrap();
    let b = out.open("B").unwrap();

    // A[250..300) lives in A's third sampled segment
    let mut src = out.top_cursor(a, 2);
    src.slice(&out, 50, 0);

    let mut results = BTreeSet::new();
    let path = BTreeSet::from([r]);
    let n = map_segment(&out, &src, &mut results, b, &path, false).unwrap();

    assert_eq!(n, 1);
    let total: usize = results.iter().map(|m| m.length(&out)).sum();
    assert_eq!(total, src.length(&out));
    let m = results.first().unwrap();
    assert_eq!(m.genome(), b);
    // the two reversed hops cancel out
    assert!(!m.is_reversed());
    assert_eq!(m.target().covered(&out), (250, 300));
}

// R - M - {A, B}: M is internal, so its tops come from R's pass and its
// bottoms from its own, with parse info wired between them.
fn four_genome_chain() -> Alignment {
    let mut aln = Alignment::new();
    let r = aln.add_root_genome("R").unwrap();
    let m = aln.add_leaf_genome("M", "R", 1.0).unwrap();
    let a = aln.add_leaf_genome("A", "M", 1.0).unwrap();
    let b = aln.add_leaf_genome("B", "M", 1.0).unwrap();
    aln.set_dimensions(r, &[seq("chr1", 200, 0, 1)]).unwrap();
    aln.set_dimensions(m, &[seq("chr1", 200, 1, 1)]).unwrap();
    aln.set_dimensions(a, &[seq("chr1", 200, 1, 0)]).unwrap();
    aln.set_dimensions(b, &[seq("chr1", 200, 1, 0)]).unwrap();

    let rg = aln.genome_mut(r);
    rg.bottoms[0].length = 200;
    rg.bottoms[0].children[0] = ChildLink {
        top_index: Some(0),
        reversed: false,
    };
    let mg = aln.genome_mut(m);
    mg.tops[0].length = 200;
    mg.tops[0].parent_index = Some(0);
    mg.tops[0].bottom_parse_index = Some(0);
    mg.bottoms[0].length = 200;
    mg.bottoms[0].top_parse_index = Some(0);
    mg.bottoms[0].children[0] = ChildLink {
        top_index: Some(0),
        reversed: false,
    };
    mg.bottoms[0].children[1] = ChildLink {
        top_index: Some(0),
        reversed: false,
    };
    for g in [a, b] {
        let cg = aln.genome_mut(g);
        cg.tops[0].length = 200;
        cg.tops[0].parent_index = Some(0);
    }
    aln
}

#[test]
fn test_internal_node_gets_both_arrays() {
    let in_aln = four_genome_chain();
    let mut out = Alignment::new();
    create_interpolated_alignment(&in_aln, &mut out, 100, None).unwrap();

    let m = out.open("M").unwrap();
    let mg = out.genome(m);
    assert_eq!(mg.tops.len(), 2);
    assert_eq!(mg.bottoms.len(), 2);

    // co-walked parse info between the two fresh arrays
    for k in 0..2 {
        assert_eq!(mg.tops[k].bottom_parse_index, Some(k));
        assert_eq!(mg.bottoms[k].top_parse_index, Some(k));
    }

    // leaf-to-root projection across both levels
    let r = out.open("R").unwrap();
    let a = out.open("A").unwrap();
    let mut src = out.top_cursor(a, 0);
    src.slice(&out, 50, 0); // A[50..100)

    let mut results = BTreeSet::new();
    let path = BTreeSet::from([m]);
    let n = map_segment(&out, &src, &mut results, r, &path, false).unwrap();
    assert_eq!(n, 1);
    let mseg = results.first().unwrap();
    assert_eq!(mseg.genome(), r);
    assert_eq!(mseg.length(&out), 50);
    assert_eq!(mseg.target().covered(&out), (50, 100));
}
