pub mod genome;
pub mod segment;

pub use genome::{BottomDims, Genome, GenomeId, SequenceDims, SequenceInfo};
pub use segment::{BottomSegment, ChildLink, SegIndex, TopSegment};

use crate::libs::cursor::{SegKind, SegmentCursor};
use crate::libs::error::AlignError;
use itertools::Itertools;
use std::collections::BTreeMap;

/// An in-memory hierarchical alignment: a rooted tree of genomes, each
/// carrying segment arrays that link it to its neighbors in the tree.
#[derive(Debug, Default, Clone)]
pub struct Alignment {
    /// Arena storage for all genomes
    nodes: Vec<Genome>,

    /// Name lookup (genome names are unique across the alignment)
    names: BTreeMap<String, GenomeId>,

    /// Optional root ID (an alignment might be empty or in construction)
    root: Option<GenomeId>,
}

impl Alignment {
    /// Create a new empty alignment
    pub fn new() -> Self {
        Self::default()
    }

    /// Look a genome up by name.
    ///
    /// The in-memory model keeps no per-handle caches, so there is no
    /// close counterpart; the id stays valid for the alignment's lifetime.
    pub fn open(&self, name: &str) -> Result<GenomeId, AlignError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| AlignError::MissingGenome(name.to_string()))
    }

    pub fn root(&self) -> Option<GenomeId> {
        self.root
    }

    pub fn root_name(&self) -> Option<&str> {
        self.root.map(|id| self.nodes[id].name.as_str())
    }

    pub fn num_genomes(&self) -> usize {
        self.nodes.len()
    }

    /// Get a reference to a genome by ID. Panics on a stale ID, which
    /// cannot be produced through the public API.
    pub fn genome(&self, id: GenomeId) -> &Genome {
        &self.nodes[id]
    }

    /// Get a mutable reference to a genome by ID.
    pub fn genome_mut(&mut self, id: GenomeId) -> &mut Genome {
        &mut self.nodes[id]
    }

    /// Names of a genome's children, in child order.
    pub fn child_names(&self, name: &str) -> Result<Vec<String>, AlignError> {
        let id = self.open(name)?;
        Ok(self.nodes[id]
            .children
            .iter()
            .map(|&c| self.nodes[c].name.clone())
            .collect())
    }

    // --- Write operations (consumed by the LOD extractor) ---

    /// Register the root genome of an empty alignment.
    pub fn add_root_genome(&mut self, name: &str) -> Result<GenomeId, AlignError> {
        if !self.nodes.is_empty() {
            return Err(AlignError::Structural(
                "output alignment not empty".to_string(),
            ));
        }
        let id = self.push_genome(name)?;
        self.root = Some(id);
        Ok(id)
    }

    /// Register a new genome as a leaf under an existing parent.
    pub fn add_leaf_genome(
        &mut self,
        name: &str,
        parent_name: &str,
        branch_length: f64,
    ) -> Result<GenomeId, AlignError> {
        let parent = self.open(parent_name)?;
        let id = self.push_genome(name)?;
        self.nodes[id].parent = Some(parent);
        self.nodes[id].branch_length = Some(branch_length);
        self.nodes[parent].children.push(id);
        Ok(id)
    }

    fn push_genome(&mut self, name: &str) -> Result<GenomeId, AlignError> {
        if self.names.contains_key(name) {
            return Err(AlignError::Structural(format!(
                "duplicate genome name [{}]",
                name
            )));
        }
        let id = self.nodes.len();
        self.nodes.push(Genome {
            name: name.to_string(),
            ..Genome::default()
        });
        self.names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Define a genome's sequences and allocate its segment arrays.
    pub fn set_dimensions(
        &mut self,
        id: GenomeId,
        dims: &[SequenceDims],
    ) -> Result<(), AlignError> {
        self.nodes[id].apply_dimensions(dims)
    }

    /// Reallocate only the bottom array of an existing internal node.
    pub fn update_bottom_dimensions(
        &mut self,
        id: GenomeId,
        updates: &[BottomDims],
    ) -> Result<(), AlignError> {
        self.nodes[id].apply_bottom_dimensions(updates)
    }

    // --- Cursor factories ---

    /// A top-segment cursor positioned at `index`, unsliced, forward.
    pub fn top_cursor(&self, id: GenomeId, index: usize) -> SegmentCursor {
        SegmentCursor::new(id, SegKind::Top, index)
    }

    /// A bottom-segment cursor positioned at `index`, unsliced, forward.
    pub fn bottom_cursor(&self, id: GenomeId, index: usize) -> SegmentCursor {
        SegmentCursor::new(id, SegKind::Bottom, index)
    }

    // --- Newick ---

    /// Serialize the genome tree to a Newick string.
    pub fn to_newick(&self) -> String {
        match self.root {
            Some(root) => format!("{};", self.newick_of(root)),
            None => ";".to_string(),
        }
    }

    fn newick_of(&self, id: GenomeId) -> String {
        let g = &self.nodes[id];
        let info = match g.branch_length {
            Some(len) => format!("{}:{}", g.name, len),
            None => g.name.clone(),
        };
        if g.children.is_empty() {
            info
        } else {
            let inner = g.children.iter().map(|&c| self.newick_of(c)).join(",");
            format!("({}){}", inner, info)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_and_lookup() {
        let mut aln = Alignment::new();
        let r = aln.add_root_genome("R").unwrap();
        let a = aln.add_leaf_genome("A", "R", 0.5).unwrap();
        let b = aln.add_leaf_genome("B", "R", 2.0).unwrap();

        assert_eq!(aln.num_genomes(), 3);
        assert_eq!(aln.root(), Some(r));
        assert_eq!(aln.root_name(), Some("R"));
        assert_eq!(aln.open("B").unwrap(), b);
        assert!(matches!(aln.open("Z"), Err(AlignError::MissingGenome(_))));

        assert_eq!(aln.genome(a).parent, Some(r));
        assert_eq!(aln.genome(r).children, vec![a, b]);
        assert_eq!(aln.genome(r).child_slot(b), Some(1));
        assert_eq!(aln.child_names("R").unwrap(), vec!["A", "B"]);

        assert_eq!(aln.to_newick(), "(A:0.5,B:2)R;");
    }

    #[test]
    fn test_add_root_twice_is_structural() {
        let mut aln = Alignment::new();
        aln.add_root_genome("R").unwrap();
        assert!(matches!(
            aln.add_root_genome("R2"),
            Err(AlignError::Structural(_))
        ));
        assert!(matches!(
            aln.add_leaf_genome("R", "R", 1.0),
            Err(AlignError::Structural(_))
        ));
    }

    #[test]
    fn test_dimensions() {
        let mut aln = Alignment::new();
        let r = aln.add_root_genome("R").unwrap();
        aln.add_leaf_genome("A", "R", 1.0).unwrap();

        aln.set_dimensions(
            r,
            &[
                SequenceDims {
                    name: "chr1".to_string(),
                    length: 100,
                    num_top: 0,
                    num_bot: 2,
                },
                SequenceDims {
                    name: "chr2".to_string(),
                    length: 50,
                    num_top: 0,
                    num_bot: 1,
                },
            ],
        )
        .unwrap();

        let g = aln.genome(r);
        assert_eq!(g.length(), 150);
        assert_eq!(g.sequences[1].start, 100);
        assert_eq!(g.bottoms.len(), 3);
        assert_eq!(g.bottoms[0].children.len(), 1);
        assert_eq!(g.sequence_by_name("chr2"), Some(1));
        assert_eq!(g.sequence_at(99), Some(0));
        assert_eq!(g.sequence_at(100), Some(1));
        assert_eq!(g.sequence_at(150), None);

        // setting twice is a structural error
        assert!(matches!(
            aln.set_dimensions(r, &[]),
            Err(AlignError::Structural(_))
        ));

        // bottom-only update keeps sequences
        aln.update_bottom_dimensions(
            r,
            &[BottomDims {
                name: "chr1".to_string(),
                num_bot: 5,
            }],
        )
        .unwrap();
        assert_eq!(aln.genome(r).bottoms.len(), 5);
        assert_eq!(aln.genome(r).sequences.len(), 2);
    }
}
