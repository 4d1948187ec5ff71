//! Hierarchical multi-genome alignment core.
//!
//! An alignment is a rooted phylogenetic tree of genomes. Each genome
//! carries "top" segments linking toward its parent and "bottom" segments
//! linking toward its children; adjacent top/bottom segments of the same
//! genome parse into each other, and top segments sharing a parent form
//! cyclic paralogy lists.
//!
//! Two engines operate on this model:
//!
//! - [`map_segment`] projects a genomic interval from one genome into all
//!   homologous intervals on another, walking the ancestry tree and
//!   handling duplications, strand reversals, and sub-segment slicing.
//! - [`create_interpolated_alignment`] builds a reduced, level-of-detail
//!   alignment at a sampling step, one block graph per internal tree node.

pub mod libs;

pub use crate::libs::align::{Alignment, BottomDims, Genome, GenomeId, SequenceDims};
pub use crate::libs::cursor::{SegKind, SegmentCursor};
pub use crate::libs::error::AlignError;
pub use crate::libs::lod::{create_interpolated_alignment, LodGraph};
pub use crate::libs::mapping::{map_segment, MappedSegment};
