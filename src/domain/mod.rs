// Domain model and the extraction/reduction algorithms. No I/O lives here.

pub mod auxiliary;
pub mod behavior;
pub mod branch;
pub mod dead_leaf;
pub mod extractor;
pub mod graph;
pub mod interest;
pub mod noise;
pub mod reducer;

pub use behavior::{RawBehavior, ReducedBehavior, ReducedBehaviors};
pub use graph::{EdgeTriple, KnowledgeGraph, Node, NodeId, Relation};
