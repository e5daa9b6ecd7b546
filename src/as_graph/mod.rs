//! The AS-level topology: relationship records and the immutable
//! [`ASGraph`] the propagation engine runs over.

mod graph;

pub use graph::{ASGraph, ASGraphBuilder, RelationshipRecord, ASN};
