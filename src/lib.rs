//! Infer how BGP announcements propagate across the AS-level Internet
//! under the Gao-Rexford (valley-free) routing model.
//!
//! Build an immutable [`ASGraph`] from AS-relationship records (CAIDA
//! snapshots or literals), describe an [`Announcement`] (origins, prefix,
//! poisoned ASes, export scoping, prepending), and run a
//! [`PropagationEngine`] to get back a per-AS [`Rib`] of best paths.
//!
//! ```
//! use bgpinfer::{Announcement, ASGraph, PropagationEngine, RelationshipRecord, RouteOutcome};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let graph = ASGraph::build([
//!     RelationshipRecord::provider_to_customer(1, 2),
//!     RelationshipRecord::provider_to_customer(2, 3),
//! ])?;
//!
//! let announcement = Announcement::new("203.0.113.0/24".parse()?, 3).with_poisoned([2]);
//! let rib = PropagationEngine::new(&graph).infer(&announcement)?;
//!
//! // The poisoned AS blocks the only route upward.
//! assert!(matches!(rib.route_to(&graph, 2), RouteOutcome::NoRoute));
//! assert!(matches!(rib.route_to(&graph, 99), RouteOutcome::UnknownAsn));
//! assert_eq!(rib.len(), 1);
//! # Ok(())
//! # }
//! ```

// Re-export all public modules
pub mod as_graph;
pub mod batch;
pub mod caida;
pub mod propagation;
pub mod shared;

// Re-export commonly used types at the crate root
pub use as_graph::{ASGraph, ASGraphBuilder, RelationshipRecord, ASN};
pub use batch::BatchRunner;
pub use caida::CaidaCollector;
pub use propagation::{
    Announcement, AsPath, ImportFilter, Prefix, PropagationEngine, RelationshipPolicy, Rib,
    RibEntry, RouteOutcome,
};
pub use shared::{
    AnnouncementError, CaidaError, Crossing, InvariantViolation, PropagationPhase, Relationship,
    TieBreak, ValidationError,
};
