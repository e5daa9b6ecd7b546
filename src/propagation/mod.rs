//! Propagation semantics: what gets announced, the valley-free
//! relationship policy, the inference engine, and the settled results.

pub mod announcement;
pub mod invariants;
pub mod policy;
pub mod rib;

mod engine;
mod frontier;

pub use announcement::{Announcement, Prefix};
pub use engine::{ImportFilter, PropagationEngine};
pub use policy::RelationshipPolicy;
pub use rib::{AsPath, Rib, RibEntry, RouteOutcome};
