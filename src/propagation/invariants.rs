//! Structural checks over settled routing state.
//!
//! Debug builds of the engine run [`check_entry`] on every settle and
//! merge, trading throughput for fail-fast detection of anything that is
//! not a valley-free, loop-free, poison-respecting route. Release builds
//! skip the checks; tests and external validators can still call
//! [`check_rib`] directly.

use std::collections::HashSet;

use crate::as_graph::{ASGraph, ASN};
use crate::shared::{InvariantViolation, PropagationPhase};

use super::announcement::Announcement;
use super::policy::RelationshipPolicy;
use super::rib::{AsPath, Rib, RibEntry};

/// Walks `hops` from the origin outward and returns the phase the route
/// ends in, or `None` if any edge is missing from the graph or any
/// crossing is illegal. A single-hop path is an origin's seed and traces
/// as `Up`.
pub fn trace_phase(graph: &ASGraph, hops: &[ASN]) -> Option<PropagationPhase> {
    let mut phase = PropagationPhase::Up;
    for window in hops.windows(2).rev() {
        let (importer, exporter) = (window[0], window[1]);
        let crossing = graph.crossing_between(exporter, importer)?;
        phase = RelationshipPolicy::step(phase, crossing)?;
    }
    Some(phase)
}

/// Whether every crossing along the path is a legal valley-free step over
/// edges that actually exist.
pub fn is_valley_free(graph: &ASGraph, path: &AsPath) -> bool {
    trace_phase(graph, path.hops()).is_some()
}

/// Whether no AS appears twice on the path.
pub fn is_loop_free(path: &AsPath) -> bool {
    let mut seen = HashSet::with_capacity(path.len());
    path.hops().iter().all(|&hop| seen.insert(hop))
}

/// Whether the path avoids every AS poisoned by the announcement.
pub fn respects_poisoning(path: &AsPath, announcement: &Announcement) -> bool {
    path.hops().iter().all(|&hop| !announcement.is_poisoned(hop))
}

/// Checks one settled entry: the primary path and each alternate must be
/// well-formed routes for `asn`, and alternates must tie the primary on
/// phase and effective length exactly.
pub fn check_entry(
    graph: &ASGraph,
    announcement: &Announcement,
    asn: ASN,
    entry: &RibEntry,
) -> Result<(), InvariantViolation> {
    check_path(graph, announcement, asn, entry.path())?;
    for alternate in entry.alternates() {
        check_path(graph, announcement, asn, alternate)?;
        if alternate.phase() != entry.path().phase()
            || alternate.effective_len() != entry.path().effective_len()
        {
            return Err(InvariantViolation::AlternateMismatch {
                asn,
                path: alternate.hops().to_vec(),
            });
        }
    }
    Ok(())
}

/// Checks every entry of a settled RIB.
pub fn check_rib(
    graph: &ASGraph,
    announcement: &Announcement,
    rib: &Rib,
) -> Result<(), InvariantViolation> {
    for (asn, entry) in rib.entries() {
        check_entry(graph, announcement, asn, entry)?;
    }
    Ok(())
}

fn check_path(
    graph: &ASGraph,
    announcement: &Announcement,
    asn: ASN,
    path: &AsPath,
) -> Result<(), InvariantViolation> {
    if path.is_empty() {
        return Err(InvariantViolation::EmptyPath { asn });
    }
    if path.owner() != asn {
        return Err(InvariantViolation::WrongOwner {
            asn,
            owner: path.owner(),
        });
    }
    let mut seen = HashSet::with_capacity(path.len());
    for &hop in path.hops() {
        if !seen.insert(hop) {
            return Err(InvariantViolation::RepeatedHop { asn, hop });
        }
        if announcement.is_poisoned(hop) {
            return Err(InvariantViolation::PoisonedHop { asn, hop });
        }
    }
    if !announcement.is_origin(path.origin()) {
        return Err(InvariantViolation::ForeignOrigin {
            asn,
            origin: path.origin(),
        });
    }
    match trace_phase(graph, path.hops()) {
        None => Err(InvariantViolation::IllegalPath {
            asn,
            path: path.hops().to_vec(),
        }),
        Some(traced) if traced != path.phase() => Err(InvariantViolation::PhaseMismatch {
            asn,
            recorded: path.phase(),
            traced,
        }),
        Some(_) => Ok(()),
    }
}
