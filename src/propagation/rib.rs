use std::collections::HashMap;
use std::fmt;

use serde_json::json;

use crate::as_graph::{ASGraph, ASN};
use crate::shared::PropagationPhase;

use super::announcement::Prefix;

/// A settled route: the hop sequence from the owning AS (first) to the
/// origin (last), the phase its final crossing happened in, and any
/// prepend surcharge the route carried from the origin's announcement.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AsPath {
    hops: Vec<ASN>,
    phase: PropagationPhase,
    prepend: u32,
}

impl AsPath {
    pub fn new(hops: Vec<ASN>, phase: PropagationPhase) -> Self {
        AsPath {
            hops,
            phase,
            prepend: 0,
        }
    }

    pub fn with_prepend(mut self, prepend: u32) -> Self {
        self.prepend = prepend;
        self
    }

    pub fn hops(&self) -> &[ASN] {
        &self.hops
    }

    /// The AS this route belongs to. Panics if the path is empty.
    pub fn owner(&self) -> ASN {
        self.hops[0]
    }

    /// The AS that originated the route. Panics if the path is empty.
    pub fn origin(&self) -> ASN {
        self.hops[self.hops.len() - 1]
    }

    /// The neighbor the route was learned from, absent on an origin's own
    /// seed route.
    pub fn next_hop(&self) -> Option<ASN> {
        self.hops.get(1).copied()
    }

    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    /// Hop count plus the prepend surcharge; what ranking compares.
    pub fn effective_len(&self) -> u32 {
        self.hops.len() as u32 + self.prepend
    }

    pub fn prepend(&self) -> u32 {
        self.prepend
    }

    pub fn phase(&self) -> PropagationPhase {
        self.phase
    }

    pub fn contains(&self, asn: ASN) -> bool {
        self.hops.contains(&asn)
    }
}

impl fmt::Display for AsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for hop in &self.hops {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{}", hop)?;
            first = false;
        }
        Ok(())
    }
}

/// Everything one AS settled on for the announced prefix: the primary
/// best path, plus every other equally-ranked path when the engine runs
/// with alternate-path recording.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RibEntry {
    path: AsPath,
    alternates: Vec<AsPath>,
}

impl RibEntry {
    pub(crate) fn new(path: AsPath) -> Self {
        RibEntry {
            path,
            alternates: Vec::new(),
        }
    }

    pub(crate) fn push_alternate(&mut self, path: AsPath) {
        self.alternates.push(path);
    }

    pub fn path(&self) -> &AsPath {
        &self.path
    }

    pub fn alternates(&self) -> &[AsPath] {
        &self.alternates
    }

    /// The primary path followed by its equally-ranked alternates.
    pub fn best_paths(&self) -> impl Iterator<Item = &AsPath> {
        std::iter::once(&self.path).chain(self.alternates.iter())
    }

    pub fn phase(&self) -> PropagationPhase {
        self.path.phase()
    }

    pub fn next_hop(&self) -> Option<ASN> {
        self.path.next_hop()
    }
}

/// Why a RIB lookup came back empty, when it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome<'r> {
    /// The AS settled on a route.
    Learned(&'r RibEntry),
    /// The AS is in the topology but no valley-free route reached it.
    NoRoute,
    /// The ASN is not in the topology at all.
    UnknownAsn,
}

impl<'r> RouteOutcome<'r> {
    pub fn is_learned(&self) -> bool {
        matches!(self, RouteOutcome::Learned(_))
    }

    pub fn entry(&self) -> Option<&'r RibEntry> {
        match self {
            RouteOutcome::Learned(entry) => Some(entry),
            _ => None,
        }
    }
}

/// Immutable result of one inference run: a best-path entry for every AS
/// the announcement reached.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Rib {
    prefix: Prefix,
    origins: Vec<ASN>,
    entries: HashMap<ASN, RibEntry>,
}

impl Rib {
    pub(crate) fn new(prefix: Prefix, origins: Vec<ASN>, entries: HashMap<ASN, RibEntry>) -> Self {
        Rib {
            prefix,
            origins,
            entries,
        }
    }

    pub fn prefix(&self) -> Prefix {
        self.prefix
    }

    /// Origins of the announcement this RIB answers, ascending.
    pub fn origins(&self) -> &[ASN] {
        &self.origins
    }

    /// Number of ASes that learned a route.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, asn: ASN) -> Option<&RibEntry> {
        self.entries.get(&asn)
    }

    pub fn entries(&self) -> impl Iterator<Item = (ASN, &RibEntry)> + '_ {
        self.entries.iter().map(|(&asn, entry)| (asn, entry))
    }

    /// Distinguishes an AS that learned nothing from an ASN that is not
    /// even in the topology.
    pub fn route_to(&self, graph: &ASGraph, asn: ASN) -> RouteOutcome<'_> {
        match self.entries.get(&asn) {
            Some(entry) => RouteOutcome::Learned(entry),
            None if graph.contains(asn) => RouteOutcome::NoRoute,
            None => RouteOutcome::UnknownAsn,
        }
    }

    /// Research-friendly dump with one entry per settled AS. Entries are
    /// keyed by the ASN rendered as a string, so the object sorts them
    /// lexicographically ("10" before "2").
    pub fn to_json(&self) -> serde_json::Value {
        let entries: serde_json::Map<String, serde_json::Value> = self
            .entries
            .iter()
            .map(|(&asn, entry)| (asn.to_string(), entry_json(entry)))
            .collect();
        json!({
            "prefix": self.prefix.to_string(),
            "origins": self.origins,
            "entries": entries,
        })
    }
}

fn entry_json(entry: &RibEntry) -> serde_json::Value {
    json!({
        "path": entry.path().hops(),
        "phase": entry.phase().to_string(),
        "prepend": entry.path().prepend(),
        "alternates": entry
            .alternates()
            .iter()
            .map(|path| json!(path.hops()))
            .collect::<Vec<_>>(),
    })
}
