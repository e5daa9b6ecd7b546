use std::collections::{BTreeMap, BTreeSet};

use crate::as_graph::{ASGraph, ASN};
use crate::shared::AnnouncementError;

pub type Prefix = ipnetwork::IpNetwork;

/// What gets announced: one or more origin ASes, the prefix they
/// originate, and the knobs that shape how the route spreads.
///
/// The poison set lists ASes the route must never traverse: extensions
/// into a poisoned AS are pruned at the same point loop prevention
/// applies, so poisoned ASNs never appear on a recorded path. An export
/// scope restricts which direct neighbors an origin announces to at all,
/// and a prepend inflates the effective length of every route whose first
/// hop off the origin is the given neighbor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    prefix: Prefix,
    origins: BTreeSet<ASN>,
    poisoned: BTreeSet<ASN>,
    export_scopes: BTreeMap<ASN, BTreeSet<ASN>>,
    prepends: BTreeMap<(ASN, ASN), u32>,
}

impl Announcement {
    pub fn new(prefix: Prefix, origin: ASN) -> Self {
        Self::anycast(prefix, [origin])
    }

    /// The same prefix announced from several origins at once.
    pub fn anycast<I: IntoIterator<Item = ASN>>(prefix: Prefix, origins: I) -> Self {
        Announcement {
            prefix,
            origins: origins.into_iter().collect(),
            poisoned: BTreeSet::new(),
            export_scopes: BTreeMap::new(),
            prepends: BTreeMap::new(),
        }
    }

    pub fn with_poisoned<I: IntoIterator<Item = ASN>>(mut self, asns: I) -> Self {
        self.poisoned.extend(asns);
        self
    }

    /// Restrict `origin` to announcing only to the given neighbors. An
    /// empty scope is valid and means the origin announces to nobody.
    pub fn with_export_scope<I: IntoIterator<Item = ASN>>(
        mut self,
        origin: ASN,
        neighbors: I,
    ) -> Self {
        self.export_scopes
            .insert(origin, neighbors.into_iter().collect());
        self
    }

    /// Inflate by `count` the effective length of every route that leaves
    /// `origin` through `neighbor`, making that exit less attractive.
    pub fn with_prepend(mut self, origin: ASN, neighbor: ASN, count: u32) -> Self {
        self.prepends.insert((origin, neighbor), count);
        self
    }

    pub fn prefix(&self) -> Prefix {
        self.prefix
    }

    /// Origin ASNs, ascending and deduplicated.
    pub fn origins(&self) -> impl Iterator<Item = ASN> + '_ {
        self.origins.iter().copied()
    }

    pub fn poisoned(&self) -> impl Iterator<Item = ASN> + '_ {
        self.poisoned.iter().copied()
    }

    pub fn is_origin(&self, asn: ASN) -> bool {
        self.origins.contains(&asn)
    }

    pub fn is_poisoned(&self, asn: ASN) -> bool {
        self.poisoned.contains(&asn)
    }

    /// Whether `origin` may seed `neighbor` under its export scope.
    pub fn scope_allows(&self, origin: ASN, neighbor: ASN) -> bool {
        match self.export_scopes.get(&origin) {
            Some(scope) => scope.contains(&neighbor),
            None => true,
        }
    }

    /// Length surcharge for routes leaving `origin` through `neighbor`.
    pub fn prepend_for(&self, origin: ASN, neighbor: ASN) -> u32 {
        self.prepends.get(&(origin, neighbor)).copied().unwrap_or(0)
    }

    /// Checks the announcement against a topology. Poisoned ASNs that are
    /// not in the graph are permitted; they simply never match anything.
    pub fn validate(&self, graph: &ASGraph) -> Result<(), AnnouncementError> {
        if self.origins.is_empty() {
            return Err(AnnouncementError::NoOrigins);
        }
        for &origin in &self.origins {
            if !graph.contains(origin) {
                return Err(AnnouncementError::UnknownOrigin(origin));
            }
            if self.poisoned.contains(&origin) {
                return Err(AnnouncementError::PoisonedOrigin(origin));
            }
        }
        for (&origin, scope) in &self.export_scopes {
            if !self.origins.contains(&origin) {
                return Err(AnnouncementError::NotAnOrigin(origin));
            }
            for &neighbor in scope {
                if graph.crossing_between(origin, neighbor).is_none() {
                    return Err(AnnouncementError::NotANeighbor { origin, neighbor });
                }
            }
        }
        for &(origin, neighbor) in self.prepends.keys() {
            if !self.origins.contains(&origin) {
                return Err(AnnouncementError::NotAnOrigin(origin));
            }
            if graph.crossing_between(origin, neighbor).is_none() {
                return Err(AnnouncementError::NotANeighbor { origin, neighbor });
            }
        }
        Ok(())
    }
}
