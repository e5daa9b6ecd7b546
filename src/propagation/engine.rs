use std::collections::HashMap;
use std::time::Instant;

use log::debug;

use crate::as_graph::{ASGraph, ASN};
use crate::shared::{AnnouncementError, PropagationPhase};

use super::announcement::Announcement;
use super::frontier::{Candidate, Frontier};
#[cfg(debug_assertions)]
use super::invariants;
use super::policy::RelationshipPolicy;
use super::rib::{AsPath, Rib, RibEntry};

/// Per-AS import predicate. Returning `false` rejects the offered path
/// before it settles or merges, and the AS falls back to its next-ranked
/// candidate, if any. Predicates must be pure for runs to stay
/// deterministic.
pub type ImportFilter = dyn Fn(ASN, &AsPath) -> bool + Send + Sync;

/// Single-source propagation inference over a shared, immutable
/// [`ASGraph`].
///
/// One run is a label-correcting search: origins settle up front, every
/// legal export becomes a frontier candidate ranked by
/// [`RelationshipPolicy`], and each AS settles exactly once, on the first
/// candidate popped for it. Settled entries never change afterwards;
/// alternate-path recording appends equally-ranked paths but never
/// replaces the primary.
///
/// The engine itself carries no per-run state, so one graph can serve
/// many concurrent runs from separate threads.
///
/// ```
/// use bgpinfer::{Announcement, ASGraph, PropagationEngine, RelationshipRecord};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let graph = ASGraph::build([
///     RelationshipRecord::provider_to_customer(1, 2),
///     RelationshipRecord::peer_to_peer(2, 3),
/// ])?;
/// let rib = PropagationEngine::new(&graph).infer(&Announcement::new("203.0.113.0/24".parse()?, 2))?;
/// assert_eq!(rib.get(1).map(|entry| entry.path().hops()), Some(&[1, 2][..]));
/// # Ok(())
/// # }
/// ```
pub struct PropagationEngine<'g> {
    graph: &'g ASGraph,
    policy: RelationshipPolicy,
    record_alternates: bool,
    import_filters: HashMap<ASN, Box<ImportFilter>>,
}

impl<'g> PropagationEngine<'g> {
    pub fn new(graph: &'g ASGraph) -> Self {
        PropagationEngine {
            graph,
            policy: RelationshipPolicy::default(),
            record_alternates: false,
            import_filters: HashMap::new(),
        }
    }

    pub fn with_policy(mut self, policy: RelationshipPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Record every equally-ranked best path per AS, not just the
    /// tie-break winner.
    pub fn with_alternate_paths(mut self, record: bool) -> Self {
        self.record_alternates = record;
        self
    }

    /// Install an import predicate for one AS. In single-path runs the
    /// predicate sees each primary candidate; with alternate-path
    /// recording it sees every tied path individually.
    pub fn with_import_filter<F>(mut self, asn: ASN, filter: F) -> Self
    where
        F: Fn(ASN, &AsPath) -> bool + Send + Sync + 'static,
    {
        self.import_filters.insert(asn, Box::new(filter));
        self
    }

    pub fn graph(&self) -> &'g ASGraph {
        self.graph
    }

    pub fn policy(&self) -> RelationshipPolicy {
        self.policy
    }

    /// Runs one inference and returns the settled RIB.
    pub fn infer(&self, announcement: &Announcement) -> Result<Rib, AnnouncementError> {
        announcement.validate(self.graph)?;
        let started = Instant::now();
        let mut run = InferenceRun::new(self, announcement);
        run.seed();
        run.drain();
        let rib = run.finish();
        debug!(
            "settled {} of {} ASes in {:?}",
            rib.len(),
            self.graph.len(),
            started.elapsed()
        );
        Ok(rib)
    }

    fn accepts(&self, asn: ASN, path: &AsPath) -> bool {
        match self.import_filters.get(&asn) {
            Some(filter) => filter(asn, path),
            None => true,
        }
    }
}

/// Mutable state of one run, dense over graph indices. Everything here is
/// per-run, which is what keeps the engine shareable.
struct InferenceRun<'e, 'g> {
    engine: &'e PropagationEngine<'g>,
    announcement: &'e Announcement,
    settled: Vec<Option<RibEntry>>,
    frontier: Frontier,
    poisoned: Vec<bool>,
    origin: Vec<bool>,
}

impl<'e, 'g> InferenceRun<'e, 'g> {
    fn new(engine: &'e PropagationEngine<'g>, announcement: &'e Announcement) -> Self {
        let n = engine.graph.len();
        let mut poisoned = vec![false; n];
        for asn in announcement.poisoned() {
            if let Some(index) = engine.graph.index_of(asn) {
                poisoned[index] = true;
            }
        }
        let mut origin = vec![false; n];
        for asn in announcement.origins() {
            if let Some(index) = engine.graph.index_of(asn) {
                origin[index] = true;
            }
        }
        InferenceRun {
            engine,
            announcement,
            settled: vec![None; n],
            frontier: Frontier::new(),
            poisoned,
            origin,
        }
    }

    /// Origins settle immediately with their trivial path and export to
    /// their (possibly scoped) neighbors. Origins never import.
    fn seed(&mut self) {
        let graph = self.engine.graph;
        for asn in self.announcement.origins() {
            if let Some(index) = graph.index_of(asn) {
                let seed = AsPath::new(vec![asn], PropagationPhase::Up);
                self.settled[index] = Some(RibEntry::new(seed));
                self.export_from(index as u32);
            }
        }
    }

    fn drain(&mut self) {
        while let Some(candidate) = self.frontier.pop() {
            if self.settled[candidate.dest as usize].is_some() {
                self.merge(candidate);
            } else {
                self.settle(candidate);
            }
        }
    }

    /// First pop for an unsettled AS carries its best rank key, so the
    /// candidate's extension of `via` becomes the primary path. Nothing on
    /// `via`'s settled paths can equal the destination: every hop there
    /// settled earlier, and the destination is only now settling.
    fn settle(&mut self, candidate: Candidate) {
        let engine = self.engine;
        let dest_asn = engine.graph.node_at(candidate.dest).asn;
        let mut paths = {
            let via_entry = self.settled[candidate.via as usize]
                .as_ref()
                .expect("frontier candidates only extend settled entries");
            let mut paths = Vec::with_capacity(1 + via_entry.alternates().len());
            paths.push(extend(via_entry.path(), dest_asn, candidate));
            if engine.record_alternates {
                for alternate in via_entry.alternates() {
                    paths.push(extend(alternate, dest_asn, candidate));
                }
            }
            paths
        };
        paths.retain(|path| engine.accepts(dest_asn, path));

        let mut paths = paths.into_iter();
        let Some(first) = paths.next() else {
            return;
        };
        let mut entry = RibEntry::new(first);
        for path in paths {
            entry.push_alternate(path);
        }
        #[cfg(debug_assertions)]
        self.check_settled(dest_asn, &entry);
        self.settled[candidate.dest as usize] = Some(entry);
        self.export_from(candidate.dest);
    }

    /// A candidate for an already-settled AS is an equal-rank tie (record
    /// it as alternates when asked to) or strictly worse (drop it). The
    /// repeat filter applies here: `via` may have settled through the
    /// destination itself.
    fn merge(&mut self, candidate: Candidate) {
        if !self.engine.record_alternates {
            return;
        }
        let dest = candidate.dest as usize;
        if self.origin[dest] {
            return;
        }
        let engine = self.engine;
        let dest_asn = engine.graph.node_at(candidate.dest).asn;

        let (settled_phase, settled_len) = {
            let entry = self.settled[dest]
                .as_ref()
                .expect("merge only runs against settled entries");
            (entry.phase(), entry.path().effective_len())
        };
        debug_assert!(
            (settled_phase, settled_len) <= (candidate.key.phase, candidate.key.effective_len),
            "a settled key can never lose to a later candidate"
        );
        if (candidate.key.phase, candidate.key.effective_len) != (settled_phase, settled_len) {
            return;
        }

        let new_paths: Vec<AsPath> = {
            let via_entry = self.settled[candidate.via as usize]
                .as_ref()
                .expect("frontier candidates only extend settled entries");
            via_entry
                .best_paths()
                .filter(|path| !path.contains(dest_asn))
                .map(|path| extend(path, dest_asn, candidate))
                .filter(|path| engine.accepts(dest_asn, path))
                .collect()
        };
        if new_paths.is_empty() {
            return;
        }
        let entry = self.settled[dest]
            .as_mut()
            .expect("merge only runs against settled entries");
        for path in new_paths {
            entry.push_alternate(path);
        }
        #[cfg(debug_assertions)]
        {
            let entry = self.settled[dest]
                .as_ref()
                .expect("merge only runs against settled entries");
            self.check_settled(dest_asn, entry);
        }
    }

    /// Enqueues every legal extension of a freshly settled entry. Poisoned
    /// targets are pruned here, the same point loop prevention acts, so
    /// they never settle and never appear on a path.
    fn export_from(&mut self, from: u32) {
        let graph = self.engine.graph;
        let (phase, hop_count, entry_prepend) = {
            let entry = self.settled[from as usize]
                .as_ref()
                .expect("only settled entries export");
            (
                entry.phase(),
                entry.path().len() as u32,
                entry.path().prepend(),
            )
        };
        let from_asn = graph.node_at(from).asn;
        let is_origin = self.origin[from as usize];

        for (crossing, targets) in graph.node_at(from).classes() {
            let Some(next_phase) = RelationshipPolicy::step(phase, crossing) else {
                continue;
            };
            for &target in targets {
                if self.poisoned[target as usize] {
                    continue;
                }
                let target_asn = graph.node_at(target).asn;
                if is_origin && !self.announcement.scope_allows(from_asn, target_asn) {
                    continue;
                }
                // Surcharge is added only where a route leaves its origin;
                // re-exported paths each already carry their own, and the
                // primary's share is folded into the key through the entry.
                let added = if is_origin {
                    self.announcement.prepend_for(from_asn, target_asn)
                } else {
                    0
                };
                let key = self.engine.policy.rank_key(
                    next_phase,
                    hop_count + 1 + entry_prepend + added,
                    from_asn,
                );
                self.frontier.push(Candidate {
                    key,
                    dest: target,
                    via: from,
                    prepend: added,
                });
            }
        }
    }

    fn finish(self) -> Rib {
        let graph = self.engine.graph;
        let mut entries = HashMap::new();
        for (index, slot) in self.settled.into_iter().enumerate() {
            if let (Some(entry), Some(asn)) = (slot, graph.asn_of(index)) {
                entries.insert(asn, entry);
            }
        }
        Rib::new(
            self.announcement.prefix(),
            self.announcement.origins().collect(),
            entries,
        )
    }

    #[cfg(debug_assertions)]
    fn check_settled(&self, asn: ASN, entry: &RibEntry) {
        if let Err(violation) =
            invariants::check_entry(self.engine.graph, self.announcement, asn, entry)
        {
            panic!("propagation invariant violated: {}", violation);
        }
    }
}

fn extend(path: &AsPath, dest_asn: ASN, candidate: Candidate) -> AsPath {
    let mut hops = Vec::with_capacity(path.len() + 1);
    hops.push(dest_asn);
    hops.extend_from_slice(path.hops());
    AsPath::new(hops, candidate.key.phase).with_prepend(path.prepend() + candidate.prepend)
}
