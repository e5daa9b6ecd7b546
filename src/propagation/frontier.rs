use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::policy::RankKey;

/// One pending extension: settle the AS at graph index `dest` through the
/// already-settled AS at index `via`. `prepend` is the surcharge this one
/// crossing adds, non-zero only where a route leaves an origin through a
/// prepended link; each extended path adds it to the surcharge it already
/// carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Candidate {
    pub(crate) key: RankKey,
    pub(crate) dest: u32,
    pub(crate) via: u32,
    pub(crate) prepend: u32,
}

/// Min-ordered frontier of candidates. Pop order is total: the rank key
/// decides, and candidates with identical keys fall back to destination
/// then via index, so a run is deterministic end to end.
#[derive(Debug, Default)]
pub(crate) struct Frontier {
    heap: BinaryHeap<Reverse<Candidate>>,
}

impl Frontier {
    pub(crate) fn new() -> Self {
        Frontier {
            heap: BinaryHeap::new(),
        }
    }

    pub(crate) fn push(&mut self, candidate: Candidate) {
        self.heap.push(Reverse(candidate));
    }

    pub(crate) fn pop(&mut self) -> Option<Candidate> {
        self.heap.pop().map(|Reverse(candidate)| candidate)
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
