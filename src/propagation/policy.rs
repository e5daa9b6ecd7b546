use crate::as_graph::ASN;
use crate::shared::{Crossing, PropagationPhase, TieBreak};

/// Composite ranking key of one candidate route. `Ord` is lexicographic
/// over the declared field order, which is exactly the preference order:
/// phase first, then effective length, then the tie-break value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct RankKey {
    pub(crate) phase: PropagationPhase,
    pub(crate) effective_len: u32,
    pub(crate) tie_break: u32,
}

/// The Gao-Rexford relationship policy: which exports are legal, and how
/// candidate routes are ranked against each other.
///
/// Export legality is a three-state automaton over [`PropagationPhase`].
/// A route starts in `Up` at its origin; crossing into a customer always
/// sends it to `Down`, crossing into a provider or peer is legal only
/// while it is still in `Up`, and a sibling crossing keeps whatever phase
/// it had (mutual full transit). Once a route has gone sideways or down
/// it can never climb again, which is what keeps paths valley-free.
///
/// Ranking prefers the lowest phase ordinal (customer-learned routes beat
/// peer-learned ones, which beat provider-learned ones), then the shortest
/// effective length, then the configured [`TieBreak`] over the next hop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelationshipPolicy {
    tie_break: TieBreak,
}

impl RelationshipPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tie_break(tie_break: TieBreak) -> Self {
        RelationshipPolicy { tie_break }
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Phase a route enters after an edge crossing, or `None` if the
    /// export is not valley-free and must be pruned.
    pub fn step(phase: PropagationPhase, crossing: Crossing) -> Option<PropagationPhase> {
        match crossing {
            Crossing::ToCustomer => Some(PropagationPhase::Down),
            Crossing::ToSibling => Some(phase),
            Crossing::ToProvider if phase == PropagationPhase::Up => Some(PropagationPhase::Up),
            Crossing::ToPeer if phase == PropagationPhase::Up => Some(PropagationPhase::Peer),
            _ => None,
        }
    }

    pub(crate) fn rank_key(
        &self,
        phase: PropagationPhase,
        effective_len: u32,
        next_hop: ASN,
    ) -> RankKey {
        let tie_break = match self.tie_break {
            TieBreak::LowestNextHop => next_hop,
            TieBreak::HighestNextHop => u32::MAX - next_hop,
        };
        RankKey {
            phase,
            effective_len,
            tie_break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PropagationPhase::*;

    #[test]
    fn automaton_permits_exactly_the_valley_free_steps() {
        assert_eq!(RelationshipPolicy::step(Up, Crossing::ToProvider), Some(Up));
        assert_eq!(RelationshipPolicy::step(Up, Crossing::ToPeer), Some(Peer));
        assert_eq!(RelationshipPolicy::step(Up, Crossing::ToCustomer), Some(Down));

        assert_eq!(RelationshipPolicy::step(Peer, Crossing::ToProvider), None);
        assert_eq!(RelationshipPolicy::step(Peer, Crossing::ToPeer), None);
        assert_eq!(
            RelationshipPolicy::step(Peer, Crossing::ToCustomer),
            Some(Down)
        );

        assert_eq!(RelationshipPolicy::step(Down, Crossing::ToProvider), None);
        assert_eq!(RelationshipPolicy::step(Down, Crossing::ToPeer), None);
        assert_eq!(
            RelationshipPolicy::step(Down, Crossing::ToCustomer),
            Some(Down)
        );
    }

    #[test]
    fn sibling_crossings_preserve_the_phase() {
        for phase in [Up, Peer, Down] {
            assert_eq!(
                RelationshipPolicy::step(phase, Crossing::ToSibling),
                Some(phase)
            );
        }
    }

    #[test]
    fn phase_outranks_length_outranks_tie_break() {
        let policy = RelationshipPolicy::new();
        let long_customer = policy.rank_key(Up, 9, 40);
        let short_peer = policy.rank_key(Peer, 2, 1);
        assert!(long_customer < short_peer);

        let short = policy.rank_key(Down, 3, 70);
        let long = policy.rank_key(Down, 4, 2);
        assert!(short < long);

        let low_hop = policy.rank_key(Down, 3, 11);
        let high_hop = policy.rank_key(Down, 3, 12);
        assert!(low_hop < high_hop);
    }

    #[test]
    fn highest_next_hop_reverses_only_the_final_key() {
        let policy = RelationshipPolicy::with_tie_break(TieBreak::HighestNextHop);
        assert!(policy.rank_key(Down, 3, 12) < policy.rank_key(Down, 3, 11));
        assert!(policy.rank_key(Up, 5, 1) < policy.rank_key(Peer, 2, 99));
    }
}
