use bgpinfer::propagation::{invariants, Announcement, AsPath, PropagationEngine, Rib};
use bgpinfer::shared::{AnnouncementError, PropagationPhase};
use bgpinfer::{ASGraph, Prefix, RelationshipRecord, RouteOutcome, ASN};

fn prefix() -> Prefix {
    "203.0.113.0/24".parse().unwrap()
}

fn hops(rib: &Rib, asn: ASN) -> Vec<ASN> {
    rib.get(asn).unwrap().path().hops().to_vec()
}

fn best_paths(rib: &Rib, asn: ASN) -> Vec<Vec<ASN>> {
    let mut paths: Vec<Vec<ASN>> = rib
        .get(asn)
        .unwrap()
        .best_paths()
        .map(|path| path.hops().to_vec())
        .collect();
    paths.sort();
    paths
}

/// See `engine_tests`: the long peer route at AS3 usually hides the short
/// provider route from AS8.
fn withdrawal_graph() -> ASGraph {
    ASGraph::build([
        RelationshipRecord::provider_to_customer(1, 3),
        RelationshipRecord::provider_to_customer(1, 4),
        RelationshipRecord::provider_to_customer(1, 10),
        RelationshipRecord::peer_to_peer(2, 3),
        RelationshipRecord::provider_to_customer(2, 5),
        RelationshipRecord::provider_to_customer(3, 8),
        RelationshipRecord::provider_to_customer(4, 6),
        RelationshipRecord::provider_to_customer(5, 7),
        RelationshipRecord::provider_to_customer(6, 8),
        RelationshipRecord::provider_to_customer(7, 9),
        RelationshipRecord::provider_to_customer(9, 10),
    ])
    .unwrap()
}

/// Fan of three transits under AS1, all providing AS5, peering AS6; a
/// second identical fan hangs under AS5.
fn fan_graph() -> ASGraph {
    ASGraph::build([
        RelationshipRecord::provider_to_customer(1, 2),
        RelationshipRecord::provider_to_customer(1, 3),
        RelationshipRecord::provider_to_customer(1, 4),
        RelationshipRecord::provider_to_customer(2, 5),
        RelationshipRecord::provider_to_customer(3, 5),
        RelationshipRecord::provider_to_customer(4, 5),
        RelationshipRecord::peer_to_peer(2, 6),
        RelationshipRecord::peer_to_peer(3, 6),
        RelationshipRecord::peer_to_peer(4, 6),
        RelationshipRecord::provider_to_customer(6, 7),
        RelationshipRecord::provider_to_customer(5, 8),
        RelationshipRecord::provider_to_customer(5, 9),
        RelationshipRecord::provider_to_customer(5, 10),
        RelationshipRecord::provider_to_customer(8, 11),
        RelationshipRecord::provider_to_customer(9, 11),
        RelationshipRecord::provider_to_customer(10, 11),
        RelationshipRecord::peer_to_peer(8, 12),
        RelationshipRecord::peer_to_peer(9, 12),
        RelationshipRecord::peer_to_peer(10, 12),
        RelationshipRecord::provider_to_customer(12, 13),
    ])
    .unwrap()
}

#[test]
fn test_poisoned_as_never_settles() {
    let graph = withdrawal_graph();
    let announcement = Announcement::new(prefix(), 10).with_poisoned([9]);
    let rib = PropagationEngine::new(&graph).infer(&announcement).unwrap();

    assert!(rib.get(9).is_none());
    assert!(matches!(rib.route_to(&graph, 9), RouteOutcome::NoRoute));
    for (_, entry) in rib.entries() {
        for path in entry.best_paths() {
            assert!(!path.contains(9));
        }
    }
}

#[test]
fn test_poisoning_reroutes_downstream_ases() {
    let graph = withdrawal_graph();

    // Unpoisoned, AS3 prefers the peer route through the 2-5-7-9 spur
    // and AS8 only hears the long way around.
    let rib = PropagationEngine::new(&graph)
        .infer(&Announcement::new(prefix(), 10))
        .unwrap();
    assert_eq!(hops(&rib, 3), vec![3, 2, 5, 7, 9, 10]);
    assert_eq!(hops(&rib, 8), vec![8, 6, 4, 1, 10]);

    // Poisoning AS9 kills the spur, so AS3 falls back to its provider
    // route and re-exports it, shortening AS8's path.
    let announcement = Announcement::new(prefix(), 10).with_poisoned([9]);
    let rib = PropagationEngine::new(&graph).infer(&announcement).unwrap();
    assert_eq!(hops(&rib, 3), vec![3, 1, 10]);
    assert_eq!(rib.get(3).unwrap().phase(), PropagationPhase::Down);
    assert_eq!(hops(&rib, 8), vec![8, 3, 1, 10]);
    for asn in [2, 5, 7, 9] {
        assert!(matches!(rib.route_to(&graph, asn), RouteOutcome::NoRoute));
    }
}

#[test]
fn test_poisoning_leaves_independent_routes_alone() {
    //  2 provides 1 and peers 3; 3 provides 4; 1 provides 4.
    let graph = ASGraph::build([
        RelationshipRecord::provider_to_customer(2, 1),
        RelationshipRecord::peer_to_peer(2, 3),
        RelationshipRecord::provider_to_customer(3, 4),
        RelationshipRecord::provider_to_customer(1, 4),
    ])
    .unwrap();

    let rib = PropagationEngine::new(&graph)
        .infer(&Announcement::new(prefix(), 1))
        .unwrap();
    assert_eq!(hops(&rib, 2), vec![2, 1]);
    assert_eq!(hops(&rib, 3), vec![3, 2, 1]);
    assert_eq!(hops(&rib, 4), vec![4, 1]);

    let rib = PropagationEngine::new(&graph)
        .infer(&Announcement::new(prefix(), 1).with_poisoned([3]))
        .unwrap();
    assert!(rib.get(3).is_none());
    assert_eq!(hops(&rib, 2), vec![2, 1]);
    assert_eq!(hops(&rib, 4), vec![4, 1]);
}

#[test]
fn test_poisoning_unknown_asn_is_harmless() {
    let graph = fan_graph();
    let plain = PropagationEngine::new(&graph)
        .infer(&Announcement::new(prefix(), 1))
        .unwrap();
    let poisoned = PropagationEngine::new(&graph)
        .infer(&Announcement::new(prefix(), 1).with_poisoned([64500]))
        .unwrap();
    assert_eq!(plain, poisoned);
}

#[test]
fn test_announcement_validation_errors() {
    let graph = fan_graph();
    let engine = PropagationEngine::new(&graph);

    let err = engine
        .infer(&Announcement::anycast(prefix(), []))
        .unwrap_err();
    assert!(matches!(err, AnnouncementError::NoOrigins));

    let err = engine
        .infer(&Announcement::new(prefix(), 64500))
        .unwrap_err();
    assert!(matches!(err, AnnouncementError::UnknownOrigin(64500)));

    let err = engine
        .infer(&Announcement::new(prefix(), 1).with_poisoned([1]))
        .unwrap_err();
    assert!(matches!(err, AnnouncementError::PoisonedOrigin(1)));

    // Scoping or prepending is only meaningful on an origin's own links.
    let err = engine
        .infer(&Announcement::new(prefix(), 1).with_export_scope(3, [1]))
        .unwrap_err();
    assert!(matches!(err, AnnouncementError::NotAnOrigin(3)));

    let err = engine
        .infer(&Announcement::new(prefix(), 1).with_export_scope(1, [13]))
        .unwrap_err();
    assert!(matches!(
        err,
        AnnouncementError::NotANeighbor {
            origin: 1,
            neighbor: 13
        }
    ));

    let err = engine
        .infer(&Announcement::new(prefix(), 1).with_prepend(1, 13, 2))
        .unwrap_err();
    assert!(matches!(
        err,
        AnnouncementError::NotANeighbor {
            origin: 1,
            neighbor: 13
        }
    ));
}

#[test]
fn test_export_scope_limits_origin_neighbors() {
    let graph = fan_graph();
    let announcement = Announcement::new(prefix(), 1).with_export_scope(1, [2]);
    let rib = PropagationEngine::new(&graph)
        .with_alternate_paths(true)
        .infer(&announcement)
        .unwrap();

    // Only the AS2 branch hears anything.
    assert_eq!(best_paths(&rib, 2), vec![vec![2, 1]]);
    assert_eq!(best_paths(&rib, 5), vec![vec![5, 2, 1]]);
    assert_eq!(
        best_paths(&rib, 11),
        vec![
            vec![11, 8, 5, 2, 1],
            vec![11, 9, 5, 2, 1],
            vec![11, 10, 5, 2, 1],
        ]
    );
    for asn in [3, 4, 6, 7, 12, 13] {
        assert!(matches!(rib.route_to(&graph, asn), RouteOutcome::NoRoute));
    }
}

#[test]
fn test_export_scope_applies_per_origin() {
    let graph = fan_graph();
    let announcement = Announcement::anycast(prefix(), [2, 4]).with_export_scope(2, [1]);
    let rib = PropagationEngine::new(&graph)
        .with_alternate_paths(true)
        .infer(&announcement)
        .unwrap();

    // AS2 only talks to AS1 now; AS4 still exports everywhere.
    assert_eq!(best_paths(&rib, 1), vec![vec![1, 2], vec![1, 4]]);
    assert_eq!(best_paths(&rib, 5), vec![vec![5, 4]]);
    assert_eq!(best_paths(&rib, 6), vec![vec![6, 4]]);
    assert_eq!(best_paths(&rib, 7), vec![vec![7, 6, 4]]);
}

#[test]
fn test_prepend_lengthens_one_export() {
    // AS4 reaches the origin through customers 2 and 3, normally a tie.
    let graph = ASGraph::build([
        RelationshipRecord::provider_to_customer(2, 1),
        RelationshipRecord::provider_to_customer(3, 1),
        RelationshipRecord::provider_to_customer(4, 2),
        RelationshipRecord::provider_to_customer(4, 3),
    ])
    .unwrap();
    let announcement = Announcement::new(prefix(), 1).with_prepend(1, 2, 1);
    let rib = PropagationEngine::new(&graph).infer(&announcement).unwrap();

    let via_2 = rib.get(2).unwrap().path();
    assert_eq!(via_2.hops(), &[2, 1]);
    assert_eq!(via_2.prepend(), 1);
    assert_eq!(via_2.len(), 2);
    assert_eq!(via_2.effective_len(), 3);

    // The surcharge rides along on re-export, so AS4 settles via AS3.
    assert_eq!(hops(&rib, 4), vec![4, 3, 1]);
}

/// AS1 and AS7 both originate the prefix; 2 and 3 peer with AS1, 4 and 5
/// provide it, and 6, 7, 8, 9 hang around the edges. ASes 2 and 4 only
/// accept routes that really lead to AS1.
fn origin_filter_graph() -> ASGraph {
    ASGraph::build([
        RelationshipRecord::peer_to_peer(1, 2),
        RelationshipRecord::peer_to_peer(1, 3),
        RelationshipRecord::customer_to_provider(1, 4),
        RelationshipRecord::customer_to_provider(1, 5),
        RelationshipRecord::customer_to_provider(6, 2),
        RelationshipRecord::customer_to_provider(6, 3),
        RelationshipRecord::customer_to_provider(6, 4),
        RelationshipRecord::customer_to_provider(6, 5),
        RelationshipRecord::customer_to_provider(7, 2),
        RelationshipRecord::customer_to_provider(7, 3),
        RelationshipRecord::customer_to_provider(7, 4),
        RelationshipRecord::customer_to_provider(7, 5),
        RelationshipRecord::peer_to_peer(8, 2),
        RelationshipRecord::peer_to_peer(8, 3),
        RelationshipRecord::peer_to_peer(8, 4),
        RelationshipRecord::peer_to_peer(8, 5),
        RelationshipRecord::provider_to_customer(9, 2),
        RelationshipRecord::provider_to_customer(9, 3),
        RelationshipRecord::provider_to_customer(9, 4),
        RelationshipRecord::provider_to_customer(9, 5),
    ])
    .unwrap()
}

#[test]
fn test_import_filters_shape_a_hijack() {
    let graph = origin_filter_graph();
    let announcement = Announcement::anycast(prefix(), [1, 7]);
    let rib = PropagationEngine::new(&graph)
        .with_alternate_paths(true)
        .with_import_filter(2, |_, path| path.origin() == 1)
        .with_import_filter(4, |_, path| path.origin() == 1)
        .infer(&announcement)
        .unwrap();

    // AS2 drops the customer route from the bogus origin and keeps the
    // peer route to the real one; AS4 keeps its customer route to AS1.
    assert_eq!(best_paths(&rib, 2), vec![vec![2, 1]]);
    assert_eq!(rib.get(2).unwrap().phase(), PropagationPhase::Peer);
    assert_eq!(best_paths(&rib, 4), vec![vec![4, 1]]);
    assert_eq!(rib.get(4).unwrap().phase(), PropagationPhase::Up);

    // Unfiltered ASes still believe the bogus origin.
    assert_eq!(best_paths(&rib, 3), vec![vec![3, 7]]);
    assert_eq!(best_paths(&rib, 5), vec![vec![5, 1], vec![5, 7]]);

    assert_eq!(
        best_paths(&rib, 6),
        vec![
            vec![6, 2, 1],
            vec![6, 3, 7],
            vec![6, 4, 1],
            vec![6, 5, 1],
            vec![6, 5, 7],
        ]
    );
    assert_eq!(rib.get(6).unwrap().phase(), PropagationPhase::Down);

    // AS2 holds a peer route, so only 3, 4 and 5 export across to AS8.
    assert_eq!(
        best_paths(&rib, 8),
        vec![
            vec![8, 3, 7],
            vec![8, 4, 1],
            vec![8, 5, 1],
            vec![8, 5, 7],
        ]
    );
    assert_eq!(rib.get(8).unwrap().phase(), PropagationPhase::Peer);

    assert_eq!(
        best_paths(&rib, 9),
        vec![
            vec![9, 3, 7],
            vec![9, 4, 1],
            vec![9, 5, 1],
            vec![9, 5, 7],
        ]
    );
    assert_eq!(rib.get(9).unwrap().phase(), PropagationPhase::Up);
}

#[test]
fn test_rejected_primary_falls_back_to_next_candidate() {
    let graph = origin_filter_graph();
    let announcement = Announcement::anycast(prefix(), [1, 7]);
    let rib = PropagationEngine::new(&graph)
        .with_import_filter(2, |_, path| path.origin() == 1)
        .infer(&announcement)
        .unwrap();

    // Without the filter AS2 would take [2, 7] from its customer. The
    // filter leaves AS2 unsettled until the peer route shows up.
    assert_eq!(hops(&rib, 2), vec![2, 1]);
    assert_eq!(rib.get(2).unwrap().phase(), PropagationPhase::Peer);
}

#[test]
fn test_settled_ribs_satisfy_route_invariants() {
    let graph = withdrawal_graph();
    let announcement = Announcement::new(prefix(), 10).with_poisoned([9]);
    let rib = PropagationEngine::new(&graph)
        .with_alternate_paths(true)
        .infer(&announcement)
        .unwrap();

    invariants::check_rib(&graph, &announcement, &rib).unwrap();
}

#[test]
fn test_trace_phase_follows_the_export_rules() {
    let graph = withdrawal_graph();

    assert_eq!(invariants::trace_phase(&graph, &[10]), Some(PropagationPhase::Up));
    assert_eq!(
        invariants::trace_phase(&graph, &[1, 10]),
        Some(PropagationPhase::Up)
    );
    assert_eq!(
        invariants::trace_phase(&graph, &[3, 2, 5, 7, 9, 10]),
        Some(PropagationPhase::Peer)
    );
    assert_eq!(
        invariants::trace_phase(&graph, &[8, 6, 4, 1, 10]),
        Some(PropagationPhase::Down)
    );

    // Climbing back out of a provider route is not a legal crossing.
    assert_eq!(invariants::trace_phase(&graph, &[2, 3, 1, 10]), None);
    // Edges absent from the graph fail the trace outright.
    assert_eq!(invariants::trace_phase(&graph, &[5, 9, 10]), None);
}

#[test]
fn test_path_predicates() {
    let graph = withdrawal_graph();

    let valley = AsPath::new(vec![2, 3, 1, 10], PropagationPhase::Peer);
    assert!(!invariants::is_valley_free(&graph, &valley));
    let legal = AsPath::new(vec![8, 6, 4, 1, 10], PropagationPhase::Down);
    assert!(invariants::is_valley_free(&graph, &legal));

    let looped = AsPath::new(vec![8, 6, 8], PropagationPhase::Down);
    assert!(!invariants::is_loop_free(&looped));
    assert!(invariants::is_loop_free(&legal));

    let announcement = Announcement::new(prefix(), 10).with_poisoned([4]);
    assert!(!invariants::respects_poisoning(&legal, &announcement));
    let clean = AsPath::new(vec![1, 10], PropagationPhase::Up);
    assert!(invariants::respects_poisoning(&clean, &announcement));
}
