use crate::controller::{ControllerRequest, decode_request, encode_state};
use crate::error::RouterError;
use crate::net::{Flow, Location, NodeId, PathHint, Topology, TrafficCounter};
use crate::routing::{Decision, ProbabilisticTable, RoutingPolicy, StrategyKind};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const RING4: &str = "0,1,0,1,1,0,1,0,0,1,0,1,1,0,1,0";

fn flow(src: usize, dst: usize) -> Flow {
    Flow {
        src: NodeId(src),
        dst: NodeId(dst),
        step: 0,
        id: 0,
        size_bytes: 1_000,
    }
}

#[test]
fn initial_table_must_follow_the_topology() {
    let line3 = Topology::load("0,1,0,1,0,1,0,1,0", 3).expect("load");
    let table = ProbabilisticTable::parse("0,0,100,0,0,100,0,100,0", 3).expect("table");
    let err = table.check_links(&line3).expect_err("0->2 is not a link");
    assert!(matches!(err, RouterError::Config(_)), "{err:?}");

    let err = RoutingPolicy::build(
        StrategyKind::Probabilistic,
        &line3,
        Some("0,0,100,0,0,100,0,100,0"),
    )
    .expect_err("build rejects it too");
    assert!(matches!(err, RouterError::Config(_)), "{err:?}");

    let policy = RoutingPolicy::build(
        StrategyKind::Probabilistic,
        &line3,
        Some("0,100,0,50,0,50,0,100,0"),
    );
    assert!(policy.is_ok());
}

#[test]
fn direct_weight_routes_straight_to_destination() {
    let topo = Topology::load("0,1,1,0", 2).expect("load");
    let table = ProbabilisticTable::parse("[0,1,0,0]", 2).expect("table");
    let mut rng = ChaCha8Rng::seed_from_u64(0);

    for _ in 0..16 {
        assert_eq!(
            table.next_hop(&topo, NodeId(0), NodeId(1), &mut rng),
            Some(NodeId(1))
        );
    }
    assert_eq!(topo.gate_index(NodeId(0), NodeId(1)), Some(1));
}

#[test]
fn decide_counts_traffic_on_the_chosen_link() {
    let topo = Topology::load("0,1,1,0", 2).expect("load");
    let policy =
        RoutingPolicy::build(StrategyKind::Probabilistic, &topo, Some("0,1,0,0")).expect("build");
    let mut traffic = TrafficCounter::new(2);
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let mut hint = PathHint::empty();
    let f = flow(0, 1);

    let at_host = policy
        .decide(&topo, &mut traffic, &f, &mut hint, Location::Host(NodeId(0)), &mut rng)
        .expect("host hop");
    assert_eq!(at_host, Decision::Router { next: NodeId(0), gate: 1 });
    assert_eq!(traffic.total_bits(), 0);

    let at_router = policy
        .decide(&topo, &mut traffic, &f, &mut hint, Location::Router(NodeId(0)), &mut rng)
        .expect("router hop");
    assert_eq!(at_router, Decision::Router { next: NodeId(1), gate: 1 });
    assert_eq!(traffic.bits(NodeId(0), NodeId(1)), 8_000);

    let at_dst = policy
        .decide(&topo, &mut traffic, &f, &mut hint, Location::Router(NodeId(1)), &mut rng)
        .expect("dst hop");
    assert_eq!(at_dst, Decision::Host { host: NodeId(1), gate: 2 });
    assert_eq!(traffic.total_bits(), 8_000);
}

#[test]
fn roulette_only_picks_positive_weight_neighbors() {
    let topo = Topology::load(RING4, 4).expect("load");
    // 0 -> 2 没有直达权重，只有邻居 3 有正权重
    let mut raw = vec!["0"; 16];
    raw[3] = "100";
    let table = ProbabilisticTable::parse(&raw.join(","), 4).expect("table");
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    for _ in 0..32 {
        assert_eq!(
            table.next_hop(&topo, NodeId(0), NodeId(2), &mut rng),
            Some(NodeId(3))
        );
    }
}

#[test]
fn all_zero_row_falls_back_to_lowest_neighbor() {
    let topo = Topology::load(RING4, 4).expect("load");
    let table = ProbabilisticTable::parse(&vec!["0"; 16].join(","), 4).expect("table");
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    assert_eq!(
        table.next_hop(&topo, NodeId(2), NodeId(0), &mut rng),
        Some(NodeId(1))
    );
}

#[test]
fn renormalized_rows_sum_to_one_hundred() {
    let topo = Topology::load(RING4, 4).expect("load");
    let edge_weights = [1.0, 3.0, 2.0, 2.0, 0.5, 1.5, 4.0, 1.0];
    let table = ProbabilisticTable::renormalized(&topo, &edge_weights).expect("renormalize");

    for row in 0..4 {
        let sum: f64 = (0..4).map(|c| table.weight(NodeId(row), NodeId(c))).sum();
        assert!((sum - 100.0).abs() < 1e-9, "row {row} sums to {sum}");
    }
    assert!((table.weight(NodeId(0), NodeId(1)) - 25.0).abs() < 1e-9);
    assert!((table.weight(NodeId(0), NodeId(3)) - 75.0).abs() < 1e-9);
    assert_eq!(table.weight(NodeId(0), NodeId(2)), 0.0);
}

#[test]
fn zero_sum_row_stays_zero() {
    let topo = Topology::load(RING4, 4).expect("load");
    let edge_weights = [0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0];
    let table = ProbabilisticTable::renormalized(&topo, &edge_weights).expect("renormalize");
    let row0: f64 = (0..4).map(|c| table.weight(NodeId(0), NodeId(c))).sum();
    assert_eq!(row0, 0.0);
}

#[test]
fn state_report_then_edge_weight_reply_updates_policy() {
    let topo = Topology::load(RING4, 4).expect("load");
    let zeros = vec!["0"; 16].join(",");
    let mut policy =
        RoutingPolicy::build(StrategyKind::Probabilistic, &topo, Some(zeros.as_str()))
            .expect("build");

    let mut traffic = TrafficCounter::new(4);
    traffic.add_bytes(NodeId(0), NodeId(1), 125_000);
    let msg = encode_state(3, &traffic.throughput_mbps(1.0));
    match decode_request(&msg).expect("decode") {
        ControllerRequest::State { step, throughput_mbps } => {
            assert_eq!(step, 3);
            assert_eq!(throughput_mbps.len(), 16);
            assert!((throughput_mbps[1] - 1.0).abs() < 1e-9);
        }
        other => panic!("unexpected {other:?}"),
    }

    policy
        .apply_update(&topo, "[1, 1, 2, 6, 3, 1, 5, 5]")
        .expect("apply");
    let RoutingPolicy::Probabilistic(table) = &policy else {
        panic!("strategy changed");
    };
    for row in 0..4 {
        let sum: f64 = (0..4).map(|c| table.weight(NodeId(row), NodeId(c))).sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }
    assert!((table.weight(NodeId(1), NodeId(2)) - 75.0).abs() < 1e-9);
}

#[test]
fn malformed_reply_keeps_previous_table() {
    let topo = Topology::load("0,1,1,0", 2).expect("load");
    let mut policy =
        RoutingPolicy::build(StrategyKind::Probabilistic, &topo, Some("0,1,1,0")).expect("build");

    let too_short = policy.apply_update(&topo, "1").expect_err("length mismatch");
    assert!(matches!(too_short, RouterError::MalformedPolicyUpdate(_)));
    let junk = policy.apply_update(&topo, "1,abc").expect_err("junk");
    assert!(matches!(junk, RouterError::MalformedPolicyUpdate(_)));

    let RoutingPolicy::Probabilistic(table) = &policy else {
        panic!("strategy changed");
    };
    assert_eq!(table.weight(NodeId(0), NodeId(1)), 1.0);
}
