use super::Recorder;
use crate::config::SessionConfig;
use crate::controller::{ControllerRequest, StaticController, decode_request};
use crate::epoch::EntityScope;
use crate::error::RouterError;
use crate::net::{Flow, Location, NodeId, PathHint};
use crate::routing::{Decision, RoutingPolicy};
use crate::session::Session;
use crate::sim::SimTime;

fn ms(v: u64) -> SimTime {
    SimTime::from_millis(v)
}

fn line3_singlepath(mode: &str) -> SessionConfig {
    SessionConfig::from_json(&format!(
        r#"{{
            "node_count": 3,
            "strategy": "singlepath",
            "return_mode": "{mode}",
            "topology": "0,1,0,1,0,1,0,1,0",
            "init_table": "0,2,0.1.2;2,0,2.1.0;0,1,0.1;1,0,1.0;1,2,1.2;2,1,2.1",
            "over_time_ms": 50
        }}"#
    ))
    .expect("config")
}

/// 把一个包从源主机一路转发到目的主机，返回经过的位置
fn walk(session: &mut Session, flow: &Flow) -> Vec<Location> {
    let mut hint = PathHint::empty();
    let mut at = Location::Host(flow.src);
    let mut seen = vec![at];
    for _ in 0..16 {
        match session.decide(flow, &mut hint, at).expect("decide") {
            Decision::Router { next, .. } => at = Location::Router(next),
            Decision::Host { host, .. } => {
                seen.push(Location::Host(host));
                return seen;
            }
            Decision::Delegated => panic!("delegated"),
        }
        seen.push(at);
    }
    panic!("packet looped: {seen:?}");
}

#[test]
fn send_ids_are_monotonic_for_the_whole_session() {
    let cfg = line3_singlepath("global");
    let mut s = Session::new(&cfg, Box::new(StaticController::default())).expect("session");
    let ids: Vec<u64> = (0..5).map(|_| s.next_send_id()).collect();
    assert_eq!(ids, vec![0, 1, 2, 3, 4]);
}

#[test]
fn one_epoch_round_trip_with_static_controller() {
    let cfg = line3_singlepath("global");
    let (ch, log) = Recorder::new("0,2,0.1.2;2,0,2.1.0");
    let mut s = Session::new(&cfg, Box::new(ch)).expect("session");

    let flows: Vec<Flow> = [(0, 2), (2, 0)]
        .into_iter()
        .map(|(src, dst)| Flow {
            src: NodeId(src),
            dst: NodeId(dst),
            step: 0,
            id: s.next_send_id(),
            size_bytes: 125,
        })
        .collect();
    for f in &flows {
        let path = walk(&mut s, f);
        assert_eq!(path.len(), 5, "{path:?}");
    }
    // 两个包各经过两条路由器间链路
    assert_eq!(s.traffic().total_bits(), 4 * 1_000);

    s.report_packets_sent(0, 2);
    for node in 0..3 {
        s.report_node_step_end(0, ms(100));
        let sent = s.report_step_throughput(0, ms(100)).expect("throughput");
        assert_eq!(sent, node == 2);
    }
    assert_eq!(s.state_reports(), 1);
    assert_eq!(s.traffic().total_bits(), 0);
    let RoutingPolicy::SinglePath(table) = s.policy() else {
        panic!("strategy changed");
    };
    assert_eq!(table.len(), 2);

    s.report_delay_sample(&flows[0], ms(3), ms(103)).expect("sample");
    assert!(s.rewards().is_empty());
    s.report_delay_sample(&flows[1], ms(5), ms(105)).expect("sample");
    assert_eq!(s.rewards().len(), 1);
    assert!((s.rewards()[0].avg_delay - 0.004).abs() < 1e-12);

    let log = log.lock().expect("log lock");
    assert_eq!(log.len(), 2);
    match decode_request(&log[0]).expect("state") {
        ControllerRequest::State { step, throughput_mbps } => {
            assert_eq!(step, 0);
            // 1000 bit / 1e6 / 0.1 s
            assert!((throughput_mbps[1] - 0.01).abs() < 1e-9);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(log[1], "r@@0@@0.004000,0.000000");
}

#[test]
fn distributed_path_mode_reports_every_ordered_pair() {
    let cfg = line3_singlepath("distributed");
    let (ch, log) = Recorder::new("");
    let mut s = Session::new(&cfg, Box::new(ch)).expect("session");
    assert_eq!(s.coordinator().scope(), EntityScope::PerPath);

    let f = Flow {
        src: NodeId(0),
        dst: NodeId(2),
        step: 0,
        id: s.next_send_id(),
        size_bytes: 10,
    };
    walk(&mut s, &f);
    s.report_packets_sent(0, 1);
    for _ in 0..3 {
        s.report_node_step_end(0, ms(10));
    }
    s.report_delay_sample(&f, ms(2), ms(12)).expect("sample");

    let rewards = s.rewards();
    assert_eq!(rewards.len(), 1);
    assert_eq!(rewards[0].entities.len(), 9);
    assert!((rewards[0].entities[2].0 - 0.002).abs() < 1e-12);
    let log = log.lock().expect("log lock");
    let groups = log[0].split('/').count();
    assert_eq!(groups, 10);
}

#[test]
fn probabilistic_distributed_mode_counts_router_passes() {
    let cfg = SessionConfig::from_json(
        r#"{
            "node_count": 2,
            "strategy": "probabilistic",
            "return_mode": "distributed",
            "init_table": "0,100,100,0"
        }"#,
    )
    .expect("config");
    let mut s = Session::new(&cfg, Box::new(StaticController::new("1,1"))).expect("session");
    assert_eq!(s.coordinator().scope(), EntityScope::PerRouter);

    let f = Flow {
        src: NodeId(0),
        dst: NodeId(1),
        step: 0,
        id: s.next_send_id(),
        size_bytes: 10,
    };
    let path = walk(&mut s, &f);
    assert_eq!(
        path,
        vec![
            Location::Host(NodeId(0)),
            Location::Router(NodeId(0)),
            Location::Router(NodeId(1)),
            Location::Host(NodeId(1)),
        ]
    );
    s.report_packets_sent(0, 1);
    s.report_node_step_end(0, ms(1));
    s.report_node_step_end(0, ms(1));
    s.report_delay_sample(&f, ms(1), ms(2)).expect("sample");
    assert_eq!(s.rewards()[0].entities, vec![(0.001, 0.0), (0.001, 0.0)]);
}

#[test]
fn bad_controller_reply_is_fatal() {
    let cfg = line3_singlepath("global");
    let mut s = Session::new(&cfg, Box::new(StaticController::new("0,2"))).expect("session");
    for _ in 0..2 {
        assert!(!s.report_step_throughput(0, ms(100)).expect("barrier"));
    }
    let err = s.report_step_throughput(0, ms(100)).expect_err("bad reply");
    assert!(matches!(err, RouterError::MalformedPolicyUpdate(_)));
}

#[test]
fn force_close_sends_reward() {
    let cfg = line3_singlepath("global");
    let (ch, log) = Recorder::new("");
    let mut s = Session::new(&cfg, Box::new(ch)).expect("session");
    s.report_packets_sent(3, 4);
    s.force_close(3).expect("close");
    s.force_close(3).expect("close again");
    assert_eq!(s.rewards().len(), 1);
    assert_eq!(log.lock().expect("log lock").as_slice(), ["r@@3@@0.000000,1.000000"]);
}

#[test]
fn overtime_check_closes_lossy_step() {
    let cfg = line3_singlepath("global");
    let mut s = Session::new(&cfg, Box::new(StaticController::default())).expect("session");
    s.report_packets_sent(0, 2);
    for _ in 0..3 {
        s.report_node_step_end(0, ms(100));
    }
    s.check_step_timeout(0, ms(149)).expect("check");
    assert!(s.rewards().is_empty());
    s.check_step_timeout(0, ms(150)).expect("check");
    assert_eq!(s.rewards()[0].loss_rate, 1.0);
}
