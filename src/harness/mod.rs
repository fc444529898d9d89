//! 演示框架
//!
//! 用事件驱动仿真器驱动路由会话：每台主机周期性向其它主机发包，
//! 逐跳调用路由决策，送达时上报时延，step 计时到期时上报吞吐。

mod app;
mod ecmp;
mod hop;
mod world;

pub use app::{SendTick, StepOvertime};
pub use ecmp::EcmpTable;
pub use hop::{HopArrival, MAX_HOPS};
pub use world::{HarnessStats, HostApp, RlWorld};

use tracing::info;

use crate::config::SessionConfig;
use crate::controller::{ControllerChannel, StaticController};
use crate::epoch::StepReward;
use crate::error::Result;
use crate::net::{NodeId, Topology};
use crate::routing::{ProbabilisticTable, StrategyKind};
use crate::sim::{SimTime, Simulator};

/// 一次运行的结果
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub stats: HarnessStats,
    pub state_reports: u64,
    pub closed_steps: u64,
    pub rewards: Vec<StepReward>,
    pub final_time: SimTime,
}

/// 运行演示仿真，直到全部主机完成 `total_steps` 或到达 `until`。
#[tracing::instrument(skip(cfg, channel))]
pub fn run(
    cfg: &SessionConfig,
    channel: Box<dyn ControllerChannel>,
    until: Option<SimTime>,
) -> Result<RunSummary> {
    let mut world = RlWorld::new(cfg, channel)?;
    let mut sim = Simulator::default();

    for i in 0..cfg.node_count {
        sim.schedule(SimTime::ZERO, SendTick { host: NodeId(i) });
    }

    match until {
        Some(t) => sim.run_until(t, &mut world),
        None => sim.run(&mut world),
    }

    if let Some(err) = world.take_error() {
        return Err(err);
    }

    let summary = RunSummary {
        stats: world.stats,
        state_reports: world.session.state_reports(),
        closed_steps: world.session.coordinator().closed_steps(),
        rewards: world.session.rewards().to_vec(),
        final_time: sim.now(),
    };
    info!(
        sent = summary.stats.sent_pkts,
        delivered = summary.stats.delivered_pkts,
        dropped = summary.stats.dropped_pkts,
        closed_steps = summary.closed_steps,
        "📊 演示运行结束"
    );
    Ok(summary)
}

/// 离线运行用的固定应答控制器：每次状态上报都把初始表原样发回。
///
/// 概率策略发回按链路编号排列的初始权重，路径类策略发回初始路径表。
pub fn offline_controller(cfg: &SessionConfig) -> Result<StaticController> {
    let reply = match cfg.strategy {
        StrategyKind::Convention => String::new(),
        StrategyKind::Probabilistic => {
            let topo = Topology::load(cfg.adjacency()?, cfg.node_count)?;
            let init = cfg.init_table.as_deref().unwrap_or_default();
            let table = ProbabilisticTable::parse(init, cfg.node_count)?;
            topo.links_by_id()
                .into_iter()
                .map(|(from, to)| table.weight(from, to).to_string())
                .collect::<Vec<_>>()
                .join(",")
        }
        StrategyKind::Singlepath | StrategyKind::Multipath => {
            cfg.init_table.clone().unwrap_or_default()
        }
    };
    Ok(StaticController::new(reply))
}
