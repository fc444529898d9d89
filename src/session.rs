//! 路由会话
//!
//! 显式构造的会话对象，持有拓扑、流量计数、路由策略、epoch 协调器和控制器通道，
//! 并向仿真框架暴露全部入口。

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::controller::{ControllerChannel, encode_reward, encode_state};
use crate::epoch::{EntityScope, EpochCoordinator, ReturnMode, StepReward};
use crate::error::Result;
use crate::net::{Flow, Location, NodeId, PathHint, Topology, TrafficCounter};
use crate::routing::{Decision, RoutingPolicy, StrategyKind};
use crate::sim::SimTime;

pub struct Session {
    topology: Topology,
    policy: RoutingPolicy,
    traffic: TrafficCounter,
    coordinator: EpochCoordinator,
    channel: Box<dyn ControllerChannel>,
    rng: ChaCha8Rng,
    next_send_id: u64,
    state_reports: u64,
    rewards: Vec<StepReward>,
}

impl Session {
    pub fn new(cfg: &SessionConfig, channel: Box<dyn ControllerChannel>) -> Result<Self> {
        cfg.validate()?;
        let topology = Topology::load(cfg.adjacency()?, cfg.node_count)?;
        let policy = RoutingPolicy::build(cfg.strategy, &topology, cfg.init_table.as_deref())?;
        let scope = entity_scope(cfg.return_mode, cfg.strategy);

        info!(
            node_count = cfg.node_count,
            directed_links = topology.directed_link_count(),
            strategy = ?cfg.strategy,
            return_mode = ?cfg.return_mode,
            "🧭 路由会话已建立"
        );

        Ok(Self {
            traffic: TrafficCounter::new(cfg.node_count),
            coordinator: EpochCoordinator::new(cfg.node_count, cfg.over_time(), scope),
            topology,
            policy,
            channel,
            rng: ChaCha8Rng::seed_from_u64(cfg.seed),
            next_send_id: 0,
            state_reports: 0,
            rewards: Vec::new(),
        })
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn policy(&self) -> &RoutingPolicy {
        &self.policy
    }

    pub fn traffic(&self) -> &TrafficCounter {
        &self.traffic
    }

    pub fn coordinator(&self) -> &EpochCoordinator {
        &self.coordinator
    }

    /// 已发给控制器的奖励（按关闭顺序）
    pub fn rewards(&self) -> &[StepReward] {
        &self.rewards
    }

    pub fn state_reports(&self) -> u64 {
        self.state_reports
    }

    /// 会话内单调递增的发送编号（从不重置）
    pub fn next_send_id(&mut self) -> u64 {
        let id = self.next_send_id;
        self.next_send_id = self.next_send_id.wrapping_add(1);
        id
    }

    /// 每个包每一跳调用一次。
    #[tracing::instrument(skip_all, fields(pkt_id = flow.id, step = flow.step, at = %at))]
    pub fn decide(&mut self, flow: &Flow, hint: &mut PathHint, at: Location) -> Result<Decision> {
        let decision = self.policy.decide(
            &self.topology,
            &mut self.traffic,
            flow,
            hint,
            at,
            &mut self.rng,
        )?;

        match at {
            Location::Host(_) if self.policy.kind().uses_paths() => {
                self.coordinator.record_path_sent(flow.step, flow.src, flow.dst);
            }
            Location::Router(node) => {
                self.coordinator.record_router_pass(flow.step, node, flow.id);
            }
            Location::Host(_) => {}
        }

        Ok(decision)
    }

    /// 常规策略下由外部路由选出的链路，由框架回报以计入吞吐。
    pub fn record_link_traffic(&mut self, from: NodeId, to: NodeId, bytes: u32) {
        self.traffic.add_bytes(from, to, bytes);
    }

    pub fn report_packets_sent(&mut self, step: u64, count: u64) {
        self.coordinator.report_packets_sent(step, count);
    }

    pub fn report_node_step_end(&mut self, step: u64, time: SimTime) {
        self.coordinator.report_node_step_end(step, time);
    }

    /// 节点到达吞吐上报时刻；最后一个节点到达时与控制器交换状态与新策略。
    ///
    /// 返回本次调用是否发出了状态上报。
    #[tracing::instrument(skip(self))]
    pub fn report_step_throughput(&mut self, step: u64, elapsed: SimTime) -> Result<bool> {
        if !self.coordinator.report_step_throughput(step) {
            return Ok(false);
        }

        let throughput = self.traffic.throughput_mbps(elapsed.as_secs_f64());
        self.traffic.clear();
        let msg = encode_state(step, &throughput);
        debug!(msg = %msg, "📤 状态上报");

        let reply = self.channel.request(&msg)?;
        self.policy.apply_update(&self.topology, &reply)?;
        self.state_reports += 1;
        info!(step, reply_len = reply.len(), "🔄 路由策略已更新");
        Ok(true)
    }

    pub fn report_delay_sample(&mut self, flow: &Flow, delay: SimTime, now: SimTime) -> Result<()> {
        let closed = self
            .coordinator
            .report_delay_sample(flow, delay.as_secs_f64(), now);
        self.send_rewards(closed)
    }

    pub fn check_step_timeout(&mut self, step: u64, now: SimTime) -> Result<()> {
        let closed = self.coordinator.check_step_timeout(step, now);
        self.send_rewards(closed)
    }

    /// 即使并非所有节点都结束，也强制关闭 `step`。
    pub fn force_close(&mut self, step: u64) -> Result<()> {
        let closed = self.coordinator.force_close(step).into_iter().collect();
        self.send_rewards(closed)
    }

    fn send_rewards(&mut self, closed: Vec<StepReward>) -> Result<()> {
        for reward in closed {
            let msg = encode_reward(&reward);
            debug!(msg = %msg, "📤 奖励上报");
            // 应答只是确认，内容忽略
            self.channel.request(&msg)?;
            self.rewards.push(reward);
        }
        Ok(())
    }
}

fn entity_scope(mode: ReturnMode, strategy: StrategyKind) -> EntityScope {
    match mode {
        ReturnMode::Global => EntityScope::None,
        ReturnMode::Distributed if strategy.uses_paths() => EntityScope::PerPath,
        ReturnMode::Distributed => EntityScope::PerRouter,
    }
}
