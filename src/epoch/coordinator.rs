//! Epoch 协调器
//!
//! 每个 step 的状态机 `Open -> AllReported -> Closed`：
//! - 所有节点都调用 `report_node_step_end` 后进入 `AllReported`，记录 `close_time`；
//! - 收到的时延样本数等于发送包数，或 `now - close_time >= over_time` 时关闭；
//! - 关闭是幂等的，同一个 step 只会产出一次 `StepReward`。

use std::collections::BTreeMap;

use tracing::{debug, info, trace};

use super::record::{StepPhase, StepRecord};
use super::reward::{EntityScope, StepReward, aggregate};
use crate::net::{Flow, NodeId};
use crate::sim::SimTime;

#[derive(Debug)]
pub struct EpochCoordinator {
    node_count: usize,
    /// `None` 表示永不超时
    over_time: Option<SimTime>,
    scope: EntityScope,
    steps: BTreeMap<u64, StepRecord>,
    closed_steps: u64,
}

impl EpochCoordinator {
    pub fn new(node_count: usize, over_time: Option<SimTime>, scope: EntityScope) -> Self {
        Self {
            node_count,
            over_time,
            scope,
            steps: BTreeMap::new(),
            closed_steps: 0,
        }
    }

    pub fn scope(&self) -> EntityScope {
        self.scope
    }

    fn record_mut(&mut self, step: u64) -> &mut StepRecord {
        self.steps.entry(step).or_default()
    }

    pub fn record(&self, step: u64) -> Option<&StepRecord> {
        self.steps.get(&step)
    }

    pub fn phase(&self, step: u64) -> StepPhase {
        self.steps
            .get(&step)
            .map(StepRecord::phase)
            .unwrap_or(StepPhase::Open)
    }

    pub fn is_closed(&self, step: u64) -> bool {
        self.phase(step) == StepPhase::Closed
    }

    pub fn closed_steps(&self) -> u64 {
        self.closed_steps
    }

    /// 某个节点宣告自己结束了 `step`；第 `node_count` 个宣告时记录关闭时间。
    pub fn report_node_step_end(&mut self, step: u64, time: SimTime) {
        let node_count = self.node_count;
        let rec = self.record_mut(step);
        rec.reported_nodes += 1;
        trace!(step, reported = rec.reported_nodes, node_count, "节点结束 step");
        if rec.reported_nodes == node_count {
            rec.all_reported = true;
            rec.close_time = time;
            info!(step, close_time = ?time, "🏁 所有节点已结束 step");
        }
    }

    pub fn report_packets_sent(&mut self, step: u64, count: u64) {
        let rec = self.record_mut(step);
        rec.packets_sent = rec.packets_sent.saturating_add(count);
    }

    /// 吞吐上报屏障：第 `node_count` 个节点到达时返回 `true`（只返回一次）。
    pub fn report_step_throughput(&mut self, step: u64) -> bool {
        let node_count = self.node_count;
        let rec = self.record_mut(step);
        rec.throughput_reports += 1;
        rec.throughput_reports == node_count
    }

    /// 路径类策略：流在源主机发出时计入 `(src, dst)` 的发送数
    pub fn record_path_sent(&mut self, step: u64, src: NodeId, dst: NodeId) {
        if self.scope != EntityScope::PerPath {
            return;
        }
        let rec = self.record_mut(step);
        *rec.path_sent.entry((src, dst)).or_insert(0) += 1;
    }

    /// 逐跳策略：记录包经过了某个路由器
    pub fn record_router_pass(&mut self, step: u64, router: NodeId, packet_id: u64) {
        if self.scope != EntityScope::PerRouter {
            return;
        }
        let rec = self.record_mut(step);
        rec.router_passes.entry(router).or_default().insert(packet_id);
    }

    /// 记录一个到达样本，然后对该 step 做关闭判断。
    pub fn report_delay_sample(&mut self, flow: &Flow, delay_secs: f64, now: SimTime) -> Vec<StepReward> {
        let scope = self.scope;
        let rec = self.record_mut(flow.step);
        if rec.closed {
            debug!(step = flow.step, pkt_id = flow.id, "step 已关闭，丢弃迟到样本");
            return Vec::new();
        }
        rec.delays.push(delay_secs);
        match scope {
            EntityScope::PerPath => rec
                .path_delays
                .entry((flow.src, flow.dst))
                .or_default()
                .push(delay_secs),
            EntityScope::PerRouter => {
                rec.packet_delays.insert(flow.id, delay_secs);
            }
            EntityScope::None => {}
        }
        self.check_step_timeout(flow.step, now)
    }

    /// 关闭判断：
    /// 1. `step` 已 `AllReported` 且样本数等于发送数；
    /// 2. 任何不晚于 `step`、已 `AllReported` 且超过 `over_time` 的 step。
    pub fn check_step_timeout(&mut self, step: u64, now: SimTime) -> Vec<StepReward> {
        let mut closed = Vec::new();

        let complete = self.steps.get(&step).is_some_and(|rec| {
            rec.all_reported && !rec.closed && rec.delays.len() as u64 == rec.packets_sent
        });
        if complete {
            debug!(step, "样本已齐，关闭 step");
            closed.extend(self.close(step));
        }

        if let Some(over_time) = self.over_time {
            let expired: Vec<u64> = self
                .steps
                .range(..=step)
                .filter(|(_, rec)| {
                    rec.all_reported
                        && !rec.closed
                        && now.0.saturating_sub(rec.close_time.0) >= over_time.0
                })
                .map(|(s, _)| *s)
                .collect();
            for s in expired {
                debug!(step = s, now = ?now, "超时，强制关闭 step");
                closed.extend(self.close(s));
            }
        }

        closed
    }

    /// 外部强制关闭（即使没有 `AllReported`）
    pub fn force_close(&mut self, step: u64) -> Option<StepReward> {
        self.record_mut(step);
        self.close(step)
    }

    fn close(&mut self, step: u64) -> Option<StepReward> {
        let node_count = self.node_count;
        let scope = self.scope;
        let rec = self.steps.get_mut(&step)?;
        if rec.closed {
            return None;
        }
        let reward = aggregate(step, rec, node_count, scope);
        rec.closed = true;
        rec.clear_samples();
        self.closed_steps += 1;
        info!(
            step,
            avg_delay = reward.avg_delay,
            loss_rate = reward.loss_rate,
            "✅ step 关闭"
        );
        Some(reward)
    }
}
