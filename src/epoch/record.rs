//! 单个 step 的记录

use std::collections::{HashMap, HashSet};

use crate::net::NodeId;
use crate::routing::PairKey;
use crate::sim::SimTime;

/// step 的生命周期阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPhase {
    Open,
    AllReported,
    Closed,
}

#[derive(Debug, Clone, Default)]
pub struct StepRecord {
    pub(crate) reported_nodes: usize,
    pub(crate) throughput_reports: usize,
    pub(crate) all_reported: bool,
    pub(crate) closed: bool,
    pub(crate) close_time: SimTime,
    pub(crate) packets_sent: u64,
    pub(crate) delays: Vec<f64>,
    /// 按路径统计（路径类策略的 distributed 模式）
    pub(crate) path_delays: HashMap<PairKey, Vec<f64>>,
    pub(crate) path_sent: HashMap<PairKey, u64>,
    /// 按路由器统计：经过该路由器的包编号，以及已到达包的时延
    pub(crate) router_passes: HashMap<NodeId, HashSet<u64>>,
    pub(crate) packet_delays: HashMap<u64, f64>,
}

impl StepRecord {
    pub fn phase(&self) -> StepPhase {
        if self.closed {
            StepPhase::Closed
        } else if self.all_reported {
            StepPhase::AllReported
        } else {
            StepPhase::Open
        }
    }

    pub fn packets_sent(&self) -> u64 {
        self.packets_sent
    }

    pub fn samples(&self) -> usize {
        self.delays.len()
    }

    pub fn close_time(&self) -> SimTime {
        self.close_time
    }

    /// 关闭后只保留标志位
    pub(crate) fn clear_samples(&mut self) {
        self.delays = Vec::new();
        self.path_delays = HashMap::new();
        self.path_sent = HashMap::new();
        self.router_passes = HashMap::new();
        self.packet_delays = HashMap::new();
    }
}
