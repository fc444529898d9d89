//! step 关闭时的时延/丢包聚合
//!
//! 约定：`sent == 0` 时丢包率为 0；没有样本时平均时延为 0。

use std::collections::HashSet;

use super::record::StepRecord;
use crate::net::NodeId;

/// 一个已关闭 step 的聚合结果
#[derive(Debug, Clone, PartialEq)]
pub struct StepReward {
    pub step: u64,
    pub avg_delay: f64,
    pub loss_rate: f64,
    /// distributed 模式下每个实体（路由器或有序节点对）的 `(avg_delay, loss_rate)`
    pub entities: Vec<(f64, f64)>,
}

/// 按实体拆分统计的粒度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityScope {
    /// 不拆分，只有全局一对
    None,
    /// 每个路由器一对
    PerRouter,
    /// 每个有序 (src, dst) 一对，行主序
    PerPath,
}

pub fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        0.0
    } else {
        samples.iter().sum::<f64>() / samples.len() as f64
    }
}

pub fn loss_rate(arrived: u64, sent: u64) -> f64 {
    if sent == 0 {
        return 0.0;
    }
    sent.saturating_sub(arrived) as f64 / sent as f64
}

pub(crate) fn aggregate(step: u64, rec: &StepRecord, node_count: usize, scope: EntityScope) -> StepReward {
    let entities = match scope {
        EntityScope::None => Vec::new(),
        EntityScope::PerPath => per_path(rec, node_count),
        EntityScope::PerRouter => per_router(rec, node_count),
    };
    StepReward {
        step,
        avg_delay: mean(&rec.delays),
        loss_rate: loss_rate(rec.delays.len() as u64, rec.packets_sent),
        entities,
    }
}

fn per_path(rec: &StepRecord, node_count: usize) -> Vec<(f64, f64)> {
    let mut out = Vec::with_capacity(node_count * node_count);
    for src in 0..node_count {
        for dst in 0..node_count {
            if src == dst {
                out.push((0.0, 0.0));
                continue;
            }
            let key = (NodeId(src), NodeId(dst));
            let samples = rec.path_delays.get(&key).map(Vec::as_slice).unwrap_or(&[]);
            let sent = rec.path_sent.get(&key).copied().unwrap_or(0);
            out.push((mean(samples), loss_rate(samples.len() as u64, sent)));
        }
    }
    out
}

fn per_router(rec: &StepRecord, node_count: usize) -> Vec<(f64, f64)> {
    let empty = HashSet::new();
    (0..node_count)
        .map(|node| {
            let passed = rec.router_passes.get(&NodeId(node)).unwrap_or(&empty);
            let mut ids: Vec<u64> = passed.iter().copied().collect();
            ids.sort_unstable();
            let delays: Vec<f64> = ids
                .iter()
                .filter_map(|id| rec.packet_delays.get(id).copied())
                .collect();
            (
                mean(&delays),
                loss_rate(delays.len() as u64, passed.len() as u64),
            )
        })
        .collect()
}
