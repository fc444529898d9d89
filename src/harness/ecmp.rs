//! 最短跳数路由（含 ECMP）
//!
//! 常规策略把下一跳交给仿真框架决定：这里为每个 (from, dst)
//! 预计算所有等价最短路径的下一跳集合，再按 flow id 做稳定哈希选择。

use std::collections::{HashMap, VecDeque};

use crate::net::{NodeId, Topology};

#[derive(Debug, Default, Clone)]
pub struct EcmpTable {
    /// (from, dst) -> 多个等价最短路径下一跳
    next_hops: HashMap<(NodeId, NodeId), Vec<NodeId>>,
    /// 用于 ECMP hashing 的盐（保证稳定且可控）
    hash_salt: u64,
}

impl EcmpTable {
    pub fn build(topo: &Topology, hash_salt: u64) -> Self {
        let adj = topo.adjacency();
        let n = adj.len();
        let mut rev_adj: Vec<Vec<NodeId>> = vec![Vec::new(); n];
        for (from, nbrs) in adj.iter().enumerate() {
            for &to in nbrs {
                rev_adj[to.0].push(NodeId(from));
            }
        }

        let mut next_hops = HashMap::new();

        // 对每个 dst 在反向图上做 BFS，得到到 dst 的最短跳数距离 dist[*]。
        // 然后对每个 from，选出所有满足 dist[next] = dist[from] - 1 的 next 作为 ECMP 候选。
        let mut dist: Vec<i32> = vec![i32::MAX; n];
        let mut q: VecDeque<NodeId> = VecDeque::new();

        for dst_idx in 0..n {
            dist.fill(i32::MAX);
            q.clear();

            dist[dst_idx] = 0;
            q.push_back(NodeId(dst_idx));

            while let Some(v) = q.pop_front() {
                let dv = dist[v.0];
                for &pred in &rev_adj[v.0] {
                    if dist[pred.0] == i32::MAX {
                        dist[pred.0] = dv.saturating_add(1);
                        q.push_back(pred);
                    }
                }
            }

            for from_idx in 0..n {
                if from_idx == dst_idx {
                    continue;
                }
                let df = dist[from_idx];
                if df == i32::MAX {
                    continue; // unreachable
                }
                let cands: Vec<NodeId> = adj[from_idx]
                    .iter()
                    .copied()
                    .filter(|nh| dist[nh.0] == df - 1)
                    .collect();
                if !cands.is_empty() {
                    next_hops.insert((NodeId(from_idx), NodeId(dst_idx)), cands);
                }
            }
        }

        Self {
            next_hops,
            hash_salt,
        }
    }

    /// 获取 (from, dst) 的 ECMP 下一跳候选集合。
    pub fn next_hops(&self, from: NodeId, dst: NodeId) -> Option<&[NodeId]> {
        self.next_hops.get(&(from, dst)).map(|v| v.as_slice())
    }

    /// 基于 flow id 的稳定 ECMP 选择；不可达时返回 `None`。
    pub fn pick(&self, from: NodeId, dst: NodeId, flow_id: u64) -> Option<NodeId> {
        let cands = self.next_hops(from, dst)?;
        let h = mix64(
            flow_id ^ (from.0 as u64).wrapping_mul(0x9E3779B97F4A7C15)
                ^ (dst.0 as u64)
                ^ self.hash_salt,
        );
        Some(cands[(h as usize) % cands.len()])
    }
}

/// 一个简单、确定性的 64-bit mixing（替代 RandomState，避免每次运行 hash 不稳定）。
fn mix64(mut x: u64) -> u64 {
    // splitmix64
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}
