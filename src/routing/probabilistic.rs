//! 概率路由：逐跳按转发概率矩阵做轮盘赌

use rand::Rng;
use tracing::{debug, warn};

use super::roulette::{Threshold, spin};
use crate::error::{Result, RouterError};
use crate::net::{Matrix, NodeId, Topology};

/// `node_count × node_count` 的转发权重（每行在邻居间归一化为 100）
#[derive(Debug, Clone)]
pub struct ProbabilisticTable {
    weights: Matrix<f64>,
}

impl ProbabilisticTable {
    /// 从扁平化的行主序权重串构造，例如 `"[0,50,50,100,0,0,...]"`。
    pub fn parse(raw: &str, node_count: usize) -> Result<Self> {
        let values = parse_csv_f64(raw).map_err(RouterError::MalformedPolicyUpdate)?;
        if values.len() != node_count * node_count {
            return Err(RouterError::MalformedPolicyUpdate(format!(
                "expected {} weights, got {}",
                node_count * node_count,
                values.len()
            )));
        }
        let mut weights = Matrix::filled(node_count, node_count, 0.0);
        for (idx, v) in values.into_iter().enumerate() {
            weights[(idx / node_count, idx % node_count)] = v;
        }
        Ok(Self { weights })
    }

    /// 非零权重必须落在拓扑中存在的链路上
    pub fn check_links(&self, topo: &Topology) -> Result<()> {
        let n = self.weights.rows();
        for i in 0..n {
            for j in 0..n {
                if self.weights[(i, j)] != 0.0 && topo.link(NodeId(i), NodeId(j)).is_none() {
                    return Err(RouterError::Config(format!(
                        "init_table weight at ({i},{j}) has no matching link"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn from_matrix(weights: Matrix<f64>) -> Self {
        Self { weights }
    }

    pub fn weight(&self, from: NodeId, to: NodeId) -> f64 {
        self.weights.get(from.0, to.0).copied().unwrap_or(0.0)
    }

    pub fn weights(&self) -> &Matrix<f64> {
        &self.weights
    }

    /// 选出 `node` 去往 `dst` 的下一跳。
    ///
    /// 到 `dst` 的权重非零时直达；否则在正权重邻居间按编号升序做轮盘赌，
    /// 没有候选胜出时取编号最小的候选。
    pub fn next_hop<R: Rng + ?Sized>(
        &self,
        topo: &Topology,
        node: NodeId,
        dst: NodeId,
        rng: &mut R,
    ) -> Option<NodeId> {
        if self.weight(node, dst) != 0.0 {
            return Some(dst);
        }

        let (cands, weights): (Vec<NodeId>, Vec<f64>) = topo
            .neighbors_of(node)
            .map(|(n, _)| (n, self.weight(node, n)))
            .filter(|(_, w)| *w > 0.0)
            .unzip();

        if cands.is_empty() {
            // 没有任何正权重：退回到编号最小的邻居
            return topo.neighbors_of(node).map(|(n, _)| n).next();
        }

        let picked = spin(&weights, Threshold::Inclusive, rng).unwrap_or(0);
        debug!(node = ?node, dst = ?dst, next = ?cands[picked], "轮盘赌选择下一跳");
        Some(cands[picked])
    }

    /// 用按链路编号排列的边权重生成新表：每行 `w / Σw * 100`。
    pub fn renormalized(topo: &Topology, edge_weights: &[f64]) -> Result<Self> {
        if edge_weights.len() != topo.directed_link_count() {
            return Err(RouterError::MalformedPolicyUpdate(format!(
                "expected {} edge weights, got {}",
                topo.directed_link_count(),
                edge_weights.len()
            )));
        }

        let n = topo.node_count();
        let mut weights = Matrix::filled(n, n, 0.0);
        for row in 0..n {
            let node = NodeId(row);
            let total: f64 = topo
                .neighbors_of(node)
                .map(|(_, link)| edge_weights[link.0])
                .sum();
            if !(total > 0.0) {
                if topo.degree(node) > 0 {
                    warn!(node = ?node, "边权重之和为 0，该行概率保持为 0");
                }
                continue;
            }
            for (nbr, link) in topo.neighbors_of(node) {
                weights[(row, nbr.0)] = edge_weights[link.0] / total * 100.0;
            }
        }
        Ok(Self { weights })
    }
}

pub(crate) fn parse_csv_f64(raw: &str) -> std::result::Result<Vec<f64>, String> {
    let body = super::strip_envelope(raw);
    body.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| t.parse::<f64>().map_err(|_| format!("bad number {t:?}")))
        .collect()
}
