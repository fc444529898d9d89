//! 链路流量计数
//!
//! 每条有向链路在当前 epoch 内经过的比特数，每次状态上报后清零。

use super::id::NodeId;
use super::matrix::Matrix;

#[derive(Debug, Clone)]
pub struct TrafficCounter {
    bits: Matrix<u64>,
}

impl TrafficCounter {
    pub fn new(node_count: usize) -> Self {
        Self {
            bits: Matrix::filled(node_count, node_count, 0),
        }
    }

    pub fn add_bytes(&mut self, from: NodeId, to: NodeId, bytes: u32) {
        let cell = &mut self.bits[(from.0, to.0)];
        *cell = cell.saturating_add(u64::from(bytes).saturating_mul(8));
    }

    pub fn bits(&self, from: NodeId, to: NodeId) -> u64 {
        self.bits[(from.0, to.0)]
    }

    pub fn total_bits(&self) -> u64 {
        self.bits.iter().sum()
    }

    /// 行主序的 Mbps 矩阵：`bits / 1e6 / elapsed_secs`。
    ///
    /// `elapsed_secs <= 0` 时所有链路记为 0。
    pub fn throughput_mbps(&self, elapsed_secs: f64) -> Vec<f64> {
        self.bits
            .iter()
            .map(|&b| {
                if elapsed_secs > 0.0 {
                    b as f64 / 1_000_000.0 / elapsed_secs
                } else {
                    0.0
                }
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.bits.fill(0);
    }
}
