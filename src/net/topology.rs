//! 拓扑存储
//!
//! 一张 `node_count × node_count` 的链路表：`None` 表示无链路，
//! `Some(LinkId)` 为加载时按行主序扫描顺序分配的链路编号。

use super::id::{LinkId, NodeId};
use super::matrix::Matrix;
use crate::error::{Result, RouterError};

#[derive(Debug, Clone)]
pub struct Topology {
    links: Matrix<Option<LinkId>>,
    directed_links: usize,
}

impl Topology {
    /// 解析扁平化的行主序邻接描述（逗号分隔）。
    ///
    /// 任何非零数值 token 都视为一条链路，所以初始概率表本身也可以作为描述。
    /// 允许外层的 `[` `]` 与空白；行数不足时缺失的行没有链路。
    pub fn load(description: &str, node_count: usize) -> Result<Topology> {
        if node_count == 0 {
            return Err(RouterError::MalformedTopology(
                "node count must be positive".to_string(),
            ));
        }

        let tokens = split_tokens(description);
        if tokens.is_empty() {
            return Err(RouterError::MalformedTopology(
                "empty adjacency description".to_string(),
            ));
        }
        if tokens.len() % node_count != 0 {
            return Err(RouterError::MalformedTopology(format!(
                "{} tokens is not a multiple of node count {}",
                tokens.len(),
                node_count
            )));
        }
        if tokens.len() / node_count > node_count {
            return Err(RouterError::MalformedTopology(format!(
                "{} rows for {} nodes",
                tokens.len() / node_count,
                node_count
            )));
        }

        let mut links = Matrix::filled(node_count, node_count, None);
        let mut next_id = 0usize;
        for (idx, token) in tokens.iter().enumerate() {
            let value: f64 = token.parse().map_err(|_| {
                RouterError::MalformedTopology(format!("token #{idx} ({token:?}) is not numeric"))
            })?;
            if !value.is_finite() {
                return Err(RouterError::MalformedTopology(format!(
                    "token #{idx} ({token:?}) is not finite"
                )));
            }
            if value != 0.0 {
                links[(idx / node_count, idx % node_count)] = Some(LinkId(next_id));
                next_id += 1;
            }
        }

        Ok(Topology {
            links,
            directed_links: next_id,
        })
    }

    pub fn node_count(&self) -> usize {
        self.links.rows()
    }

    /// 有向链路条数（等于已分配链路编号的个数）
    pub fn directed_link_count(&self) -> usize {
        self.directed_links
    }

    /// 全双工视角下的边数
    pub fn undirected_edge_count(&self) -> usize {
        self.directed_links / 2
    }

    pub fn link(&self, from: NodeId, to: NodeId) -> Option<LinkId> {
        self.links.get(from.0, to.0).copied().flatten()
    }

    /// 按邻居编号升序枚举 `(邻居, 链路编号)`。
    ///
    /// 网关编号依赖这个顺序，任何调用都必须得到相同的序列。
    pub fn neighbors_of(&self, node: NodeId) -> impl Iterator<Item = (NodeId, LinkId)> + Clone + '_ {
        let row: &[Option<LinkId>] = if node.0 < self.node_count() {
            self.links.row(node.0)
        } else {
            &[]
        };
        row.iter()
            .enumerate()
            .filter_map(|(i, l)| l.map(|l| (NodeId(i), l)))
    }

    pub fn degree(&self, node: NodeId) -> usize {
        self.neighbors_of(node).count()
    }

    /// 从 `node` 转发到 `neighbor` 的网关编号。
    ///
    /// 0 号接口保留给 loopback，因此第一个邻居是 1。
    pub fn gate_index(&self, node: NodeId, neighbor: NodeId) -> Option<usize> {
        self.link(node, neighbor)?;
        let before = self
            .neighbors_of(node)
            .take_while(|(n, _)| *n < neighbor)
            .count();
        Some(before + 1)
    }

    /// 路由器通往本地主机的网关：排在所有路由器邻居之后。
    pub fn host_gate(&self, router: NodeId) -> usize {
        1 + self.degree(router)
    }

    /// 出边邻接表（给最短路计算使用）
    pub fn adjacency(&self) -> Vec<Vec<NodeId>> {
        (0..self.node_count())
            .map(|i| self.neighbors_of(NodeId(i)).map(|(n, _)| n).collect())
            .collect()
    }

    /// `(from, to)` 按链路编号排列的全部有向链路
    pub fn links_by_id(&self) -> Vec<(NodeId, NodeId)> {
        let n = self.node_count();
        let mut out = vec![(NodeId(0), NodeId(0)); self.directed_links];
        for from in 0..n {
            for (to, link) in self.neighbors_of(NodeId(from)) {
                out[link.0] = (NodeId(from), to);
            }
        }
        out
    }
}

fn split_tokens(description: &str) -> Vec<&str> {
    let body = description
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']');
    body.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}
