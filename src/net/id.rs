//! 标识符类型
//!
//! 定义节点、链路的唯一标识符，以及节点在边界上的地址类别。

use std::fmt;

/// 节点标识符，取值范围 `[0, node_count)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

/// 链路标识符（加载拓扑时按扫描顺序分配）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 当前做转发决策的位置：主机 `H[i]` 或路由器 `R[i]`。
///
/// 主机 `i` 总是挂在路由器 `i` 上。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    Host(NodeId),
    Router(NodeId),
}

impl Location {
    pub fn node(self) -> NodeId {
        match self {
            Location::Host(n) | Location::Router(n) => n,
        }
    }

    pub fn is_host(self) -> bool {
        matches!(self, Location::Host(_))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Host(n) => write!(f, "H[{}]", n.0),
            Location::Router(n) => write!(f, "R[{}]", n.0),
        }
    }
}
