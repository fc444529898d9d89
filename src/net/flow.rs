//! 流（单个仿真数据包在路由核心眼中的属性）与路径提示

use std::fmt;
use std::str::FromStr;

use super::id::NodeId;

/// 一个仿真数据包的路由相关属性
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flow {
    pub src: NodeId,
    pub dst: NodeId,
    /// 发送时所在的 step
    pub step: u64,
    /// 会话内唯一的发送编号
    pub id: u64,
    pub size_bytes: u32,
}

/// 随流携带的剩余路径（节点序列），文本形式为 `"0.1.2"`。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathHint(Vec<NodeId>);

impl PathHint {
    pub fn new(nodes: Vec<NodeId>) -> Self {
        Self(nodes)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.0
    }

    /// 在路径中（不含最后一个元素）定位 `at`，返回下一跳与从下一跳开始的后缀。
    pub fn advance_from(&self, at: NodeId) -> Option<(NodeId, PathHint)> {
        let pos = self
            .0
            .iter()
            .take(self.0.len().saturating_sub(1))
            .position(|&n| n == at)?;
        let next = self.0[pos + 1];
        Some((next, PathHint(self.0[pos + 1..].to_vec())))
    }
}

impl fmt::Display for PathHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, n) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", n.0)?;
        }
        Ok(())
    }
}

impl FromStr for PathHint {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(PathHint::empty());
        }
        raw.split('.')
            .map(|t| {
                t.trim()
                    .parse::<usize>()
                    .map(NodeId)
                    .map_err(|_| format!("bad node id {t:?} in path {raw:?}"))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(PathHint)
    }
}
