//! 显式路径路由：每个 (src, dst) 一条节点序列，随流携带剩余路径

use std::collections::HashMap;

use crate::error::{Result, RouterError};
use crate::net::{NodeId, PathHint};

pub type PairKey = (NodeId, NodeId);

/// `(src, dst) -> path` 表，同时保留初始表作为缺项时的回退
#[derive(Debug, Clone, Default)]
pub struct PathTable {
    current: HashMap<PairKey, PathHint>,
    initial: HashMap<PairKey, PathHint>,
}

impl PathTable {
    /// 解析 `src,dst,path;src,dst,path;...`
    pub fn parse(raw: &str) -> Result<Self> {
        let current = parse_paths(raw)?;
        Ok(Self {
            initial: current.clone(),
            current,
        })
    }

    /// 用控制器下发的新表替换当前表，初始表保持不变。
    pub fn replaced(&self, raw: &str) -> Result<Self> {
        Ok(Self {
            current: parse_paths(raw)?,
            initial: self.initial.clone(),
        })
    }

    /// 发起时挂到流上的路径
    pub fn path_for(&self, src: NodeId, dst: NodeId) -> Option<&PathHint> {
        self.current
            .get(&(src, dst))
            .filter(|p| !p.is_empty())
            .or_else(|| self.initial.get(&(src, dst)))
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }
}

/// 沿携带的路径走一步：返回下一跳并把剩余路径写回 `hint`。
pub(crate) fn follow(hint: &mut PathHint, at: NodeId, src: NodeId, dst: NodeId) -> Result<NodeId> {
    match hint.advance_from(at) {
        Some((next, rest)) => {
            *hint = rest;
            Ok(next)
        }
        None => Err(RouterError::RoutingIntegrity {
            at,
            src,
            dst,
            reason: format!("node not found in attached path {:?}", hint.to_string()),
        }),
    }
}

fn parse_paths(raw: &str) -> Result<HashMap<PairKey, PathHint>> {
    let mut out = HashMap::new();
    for fields in split_records(raw, 3)? {
        let key = parse_pair(&fields)?;
        let path = parse_path(fields[2])?;
        out.insert(key, path);
    }
    Ok(out)
}

/// 按 `;` 切记录、按 `,` 切字段，空记录跳过，字段数不符即报错。
pub(crate) fn split_records(raw: &str, fields: usize) -> Result<Vec<Vec<&str>>> {
    super::strip_envelope(raw)
        .split(';')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(|record| {
            let items: Vec<&str> = record.split(',').map(str::trim).collect();
            if items.len() == fields {
                Ok(items)
            } else {
                Err(RouterError::MalformedPolicyUpdate(format!(
                    "record {record:?} has {} fields, expected {fields}",
                    items.len()
                )))
            }
        })
        .collect()
}

pub(crate) fn parse_pair(fields: &[&str]) -> Result<PairKey> {
    let node = |t: &str| {
        t.parse::<usize>()
            .map(NodeId)
            .map_err(|_| RouterError::MalformedPolicyUpdate(format!("bad node id {t:?}")))
    };
    Ok((node(fields[0])?, node(fields[1])?))
}

pub(crate) fn parse_path(raw: &str) -> Result<PathHint> {
    raw.parse::<PathHint>()
        .map_err(RouterError::MalformedPolicyUpdate)
}
