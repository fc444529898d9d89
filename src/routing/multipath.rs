//! 多路径分流：每个 (src, dst) 若干条带权重的候选路径

use std::collections::HashMap;

use rand::Rng;

use super::path::{PairKey, parse_pair, parse_path, split_records};
use super::roulette::{Threshold, spin};
use crate::error::{Result, RouterError};
use crate::net::{NodeId, PathHint};

#[derive(Debug, Clone, Default)]
pub struct SplitTable {
    current: HashMap<PairKey, Vec<(PathHint, f64)>>,
    initial: HashMap<PairKey, Vec<(PathHint, f64)>>,
}

impl SplitTable {
    /// 解析 `src,dst,path,weight;...`，同一 pair 的多条记录按出现顺序保留。
    pub fn parse(raw: &str) -> Result<Self> {
        let current = parse_splits(raw)?;
        Ok(Self {
            initial: current.clone(),
            current,
        })
    }

    pub fn replaced(&self, raw: &str) -> Result<Self> {
        Ok(Self {
            current: parse_splits(raw)?,
            initial: self.initial.clone(),
        })
    }

    pub fn splits(&self, src: NodeId, dst: NodeId) -> &[(PathHint, f64)] {
        self.current
            .get(&(src, dst))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 为新流挑一条路径。
    ///
    /// 只有一条候选时不抽样；否则第一条累积权重严格大于抽样值的路径胜出；
    /// 都没选中时退回初始表中该 pair 的第一条路径。
    pub fn select<R: Rng + ?Sized>(&self, src: NodeId, dst: NodeId, rng: &mut R) -> Result<PathHint> {
        let splits = self.splits(src, dst);
        let picked = match splits {
            [only] => Some(only.0.clone()),
            [] => None,
            many => {
                let weights: Vec<f64> = many.iter().map(|(_, w)| *w).collect();
                spin(&weights, Threshold::Exclusive, rng).map(|i| many[i].0.clone())
            }
        };

        picked
            .or_else(|| {
                self.initial
                    .get(&(src, dst))
                    .and_then(|v| v.first())
                    .map(|(p, _)| p.clone())
            })
            .ok_or_else(|| RouterError::RoutingIntegrity {
                at: src,
                src,
                dst,
                reason: "no split path for pair".to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }
}

fn parse_splits(raw: &str) -> Result<HashMap<PairKey, Vec<(PathHint, f64)>>> {
    let mut out: HashMap<PairKey, Vec<(PathHint, f64)>> = HashMap::new();
    for fields in split_records(raw, 4)? {
        let key = parse_pair(&fields)?;
        let path = parse_path(fields[2])?;
        let weight: f64 = fields[3].parse().map_err(|_| {
            RouterError::MalformedPolicyUpdate(format!("bad split weight {:?}", fields[3]))
        })?;
        out.entry(key).or_default().push((path, weight));
    }
    Ok(out)
}
