//! 路由策略
//!
//! 四种策略组成一个封闭枚举，通过同一个 `decide` 分派：
//! - `Conventional`：下一跳交给外部（仿真框架自带的路由）决定；
//! - `Probabilistic`：逐跳按概率矩阵轮盘赌；
//! - `SinglePath`：每个 (src, dst) 一条显式路径；
//! - `Multipath`：每个 (src, dst) 多条带权重路径，发起时选一条。
//!
//! 主机到路由器、目的路由器到主机两条结构性规则对所有策略只实现一次。

mod multipath;
mod path;
mod probabilistic;
mod roulette;

pub use multipath::SplitTable;
pub use path::{PairKey, PathTable};
pub use probabilistic::ProbabilisticTable;
pub use roulette::{Threshold, spin};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{Result, RouterError};
use crate::net::{Flow, Location, NodeId, PathHint, Topology, TrafficCounter};

/// 策略选择器（配置中的 `strategy`）
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[serde(alias = "conventional")]
    Convention,
    Probabilistic,
    Singlepath,
    Multipath,
}

impl StrategyKind {
    pub fn parse(raw: &str) -> std::result::Result<Self, String> {
        match raw.trim().to_lowercase().as_str() {
            "convention" | "conventional" => Ok(Self::Convention),
            "probabilistic" => Ok(Self::Probabilistic),
            "singlepath" | "single_path" => Ok(Self::Singlepath),
            "multipath" | "multi_path" => Ok(Self::Multipath),
            _ => Err(format!("unknown strategy: {raw}")),
        }
    }

    /// 是否使用随流携带的显式路径
    pub fn uses_paths(self) -> bool {
        matches!(self, Self::Singlepath | Self::Multipath)
    }
}

/// 一次转发决策
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// 转发到下一个路由器
    Router { next: NodeId, gate: usize },
    /// 交付给本地主机
    Host { host: NodeId, gate: usize },
    /// 由外部路由决定（常规策略）
    Delegated,
}

/// 当前生效的路由策略
#[derive(Debug, Clone)]
pub enum RoutingPolicy {
    Conventional,
    Probabilistic(ProbabilisticTable),
    SinglePath(PathTable),
    Multipath(SplitTable),
}

impl RoutingPolicy {
    /// 按策略与初始表构造。非常规策略必须提供初始表。
    pub fn build(kind: StrategyKind, topo: &Topology, init_table: Option<&str>) -> Result<Self> {
        let require = || {
            init_table.ok_or_else(|| {
                RouterError::Config(format!("strategy {kind:?} requires an init_table"))
            })
        };
        Ok(match kind {
            StrategyKind::Convention => RoutingPolicy::Conventional,
            StrategyKind::Probabilistic => {
                let table = ProbabilisticTable::parse(require()?, topo.node_count())?;
                table.check_links(topo)?;
                RoutingPolicy::Probabilistic(table)
            }
            StrategyKind::Singlepath => RoutingPolicy::SinglePath(PathTable::parse(require()?)?),
            StrategyKind::Multipath => RoutingPolicy::Multipath(SplitTable::parse(require()?)?),
        })
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            RoutingPolicy::Conventional => StrategyKind::Convention,
            RoutingPolicy::Probabilistic(_) => StrategyKind::Probabilistic,
            RoutingPolicy::SinglePath(_) => StrategyKind::Singlepath,
            RoutingPolicy::Multipath(_) => StrategyKind::Multipath,
        }
    }

    /// 在 `at` 为 `flow` 做一次转发决策。
    ///
    /// 路径类策略在主机处把路径写入 `hint`，之后每跳把剩余路径写回。
    /// 在路由器之间转发时，`(当前, 下一跳)` 的流量计数增加该流的大小。
    pub fn decide<R: Rng + ?Sized>(
        &self,
        topo: &Topology,
        traffic: &mut TrafficCounter,
        flow: &Flow,
        hint: &mut PathHint,
        at: Location,
        rng: &mut R,
    ) -> Result<Decision> {
        let node = at.node();

        if at.is_host() {
            self.attach_path(flow, hint, rng)?;
            trace!(at = %at, hint = %hint, "主机直接交给本地路由器");
            return Ok(Decision::Router { next: node, gate: 1 });
        }

        if node == flow.dst {
            return Ok(Decision::Host {
                host: flow.dst,
                gate: topo.host_gate(flow.dst),
            });
        }

        let next = match self {
            RoutingPolicy::Conventional => return Ok(Decision::Delegated),
            RoutingPolicy::Probabilistic(table) => table
                .next_hop(topo, node, flow.dst, rng)
                .ok_or_else(|| RouterError::RoutingIntegrity {
                    at: node,
                    src: flow.src,
                    dst: flow.dst,
                    reason: "router has no neighbors".to_string(),
                })?,
            RoutingPolicy::SinglePath(_) | RoutingPolicy::Multipath(_) => {
                path::follow(hint, node, flow.src, flow.dst)?
            }
        };

        let gate = topo
            .gate_index(node, next)
            .ok_or_else(|| RouterError::RoutingIntegrity {
                at: node,
                src: flow.src,
                dst: flow.dst,
                reason: format!("no link to chosen next hop {next:?}"),
            })?;
        traffic.add_bytes(node, next, flow.size_bytes);
        debug!(at = %at, next = ?next, gate, "转发决策");
        Ok(Decision::Router { next, gate })
    }

    fn attach_path<R: Rng + ?Sized>(&self, flow: &Flow, hint: &mut PathHint, rng: &mut R) -> Result<()> {
        match self {
            RoutingPolicy::SinglePath(table) => {
                let path = table
                    .path_for(flow.src, flow.dst)
                    .ok_or_else(|| RouterError::RoutingIntegrity {
                        at: flow.src,
                        src: flow.src,
                        dst: flow.dst,
                        reason: "no path for pair".to_string(),
                    })?;
                *hint = path.clone();
            }
            RoutingPolicy::Multipath(table) => {
                *hint = table.select(flow.src, flow.dst, rng)?;
            }
            RoutingPolicy::Conventional | RoutingPolicy::Probabilistic(_) => {}
        }
        Ok(())
    }

    /// 解析控制器对状态上报的回复并生成新策略。
    ///
    /// 新表完整构造成功后才替换旧表；解析失败时旧表不变。
    pub fn apply_update(&mut self, topo: &Topology, reply: &str) -> Result<()> {
        let next = match self {
            RoutingPolicy::Conventional => return Ok(()),
            RoutingPolicy::Probabilistic(_) => {
                let weights = probabilistic::parse_csv_f64(reply)
                    .map_err(RouterError::MalformedPolicyUpdate)?;
                RoutingPolicy::Probabilistic(ProbabilisticTable::renormalized(topo, &weights)?)
            }
            RoutingPolicy::SinglePath(table) => RoutingPolicy::SinglePath(table.replaced(reply)?),
            RoutingPolicy::Multipath(table) => RoutingPolicy::Multipath(table.replaced(reply)?),
        };
        *self = next;
        Ok(())
    }
}

/// 去掉外层的空白、引号与方括号
pub(crate) fn strip_envelope(raw: &str) -> &str {
    raw.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim()
}
