//! 会话配置（JSON）
//!
//! 字段大多带默认值，最小配置只需要 `node_count`、`strategy` 与拓扑/初始表。

use serde::{Deserialize, Serialize};

use crate::epoch::ReturnMode;
use crate::error::{Result, RouterError};
use crate::net::Topology;
use crate::routing::{RoutingPolicy, StrategyKind};
use crate::sim::SimTime;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub node_count: usize,
    pub strategy: StrategyKind,
    #[serde(default)]
    pub return_mode: ReturnMode,
    /// 行主序 0/1 邻接串；概率策略可省略，此时由 `init_table` 推导
    #[serde(default)]
    pub topology: Option<String>,
    /// 概率矩阵或路径/分流表，格式取决于策略
    #[serde(default)]
    pub init_table: Option<String>,
    #[serde(default = "default_step_duration_ms")]
    pub step_duration_ms: u64,
    #[serde(default = "default_total_steps")]
    pub total_steps: u64,
    /// 缺省表示从不超时
    #[serde(default)]
    pub over_time_ms: Option<u64>,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub controller: ControllerSpec,
    #[serde(default)]
    pub traffic: TrafficSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerSpec {
    #[serde(default = "default_controller_addr")]
    pub addr: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ControllerSpec {
    fn default() -> Self {
        Self {
            addr: default_controller_addr(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// 演示框架的发包参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficSpec {
    #[serde(default = "default_flow_rate_mbps")]
    pub flow_rate_mbps: f64,
    #[serde(default = "default_message_bytes")]
    pub message_bytes: u32,
    #[serde(default = "default_link_latency_us")]
    pub link_latency_us: u64,
    /// 每一跳的随机丢包概率
    #[serde(default)]
    pub hop_loss_rate: f64,
}

impl Default for TrafficSpec {
    fn default() -> Self {
        Self {
            flow_rate_mbps: default_flow_rate_mbps(),
            message_bytes: default_message_bytes(),
            link_latency_us: default_link_latency_us(),
            hop_loss_rate: 0.0,
        }
    }
}

fn default_step_duration_ms() -> u64 {
    100
}

fn default_total_steps() -> u64 {
    10
}

fn default_controller_addr() -> String {
    "127.0.0.1:5555".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    3_000
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_flow_rate_mbps() -> f64 {
    1.0
}

fn default_message_bytes() -> u32 {
    1_000
}

fn default_link_latency_us() -> u64 {
    100
}

impl SessionConfig {
    pub fn from_json(raw: &str) -> Result<Self> {
        let cfg: SessionConfig =
            serde_json::from_str(raw).map_err(|e| RouterError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// 邻接描述：显式给出的 `topology`，或概率策略下的初始概率表。
    pub fn adjacency(&self) -> Result<&str> {
        match (&self.topology, self.strategy) {
            (Some(t), _) if !t.trim().is_empty() => Ok(t.as_str()),
            (_, StrategyKind::Probabilistic) => self.init_table.as_deref().ok_or_else(|| {
                RouterError::Config("probabilistic strategy needs topology or init_table".into())
            }),
            _ => Err(RouterError::Config(format!(
                "strategy {:?} needs an explicit topology",
                self.strategy
            ))),
        }
    }

    pub fn step_duration(&self) -> SimTime {
        SimTime::from_millis(self.step_duration_ms)
    }

    pub fn over_time(&self) -> Option<SimTime> {
        self.over_time_ms.map(SimTime::from_millis)
    }

    pub fn validate(&self) -> Result<()> {
        if self.node_count == 0 {
            return Err(RouterError::Config("node_count must be positive".into()));
        }
        if self.step_duration_ms == 0 {
            return Err(RouterError::Config("step_duration_ms must be positive".into()));
        }
        if self.strategy != StrategyKind::Convention && self.init_table.is_none() {
            return Err(RouterError::Config(format!(
                "strategy {:?} requires init_table",
                self.strategy
            )));
        }
        if self.controller.connect_timeout_ms == 0 || self.controller.request_timeout_ms == 0 {
            return Err(RouterError::Config("controller timeouts must be positive".into()));
        }
        if !(self.traffic.flow_rate_mbps > 0.0) || self.traffic.message_bytes == 0 {
            return Err(RouterError::Config(
                "traffic needs positive flow_rate_mbps and message_bytes".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.traffic.hop_loss_rate) {
            return Err(RouterError::Config("hop_loss_rate must be in [0, 1)".into()));
        }
        let adjacency = self.adjacency()?;
        if self.strategy == StrategyKind::Probabilistic {
            // 显式拓扑下，初始概率表的非零项必须对应真实链路
            let topo = Topology::load(adjacency, self.node_count)?;
            RoutingPolicy::build(self.strategy, &topo, self.init_table.as_deref())?;
        }
        Ok(())
    }
}
