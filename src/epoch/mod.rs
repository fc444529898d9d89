//! 每个 epoch（step）的统计聚合与结束判定

mod coordinator;
mod record;
mod reward;

use serde::{Deserialize, Serialize};

pub use coordinator::EpochCoordinator;
pub use record::{StepPhase, StepRecord};
pub use reward::{EntityScope, StepReward, loss_rate, mean};

/// 奖励上报的粒度（配置中的 `return_mode`）
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReturnMode {
    #[default]
    Global,
    Distributed,
}

impl ReturnMode {
    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_lowercase().as_str() {
            "global" => Ok(Self::Global),
            "distributed" => Ok(Self::Distributed),
            _ => Err(format!("unknown return mode: {raw}")),
        }
    }
}
