//! 与外部控制器之间的文本协议
//!
//! - 状态上报：`s@@<step>@@<mbps,...>`（行主序 `n × n`）
//! - 奖励上报：`r@@<step>@@<d,l/>*<gd,gl>`（全局一组总在最后）

use crate::epoch::StepReward;

pub const STATE_TAG: &str = "s";
pub const REWARD_TAG: &str = "r";
const SEP: &str = "@@";

/// 由行主序吞吐量矩阵生成状态上报
pub fn encode_state(step: u64, throughput_mbps: &[f64]) -> String {
    let body: Vec<String> = throughput_mbps.iter().map(|v| format!("{v:.6}")).collect();
    format!("{STATE_TAG}{SEP}{step}{SEP}{}", body.join(","))
}

/// 生成奖励上报，每个实体一组，以 `/` 结尾
pub fn encode_reward(reward: &StepReward) -> String {
    let mut out = format!("{REWARD_TAG}{SEP}{}{SEP}", reward.step);
    for (delay, loss) in &reward.entities {
        out.push_str(&format!("{delay:.6},{loss:.6}/"));
    }
    out.push_str(&format!("{:.6},{:.6}", reward.avg_delay, reward.loss_rate));
    out
}

/// 控制器一侧看到的请求
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerRequest {
    State {
        step: u64,
        throughput_mbps: Vec<f64>,
    },
    Reward {
        step: u64,
        entities: Vec<(f64, f64)>,
        avg_delay: f64,
        loss_rate: f64,
    },
}

impl ControllerRequest {
    pub fn step(&self) -> u64 {
        match self {
            ControllerRequest::State { step, .. } | ControllerRequest::Reward { step, .. } => *step,
        }
    }
}

/// 解析 [`encode_state`] / [`encode_reward`] 产生的请求
pub fn decode_request(raw: &str) -> Result<ControllerRequest, String> {
    let mut parts = raw.trim().splitn(3, SEP);
    let tag = parts.next().unwrap_or_default();
    let step: u64 = parts
        .next()
        .ok_or_else(|| format!("missing step in {raw:?}"))?
        .parse()
        .map_err(|_| format!("bad step in {raw:?}"))?;
    let body = parts.next().ok_or_else(|| format!("missing body in {raw:?}"))?;

    match tag {
        STATE_TAG => {
            let throughput_mbps = body
                .split(',')
                .filter(|t| !t.is_empty())
                .map(|t| t.parse::<f64>().map_err(|_| format!("bad throughput {t:?}")))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ControllerRequest::State {
                step,
                throughput_mbps,
            })
        }
        REWARD_TAG => {
            let mut groups = body
                .split('/')
                .map(parse_pair)
                .collect::<Result<Vec<_>, _>>()?;
            let (avg_delay, loss_rate) = groups
                .pop()
                .ok_or_else(|| format!("missing global pair in {raw:?}"))?;
            Ok(ControllerRequest::Reward {
                step,
                entities: groups,
                avg_delay,
                loss_rate,
            })
        }
        other => Err(format!("unknown request tag {other:?}")),
    }
}

fn parse_pair(group: &str) -> Result<(f64, f64), String> {
    let (a, b) = group
        .split_once(',')
        .ok_or_else(|| format!("bad group {group:?}"))?;
    let a = a.trim().parse().map_err(|_| format!("bad delay {a:?}"))?;
    let b = b.trim().parse().map_err(|_| format!("bad loss {b:?}"))?;
    Ok((a, b))
}
