//! 演示框架的仿真世界：持有路由会话与每台主机的发包状态

use std::any::Any;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::error;

use super::ecmp::EcmpTable;
use crate::config::SessionConfig;
use crate::controller::ControllerChannel;
use crate::error::{Result, RouterError};
use crate::net::NodeId;
use crate::session::Session;
use crate::sim::{SimTime, Simulator, World};

/// 每台主机上的发包应用状态
#[derive(Debug, Clone)]
pub struct HostApp {
    pub node: NodeId,
    /// 当前所在 step
    pub step: u64,
    /// 当前 step 的起始时刻（首次发包时初始化）
    pub step_started: Option<SimTime>,
    /// 当前 step 已发出的包数
    pub sent_in_step: u64,
}

/// 演示框架统计
#[derive(Debug, Default, Clone, Copy)]
pub struct HarnessStats {
    pub sent_pkts: u64,
    pub delivered_pkts: u64,
    pub dropped_pkts: u64,
    pub ttl_expired_pkts: u64,
}

pub struct RlWorld {
    pub session: Session,
    pub hosts: Vec<HostApp>,
    pub stats: HarnessStats,
    pub(crate) ecmp: EcmpTable,
    pub(crate) rng: ChaCha8Rng,
    pub(crate) total_steps: u64,
    pub(crate) step_duration: SimTime,
    pub(crate) over_time: Option<SimTime>,
    /// 平均发包间隔（秒）
    pub(crate) send_interval_secs: f64,
    pub(crate) link_latency: SimTime,
    pub(crate) message_bytes: u32,
    pub(crate) hop_loss_rate: f64,
    fatal: Option<RouterError>,
}

impl RlWorld {
    pub fn new(cfg: &SessionConfig, channel: Box<dyn ControllerChannel>) -> Result<Self> {
        let session = Session::new(cfg, channel)?;
        let ecmp = EcmpTable::build(session.topology(), cfg.seed);
        let hosts = (0..cfg.node_count)
            .map(|i| HostApp {
                node: NodeId(i),
                step: 0,
                step_started: None,
                sent_in_step: 0,
            })
            .collect();

        // 每台主机以 flow_rate 向每个目的地发包：间隔 = message_bits / rate
        let send_interval_secs =
            f64::from(cfg.traffic.message_bytes) * 8.0 / (cfg.traffic.flow_rate_mbps * 1e6);

        Ok(Self {
            session,
            hosts,
            stats: HarnessStats::default(),
            ecmp,
            // 与路由会话使用不同的随机流
            rng: ChaCha8Rng::seed_from_u64(cfg.seed ^ 0x5EED_CAFE),
            total_steps: cfg.total_steps,
            step_duration: cfg.step_duration(),
            over_time: cfg.over_time(),
            send_interval_secs,
            link_latency: SimTime::from_micros(cfg.traffic.link_latency_us),
            message_bytes: cfg.traffic.message_bytes,
            hop_loss_rate: cfg.traffic.hop_loss_rate,
            fatal: None,
        })
    }

    pub fn is_failed(&self) -> bool {
        self.fatal.is_some()
    }

    /// 记录第一个致命错误并中止仿真
    pub(crate) fn fail(&mut self, err: RouterError, sim: &mut Simulator) {
        error!(error = %err, now = ?sim.now(), "❌ 致命错误，中止仿真");
        if self.fatal.is_none() {
            self.fatal = Some(err);
        }
        sim.halt();
    }

    pub fn take_error(&mut self) -> Option<RouterError> {
        self.fatal.take()
    }
}

impl World for RlWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub(crate) fn rl_world(world: &mut dyn World) -> &mut RlWorld {
    world
        .as_any_mut()
        .downcast_mut::<RlWorld>()
        .expect("world must be RlWorld")
}
