//! 逐跳转发事件

use rand::Rng;
use tracing::{debug, trace, warn};

use super::world::{RlWorld, rl_world};
use crate::net::{Flow, Location, NodeId, PathHint};
use crate::routing::Decision;
use crate::sim::{Event, SimTime, Simulator, World};

/// 单个包在网络中允许经过的最大跳数
pub const MAX_HOPS: u32 = 64;

/// 事件：包到达某个位置（主机或路由器）
#[derive(Debug)]
pub struct HopArrival {
    pub flow: Flow,
    pub hint: PathHint,
    pub at: Location,
    pub sent_at: SimTime,
    pub hops: u32,
}

impl Event for HopArrival {
    #[tracing::instrument(skip(self, sim, world), fields(pkt_id = self.flow.id, step = self.flow.step, at = %self.at))]
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let w = rl_world(world);
        if w.is_failed() {
            return;
        }
        let HopArrival {
            flow,
            mut hint,
            at,
            sent_at,
            hops,
        } = *self;
        let now = sim.now();

        // 到达目的主机
        if at == Location::Host(flow.dst) {
            deliver(w, sim, &flow, sent_at, now);
            return;
        }

        if hops >= MAX_HOPS {
            w.stats.ttl_expired_pkts += 1;
            warn!(pkt_id = flow.id, at = %at, hops, "⚠️  超过最大跳数，丢弃");
            return;
        }

        let decision = match w.session.decide(&flow, &mut hint, at) {
            Ok(d) => d,
            Err(e) => {
                w.fail(e, sim);
                return;
            }
        };

        let to = match decision {
            Decision::Router { next, .. } => Location::Router(next),
            Decision::Host { host, .. } => Location::Host(host),
            Decision::Delegated => {
                let from = at.node();
                match w.ecmp.pick(from, flow.dst, flow.id) {
                    Some(next) => {
                        w.session.record_link_traffic(from, next, flow.size_bytes);
                        Location::Router(next)
                    }
                    None => {
                        w.stats.dropped_pkts += 1;
                        warn!(pkt_id = flow.id, from = ?from, dst = ?flow.dst, "⚠️  目的不可达，丢弃");
                        return;
                    }
                }
            }
        };

        // 只有路由器之间的链路会随机丢包
        if matches!((at, to), (Location::Router(_), Location::Router(_))) && roll_loss(w) {
            w.stats.dropped_pkts += 1;
            trace!(pkt_id = flow.id, at = %at, to = %to, "链路丢包");
            return;
        }

        trace!(pkt_id = flow.id, at = %at, to = %to, "➡️  下一跳");
        sim.schedule(
            now.saturating_add(w.link_latency),
            HopArrival {
                flow,
                hint,
                at: to,
                sent_at,
                hops: hops + 1,
            },
        );
    }
}

fn roll_loss(w: &mut RlWorld) -> bool {
    w.hop_loss_rate > 0.0 && w.rng.r#gen::<f64>() < w.hop_loss_rate
}

fn deliver(w: &mut RlWorld, sim: &mut Simulator, flow: &Flow, sent_at: SimTime, now: SimTime) {
    w.stats.delivered_pkts += 1;
    let delay = now.saturating_sub(sent_at);
    debug!(pkt_id = flow.id, step = flow.step, delay = ?delay, "📥 包送达");
    if let Err(e) = w.session.report_delay_sample(flow, delay, now) {
        w.fail(e, sim);
    }
}

/// 从主机 `src` 注入一个包
pub(crate) fn inject(sim: &mut Simulator, at: SimTime, flow: Flow) {
    let src: NodeId = flow.src;
    sim.schedule(
        at,
        HopArrival {
            flow,
            hint: PathHint::empty(),
            at: Location::Host(src),
            sent_at: at,
            hops: 0,
        },
    );
}
