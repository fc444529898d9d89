//! 主机上的发包应用
//!
//! 每个发送周期向所有其它主机各发一个包；step 计时超过步长时依次上报
//! 发包数、节点结束与吞吐，并在 `over_time` 之后安排一次超时检查。

use rand::Rng;
use tracing::{debug, info, trace};

use super::hop::inject;
use super::world::rl_world;
use crate::net::{Flow, NodeId};
use crate::sim::{Event, SimTime, Simulator, World};

/// 事件：某台主机的发送定时器到期
#[derive(Debug)]
pub struct SendTick {
    pub host: NodeId,
}

impl Event for SendTick {
    #[tracing::instrument(skip(self, sim, world), fields(host = ?self.host))]
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let w = rl_world(world);
        if w.is_failed() {
            return;
        }
        let now = sim.now();
        let idx = self.host.0;

        if w.hosts[idx].step >= w.total_steps {
            trace!("已完成全部 step，停止发包");
            return;
        }

        let started = *w.hosts[idx].step_started.get_or_insert(now);
        let elapsed = now.saturating_sub(started);
        if elapsed > w.step_duration {
            let step = w.hosts[idx].step;
            let sent = w.hosts[idx].sent_in_step;
            debug!(step, sent, elapsed = ?elapsed, "⏱️  step 计时到期");

            w.session.report_packets_sent(step, sent);
            w.session.report_node_step_end(step, now);
            // 样本可能在最后一个节点结束前就已到齐
            let reported = w
                .session
                .check_step_timeout(step, now)
                .and_then(|_| w.session.report_step_throughput(step, elapsed));
            if let Err(e) = reported {
                w.fail(e, sim);
                return;
            }

            if let Some(over_time) = w.over_time {
                sim.schedule(now.saturating_add(over_time), StepOvertime { step });
            }

            let app = &mut w.hosts[idx];
            app.step_started = Some(now);
            app.step += 1;
            app.sent_in_step = 0;
            if app.step >= w.total_steps {
                info!(host = ?self.host, "🛑 主机完成全部 step");
                return;
            }
        }

        let n = w.hosts.len();
        let step = w.hosts[idx].step;
        for dst in (0..n).filter(|&d| d != idx) {
            let flow = Flow {
                src: self.host,
                dst: NodeId(dst),
                step,
                id: w.session.next_send_id(),
                size_bytes: w.message_bytes,
            };
            inject(sim, now, flow);
            w.hosts[idx].sent_in_step += 1;
            w.stats.sent_pkts += 1;
        }

        // 有界均匀分布的发包间隔
        let jitter: f64 = w.rng.gen_range(0.9..1.1);
        let next = now.saturating_add(SimTime::from_secs_f64(w.send_interval_secs * jitter));
        sim.schedule(next, SendTick { host: self.host });
    }
}

/// 事件：step 结束 `over_time` 之后的强制关闭检查
#[derive(Debug)]
pub struct StepOvertime {
    pub step: u64,
}

impl Event for StepOvertime {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let w = rl_world(world);
        if w.is_failed() || w.session.coordinator().is_closed(self.step) {
            return;
        }
        if let Err(e) = w.session.check_step_timeout(self.step, sim.now()) {
            w.fail(e, sim);
        }
    }
}
