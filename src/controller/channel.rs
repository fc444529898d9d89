//! 与控制器的同步请求/应答通道
//!
//! 任意时刻最多只有一个未完成请求；每个请求都有截止时间，超时即返回错误。

use std::time::Duration;

use tracing::{debug, info};

use super::wire::{ControllerRequest, decode_request};
use crate::error::ChannelError;

/// 控制器通道抽象
pub trait ControllerChannel {
    /// 发送一条请求并阻塞等待应答（受截止时间约束）
    fn request(&mut self, message: &str) -> Result<String, ChannelError>;
}

/// ZeroMQ REQ 套接字，对端是控制器的 REP 套接字。
///
/// REQ 严格按「发一条、收一条」交替，正好对应一问一答的同步交换。
pub struct ZmqChannel {
    // 套接字先于 context 释放
    socket: zmq::Socket,
    _ctx: zmq::Context,
    timeout: Duration,
}

/// `127.0.0.1:5555` 补全为 `tcp://127.0.0.1:5555`，已带协议前缀的原样返回。
pub fn endpoint(addr: &str) -> String {
    if addr.contains("://") {
        addr.to_string()
    } else {
        format!("tcp://{addr}")
    }
}

fn millis(d: Duration) -> i32 {
    i32::try_from(d.as_millis()).unwrap_or(i32::MAX)
}

impl ZmqChannel {
    /// 建立 REQ 套接字并连接控制器。
    ///
    /// ZeroMQ 的连接是异步的：控制器不在线时这里不会失败，而是第一次请求超时。
    pub fn connect(
        addr: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, ChannelError> {
        let endpoint = endpoint(addr);
        let connect_err = |source: zmq::Error| ChannelError::Connect {
            addr: endpoint.clone(),
            source,
        };

        let ctx = zmq::Context::new();
        let socket = ctx.socket(zmq::REQ).map_err(connect_err)?;
        socket.set_linger(0).map_err(connect_err)?;
        socket
            .set_connect_timeout(millis(connect_timeout))
            .map_err(connect_err)?;
        socket
            .set_rcvtimeo(millis(request_timeout))
            .map_err(connect_err)?;
        socket
            .set_sndtimeo(millis(request_timeout))
            .map_err(connect_err)?;
        socket.connect(&endpoint).map_err(connect_err)?;
        info!(endpoint = %endpoint, "🔌 已连接控制器");

        Ok(Self {
            socket,
            _ctx: ctx,
            timeout: request_timeout,
        })
    }

    fn deadline_err(&self, e: zmq::Error) -> ChannelError {
        match e {
            zmq::Error::EAGAIN => ChannelError::Deadline {
                timeout_ms: self.timeout.as_millis() as u64,
            },
            other => ChannelError::Zmq(other),
        }
    }
}

impl ControllerChannel for ZmqChannel {
    fn request(&mut self, message: &str) -> Result<String, ChannelError> {
        debug!(len = message.len(), "发送请求");
        self.socket
            .send(message, 0)
            .map_err(|e| self.deadline_err(e))?;
        let reply = self
            .socket
            .recv_string(0)
            .map_err(|e| self.deadline_err(e))?
            .map_err(|_| ChannelError::Encoding)?;
        debug!(len = reply.len(), "收到应答");
        Ok(reply)
    }
}

/// 进程内的固定应答控制器：状态上报一律回复同一份策略，奖励上报只做确认。
///
/// 用于离线运行与测试。
#[derive(Debug, Clone, Default)]
pub struct StaticController {
    policy_reply: String,
}

pub const REWARD_ACK: &str = "reward received";

impl StaticController {
    pub fn new(policy_reply: impl Into<String>) -> Self {
        Self {
            policy_reply: policy_reply.into(),
        }
    }
}

impl ControllerChannel for StaticController {
    fn request(&mut self, message: &str) -> Result<String, ChannelError> {
        match decode_request(message).map_err(ChannelError::Protocol)? {
            ControllerRequest::State { .. } => Ok(self.policy_reply.clone()),
            ControllerRequest::Reward { .. } => Ok(REWARD_ACK.to_string()),
        }
    }
}
