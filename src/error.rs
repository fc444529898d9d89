//! 错误类型
//!
//! 所有错误对一次仿真运行都是致命的：控制器不可替代，也没有重试路径。

use thiserror::Error;

use crate::net::NodeId;

/// 路由核心的统一错误类型
#[derive(Debug, Error)]
pub enum RouterError {
    /// 邻接描述无法解析为拓扑
    #[error("malformed topology: {0}")]
    MalformedTopology(String),

    /// 控制器回复无法解析为当前策略需要的表结构
    #[error("malformed policy update: {0}")]
    MalformedPolicyUpdate(String),

    /// 显式路径中找不到当前节点（上游数据损坏）
    #[error("routing integrity violated at {at:?} for flow {src:?}->{dst:?}: {reason}")]
    RoutingIntegrity {
        at: NodeId,
        src: NodeId,
        dst: NodeId,
        reason: String,
    },

    /// 与控制器之间的传输失败
    #[error("controller channel: {0}")]
    Channel(#[from] ChannelError),

    /// 配置不一致
    #[error("invalid config: {0}")]
    Config(String),
}

/// 控制器通道错误
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("cannot reach controller at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: zmq::Error,
    },

    #[error("no reply within {timeout_ms} ms")]
    Deadline { timeout_ms: u64 },

    #[error("transport failure: {0}")]
    Zmq(#[from] zmq::Error),

    #[error("reply is not valid utf-8")]
    Encoding,

    /// 收到的请求不符合线协议
    #[error("protocol violation: {0}")]
    Protocol(String),
}

pub type Result<T> = std::result::Result<T, RouterError>;
