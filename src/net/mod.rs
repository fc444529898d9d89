//! 网络模型
//!
//! 节点/链路标识、拓扑存储、链路流量计数以及流的描述。

mod flow;
mod id;
mod matrix;
mod topology;
mod traffic;

pub use flow::{Flow, PathHint};
pub use id::{LinkId, Location, NodeId};
pub use matrix::Matrix;
pub use topology::Topology;
pub use traffic::TrafficCounter;
