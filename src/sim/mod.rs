//! 离散事件仿真内核
//!
//! 纳秒精度的仿真时钟、事件队列与世界接口，演示框架在其上驱动路由会话。

mod event;
mod simulator;
mod time;

pub use event::{Event, World};
pub use simulator::Simulator;
pub use time::SimTime;
