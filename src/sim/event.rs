//! 事件与世界
//!
//! 仿真器只认识这两个 trait：事件按时间被取出执行，
//! 执行时可以继续调度新事件，并通过 `World` 访问业务状态。

use super::simulator::Simulator;
use std::any::Any;

/// 可调度的事件。`self: Box<Self>` 让事件执行时可以拿走自己携带的数据（例如包的剩余路径）。
pub trait Event: Send + 'static {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World);
}

/// 事件作用的世界；演示框架中由 `RlWorld` 实现，事件内部再向下转型。
pub trait World: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// 每个事件执行完后回调一次
    fn on_tick(&mut self, _sim: &mut Simulator) {}
}
