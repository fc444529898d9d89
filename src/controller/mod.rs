//! 控制器同步通道：线协议编解码与传输

mod channel;
pub mod wire;

pub use channel::{ControllerChannel, REWARD_ACK, StaticController, ZmqChannel, endpoint};
pub use wire::{ControllerRequest, decode_request, encode_reward, encode_state};
