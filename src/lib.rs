pub mod config;
pub mod controller;
pub mod epoch;
pub mod error;
pub mod harness;
pub mod net;
pub mod routing;
pub mod session;
pub mod sim;

pub use config::SessionConfig;
pub use error::{ChannelError, Result, RouterError};
pub use session::Session;

#[cfg(test)]
mod test;
