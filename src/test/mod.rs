mod probabilistic;
mod session;

use crate::controller::{ControllerChannel, StaticController};
use crate::error::ChannelError;
use std::sync::{Arc, Mutex};

/// 包一层 `StaticController`，把收到的原始请求记到共享日志里。
pub(crate) struct Recorder {
    inner: StaticController,
    log: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub(crate) fn new(policy_reply: &str) -> (Self, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                inner: StaticController::new(policy_reply),
                log: Arc::clone(&log),
            },
            log,
        )
    }
}

impl ControllerChannel for Recorder {
    fn request(&mut self, message: &str) -> Result<String, ChannelError> {
        self.log.lock().expect("log lock").push(message.to_string());
        self.inner.request(message)
    }
}
