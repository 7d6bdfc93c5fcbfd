//! 后台任务句柄

use std::time::Duration;
use tokio::task::JoinHandle;

/// 后台定时任务的最短周期（tokio 的 interval 不接受 0）
pub const MIN_TICK_PERIOD: Duration = Duration::from_secs(1);

/// 后台任务句柄，丢弃时终止任务
#[derive(Debug)]
pub struct BackgroundTask {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl BackgroundTask {
    pub fn new(name: &'static str, handle: JoinHandle<()>) -> Self {
        Self { name, handle }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// 立即终止任务
    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for BackgroundTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
