//! 计数器同步服务 - 业务能力层
//!
//! - 启动时拉取一次 `/stats`
//! - 每个会话只登记一次访问
//! - 定时轮询 `/stats`，以服务端为准整体覆盖；失败的轮询不改变本地计数

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::clients::ApiClient;
use crate::services::background::{BackgroundTask, MIN_TICK_PERIOD};
use crate::services::session_aggregator::SessionAggregator;

/// 会话级标记
#[derive(Debug, Default)]
pub struct SessionFlags {
    visited: AtomicBool,
}

impl SessionFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visited(&self) -> bool {
        self.visited.load(Ordering::SeqCst)
    }

    /// 标记为已访问；仅第一次调用返回 `true`
    fn mark_visited(&self) -> bool {
        !self.visited.swap(true, Ordering::SeqCst)
    }
}

/// 计数器同步
#[derive(Clone)]
pub struct CounterSync {
    client: ApiClient,
    aggregator: Arc<SessionAggregator>,
    flags: Arc<SessionFlags>,
}

impl CounterSync {
    pub fn new(client: ApiClient, aggregator: Arc<SessionAggregator>, flags: Arc<SessionFlags>) -> Self {
        Self {
            client,
            aggregator,
            flags,
        }
    }

    /// 拉取初始计数，然后登记本次会话的访问
    pub async fn initialize(&self) {
        if self.refresh().await {
            let counters = self.aggregator.counters();
            info!(
                "📈 全局计数: 访问 {}，分析请求 {}",
                counters.site_visits, counters.total_requests
            );
        }
        self.register_visit_once().await;
    }

    /// 拉取一次 `/stats`
    ///
    /// # 返回
    /// 是否成功覆盖了本地计数
    pub async fn refresh(&self) -> bool {
        match self.client.get_stats().await {
            Ok(stats) => {
                self.aggregator.apply_server_stats(&stats);
                debug!("计数已同步: {:?}", stats);
                true
            }
            Err(e) => {
                warn!("⚠️  获取统计失败，保留本地计数: {}", e);
                false
            }
        }
    }

    /// 每个会话最多登记一次访问
    ///
    /// # 返回
    /// 本次调用是否让本地访问计数加一
    pub async fn register_visit_once(&self) -> bool {
        if !self.flags.mark_visited() {
            debug!("本会话已登记过访问");
            return false;
        }

        match self.client.register_visit().await {
            Ok(()) => {
                self.aggregator.record_visit();
                true
            }
            Err(e) => {
                warn!("⚠️  访问登记失败: {}", e);
                false
            }
        }
    }

    /// 启动定时轮询，返回的句柄被丢弃时停止
    pub fn spawn_poller(&self, period: Duration) -> BackgroundTask {
        let period = period.max(MIN_TICK_PERIOD);
        let sync = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                sync.refresh().await;
            }
        });
        BackgroundTask::new("counter-poller", handle)
    }
}
