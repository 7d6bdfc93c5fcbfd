//! 人工反馈服务 - 业务能力层
//!
//! 提交反馈成功后通过 `mpsc` 通知训练状态监视器；
//! 监视器定时刷新训练状态，收到通知后稍等片刻再刷新一次。

use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::clients::ApiClient;
use crate::config::Config;
use crate::error::RequestOutcome;
use crate::models::feedback::{
    FeedbackExport, FeedbackRequest, FeedbackResponse, FeedbackStats, FeedbackSubmitted,
    TrainingStatus,
};
use crate::services::background::{BackgroundTask, MIN_TICK_PERIOD};

/// 反馈通知通道容量
pub const FEEDBACK_CHANNEL_CAPACITY: usize = 16;

/// 收到反馈通知后，等待后端处理的时间
pub const FEEDBACK_REFRESH_DELAY: Duration = Duration::from_secs(1);

/// 创建反馈通知通道
pub fn feedback_channel() -> (mpsc::Sender<FeedbackSubmitted>, mpsc::Receiver<FeedbackSubmitted>) {
    mpsc::channel(FEEDBACK_CHANNEL_CAPACITY)
}

// ========== 反馈提交 ==========

pub struct FeedbackService {
    client: ApiClient,
    notifier: mpsc::Sender<FeedbackSubmitted>,
}

impl FeedbackService {
    pub fn new(client: ApiClient, notifier: mpsc::Sender<FeedbackSubmitted>) -> Self {
        Self { client, notifier }
    }

    /// 提交一条人工反馈
    pub async fn submit(&self, feedback: &FeedbackRequest) -> RequestOutcome<FeedbackResponse> {
        let response = self.client.submit_feedback(feedback).await?;
        info!("✓ 反馈已提交: {}", response.feedback_id);

        let notice = FeedbackSubmitted {
            feedback_id: response.feedback_id.clone(),
        };
        // 通道已满说明刷新已在排队
        if let Err(e) = self.notifier.try_send(notice) {
            debug!("反馈通知未送达: {}", e);
        }
        Ok(response)
    }

    pub async fn stats(&self) -> RequestOutcome<FeedbackStats> {
        self.client.get_feedback_stats().await
    }

    pub async fn export(&self) -> RequestOutcome<FeedbackExport> {
        self.client.export_feedback().await
    }
}

// ========== 训练状态 ==========

/// 训练状态监视器
pub struct TrainingStatusMonitor {
    client: ApiClient,
    refresh_interval: Duration,
    feedback_delay: Duration,
    status: watch::Sender<Option<TrainingStatus>>,
}

impl TrainingStatusMonitor {
    pub fn new(client: ApiClient, config: &Config) -> Self {
        let (status, _) = watch::channel(None);
        Self {
            client,
            refresh_interval: config.training_refresh_interval(),
            feedback_delay: FEEDBACK_REFRESH_DELAY,
            status,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<TrainingStatus>> {
        self.status.subscribe()
    }

    pub fn latest(&self) -> Option<TrainingStatus> {
        self.status.borrow().clone()
    }

    /// 拉取一次训练状态，失败时保留上一次的值
    pub async fn refresh(&self) -> bool {
        match self.client.get_training_status().await {
            Ok(status) => {
                debug!("训练状态: {} (样本 {})", status.status, status.total_samples_used);
                self.status.send_replace(Some(status));
                true
            }
            Err(e) => {
                warn!("⚠️  获取训练状态失败: {}", e);
                false
            }
        }
    }

    /// 在后台运行：立即刷新一次，之后定时刷新，并响应反馈通知
    pub fn spawn(self, mut feedback: mpsc::Receiver<FeedbackSubmitted>) -> BackgroundTask {
        let handle = tokio::spawn(async move {
            let mut ticker = interval(self.refresh_interval.max(MIN_TICK_PERIOD));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut feedback_open = true;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.refresh().await;
                    }
                    notice = feedback.recv(), if feedback_open => match notice {
                        Some(notice) => {
                            debug!("收到反馈 {}，{:?} 后刷新", notice.feedback_id, self.feedback_delay);
                            sleep(self.feedback_delay).await;
                            self.refresh().await;
                        }
                        None => feedback_open = false,
                    },
                }
            }
        });
        BackgroundTask::new("training-status", handle)
    }
}
