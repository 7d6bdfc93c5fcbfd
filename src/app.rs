//! 应用入口
//!
//! 负责组装各层：解析后端地址 → 同步计数器 → 启动后台任务 → 执行分析 → 导出历史。

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::clients::{ApiClient, EndpointResolver, ReqwestTransport, Transport};
use crate::config::Config;
use crate::error::{AppError, AppResult, RequestOutcome};
use crate::models::feedback::{FeedbackRequest, FeedbackResponse, TrainingStatus};
use crate::models::loaders::{validate_file, write_example_template};
use crate::models::{BatchItemResult, BatchSummary, HistoryRecord};
use crate::orchestrator::BatchProcessor;
use crate::services::{
    export_history_csv, feedback_channel, BackgroundTask, CounterSync, FeedbackService,
    SessionAggregator, SessionFlags, TrainingStatusMonitor,
};
use crate::utils::logging::{log_batch_start, log_startup, print_session_metrics};
use crate::workflow::ItemFlow;

/// 应用主结构
pub struct App {
    config: Config,
    client: ApiClient,
    aggregator: Arc<SessionAggregator>,
    counter_sync: CounterSync,
    feedback: FeedbackService,
    training_status: watch::Receiver<Option<TrainingStatus>>,
    _poller: BackgroundTask,
    _training_monitor: BackgroundTask,
}

impl App {
    /// 初始化应用（使用 reqwest 传输）
    pub async fn initialize(config: Config) -> Result<Self> {
        let transport = ReqwestTransport::new().context("无法创建 HTTP 客户端")?;
        Self::with_transport(config, Arc::new(transport)).await
    }

    /// 使用指定的传输实现初始化应用
    pub async fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Result<Self> {
        // 后端地址只解析一次
        let resolver = EndpointResolver::new(&config, transport.clone());
        let endpoint = resolver.resolve().await;
        log_startup(&endpoint);

        let client = ApiClient::new(&config, endpoint, transport);
        if client.check_connection().await {
            info!("✓ 后端在线");
        } else {
            warn!("⚠️  后端暂不可用，请求将按策略重试");
        }

        let aggregator = Arc::new(SessionAggregator::from_config(&config));
        let counter_sync = CounterSync::new(
            client.clone(),
            aggregator.clone(),
            Arc::new(SessionFlags::new()),
        );
        counter_sync.initialize().await;
        let poller = counter_sync.spawn_poller(config.stats_poll_interval());

        let (notifier, notices) = feedback_channel();
        let monitor = TrainingStatusMonitor::new(client.clone(), &config);
        let training_status = monitor.subscribe();
        let training_monitor = monitor.spawn(notices);

        Ok(Self {
            feedback: FeedbackService::new(client.clone(), notifier),
            config,
            client,
            aggregator,
            counter_sync,
            training_status,
            _poller: poller,
            _training_monitor: training_monitor,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        let mut did_work = false;

        if let Some(text) = self.config.analyze_text.clone() {
            did_work = true;
            if let Err(e) = self.analyze_text(&text).await {
                error!("❌ {}", e.user_message());
            }
        }

        if let Some(input) = self.config.input_file.clone() {
            did_work = true;
            self.process_file(Path::new(&input))
                .await
                .with_context(|| format!("批量处理失败: {}", input))?;
        }

        if !did_work {
            warn!("⚠️ 未设置 INPUT_FILE 或 ANALYZE_TEXT，程序结束");
            return Ok(());
        }

        let history = self.aggregator.history();
        let export_path = if history.is_empty() {
            None
        } else {
            let path = PathBuf::from(&self.config.output_file);
            export_history_csv(&history, &path).await?;
            Some(self.config.output_file.as_str())
        };

        print_session_metrics(&self.aggregator.metrics(), export_path);
        Ok(())
    }

    /// 分析单段文本并写入历史
    pub async fn analyze_text(&self, text: &str) -> RequestOutcome<HistoryRecord> {
        let result = self.client.analyze_text(text).await?;
        self.aggregator.record_successful_requests(1);
        let record = self.aggregator.add_individual_result(&result, text, None);
        info!(
            "✓ {} | 风险: {} | 置信度: {:.1}%",
            record.classification.label(),
            record.risk_level.label(),
            record.probability * 100.0
        );
        Ok(record)
    }

    /// 校验并批量分析一个表格文件
    ///
    /// 校验失败时在同目录写出示例模板，并返回校验错误。
    pub async fn process_file(&self, path: &Path) -> AppResult<Vec<BatchItemResult>> {
        let items = match validate_file(path).await {
            Ok(items) => items,
            Err(e) => {
                error!("❌ {}", e);
                let dir = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or_else(|| Path::new("."));
                match write_example_template(dir).await {
                    Ok(template) => info!("📄 示例文件已生成: {}", template.display()),
                    Err(io) => warn!("⚠️  示例文件写入失败: {}", io),
                }
                return Err(AppError::from(e));
            }
        };

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        log_batch_start(items.len(), &file_name);

        let processor = BatchProcessor::with_flow(
            ItemFlow::new(self.client.clone()).with_verbose_logging(self.config.verbose_logging),
        );
        let results = processor
            .run_batch_with_progress(&items, |done, total| {
                info!("⏳ 进度: {}/{}", done, total);
            })
            .await;

        let summary = BatchSummary::from_results(&results);
        self.aggregator
            .record_successful_requests(summary.succeeded as u64);
        self.aggregator.add_batch_results(&results);

        Ok(results)
    }

    /// 提交人工反馈
    pub async fn submit_feedback(&self, feedback: &FeedbackRequest) -> RequestOutcome<FeedbackResponse> {
        self.feedback.submit(feedback).await
    }

    pub fn aggregator(&self) -> &Arc<SessionAggregator> {
        &self.aggregator
    }

    pub fn counter_sync(&self) -> &CounterSync {
        &self.counter_sync
    }

    pub fn feedback(&self) -> &FeedbackService {
        &self.feedback
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// 最近一次获取到的训练状态
    pub fn training_status(&self) -> Option<TrainingStatus> {
        self.training_status.borrow().clone()
    }
}
