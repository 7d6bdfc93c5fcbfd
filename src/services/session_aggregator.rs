//! 会话聚合服务 - 业务能力层
//!
//! 持有本次会话的分析历史与全局计数器，是两者唯一的写入方。
//! 每次修改都整体替换旧值并通过 `watch` 广播，订阅方只会看到完整的快照。

use chrono::{Duration as ChronoDuration, Local};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tracing::debug;

use crate::config::Config;
use crate::models::history::SOURCE_TEXT_CHARS;
use crate::models::{
    AnalysisResult, BatchItemResult, GlobalCounters, HistoryRecord, RecordKind, RiskLevel,
    SessionMetrics, StatsResponse,
};

/// 默认历史容量
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// 会话聚合器
pub struct SessionAggregator {
    capacity: usize,
    /// 下一条记录的序号（从 1 开始）
    next_sequence: AtomicU64,
    history: watch::Sender<Vec<HistoryRecord>>,
    counters: watch::Sender<GlobalCounters>,
}

impl SessionAggregator {
    pub fn new(capacity: usize) -> Self {
        let (history, _) = watch::channel(Vec::new());
        let (counters, _) = watch::channel(GlobalCounters::default());
        Self {
            capacity: capacity.max(1),
            next_sequence: AtomicU64::new(1),
            history,
            counters,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.history_capacity)
    }

    // ========== 历史 ==========

    /// 记录一次单条分析
    ///
    /// # 参数
    /// - `result`: 分析结果
    /// - `text`: 原文（保存前 200 个字符）
    /// - `request_id`: 原始请求 id，缺省时使用序号
    ///
    /// # 返回
    /// 新插入的记录
    pub fn add_individual_result(
        &self,
        result: &AnalysisResult,
        text: &str,
        request_id: Option<&str>,
    ) -> HistoryRecord {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        let now = Local::now();

        let record = HistoryRecord {
            id: format!("ind-{}-{}", now.timestamp_millis(), sequence),
            request_id: request_id
                .map(str::to_string)
                .unwrap_or_else(|| sequence.to_string()),
            sequence_number: sequence,
            timestamp: now,
            kind: RecordKind::Individual,
            source_text: text.chars().take(SOURCE_TEXT_CHARS).collect(),
            classification: result.classification,
            probability: result.confidence,
            risk_level: RiskLevel::derive(
                result.classification,
                Some(result.risk_label.as_str()),
                result.confidence,
            ),
            risk_label: result.risk_label.clone(),
            entities: result.entities.clone(),
        };

        self.prepend(vec![record.clone()]);
        record
    }

    /// 记录一次批量分析的全部结果
    ///
    /// 整批作为一个块插入到历史最前面，块内保持输入顺序。
    /// 第 i 条的时间戳为批量时间加 i 毫秒。
    pub fn add_batch_results(&self, results: &[BatchItemResult]) -> usize {
        if results.is_empty() {
            return 0;
        }

        let first_sequence = self
            .next_sequence
            .fetch_add(results.len() as u64, Ordering::SeqCst);
        let now = Local::now();

        let records: Vec<HistoryRecord> = results
            .iter()
            .enumerate()
            .map(|(index, result)| {
                let sequence = first_sequence + index as u64;
                HistoryRecord {
                    id: format!("batch-{}-{}", now.timestamp_millis(), sequence),
                    request_id: result.id.clone(),
                    sequence_number: sequence,
                    timestamp: now + ChronoDuration::milliseconds(index as i64),
                    kind: RecordKind::Batch,
                    source_text: result.text_preview.clone(),
                    classification: result.classification,
                    probability: result.probability,
                    risk_level: RiskLevel::derive(
                        result.classification,
                        Some(result.risk_label.as_str()),
                        result.probability,
                    ),
                    risk_label: result.risk_label.clone(),
                    entities: result.entities.clone(),
                }
            })
            .collect();

        let count = records.len();
        self.prepend(records);
        count
    }

    /// 新记录放在最前面，超出容量时丢弃最旧的
    fn prepend(&self, mut records: Vec<HistoryRecord>) {
        let capacity = self.capacity;
        self.history.send_modify(|history| {
            let retained = capacity.saturating_sub(records.len());
            records.truncate(capacity);
            records.extend(history.iter().take(retained).cloned());
            *history = records;
        });
        debug!("历史记录数: {}", self.history.borrow().len());
    }

    pub fn clear_history(&self) {
        self.history.send_replace(Vec::new());
    }

    /// 当前历史快照（最新在前）
    pub fn history(&self) -> Vec<HistoryRecord> {
        self.history.borrow().clone()
    }

    /// 由当前历史推导的会话指标
    pub fn metrics(&self) -> SessionMetrics {
        SessionMetrics::from_history(&self.history.borrow())
    }

    pub fn subscribe_history(&self) -> watch::Receiver<Vec<HistoryRecord>> {
        self.history.subscribe()
    }

    // ========== 计数器 ==========

    pub fn counters(&self) -> GlobalCounters {
        *self.counters.borrow()
    }

    pub fn subscribe_counters(&self) -> watch::Receiver<GlobalCounters> {
        self.counters.subscribe()
    }

    /// 用服务端统计整体覆盖本地计数器
    pub fn apply_server_stats(&self, stats: &StatsResponse) {
        self.counters.send_replace(GlobalCounters::from(stats));
    }

    /// 成功完成 `count` 次分析后的乐观自增
    pub fn record_successful_requests(&self, count: u64) {
        if count == 0 {
            return;
        }
        self.counters.send_modify(|current| {
            *current = GlobalCounters {
                total_requests: current.total_requests + count,
                ..*current
            };
        });
    }

    /// 本次会话的访问已被服务端接受
    pub fn record_visit(&self) {
        self.counters.send_modify(|current| {
            *current = GlobalCounters {
                site_visits: current.site_visits + 1,
                ..*current
            };
        });
    }
}

impl Default for SessionAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
