use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::analysis::{Classification, Entity};
use crate::models::risk::RiskLevel;

/// 历史记录中保存的原文最大字符数
pub const SOURCE_TEXT_CHARS: usize = 200;

/// 历史记录来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Individual,
    Batch,
}

impl RecordKind {
    pub fn label(self) -> &'static str {
        match self {
            RecordKind::Individual => "Individual",
            RecordKind::Batch => "Lote",
        }
    }
}

/// 会话历史中的一条记录（单条与批量统一格式）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// 记录自身的唯一标识
    pub id: String,
    /// 原始请求 id（表格中的 id，单条分析时为序号）
    pub request_id: String,
    pub sequence_number: u64,
    pub timestamp: DateTime<Local>,
    pub kind: RecordKind,
    pub source_text: String,
    pub classification: Classification,
    pub probability: f64,
    pub risk_level: RiskLevel,
    /// 服务端原始风险标签
    pub risk_label: String,
    pub entities: Vec<Entity>,
}

/// 各风险等级计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskDistribution {
    pub critical: usize,
    pub high: usize,
    pub moderate: usize,
    pub low: usize,
    pub safe: usize,
}

impl RiskDistribution {
    fn bump(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::Critical => self.critical += 1,
            RiskLevel::High => self.high += 1,
            RiskLevel::Moderate => self.moderate += 1,
            RiskLevel::Low => self.low += 1,
            RiskLevel::Safe => self.safe += 1,
        }
    }

    pub fn get(&self, level: RiskLevel) -> usize {
        match level {
            RiskLevel::Critical => self.critical,
            RiskLevel::High => self.high,
            RiskLevel::Moderate => self.moderate,
            RiskLevel::Low => self.low,
            RiskLevel::Safe => self.safe,
        }
    }
}

/// 会话指标，完全由当前历史推导
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub total_processed: usize,
    pub public_count: usize,
    pub non_public_count: usize,
    pub average_confidence: f64,
    pub risk_distribution: RiskDistribution,
    /// 个人信息类型（大写）→ 出现次数
    pub pii_type_counts: BTreeMap<String, usize>,
}

impl SessionMetrics {
    pub fn from_history(history: &[HistoryRecord]) -> Self {
        let mut metrics = SessionMetrics::default();
        let mut total_confidence = 0.0;

        for record in history {
            match record.classification {
                Classification::Public => metrics.public_count += 1,
                Classification::Restricted => metrics.non_public_count += 1,
            }
            total_confidence += record.probability;
            metrics.risk_distribution.bump(record.risk_level);

            for entity in &record.entities {
                *metrics
                    .pii_type_counts
                    .entry(entity.entity_type.to_uppercase())
                    .or_insert(0) += 1;
            }
        }

        metrics.total_processed = history.len();
        if !history.is_empty() {
            metrics.average_confidence = total_confidence / history.len() as f64;
        }
        metrics
    }
}
