use serde::{Deserialize, Serialize};

use crate::error::ApiErrorKind;
use crate::models::analysis::{AnalysisResult, Classification, Entity};
use crate::utils::logging::truncate_text;

/// 批量结果中文本预览的最大字符数
pub const PREVIEW_CHARS: usize = 100;

/// 批量提交的一条待分析文本
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: String,
    pub text: String,
}

impl WorkItem {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// 批量中单条文本的分析结果
///
/// 每个 [`WorkItem`] 恰好对应一条，失败时也会生成。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItemResult {
    pub id: String,
    pub text_preview: String,
    pub full_text: String,
    pub classification: Classification,
    pub probability: f64,
    /// 服务端风险标签；失败行为 `ERRO_<KIND>`
    pub risk_label: String,
    pub entities: Vec<Entity>,
    /// 失败类型，成功时为 `None`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiErrorKind>,
}

impl BatchItemResult {
    /// 由成功的分析结果构造
    pub fn from_analysis(item: &WorkItem, analysis: AnalysisResult) -> Self {
        Self {
            id: item.id.clone(),
            text_preview: truncate_text(&item.text, PREVIEW_CHARS),
            full_text: item.text.clone(),
            classification: analysis.classification,
            probability: analysis.confidence,
            risk_label: analysis.risk_label,
            entities: analysis.entities,
            error: None,
        }
    }

    /// 为失败的条目合成一条结果
    pub fn failed(item: &WorkItem, kind: ApiErrorKind) -> Self {
        Self {
            id: item.id.clone(),
            text_preview: truncate_text(&item.text, PREVIEW_CHARS),
            full_text: item.text.clone(),
            classification: Classification::Restricted,
            probability: 0.0,
            risk_label: kind.sentinel(),
            entities: Vec::new(),
            error: Some(kind),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// 批量处理统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_results(results: &[BatchItemResult]) -> Self {
        let failed = results.iter().filter(|r| r.is_error()).count();
        Self {
            succeeded: results.len() - failed,
            failed,
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_row_keeps_id_and_preview() {
        let long_text = "x".repeat(150);
        let item = WorkItem::new("PROT-7", long_text.clone());
        let row = BatchItemResult::failed(&item, ApiErrorKind::Offline);

        assert_eq!(row.id, "PROT-7");
        assert_eq!(row.text_preview.chars().count(), PREVIEW_CHARS + 3);
        assert!(row.text_preview.ends_with("..."));
        assert_eq!(row.full_text, long_text);
        assert_eq!(row.classification, Classification::Restricted);
        assert_eq!(row.probability, 0.0);
        assert_eq!(row.risk_label, "ERRO_OFFLINE");
        assert_eq!(row.error, Some(ApiErrorKind::Offline));
    }

    #[test]
    fn test_summary_counts() {
        let item = WorkItem::new("1", "texto");
        let ok = BatchItemResult::from_analysis(
            &item,
            AnalysisResult {
                classification: Classification::Public,
                confidence: 0.1,
                risk_label: "SEGURO".to_string(),
                entities: Vec::new(),
            },
        );
        let failed = BatchItemResult::failed(&item, ApiErrorKind::Timeout);

        let summary = BatchSummary::from_results(&[ok.clone(), failed, ok]);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total(), 3);
    }
}
