//! 人工反馈相关的数据结构

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 人工对单个实体的判定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HumanValidation {
    Correto,
    Incorreto,
    Parcial,
}

/// 单个实体的反馈
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityFeedback {
    pub tipo: String,
    pub valor: String,
    pub confianca_modelo: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fonte: Option<String>,
    pub validacao_humana: HumanValidation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tipo_corrigido: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comentario: Option<String>,
}

/// `POST /feedback` 请求体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_id: Option<String>,
    pub original_text: String,
    pub entity_feedbacks: Vec<EntityFeedback>,
    pub classificacao_modelo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classificacao_corrigida: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revisor: Option<String>,
}

/// 按实体类型的反馈统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeFeedbackStats {
    pub correct: u64,
    pub incorrect: u64,
    pub partial: u64,
    pub total: u64,
    pub accuracy: f64,
    pub false_positive_rate: f64,
}

/// `GET /feedback/stats` 响应
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackStats {
    pub total_feedbacks: u64,
    pub total_entities_reviewed: u64,
    pub correct: u64,
    pub incorrect: u64,
    pub partial: u64,
    pub accuracy: f64,
    pub false_positive_rate: f64,
    pub by_type: BTreeMap<String, TypeFeedbackStats>,
    pub last_updated: Option<String>,
}

/// `POST /feedback` 响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub feedback_id: String,
    pub message: String,
    #[serde(default)]
    pub stats: FeedbackStats,
}

/// `GET /feedback/export` 响应
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackExport {
    pub total_records: u64,
    pub feedbacks: Vec<serde_json::Value>,
    pub stats: serde_json::Map<String, serde_json::Value>,
    pub exported_at: String,
}

/// 按检测来源汇总的校准情况
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceCalibration {
    pub avg_improvement: f64,
    pub num_calibrations: u64,
    pub total_samples: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingRecommendation {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub action: String,
}

/// `GET /feedback/training-status` 响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingStatus {
    pub status: String,
    pub last_calibration: Option<String>,
    pub total_samples_used: u64,
    pub accuracy_before: f64,
    pub accuracy_after: f64,
    pub improvement_percentage: f64,
    pub time_since_last: String,
    pub by_source: BTreeMap<String, SourceCalibration>,
    pub recommendations: Vec<TrainingRecommendation>,
}

impl Default for TrainingStatus {
    fn default() -> Self {
        Self {
            status: "never_trained".to_string(),
            last_calibration: None,
            total_samples_used: 0,
            accuracy_before: 0.0,
            accuracy_after: 0.0,
            improvement_percentage: 0.0,
            time_since_last: String::new(),
            by_source: BTreeMap::new(),
            recommendations: Vec::new(),
        }
    }
}

/// 反馈提交成功后发给训练状态监视器的通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackSubmitted {
    pub feedback_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_feedback_request_wire_format() {
        let request = FeedbackRequest {
            analysis_id: None,
            original_text: "Meu CPF é 123".to_string(),
            entity_feedbacks: vec![EntityFeedback {
                tipo: "CPF".to_string(),
                valor: "123".to_string(),
                confianca_modelo: 0.9,
                fonte: None,
                validacao_humana: HumanValidation::Incorreto,
                tipo_corrigido: None,
                comentario: None,
            }],
            classificacao_modelo: "NÃO PÚBLICO".to_string(),
            classificacao_corrigida: Some("PÚBLICO".to_string()),
            revisor: None,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value["entity_feedbacks"][0]["validacao_humana"],
            json!("INCORRETO")
        );
        assert!(value.get("analysis_id").is_none());
    }

    #[test]
    fn test_partial_stats_deserialize() {
        let stats: FeedbackStats =
            serde_json::from_value(json!({"total_feedbacks": 4, "accuracy": 0.75})).unwrap();
        assert_eq!(stats.total_feedbacks, 4);
        assert!(stats.by_type.is_empty());
    }

    #[test]
    fn test_training_status_tolerates_partial_payload() {
        let status: TrainingStatus = serde_json::from_value(json!({
            "status": "calibrated",
            "total_samples_used": 12,
            "by_source": {"regex": {"avg_improvement": 0.1, "num_calibrations": 2}},
            "recommendations": [{"type": "info", "message": "ok", "action": "none"}]
        }))
        .unwrap();

        assert_eq!(status.status, "calibrated");
        assert_eq!(status.total_samples_used, 12);
        assert_eq!(status.by_source["regex"].num_calibrations, 2);
        assert_eq!(status.by_source["regex"].total_samples, 0);
        assert_eq!(status.recommendations[0].kind, "info");
        assert_eq!(TrainingStatus::default().status, "never_trained");
    }
}
