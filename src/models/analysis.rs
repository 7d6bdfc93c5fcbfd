use serde::{Deserialize, Serialize};

/// 服务端未给出置信度时使用的默认值
pub const DEFAULT_ENTITY_CONFIDENCE: f64 = 0.95;

/// 服务端未给出风险等级时使用的默认标签
pub const DEFAULT_RISK_LABEL: &str = "BAIXO";

/// `POST /analyze` 请求体
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyzeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub text: String,
}

/// `POST /analyze` 返回的实体
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiEntity {
    pub tipo: String,
    pub valor: String,
    #[serde(default)]
    pub confianca: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fonte: Option<String>,
}

/// `POST /analyze` 响应
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyzeResponse {
    pub has_pii: bool,
    #[serde(default)]
    pub entities: Vec<ApiEntity>,
    #[serde(default)]
    pub risk_level: Option<String>,
    #[serde(default)]
    pub confidence_all_found: Option<f64>,
    #[serde(default)]
    pub total_entities: usize,
    #[serde(default)]
    pub sources_used: Vec<String>,
}

/// 分类结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// 可公开
    Public,
    /// 含个人信息，不可公开
    Restricted,
}

impl Classification {
    pub fn from_has_pii(has_pii: bool) -> Self {
        if has_pii {
            Classification::Restricted
        } else {
            Classification::Public
        }
    }

    /// 展示用标签
    pub fn label(self) -> &'static str {
        match self {
            Classification::Public => "PÚBLICO",
            Classification::Restricted => "NÃO PÚBLICO",
        }
    }
}

/// 文本中检测到的一项个人信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub entity_type: String,
    pub value: String,
    pub confidence: f64,
}

impl From<&ApiEntity> for Entity {
    fn from(entity: &ApiEntity) -> Self {
        Self {
            entity_type: entity.tipo.clone(),
            value: entity.valor.clone(),
            confidence: entity
                .confianca
                .unwrap_or(DEFAULT_ENTITY_CONFIDENCE)
                .clamp(0.0, 1.0),
        }
    }
}

/// 单条分析结果（已映射为内部格式）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub classification: Classification,
    pub confidence: f64,
    pub risk_label: String,
    pub entities: Vec<Entity>,
}

impl From<AnalyzeResponse> for AnalysisResult {
    fn from(response: AnalyzeResponse) -> Self {
        Self {
            classification: Classification::from_has_pii(response.has_pii),
            confidence: response.confidence_all_found.unwrap_or(0.0).clamp(0.0, 1.0),
            risk_label: normalize_risk_label(response.risk_level.as_deref()),
            entities: response.entities.iter().map(Entity::from).collect(),
        }
    }
}

/// 风险标签统一为大写，缺失时使用默认值
pub fn normalize_risk_label(risk_level: Option<&str>) -> String {
    match risk_level.map(str::trim) {
        Some(label) if !label.is_empty() => label.to_uppercase(),
        _ => DEFAULT_RISK_LABEL.to_string(),
    }
}
