//! 风险等级推导
//!
//! 优先使用服务端给出的风险标签，缺失或无法识别时按概率阈值推导。
//! 分类为“公开”时一律视为 `Safe`。

use phf::phf_map;
use serde::{Deserialize, Serialize};

use crate::models::analysis::Classification;

/// 五档风险等级，按严重程度从高到低排列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Critical,
    High,
    Moderate,
    Low,
    Safe,
}

/// 服务端风险标签（已转大写）到风险等级的映射
static RISK_LABELS: phf::Map<&'static str, RiskLevel> = phf_map! {
    "CRÍTICO" => RiskLevel::Critical,
    "CRITICO" => RiskLevel::Critical,
    "CRITICAL" => RiskLevel::Critical,
    "ALTO" => RiskLevel::High,
    "HIGH" => RiskLevel::High,
    "MODERADO" => RiskLevel::Moderate,
    "MODERATE" => RiskLevel::Moderate,
    "BAIXO" => RiskLevel::Low,
    "LOW" => RiskLevel::Low,
    "SEGURO" => RiskLevel::Safe,
    "SAFE" => RiskLevel::Safe,
};

impl RiskLevel {
    /// 全部等级，从高到低
    pub const ALL: [RiskLevel; 5] = [
        RiskLevel::Critical,
        RiskLevel::High,
        RiskLevel::Moderate,
        RiskLevel::Low,
        RiskLevel::Safe,
    ];

    /// 识别服务端风险标签（大小写不敏感）
    pub fn from_label(label: &str) -> Option<Self> {
        let upper = label.trim().to_uppercase();
        RISK_LABELS.get(upper.as_str()).copied()
    }

    /// 概率阈值推导
    pub fn from_probability(probability: f64, classification: Classification) -> Self {
        if classification == Classification::Public {
            return RiskLevel::Safe;
        }
        match probability {
            p if p >= 0.90 => RiskLevel::Critical,
            p if p >= 0.70 => RiskLevel::High,
            p if p >= 0.40 => RiskLevel::Moderate,
            p if p >= 0.20 => RiskLevel::Low,
            _ => RiskLevel::Safe,
        }
    }

    /// 综合推导：公开 → Safe；否则标签优先，概率兜底
    pub fn derive(classification: Classification, label: Option<&str>, probability: f64) -> Self {
        if classification == Classification::Public {
            return RiskLevel::Safe;
        }
        label
            .and_then(Self::from_label)
            .unwrap_or_else(|| Self::from_probability(probability, classification))
    }

    /// 展示用标签
    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Critical => "Crítico",
            RiskLevel::High => "Alto",
            RiskLevel::Moderate => "Moderado",
            RiskLevel::Low => "Baixo",
            RiskLevel::Safe => "Seguro",
        }
    }
}
