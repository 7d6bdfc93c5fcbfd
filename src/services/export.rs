//! 历史导出服务 - 业务能力层
//!
//! CSV 使用 `;` 分隔并带 UTF-8 BOM，便于表格软件直接打开。

use serde::Serialize;
use std::path::Path;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::HistoryRecord;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub const EXPORT_HEADERS: [&str; 9] = [
    "ID",
    "Data",
    "Horário",
    "Tipo",
    "Classificação",
    "Confiança",
    "Nível de Risco",
    "Prévia do Pedido",
    "Dados Identificados",
];

/// 导出表中的一行
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    #[serde(rename = "ID")]
    pub position: usize,
    #[serde(rename = "Data")]
    pub date: String,
    #[serde(rename = "Horário")]
    pub time: String,
    #[serde(rename = "Tipo")]
    pub kind: &'static str,
    #[serde(rename = "Classificação")]
    pub classification: &'static str,
    #[serde(rename = "Confiança")]
    pub confidence: String,
    #[serde(rename = "Nível de Risco")]
    pub risk_level: &'static str,
    #[serde(rename = "Prévia do Pedido")]
    pub preview: String,
    #[serde(rename = "Dados Identificados")]
    pub identified: String,
}

impl ExportRow {
    pub fn from_record(position: usize, record: &HistoryRecord) -> Self {
        let identified = if record.entities.is_empty() {
            "Nenhum".to_string()
        } else {
            record
                .entities
                .iter()
                .map(|e| format!("{}: {}", e.entity_type, e.value))
                .collect::<Vec<_>>()
                .join("; ")
        };

        Self {
            position,
            date: record.timestamp.format("%d/%m/%Y").to_string(),
            time: record.timestamp.format("%H:%M").to_string(),
            kind: record.kind.label(),
            classification: record.classification.label(),
            confidence: format!("{:.1}%", record.probability * 100.0),
            risk_level: record.risk_level.label(),
            preview: record.source_text.clone(),
            identified,
        }
    }
}

/// 把历史记录按当前顺序转换为导出行（ID 从 1 开始）
pub fn export_rows(history: &[HistoryRecord]) -> Vec<ExportRow> {
    history
        .iter()
        .enumerate()
        .map(|(i, record)| ExportRow::from_record(i + 1, record))
        .collect()
}

/// 生成 CSV 内容
pub fn history_to_csv(history: &[HistoryRecord]) -> AppResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .from_writer(UTF8_BOM.to_vec());

    writer.write_record(EXPORT_HEADERS)?;
    for row in export_rows(history) {
        writer.serialize(row)?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::Other(format!("CSV 写入失败: {}", e)))
}

/// 导出历史为 CSV 文件
///
/// # 参数
/// - `history`: 历史记录（最新在前）
/// - `path`: 输出路径
pub async fn export_history_csv(history: &[HistoryRecord], path: &Path) -> AppResult<()> {
    let content = history_to_csv(history)?;
    tokio::fs::write(path, content)
        .await
        .map_err(|e| AppError::file(path.display().to_string(), e))?;
    info!("💾 已导出 {} 条历史: {}", history.len(), path.display());
    Ok(())
}

/// 导出历史为 JSON 文件
pub async fn export_history_json(history: &[HistoryRecord], path: &Path) -> AppResult<()> {
    let content = serde_json::to_vec_pretty(&export_rows(history))
        .map_err(|e| AppError::Other(format!("JSON 序列化失败: {}", e)))?;
    tokio::fs::write(path, content)
        .await
        .map_err(|e| AppError::file(path.display().to_string(), e))?;
    info!("💾 已导出 {} 条历史: {}", history.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisResult, Classification, Entity};
    use crate::services::SessionAggregator;

    fn sample_history() -> Vec<HistoryRecord> {
        let aggregator = SessionAggregator::default();
        aggregator.add_individual_result(
            &AnalysisResult {
                classification: Classification::Public,
                confidence: 0.12,
                risk_label: "SEGURO".to_string(),
                entities: Vec::new(),
            },
            "Pedido sem dados",
            None,
        );
        aggregator.add_individual_result(
            &AnalysisResult {
                classification: Classification::Restricted,
                confidence: 0.934,
                risk_label: "ALTO".to_string(),
                entities: vec![
                    Entity {
                        entity_type: "CPF".to_string(),
                        value: "123.456.789-09".to_string(),
                        confidence: 0.99,
                    },
                    Entity {
                        entity_type: "EMAIL".to_string(),
                        value: "a@b.com".to_string(),
                        confidence: 0.9,
                    },
                ],
            },
            "Meu CPF; e email",
            None,
        );
        aggregator.history()
    }

    #[test]
    fn test_rows_follow_history_order() {
        let rows = export_rows(&sample_history());

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].position, 1);
        assert_eq!(rows[0].classification, "NÃO PÚBLICO");
        assert_eq!(rows[0].confidence, "93.4%");
        assert_eq!(rows[0].risk_level, "Alto");
        assert_eq!(rows[0].kind, "Individual");
        assert_eq!(rows[0].identified, "CPF: 123.456.789-09; EMAIL: a@b.com");
        assert_eq!(rows[1].identified, "Nenhum");
        assert_eq!(rows[1].risk_level, "Seguro");
    }

    #[test]
    fn test_csv_has_bom_headers_and_quotes() {
        let bytes = history_to_csv(&sample_history()).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));

        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), EXPORT_HEADERS.join(";"));
        // 含分隔符的字段被引号包裹
        assert!(lines.next().unwrap().contains("\"Meu CPF; e email\""));
        assert_eq!(text.lines().count(), 3);
    }

    #[tokio::test]
    async fn test_export_files_are_written() {
        let dir = std::env::temp_dir().join(format!("pii_export_{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();

        let csv_path = dir.join("historico.csv");
        let json_path = dir.join("historico.json");
        let history = sample_history();

        export_history_csv(&history, &csv_path).await.unwrap();
        export_history_json(&history, &json_path).await.unwrap();

        let json: serde_json::Value =
            serde_json::from_slice(&tokio::fs::read(&json_path).await.unwrap()).unwrap();
        assert_eq!(json[0]["Nível de Risco"], "Alto");
        assert!(tokio::fs::metadata(&csv_path).await.unwrap().len() > 0);

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
