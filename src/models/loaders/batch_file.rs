//! 批量文件校验
//!
//! 在发起任何网络请求之前解析并校验上传的 .csv / .xlsx 文件，
//! 按文件行序返回 `WorkItem` 列表。

use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;
use tokio::fs;
use tracing::{debug, info};

use super::xlsx::{self, SheetRow};
use crate::error::ValidationError;
use crate::models::batch::WorkItem;

/// 校验失败时提供给用户下载的示例
pub const EXAMPLE_CSV: &str = "id,texto mascarado\n12345,Exemplo de texto para análise";

/// 示例文件名
pub const EXAMPLE_FILE_NAME: &str = "exemplo_lote.csv";

/// id 列可接受的表头
const ID_ALIASES: &[&str] = &["id", "identificador", "protocolo", "idpedido", "id_pedido"];

/// 文本列可接受的表头
const TEXT_ALIASES: &[&str] = &[
    "text",
    "texto",
    "texto_mascarado",
    "texto mascarado",
    "mascarado",
    "mensagem",
    "solicitacao",
    "descrição",
    "descricao",
    "conteudo",
    "conteúdo",
];

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]").expect("静态正则"));

/// 支持的文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Csv,
    Xlsx,
}

impl SheetFormat {
    pub fn from_file_name(file_name: &str) -> Result<Self, ValidationError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|s| s.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("csv") => Ok(SheetFormat::Csv),
            Some("xlsx") => Ok(SheetFormat::Xlsx),
            _ => Err(ValidationError::UnsupportedFormat { extension }),
        }
    }
}

/// 读取并校验磁盘上的批量文件
pub async fn validate_file(path: &Path) -> Result<Vec<WorkItem>, ValidationError> {
    let file_name = path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    // 先看扩展名，格式不对就不读文件
    SheetFormat::from_file_name(&file_name)?;

    let bytes = fs::read(path)
        .await
        .map_err(|e| ValidationError::Unreadable {
            reason: format!("{}: {}", path.display(), e),
        })?;

    info!("📄 正在校验批量文件: {} ({} 字节)", file_name, bytes.len());
    validate_bytes(&file_name, &bytes)
}

/// 校验内存中的文件内容
pub fn validate_bytes(file_name: &str, bytes: &[u8]) -> Result<Vec<WorkItem>, ValidationError> {
    let rows = match SheetFormat::from_file_name(file_name)? {
        SheetFormat::Csv => read_csv_rows(bytes)?,
        SheetFormat::Xlsx => xlsx::read_first_sheet(bytes)?,
    };
    rows_to_work_items(rows)
}

/// 把示例文件写到指定目录，返回文件路径
pub async fn write_example_template(dir: &Path) -> std::io::Result<std::path::PathBuf> {
    let path = dir.join(EXAMPLE_FILE_NAME);
    fs::write(&path, EXAMPLE_CSV).await?;
    Ok(path)
}

/// 表头归一化：去空白、小写、去重音、只保留字母数字
pub fn normalize_header(header: &str) -> String {
    let folded: String = header.trim().to_lowercase().chars().map(fold_diacritic).collect();
    NON_ALNUM.replace_all(&folded, "").into_owned()
}

fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

fn read_csv_rows(bytes: &[u8]) -> Result<Vec<SheetRow>, ValidationError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let delimiter = detect_delimiter(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ValidationError::Unreadable {
            reason: e.to_string(),
        })?;
        // 文件中的物理行号，空行也计入
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(index + 1);
        rows.push((line, record.iter().map(str::to_string).collect()));
    }
    Ok(rows)
}

/// 表头行里分号多于逗号时按分号分隔（Excel 葡语区域导出的 CSV）
fn detect_delimiter(bytes: &[u8]) -> u8 {
    let first_line = bytes.split(|b| *b == b'\n').next().unwrap_or_default();
    let commas = first_line.iter().filter(|b| **b == b',').count();
    let semicolons = first_line.iter().filter(|b| **b == b';').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

fn is_blank(cells: &[String]) -> bool {
    cells.iter().all(|c| c.trim().is_empty())
}

fn find_column(header_map: &HashMap<String, usize>, aliases: &[&str]) -> Option<usize> {
    aliases
        .iter()
        .map(|alias| normalize_header(alias))
        .find_map(|alias| header_map.get(&alias).copied())
}

fn rows_to_work_items(rows: Vec<SheetRow>) -> Result<Vec<WorkItem>, ValidationError> {
    let mut rows = rows.into_iter().filter(|(_, cells)| !is_blank(cells));

    let (_, header) = rows.next().ok_or(ValidationError::EmptySheet)?;
    let data: Vec<SheetRow> = rows.collect();
    if data.is_empty() {
        return Err(ValidationError::NoDataRows);
    }

    let mut header_map = HashMap::new();
    for (index, name) in header.iter().enumerate() {
        header_map.entry(normalize_header(name)).or_insert(index);
    }

    let id_column = find_column(&header_map, ID_ALIASES);
    let text_column = find_column(&header_map, TEXT_ALIASES);
    let (id_column, text_column) = match (id_column, text_column) {
        (Some(id), Some(text)) => (id, text),
        (id, text) => {
            return Err(ValidationError::MissingColumns {
                has_id_column: id.is_some(),
                has_text_column: text.is_some(),
            })
        }
    };
    debug!(
        "识别到列: id = {:?}, 文本 = {:?}",
        header.get(id_column),
        header.get(text_column)
    );

    let cell = |cells: &[String], column: usize| -> String {
        cells.get(column).map(|c| c.trim().to_string()).unwrap_or_default()
    };

    data.iter()
        .map(|(line, cells)| {
            let id = cell(cells, id_column);
            let text = cell(cells, text_column);
            if id.is_empty() || text.is_empty() {
                Err(ValidationError::RowData { line: *line })
            } else {
                Ok(WorkItem { id, text })
            }
        })
        .collect()
}
