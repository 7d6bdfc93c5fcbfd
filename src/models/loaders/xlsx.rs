//! 读取 .xlsx 的第一个工作表
//!
//! 按 `xl/workbook.xml` 中的顺序确定第一个工作表，只解析它和
//! `xl/sharedStrings.xml`，返回 `(表格行号, 单元格文本)` 列表，行号从 1 开始。

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{Cursor, Read};

use crate::error::ValidationError;

/// 单个 ZIP 条目解压后的最大字节数（防 zip 炸弹）
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;
/// 单个工作表最多读取的单元格数
const MAX_CELLS_PER_SHEET: usize = 500_000;
/// Excel 的最大列号（XFD，从 0 开始）
const MAX_COLUMN_INDEX: usize = 16_383;

type Archive<'a> = zip::ZipArchive<Cursor<&'a [u8]>>;

/// 表格行：`(行号, 各列文本)`
pub type SheetRow = (usize, Vec<String>);

pub fn read_first_sheet(bytes: &[u8]) -> Result<Vec<SheetRow>, ValidationError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(unreadable)?;

    let sheet_name = match workbook_first_sheet(&mut archive)? {
        Some(name) => name,
        None => first_worksheet_name(&archive).ok_or(ValidationError::EmptySheet)?,
    };

    let shared_strings = if has_entry(&archive, "xl/sharedStrings.xml") {
        let xml = read_entry_bounded(&mut archive, "xl/sharedStrings.xml")?;
        parse_shared_strings(&xml)?
    } else {
        Vec::new()
    };

    let sheet_xml = read_entry_bounded(&mut archive, &sheet_name)?;
    parse_sheet_rows(&sheet_xml, &shared_strings)
}

fn unreadable(err: impl std::fmt::Display) -> ValidationError {
    ValidationError::Unreadable {
        reason: err.to_string(),
    }
}

/// 工作簿里排在第一位的工作表对应的 ZIP 条目
///
/// `workbook.xml` 给出顺序和关系 id，`workbook.xml.rels` 把 id 映射到文件。
/// 任一文件缺失或目标不存在时返回 `None`，由调用方按文件名兜底。
fn workbook_first_sheet(archive: &mut Archive<'_>) -> Result<Option<String>, ValidationError> {
    const WORKBOOK: &str = "xl/workbook.xml";
    const WORKBOOK_RELS: &str = "xl/_rels/workbook.xml.rels";

    if !has_entry(archive, WORKBOOK) || !has_entry(archive, WORKBOOK_RELS) {
        return Ok(None);
    }

    let workbook = read_entry_bounded(archive, WORKBOOK)?;
    let Some(rel_id) = first_element_attr(&workbook, b"sheet", |key| key == b"id", None)? else {
        return Ok(None);
    };

    let rels = read_entry_bounded(archive, WORKBOOK_RELS)?;
    let Some(target) = first_element_attr(
        &rels,
        b"Relationship",
        |key| key == b"Target",
        Some(("Id", rel_id.as_str())),
    )?
    else {
        return Ok(None);
    };

    let entry = match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    };
    Ok(has_entry(archive, &entry).then_some(entry))
}

/// 找到第一个名为 `element` 的元素（可限定某个属性值），返回其匹配 `wanted` 的属性
///
/// 属性按本地名比较，`r:id` 与其他前缀的写法都能匹配到 `id`。
fn first_element_attr(
    xml: &[u8],
    element: &[u8],
    wanted: impl Fn(&[u8]) -> bool,
    required: Option<(&str, &str)>,
) -> Result<Option<String>, ValidationError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == element => {
                let matches = match required {
                    Some((key, value)) => attr(&e, key.as_bytes()).as_deref() == Some(value),
                    None => true,
                };
                if matches {
                    let found = e
                        .attributes()
                        .flatten()
                        .find(|a| wanted(a.key.local_name().as_ref()))
                        .map(|a| String::from_utf8_lossy(&a.value).into_owned());
                    return Ok(found);
                }
            }
            Ok(Event::Eof) => return Ok(None),
            Err(e) => return Err(unreadable(e)),
            _ => {}
        }
        buf.clear();
    }
}

fn has_entry(archive: &Archive<'_>, name: &str) -> bool {
    archive.file_names().any(|n| n == name)
}

fn first_worksheet_name(archive: &Archive<'_>) -> Option<String> {
    archive
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/sheet") && n.ends_with(".xml"))
        .min_by_key(|name| {
            name.trim_start_matches("xl/worksheets/sheet")
                .trim_end_matches(".xml")
                .parse::<u32>()
                .unwrap_or(u32::MAX)
        })
        .map(str::to_string)
}

fn read_entry_bounded(archive: &mut Archive<'_>, name: &str) -> Result<Vec<u8>, ValidationError> {
    let entry = archive.by_name(name).map_err(unreadable)?;
    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(unreadable)?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(unreadable(format!("{} 超出大小限制", name)));
    }
    Ok(out)
}

/// 共享字符串表；富文本的多个 `<t>` 拼接为一个字符串
fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>, ValidationError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_t = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_t = true,
                _ => {}
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"si" => {
                strings.push(String::new());
            }
            Ok(Event::Text(te)) if in_t => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&te.unescape().map_err(unreadable)?);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_t = false,
                b"si" => strings.push(current.take().unwrap_or_default()),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(unreadable(e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// 单元格类型（`t` 属性）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellType {
    Shared,
    Inline,
    Plain,
}

#[derive(Debug)]
struct PendingCell {
    column: usize,
    cell_type: CellType,
    value: String,
}

fn parse_sheet_rows(xml: &[u8], shared_strings: &[String]) -> Result<Vec<SheetRow>, ValidationError> {
    parse_sheet_rows_limited(xml, shared_strings, MAX_CELLS_PER_SHEET)
}

/// 超过 `max_cells` 个单元格时整体拒绝，不返回截断的结果
fn parse_sheet_rows_limited(
    xml: &[u8],
    shared_strings: &[String],
    max_cells: usize,
) -> Result<Vec<SheetRow>, ValidationError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut rows: Vec<SheetRow> = Vec::new();

    let mut row: Option<SheetRow> = None;
    let mut cell: Option<PendingCell> = None;
    let mut in_value = false;
    let mut cell_count = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"row" => {
                    let next = rows.last().map(|(n, _)| n + 1).unwrap_or(1);
                    let number = attr(&e, b"r")
                        .and_then(|r| r.parse().ok())
                        .unwrap_or(next);
                    row = Some((number, Vec::new()));
                }
                b"c" => {
                    let next_column = row.as_ref().map(|(_, cells)| cells.len()).unwrap_or(0);
                    let column = match attr(&e, b"r") {
                        Some(reference) => column_index(&reference)?,
                        None => None,
                    }
                    .unwrap_or(next_column);
                    if column > MAX_COLUMN_INDEX {
                        return Err(unreadable(format!("列号超出范围: {}", column)));
                    }
                    let cell_type = match attr(&e, b"t").as_deref() {
                        Some("s") => CellType::Shared,
                        Some("inlineStr") => CellType::Inline,
                        _ => CellType::Plain,
                    };
                    cell = Some(PendingCell {
                        column,
                        cell_type,
                        value: String::new(),
                    });
                }
                b"v" | b"t" => in_value = true,
                _ => {}
            },
            Ok(Event::Text(te)) if in_value => {
                if let Some(c) = cell.as_mut() {
                    c.value.push_str(&te.unescape().map_err(unreadable)?);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    if let (Some(c), Some((_, cells))) = (cell.take(), row.as_mut()) {
                        if cell_count >= max_cells {
                            return Err(ValidationError::TooLarge { limit: max_cells });
                        }
                        let text = resolve_cell(&c, shared_strings);
                        if cells.len() <= c.column {
                            cells.resize(c.column + 1, String::new());
                        }
                        cells[c.column] = text;
                        cell_count += 1;
                    }
                }
                b"row" => {
                    if let Some(r) = row.take() {
                        rows.push(r);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(unreadable(e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(rows)
}

fn resolve_cell(cell: &PendingCell, shared_strings: &[String]) -> String {
    match cell.cell_type {
        CellType::Shared => cell
            .value
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|i| shared_strings.get(i))
            .cloned()
            .unwrap_or_default(),
        CellType::Inline | CellType::Plain => cell.value.clone(),
    }
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// `"B12"` → `Some(1)`（列号从 0 开始）；没有列字母时为 `None`
///
/// 超出 Excel 列范围（XFD）的引用视为损坏文件。
fn column_index(reference: &str) -> Result<Option<usize>, ValidationError> {
    let mut index = 0usize;
    let mut seen = false;
    for c in reference.chars().take_while(|c| c.is_ascii_alphabetic()) {
        seen = true;
        let digit = c.to_ascii_uppercase() as usize - 'A' as usize + 1;
        index = index
            .checked_mul(26)
            .and_then(|v| v.checked_add(digit))
            .filter(|v| *v <= MAX_COLUMN_INDEX + 1)
            .ok_or_else(|| unreadable(format!("单元格引用不合法: {}", reference)))?;
    }
    Ok(seen.then(|| index - 1))
}
