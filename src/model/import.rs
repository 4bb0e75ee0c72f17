//! CSV 导入：文件导入与贴上文字两种入口，产出整张表的标题与列资料

use std::io::Read;
use std::path::Path;

use crate::model::cell::CellValue;
use crate::model::data_core::AppError;
use crate::model::table::{array_to_objects, Row};

/// 导入结果：整体替换表格用
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

/// 读取所有记录，跳过空白列（只含空白字符的列也跳过）
fn read_records<R: Read>(reader: R) -> Result<Vec<Vec<String>>, AppError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        records.push(record.iter().map(|f| f.to_string()).collect());
    }
    Ok(records)
}

/// 标题去重：重复的名称依序加上 `_1`、`_2`
fn dedupe_headers(raw: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for h in raw {
        let mut candidate = h.clone();
        let mut n = 1;
        while out.contains(&candidate) {
            candidate = format!("{}_{}", h, n);
            n += 1;
        }
        out.push(candidate);
    }
    out
}

/// 产生 `Column 1..N` 的合成标题
pub fn synthetic_headers(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("Column {}", i)).collect()
}

fn to_cells(records: &[Vec<String>]) -> Vec<Vec<CellValue>> {
    records
        .iter()
        .map(|r| r.iter().map(|f| CellValue::from_field(f)).collect())
        .collect()
}

fn with_headers(mut records: Vec<Vec<String>>) -> ImportedTable {
    if records.is_empty() {
        return ImportedTable {
            headers: Vec::new(),
            rows: Vec::new(),
        };
    }
    let mut raw = records.remove(0);
    if let Some(first) = raw.first_mut() {
        *first = first.trim_start_matches('\u{feff}').to_string();
    }
    let headers = dedupe_headers(raw);
    let rows = array_to_objects(&to_cells(&records), &headers);
    ImportedTable { headers, rows }
}

fn without_headers(records: Vec<Vec<String>>) -> Option<ImportedTable> {
    let first = records.first()?;
    let headers = synthetic_headers(first.len());
    let rows = array_to_objects(&to_cells(&records), &headers);
    Some(ImportedTable { headers, rows })
}

/// 从读取器导入 CSV（第一列为标题）
pub fn parse_csv_reader<R: Read>(reader: R) -> Result<ImportedTable, AppError> {
    let records = read_records(reader)?;
    let table = with_headers(records);
    tracing::info!(
        "CSV 解析完成: {} 栏, {} 列",
        table.headers.len(),
        table.rows.len()
    );
    Ok(table)
}

/// 导入 CSV 文件（第一列为标题）
pub fn parse_csv_file(path: &Path) -> Result<ImportedTable, AppError> {
    let file = std::fs::File::open(path)?;
    parse_csv_reader(std::io::BufReader::new(file))
}

/// 贴上的文字：空白文字静默忽略（回传 None）；
/// 无标题模式下没有任何资料列时同样忽略
pub fn parse_pasted_text(text: &str, no_header: bool) -> Result<Option<ImportedTable>, AppError> {
    if text.trim().is_empty() {
        tracing::warn!("贴上的文字为空，忽略");
        return Ok(None);
    }
    let records = read_records(text.as_bytes())?;
    if no_header {
        Ok(without_headers(records))
    } else {
        Ok(Some(with_headers(records)))
    }
}
