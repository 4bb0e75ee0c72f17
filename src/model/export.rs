//! 汇出：CSV（带 BOM）、JSON 表格与树状 JSON 的内容与档名

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::model::data_core::AppError;
use crate::model::table::Row;

/// 树状 JSON 的固定下载档名
pub const TREE_EXPORT_FILENAME: &str = "edited_tree.json";

const UTF8_BOM: &str = "\u{feff}";

/// 一份待写出的档案
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub filename: String,
    pub content: String,
}

/// `YYYY-MM-DD-HH-MM-SS`（UTC）
pub fn timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d-%H-%M-%S").to_string()
}

/// CSV 内容：BOM + 标题列 + 依标题顺序的资料列
pub fn rows_to_csv(headers: &[String], rows: &[Row]) -> Result<String, AppError> {
    let mut wtr = csv::WriterBuilder::new()
        .flexible(false)
        .from_writer(Vec::new());
    wtr.write_record(headers)?;
    for row in rows {
        let record: Vec<String> = headers
            .iter()
            .map(|h| row.get(h).map(|v| v.as_field()).unwrap_or_default())
            .collect();
        wtr.write_record(&record)?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| AppError::State(format!("CSV 写出失败: {}", e)))?;
    let body = String::from_utf8(bytes).map_err(|e| AppError::State(e.to_string()))?;
    Ok(format!("{}{}", UTF8_BOM, body))
}

/// JSON 内容：依标题顺序的物件阵列，2 空格缩排
pub fn rows_to_json(headers: &[String], rows: &[Row]) -> Result<String, AppError> {
    let array: Vec<Value> = rows
        .iter()
        .map(|row| {
            let obj: serde_json::Map<String, Value> = headers
                .iter()
                .map(|h| {
                    let v = row.get(h).map(|c| c.to_json()).unwrap_or_else(|| Value::String(String::new()));
                    (h.clone(), v)
                })
                .collect();
            Value::Object(obj)
        })
        .collect();
    Ok(serde_json::to_string_pretty(&Value::Array(array))?)
}

pub fn csv_export(headers: &[String], rows: &[Row], now: DateTime<Utc>) -> Result<ExportFile, AppError> {
    Ok(ExportFile {
        filename: format!("edited-{}.csv", timestamp(now)),
        content: rows_to_csv(headers, rows)?,
    })
}

pub fn json_export(headers: &[String], rows: &[Row], now: DateTime<Utc>) -> Result<ExportFile, AppError> {
    Ok(ExportFile {
        filename: format!("edited-{}.json", timestamp(now)),
        content: rows_to_json(headers, rows)?,
    })
}

/// 树状资料还原后的 JSON
pub fn tree_export(value: &Value) -> Result<ExportFile, AppError> {
    Ok(ExportFile {
        filename: TREE_EXPORT_FILENAME.to_string(),
        content: serde_json::to_string_pretty(value)?,
    })
}
