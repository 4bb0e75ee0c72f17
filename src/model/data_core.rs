//! AppState：表格与树状视图的唯一状态，由事件循环持有并逐一传入各操作

use std::path::Path;

use chrono::{DateTime, Utc};
use jsonpath_rust::JsonPath; // 提供 query 扩展
use serde_json::Value;
use thiserror::Error;

use crate::model::export::{csv_export, json_export, tree_export, ExportFile};
use crate::model::import::{parse_csv_file, parse_pasted_text, ImportedTable};
use crate::model::outline::{build_outline, parse_node_path, render_outline, OutlineRow};
use crate::model::table::SheetState;
use crate::model::tree::{from_tree, to_tree, TreeNode, ROOT_KEY};
use crate::model::visualize::visualize;
use crate::utils::fs::read_file_bytes;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO失败: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON解析失败: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("解析錯誤：{0}")]
    Csv(#[from] csv::Error),
    #[error("請上傳有效的 JSON 檔案")]
    InvalidJson,
    #[error("沒有資料可以下載")]
    NothingToDownload,
    #[error("JSONPath错误: {0}")]
    JsonPath(String),
    #[error("栏位已存在: {0}")]
    DuplicateColumn(String),
    #[error("索引超出范围: {0}")]
    IndexOutOfRange(String),
    #[error("找不到节点: {0}")]
    NodeNotFound(String),
    #[error("剪贴簿错误: {0}")]
    Clipboard(String),
    #[error("状态错误: {0}")]
    State(String),
}

/// 预设范例文件
pub fn example_json() -> Value {
    serde_json::json!({
        "name": "Alice",
        "age": 30,
        "hobbies": ["reading", "swimming", "coding"],
        "education": {
            "undergraduate": {"school": "University A", "year": 2012},
            "graduate": {"school": "University B", "year": 2015}
        },
        "isEmployed": true
    })
}

/// 树状视图：持有目前编辑中的标签树（取代全局的 currentTreeData）
#[derive(Debug, Clone, Default)]
pub struct TreeView {
    current: Option<TreeNode>,
}

impl TreeView {
    /// 以预设范例开始
    pub fn with_example() -> Self {
        let mut view = Self::default();
        view.draw(to_tree(&example_json(), ROOT_KEY));
        view
    }

    pub fn current(&self) -> Option<&TreeNode> {
        self.current.as_ref()
    }

    /// 整体替换目前的树
    pub fn draw(&mut self, tree: TreeNode) {
        tracing::debug!("重绘树状图: {}", tree.name);
        self.current = Some(tree);
    }

    /// 上传 JSON 文字；无效时保留原状态
    pub fn upload_json(&mut self, text: &str) -> Result<(), AppError> {
        let value = parse_upload(text.as_bytes())?;
        self.draw(to_tree(&value, ROOT_KEY));
        Ok(())
    }

    /// 上传 JSON 文字并以 JSONPath 选取第一个匹配节点作为树根
    pub fn upload_json_at(&mut self, text: &str, json_path: &str) -> Result<(), AppError> {
        let dom = parse_upload(text.as_bytes())?;
        self.draw_at(&dom, json_path)
    }

    fn draw_at(&mut self, dom: &Value, json_path: &str) -> Result<(), AppError> {
        let hits: Vec<&Value> = dom
            .query(json_path)
            .map_err(|e| AppError::JsonPath(e.to_string()))?;
        let first = hits
            .into_iter()
            .next()
            .ok_or_else(|| AppError::JsonPath("未匹配到任何节点".into()))?;
        let tree = to_tree(first, &key_from_path(json_path));
        self.draw(tree);
        Ok(())
    }

    /// 读取 JSON 文件；编码或语法错误都视为无效上传
    pub fn load_json_file(&mut self, path: &Path, json_path: Option<&str>) -> Result<(), AppError> {
        let bytes = read_file_bytes(path)?;
        let value = parse_upload(&bytes)?;
        match json_path {
            Some(p) => self.draw_at(&value, p)?,
            None => self.draw(to_tree(&value, ROOT_KEY)),
        }
        tracing::info!("已载入树状资料: {}", path.display());
        Ok(())
    }

    /// 修改节点标签；空白文字视为取消，回传是否有变更
    pub fn edit_label(&mut self, node_path: &str, text: &str) -> Result<bool, AppError> {
        let new_text = text.trim();
        if new_text.is_empty() {
            return Ok(false);
        }
        let indices = parse_node_path(node_path)
            .ok_or_else(|| AppError::NodeNotFound(node_path.to_string()))?;
        let tree = self
            .current
            .as_mut()
            .ok_or_else(|| AppError::State("尚未载入树状资料".into()))?;
        let node = tree
            .node_at_mut(&indices)
            .ok_or_else(|| AppError::NodeNotFound(node_path.to_string()))?;
        tracing::info!("标签 {} → {}", node.name, new_text);
        node.name = new_text.to_string();
        Ok(true)
    }

    /// 还原为 JSON 并准备下载
    pub fn download(&self) -> Result<ExportFile, AppError> {
        let tree = self.current.as_ref().ok_or(AppError::NothingToDownload)?;
        tree_export(&from_tree(tree))
    }

    pub fn outline(&self) -> Vec<OutlineRow> {
        self.current.as_ref().map(build_outline).unwrap_or_default()
    }

    pub fn render(&self) -> Option<String> {
        self.current.as_ref().map(render_outline)
    }
}

fn parse_upload(bytes: &[u8]) -> Result<Value, AppError> {
    serde_json::from_slice(bytes).map_err(|e| {
        tracing::error!("JSON 解析失败: {}", e);
        AppError::InvalidJson
    })
}

/// JSONPath 最后一段作为树根键名
fn key_from_path(json_path: &str) -> String {
    let p = json_path.trim();
    if p == "$" || p.is_empty() {
        return ROOT_KEY.to_string();
    }
    let tail = match (p.rfind('.'), p.rfind('[')) {
        (Some(d), Some(b)) if b > d => &p[b..],
        (Some(d), _) => &p[d + 1..],
        (None, Some(b)) => &p[b..],
        (None, None) => p,
    };
    let inner = tail.trim_start_matches('[').trim_end_matches(']');
    if inner.chars().all(|c| c.is_ascii_digit()) && !inner.is_empty() {
        format!("[{}]", inner)
    } else {
        inner.trim_matches(|c| c == '\'' || c == '"').to_string()
    }
}

/// 整体应用状态
#[derive(Debug, Clone)]
pub struct AppState {
    pub sheet: SheetState,
    pub tree: TreeView,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            sheet: SheetState::default(),
            tree: TreeView::with_example(),
        }
    }
}

impl AppState {
    fn apply_import(&mut self, table: ImportedTable) {
        self.sheet.load_data(table.rows, table.headers);
    }

    /// 导入 CSV 文件；解析失败时不套用任何部分结果
    pub fn import_csv_file(&mut self, path: &Path) -> Result<(), AppError> {
        let table = parse_csv_file(path)?;
        self.apply_import(table);
        Ok(())
    }

    /// 贴上文字；回传是否有载入资料
    pub fn paste_text(&mut self, text: &str, no_header: bool) -> Result<bool, AppError> {
        match parse_pasted_text(text, no_header)? {
            Some(table) => {
                self.apply_import(table);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn export_csv(&self, now: DateTime<Utc>) -> Result<ExportFile, AppError> {
        let (headers, rows) = self.sheet.current_data_objects();
        csv_export(&headers, &rows, now)
    }

    pub fn export_json(&self, now: DateTime<Utc>) -> Result<ExportFile, AppError> {
        let (headers, rows) = self.sheet.current_data_objects();
        json_export(&headers, &rows, now)
    }

    /// 把表格画到树状视图
    pub fn visualize_sheet(&mut self) -> bool {
        visualize(self.sheet.source_rows(), Some(&mut self.tree))
    }
}
