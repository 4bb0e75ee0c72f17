//! 表格状态：标题顺序、栏位规则与列数据，三者始终同步

use indexmap::IndexMap;

use crate::model::cell::CellValue;
use crate::model::columns::{infer_columns, ColumnSpec, NewColumnConfig};
use crate::model::data_core::AppError;

/// 一列资料：标题 → 单元格值
pub type Row = IndexMap<String, CellValue>;

/// 默认示范表的标题
pub const DEFAULT_HEADERS: [&str; 4] = ["年齡", "日期", "類別", "備註"];

/// 标题、栏位规则与资料的整体快照
#[derive(Debug, Clone, PartialEq)]
pub struct SheetData {
    pub headers: Vec<String>,
    pub columns: Vec<ColumnSpec>,
    pub data: Vec<Row>,
}

/// 按位置把阵列列与标题配对，缺少的位置补空值
pub fn array_to_objects<S: AsRef<str>>(rows: &[Vec<CellValue>], headers: &[S]) -> Vec<Row> {
    rows.iter()
        .map(|r| {
            headers
                .iter()
                .enumerate()
                .map(|(i, h)| (h.as_ref().to_string(), r.get(i).cloned().unwrap_or_default()))
                .collect()
        })
        .collect()
}

/// 尚未导入资料时使用的示范表
pub fn build_default_sheet() -> SheetData {
    let headers: Vec<String> = DEFAULT_HEADERS.iter().map(|h| h.to_string()).collect();
    let rows = vec![
        vec![
            CellValue::Number(20.0),
            "2025-01-01".into(),
            "其他".into(),
            "示例".into(),
        ],
        vec![
            CellValue::Number(100.0),
            "2025-01-01".into(),
            "其他".into(),
            "示例".into(),
        ],
    ];
    SheetData {
        columns: infer_columns(&headers),
        data: array_to_objects(&rows, &headers),
        headers,
    }
}

/// 表格的唯一可变状态（取代全局的表格实例）
#[derive(Debug, Clone)]
pub struct SheetState {
    headers: Vec<String>,
    columns: Vec<ColumnSpec>,
    data: Vec<Row>,
    /// 最近一次选取的 (列, 栏)
    selection: Option<(usize, usize)>,
}

impl Default for SheetState {
    fn default() -> Self {
        let SheetData {
            headers,
            columns,
            data,
        } = build_default_sheet();
        Self {
            headers,
            columns,
            data,
            selection: None,
        }
    }
}

impl SheetState {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// 原始列资料（可能带有多余或缺少的键）
    pub fn source_rows(&self) -> &[Row] {
        &self.data
    }

    pub fn row_count(&self) -> usize {
        self.data.len()
    }

    pub fn col_count(&self) -> usize {
        self.headers.len()
    }

    pub fn selection(&self) -> Option<(usize, usize)> {
        self.selection
    }

    /// 整体替换标题、栏位规则与资料
    pub fn load_data(&mut self, rows: Vec<Row>, headers: Vec<String>) {
        self.columns = infer_columns(&headers);
        self.headers = headers;
        self.data = rows;
        self.selection = None;
        tracing::info!(
            "表格已载入: {} 栏, {} 列",
            self.headers.len(),
            self.data.len()
        );
    }

    /// 以当前标题严格重投影每一列：丢弃多余键，缺少的补空值
    pub fn current_data_objects(&self) -> (Vec<String>, Vec<Row>) {
        let rows = self
            .data
            .iter()
            .map(|r| {
                self.headers
                    .iter()
                    .map(|h| (h.clone(), r.get(h).cloned().unwrap_or_default()))
                    .collect()
            })
            .collect();
        (self.headers.clone(), rows)
    }

    /// 记录选取位置；超出范围时拒绝
    pub fn select(&mut self, row: usize, col: usize) -> Result<(), AppError> {
        if row >= self.data.len() || col >= self.headers.len() {
            return Err(AppError::IndexOutOfRange(format!(
                "选取 ({}, {}) 超出表格范围 {}×{}",
                row,
                col,
                self.data.len(),
                self.headers.len()
            )));
        }
        self.selection = Some((row, col));
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// 更新单一单元格
    pub fn set_cell(&mut self, row: usize, col: usize, value: CellValue) -> Result<(), AppError> {
        let header = self.headers.get(col).cloned().ok_or_else(|| {
            AppError::IndexOutOfRange(format!("栏位 {} 不存在", col))
        })?;
        let target = self
            .data
            .get_mut(row)
            .ok_or_else(|| AppError::IndexOutOfRange(format!("列 {} 不存在", row)))?;
        target.insert(header, value);
        Ok(())
    }

    /// 新增一列，每个标题一个空值
    pub fn add_row(&mut self) {
        let row: Row = self
            .headers
            .iter()
            .map(|h| (h.clone(), CellValue::Empty))
            .collect();
        self.data.push(row);
        self.selection = None;
        tracing::info!("新增列，目前 {} 列", self.data.len());
    }

    /// 删除选取的列，未选取时删除最后一列；返回被删除的索引
    pub fn remove_row(&mut self) -> Option<usize> {
        if self.data.is_empty() {
            tracing::warn!("表格没有资料列，忽略删除");
            return None;
        }
        let index = self
            .selection
            .map(|(r, _)| r)
            .filter(|r| *r < self.data.len())
            .unwrap_or(self.data.len() - 1);
        self.data.remove(index);
        self.selection = None;
        tracing::info!("删除第 {} 列", index + 1);
        Some(index)
    }

    /// 以预设名称 `Column N` 新增文字栏；N 从栏数 + 1 起递增到未被占用为止
    pub fn add_default_column(&mut self) -> Result<(), AppError> {
        let mut n = self.headers.len() + 1;
        while self.headers.iter().any(|h| *h == format!("Column {}", n)) {
            n += 1;
        }
        self.add_column(NewColumnConfig::new(&format!("Column {}", n), Default::default()))
    }

    /// 依设定新增一栏：每列写入预设内容
    pub fn add_column(&mut self, config: NewColumnConfig) -> Result<(), AppError> {
        if config.name.trim().is_empty() {
            return Err(AppError::State("栏位名称不可为空".into()));
        }
        if self.headers.iter().any(|h| *h == config.name) {
            return Err(AppError::DuplicateColumn(config.name));
        }
        for row in &mut self.data {
            row.insert(config.name.clone(), config.default_value.clone());
        }
        self.columns.push(config.to_spec());
        self.headers.push(config.name.clone());
        self.selection = None;
        tracing::info!("新增栏位 {} ({})", config.name, config.to_spec().kind.name());
        Ok(())
    }

    /// 删除选取的栏，未选取时删除最后一栏；同时从每一列移除该键
    pub fn remove_column(&mut self) -> Option<String> {
        if self.headers.is_empty() {
            tracing::warn!("表格没有栏位，忽略删除");
            return None;
        }
        let index = self
            .selection
            .map(|(_, c)| c)
            .filter(|c| *c < self.headers.len())
            .unwrap_or(self.headers.len() - 1);
        let name = self.headers.remove(index);
        self.columns.remove(index);
        for row in &mut self.data {
            row.shift_remove(&name);
        }
        self.selection = None;
        tracing::info!("删除栏位 {}", name);
        Some(name)
    }

    /// 列出所有未通过栏位验证的单元格：(列, 栏, 值)
    pub fn validation_report(&self) -> Vec<(usize, usize, CellValue)> {
        let mut invalid = Vec::new();
        for (r, row) in self.data.iter().enumerate() {
            for (c, spec) in self.columns.iter().enumerate() {
                let value = row.get(&spec.label).cloned().unwrap_or_default();
                if !spec.validate(&value) {
                    invalid.push((r, c, value));
                }
            }
        }
        invalid
    }

    pub fn snapshot(&self) -> SheetData {
        SheetData {
            headers: self.headers.clone(),
            columns: self.columns.clone(),
            data: self.data.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::columns::{ColumnKind, NewColumnKind};

    fn row(pairs: &[(&str, CellValue)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_array_to_objects_zips_by_position() {
        let rows = vec![vec![CellValue::Number(1.0), CellValue::Number(2.0)]];
        let objs = array_to_objects(&rows, &["a", "b"]);
        assert_eq!(
            objs,
            vec![row(&[("a", CellValue::Number(1.0)), ("b", CellValue::Number(2.0))])]
        );
    }

    #[test]
    fn test_array_to_objects_fills_missing_with_empty() {
        let rows = vec![vec![CellValue::Number(1.0)]];
        let objs = array_to_objects(&rows, &["a", "b"]);
        assert_eq!(
            objs,
            vec![row(&[("a", CellValue::Number(1.0)), ("b", CellValue::Empty)])]
        );
    }

    #[test]
    fn test_default_sheet() {
        let sheet = build_default_sheet();
        assert_eq!(sheet.headers, vec!["年齡", "日期", "類別", "備註"]);
        assert_eq!(sheet.data.len(), 2, "示范表应有两列");
        assert_eq!(sheet.data[1]["年齡"], CellValue::Number(100.0));
        let kinds: Vec<&str> = sheet.columns.iter().map(|c| c.kind.name()).collect();
        assert_eq!(kinds, vec!["numeric", "date", "dropdown", "text"]);
    }

    #[test]
    fn test_current_data_objects_reprojects_rows() {
        let mut state = SheetState::default();
        let rows = vec![
            row(&[("a", "1".into()), ("stray", "x".into())]),
            row(&[("b", "2".into())]),
        ];
        state.load_data(rows, vec!["a".into(), "b".into()]);
        let (headers, rows) = state.current_data_objects();
        assert_eq!(headers, vec!["a", "b"]);
        assert_eq!(rows[0], row(&[("a", "1".into()), ("b", CellValue::Empty)]));
        assert_eq!(rows[1], row(&[("a", CellValue::Empty), ("b", "2".into())]));
        assert!(!rows[0].contains_key("stray"), "多余的键应被丢弃");
    }

    #[test]
    fn test_add_and_remove_row() {
        let mut state = SheetState::default();
        state.add_row();
        assert_eq!(state.row_count(), 3);
        let last = &state.source_rows()[2];
        assert_eq!(last.len(), 4);
        assert!(last.values().all(|v| *v == CellValue::Empty));

        state.select(0, 0).unwrap();
        assert_eq!(state.remove_row(), Some(0));
        assert_eq!(state.row_count(), 2);
        assert_eq!(state.source_rows()[0]["年齡"], CellValue::Number(100.0));

        assert_eq!(state.remove_row(), Some(1), "未选取时删除最后一列");
        state.remove_row();
        assert_eq!(state.remove_row(), None, "空表删除应无作用");
    }

    #[test]
    fn test_remove_column_drops_key_everywhere() {
        let mut state = SheetState::default();
        state.select(0, 1).unwrap();
        assert_eq!(state.remove_column().as_deref(), Some("日期"));
        assert_eq!(state.headers(), &["年齡", "類別", "備註"]);
        assert_eq!(state.columns().len(), 3);
        assert_eq!(state.columns()[1].label, "類別", "后面的栏位应往前递补");
        for r in state.source_rows() {
            assert!(!r.contains_key("日期"), "每一列都应移除该键");
        }
        let (_, rows) = state.current_data_objects();
        assert_eq!(rows[0].keys().collect::<Vec<_>>(), vec!["年齡", "類別", "備註"]);
    }

    #[test]
    fn test_add_default_column_reuses_freed_index() {
        let mut state = SheetState::default();
        state.remove_column();
        state.add_default_column().unwrap();
        assert_eq!(state.headers()[3], "Column 4");
        assert!(state.source_rows().iter().all(|r| r["Column 4"] == CellValue::Empty));
    }

    #[test]
    fn test_add_default_column_skips_taken_names() {
        let mut state = SheetState::default();
        state.load_data(
            vec![row(&[("Column 1", "1".into()), ("Column 2", "2".into()), ("Column 3", "3".into())])],
            vec!["Column 1".into(), "Column 2".into(), "Column 3".into()],
        );
        state.select(0, 0).unwrap();
        assert_eq!(state.remove_column().as_deref(), Some("Column 1"));
        state.add_default_column().unwrap();
        assert_eq!(state.headers(), &["Column 2", "Column 3", "Column 4"]);
        assert_eq!(state.source_rows()[0]["Column 4"], CellValue::Empty);
        state.add_default_column().unwrap();
        assert_eq!(state.headers()[3], "Column 5");
    }

    #[test]
    fn test_empty_column_name_rejected() {
        let mut state = SheetState::default();
        let before = state.snapshot();
        for name in ["", "   "] {
            let result = state.add_column(NewColumnConfig::new(name, NewColumnKind::Text));
            assert!(matches!(result, Err(AppError::State(_))), "空名称应被拒绝");
        }
        assert_eq!(state.snapshot(), before, "失败时状态不变");
    }

    #[test]
    fn test_add_configured_column() {
        let mut state = SheetState::default();
        let config = NewColumnConfig::new("来源", NewColumnKind::Dropdown { candidates: vec![] })
            .with_default("网络".into());
        state.add_column(config).unwrap();
        assert_eq!(state.col_count(), 5);
        assert!(matches!(
            state.columns()[4].kind,
            ColumnKind::EnumSingle { strict: false, .. }
        ));
        assert!(state.source_rows().iter().all(|r| r["来源"] == "网络".into()));
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let mut state = SheetState::default();
        let before = state.snapshot();
        let result = state.add_column(NewColumnConfig::new("備註", NewColumnKind::Text));
        assert!(matches!(result, Err(AppError::DuplicateColumn(_))));
        assert_eq!(state.snapshot(), before, "失败时状态不变");
    }

    #[test]
    fn test_select_out_of_range() {
        let mut state = SheetState::default();
        assert!(state.select(5, 0).is_err());
        assert!(state.select(0, 9).is_err());
        assert_eq!(state.selection(), None);
    }

    #[test]
    fn test_validation_report() {
        let mut state = SheetState::default();
        state.set_cell(0, 0, "-3".into()).unwrap();
        state.set_cell(1, 1, "2025/01/01".into()).unwrap();
        let report = state.validation_report();
        let cells: Vec<(usize, usize)> = report.iter().map(|(r, c, _)| (*r, *c)).collect();
        assert_eq!(cells, vec![(0, 0), (1, 1)]);
    }
}
