//! 表格与树状资料编辑核心
//!
//! 提供栏位类型推断、CSV/JSON 导入汇出、物件与标签树双向转换，
//! 以及表格转树状图的视觉化转接；以单执行绪会话驱动所有操作

pub mod model;
pub mod utils;
pub mod vm;

// 重新导出主要类型
pub use model::cell::CellValue;
pub use model::columns::{infer_columns, ColumnKind, ColumnSpec, NewColumnConfig, NewColumnKind};
pub use model::data_core::{AppError, AppState, TreeView};
pub use model::table::{array_to_objects, build_default_sheet, Row, SheetData, SheetState};
pub use model::tree::{from_tree, parse_value, to_tree, TreeNode};
pub use model::visualize::rows_to_tree;
